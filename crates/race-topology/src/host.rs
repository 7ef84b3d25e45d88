//! Capacity tracking for a single host instance during bin packing.
//!
//! A [`HostInstance`] is builder-internal: it is created while packing,
//! mutated as nodes are committed, and discarded once its
//! [`capacity`](HostInstance::capacity) view is copied into a topology.

use tracing::trace;

use crate::resources::{InstanceTypeDetails, NodeResourceRequirements};
use crate::roles::{InstanceRole, NodeRole, Platform};
use crate::topology::NodeInstanceCapacity;

/// One abstract node waiting to be placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeUnit {
    pub role: NodeRole,
    pub requirements: NodeResourceRequirements,
}

/// Colocation restriction applied to a host when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostRestriction {
    #[default]
    None,
    /// Only nodes of exactly this role.
    Role(NodeRole),
    /// Only nodes of this platform.
    Platform(Platform),
    /// Only nodes that need a GPU.
    GpuOnly,
}

impl HostRestriction {
    fn admits(&self, role: NodeRole) -> bool {
        match self {
            HostRestriction::None => true,
            HostRestriction::Role(only) => *only == role,
            HostRestriction::Platform(platform) => role.platform() == *platform,
            HostRestriction::GpuOnly => role.requires_gpu(),
        }
    }
}

/// Running resource totals for one instance.
#[derive(Debug, Clone)]
pub struct HostInstance {
    role: InstanceRole,
    details: InstanceTypeDetails,
    restriction: HostRestriction,
    guaranteed_ram: f64,
    guaranteed_cpu: f64,
    guaranteed_gpu: f64,
    overcommitted_ram: f64,
    overcommitted_cpu: f64,
    overcommitted_gpu: f64,
    nodes: Vec<NodeRole>,
}

impl HostInstance {
    pub fn new(role: InstanceRole, details: InstanceTypeDetails, restriction: HostRestriction) -> Self {
        Self {
            role,
            details,
            restriction,
            guaranteed_ram: 0.0,
            guaranteed_cpu: 0.0,
            guaranteed_gpu: 0.0,
            overcommitted_ram: 0.0,
            overcommitted_cpu: 0.0,
            overcommitted_gpu: 0.0,
            nodes: Vec::new(),
        }
    }

    pub fn role(&self) -> InstanceRole {
        self.role
    }

    /// Roles of the nodes committed so far, in commit order.
    pub fn nodes(&self) -> &[NodeRole] {
        &self.nodes
    }

    /// RAM consumed from the instance budget, excluding the management reserve.
    pub fn used_ram(&self) -> f64 {
        self.guaranteed_ram + self.overcommitted_ram
    }

    pub fn used_cpu(&self) -> f64 {
        self.guaranteed_cpu + self.overcommitted_cpu
    }

    pub fn used_gpu(&self) -> f64 {
        self.guaranteed_gpu + self.overcommitted_gpu
    }

    /// Whether `node` could be committed without exceeding any budget.
    pub fn can_host(&self, node: &NodeUnit) -> bool {
        let role = node.role;
        if role.architecture != self.details.architecture {
            return false;
        }
        if role.requires_bare_metal() && !self.details.is_bare_metal {
            return false;
        }
        if role.requires_gpu() && self.details.gpu_count == 0 {
            return false;
        }
        if !self.restriction.admits(role) {
            return false;
        }

        let req = &node.requirements;
        fits(
            self.guaranteed_ram,
            req.guaranteed_ram(),
            self.overcommitted_ram,
            req.overcommitted_ram(),
            self.details.usable_ram_mb(),
        ) && fits(
            self.guaranteed_cpu,
            req.guaranteed_cpu(),
            self.overcommitted_cpu,
            req.overcommitted_cpu(),
            f64::from(self.details.cpu_count),
        ) && fits(
            self.guaranteed_gpu,
            req.guaranteed_gpu(),
            self.overcommitted_gpu,
            req.overcommitted_gpu(),
            f64::from(self.details.gpu_count),
        )
    }

    /// Commit `node` without checking capacity.
    ///
    /// Guaranteed amounts add up; overcommitted amounts keep only the maximum.
    pub fn add(&mut self, node: &NodeUnit) {
        let req = &node.requirements;
        self.guaranteed_ram += req.guaranteed_ram();
        self.guaranteed_cpu += req.guaranteed_cpu();
        self.guaranteed_gpu += req.guaranteed_gpu();
        self.overcommitted_ram = self.overcommitted_ram.max(req.overcommitted_ram());
        self.overcommitted_cpu = self.overcommitted_cpu.max(req.overcommitted_cpu());
        self.overcommitted_gpu = self.overcommitted_gpu.max(req.overcommitted_gpu());
        self.nodes.push(node.role);
        trace!(
            instance_type = %self.details.name,
            node = %node.role,
            ram = self.used_ram(),
            cpu = self.used_cpu(),
            gpu = self.used_gpu(),
            "committed node to host"
        );
    }

    /// Commit `node` if it fits. Returns whether it was committed.
    pub fn add_if_able_to_host(&mut self, node: &NodeUnit) -> bool {
        if !self.can_host(node) {
            return false;
        }
        self.add(node);
        true
    }

    /// Node counts per kind hosted on this instance.
    pub fn capacity(&self) -> NodeInstanceCapacity {
        let mut capacity = NodeInstanceCapacity::default();
        for role in &self.nodes {
            capacity.increment(role.kind);
        }
        capacity
    }
}

fn fits(guaranteed_used: f64, guaranteed: f64, overcommitted_used: f64, overcommitted: f64, budget: f64) -> bool {
    guaranteed_used + guaranteed + overcommitted_used.max(overcommitted) <= budget
}
