//! Resource model: per-node requirements and per-instance-type facts.
//!
//! Every requirement splits into a **guaranteed** portion, which adds up
//! across co-located nodes, and an **overcommitted** portion, which is shared:
//! an instance only needs to provision the largest overcommitted amount among
//! the nodes it hosts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::roles::{Architecture, InstanceRole, NodeKind};

/// RAM reserved on every instance for the host OS and orchestration agent.
pub const MANAGEMENT_OVERHEAD_RATIO: f64 = 0.05;
pub const MANAGEMENT_OVERHEAD_MIN_RAM_MB: f64 = 200.0;
pub const MANAGEMENT_OVERHEAD_MAX_RAM_MB: f64 = 1024.0;

/// RAM (MB) reserved for management on an instance with `ram_mb` of memory.
pub fn management_overhead_ram_mb(ram_mb: f64) -> f64 {
    (ram_mb * MANAGEMENT_OVERHEAD_RATIO).clamp(MANAGEMENT_OVERHEAD_MIN_RAM_MB, MANAGEMENT_OVERHEAD_MAX_RAM_MB)
}

/// Resources one node needs, with the share of each that may be overcommitted.
///
/// Ratios are expected to be within `[0, 1]`; see [`ResourceConstraints::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeResourceRequirements {
    pub ram_mb: f64,
    pub cpus: f64,
    pub gpus: f64,
    pub ram_overcommit: f64,
    pub cpu_overcommit: f64,
    pub gpu_overcommit: f64,
}

impl NodeResourceRequirements {
    pub fn guaranteed_ram(&self) -> f64 {
        self.ram_mb * (1.0 - self.ram_overcommit)
    }

    pub fn guaranteed_cpu(&self) -> f64 {
        self.cpus * (1.0 - self.cpu_overcommit)
    }

    pub fn guaranteed_gpu(&self) -> f64 {
        self.gpus * (1.0 - self.gpu_overcommit)
    }

    pub fn overcommitted_ram(&self) -> f64 {
        self.ram_mb * self.ram_overcommit
    }

    pub fn overcommitted_cpu(&self) -> f64 {
        self.cpus * self.cpu_overcommit
    }

    pub fn overcommitted_gpu(&self) -> f64 {
        self.gpus * self.gpu_overcommit
    }
}

/// Declared resources for one node kind. `ram_mb` and `cpus` are required
/// whenever the table is written out; `gpus` defaults to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindResources {
    pub ram_mb: f64,
    pub cpus: f64,
    #[serde(default)]
    pub gpus: f64,
}

impl KindResources {
    pub const fn new(ram_mb: f64, cpus: f64, gpus: f64) -> Self {
        Self { ram_mb, cpus, gpus }
    }
}

/// Resource constraints for a deployment: per-kind amounts plus global
/// overcommit ratios shared by every role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConstraints {
    pub ram_overcommit: f64,
    pub cpu_overcommit: f64,
    pub gpu_overcommit: f64,
    pub android_client: KindResources,
    pub linux_gpu_server: KindResources,
    pub linux_gpu_client: KindResources,
    pub linux_server: KindResources,
    pub linux_client: KindResources,
}

impl Default for ResourceConstraints {
    fn default() -> Self {
        Self {
            ram_overcommit: 0.0,
            cpu_overcommit: 0.0,
            gpu_overcommit: 0.0,
            android_client: KindResources::new(4096.0, 2.0, 0.0),
            linux_gpu_server: KindResources::new(2048.0, 1.0, 1.0),
            linux_gpu_client: KindResources::new(2048.0, 1.0, 1.0),
            linux_server: KindResources::new(2048.0, 1.0, 0.0),
            linux_client: KindResources::new(1024.0, 1.0, 0.0),
        }
    }
}

impl ResourceConstraints {
    pub fn kind_resources(&self, kind: NodeKind) -> KindResources {
        match kind {
            NodeKind::AndroidClient => self.android_client,
            NodeKind::LinuxGpuServer => self.linux_gpu_server,
            NodeKind::LinuxGpuClient => self.linux_gpu_client,
            NodeKind::LinuxServer => self.linux_server,
            NodeKind::LinuxClient => self.linux_client,
        }
    }

    /// Requirements of one node of `kind` under the global overcommit ratios.
    pub fn requirements(&self, kind: NodeKind) -> NodeResourceRequirements {
        let resources = self.kind_resources(kind);
        NodeResourceRequirements {
            ram_mb: resources.ram_mb,
            cpus: resources.cpus,
            gpus: resources.gpus,
            ram_overcommit: self.ram_overcommit,
            cpu_overcommit: self.cpu_overcommit,
            gpu_overcommit: self.gpu_overcommit,
        }
    }

    /// Reject ratios outside `[0, 1]` and negative amounts.
    pub fn validate(&self) -> TopologyResult<()> {
        for (name, ratio) in [
            ("ram_overcommit", self.ram_overcommit),
            ("cpu_overcommit", self.cpu_overcommit),
            ("gpu_overcommit", self.gpu_overcommit),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(TopologyError::config_with_hint(
                    format!("{name} must be between 0.0 and 1.0, got {ratio}"),
                    format!("set --{} to a ratio in [0, 1]", name.replace('_', "-")),
                ));
            }
        }
        for kind in NodeKind::ALL {
            let resources = self.kind_resources(kind);
            if resources.ram_mb < 0.0 || resources.cpus < 0.0 || resources.gpus < 0.0 {
                return Err(TopologyError::config(format!(
                    "{kind} resources must not be negative: {resources:?}"
                )));
            }
            if kind.requires_gpu() && resources.gpus <= 0.0 {
                return Err(TopologyError::config(format!(
                    "{kind} nodes must request a GPU share greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// Facts about one cloud instance type, as reported by the provider catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceTypeDetails {
    pub name: String,
    pub architecture: Architecture,
    pub cpu_count: u32,
    pub gpu_count: u32,
    pub is_bare_metal: bool,
    pub ram_mb: u64,
}

impl InstanceTypeDetails {
    /// RAM left for nodes once the management reserve is taken out.
    pub fn usable_ram_mb(&self) -> f64 {
        let ram = self.ram_mb as f64;
        ram - management_overhead_ram_mb(ram)
    }
}

/// Instance type chosen for each instance role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceTypes {
    by_role: BTreeMap<InstanceRole, InstanceTypeDetails>,
}

impl InstanceTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: InstanceRole, details: InstanceTypeDetails) {
        self.by_role.insert(role, details);
    }

    pub fn with(mut self, role: InstanceRole, details: InstanceTypeDetails) -> Self {
        self.insert(role, details);
        self
    }

    pub fn get(&self, role: InstanceRole) -> Option<&InstanceTypeDetails> {
        self.by_role.get(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceRole, &InstanceTypeDetails)> + '_ {
        self.by_role.iter().map(|(role, details)| (*role, details))
    }

    /// Confirm every selected type can host the nodes of its role.
    pub fn validate(&self) -> TopologyResult<()> {
        for (role, details) in self.iter() {
            validate_instance_type(role, details)?;
        }
        Ok(())
    }
}

/// Check one instance type against the hard requirements of `role`.
pub fn validate_instance_type(role: InstanceRole, details: &InstanceTypeDetails) -> TopologyResult<()> {
    let flag = role.type_flag();
    if details.architecture != role.architecture {
        return Err(TopologyError::config_with_hint(
            format!(
                "instance type {} is {} but {role} instances must be {}",
                details.name, details.architecture, role.architecture
            ),
            format!("choose a {} instance type for {flag}", role.architecture),
        ));
    }
    let needs_bare_metal = role.node_roles().any(|node| node.requires_bare_metal());
    if needs_bare_metal && !details.is_bare_metal {
        return Err(TopologyError::config_with_hint(
            format!(
                "instance type {} is not bare-metal, which Android emulation requires",
                details.name
            ),
            format!("choose a bare-metal instance type for {flag}"),
        ));
    }
    let needs_gpu = role.node_roles().any(|node| node.requires_gpu());
    if needs_gpu && details.gpu_count == 0 {
        return Err(TopologyError::config_with_hint(
            format!("instance type {} has no GPUs", details.name),
            format!("choose a GPU instance type for {flag}"),
        ));
    }
    Ok(())
}
