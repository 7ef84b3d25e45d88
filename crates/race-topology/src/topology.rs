//! Topology and distribution data structures.
//!
//! A topology says how many nodes of each kind every instance hosts; a
//! distribution names the personas hosted. Both share the same six-list
//! [`InstanceGroups`] shape so that a distribution is index-aligned with the
//! topology it was produced from.

use serde::{Deserialize, Serialize};

use crate::roles::{InstanceCounts, InstanceKind, InstanceRole, NodeCounts, NodeKind, NodeRole};

/// Number of nodes of each kind hosted on one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeInstanceCapacity {
    pub android_client_count: u32,
    pub linux_gpu_client_count: u32,
    pub linux_gpu_server_count: u32,
    pub linux_client_count: u32,
    pub linux_server_count: u32,
}

impl NodeInstanceCapacity {
    pub fn count(&self, kind: NodeKind) -> u32 {
        match kind {
            NodeKind::AndroidClient => self.android_client_count,
            NodeKind::LinuxGpuServer => self.linux_gpu_server_count,
            NodeKind::LinuxGpuClient => self.linux_gpu_client_count,
            NodeKind::LinuxServer => self.linux_server_count,
            NodeKind::LinuxClient => self.linux_client_count,
        }
    }

    fn count_mut(&mut self, kind: NodeKind) -> &mut u32 {
        match kind {
            NodeKind::AndroidClient => &mut self.android_client_count,
            NodeKind::LinuxGpuServer => &mut self.linux_gpu_server_count,
            NodeKind::LinuxGpuClient => &mut self.linux_gpu_client_count,
            NodeKind::LinuxServer => &mut self.linux_server_count,
            NodeKind::LinuxClient => &mut self.linux_client_count,
        }
    }

    pub fn set(&mut self, kind: NodeKind, count: u32) {
        *self.count_mut(kind) = count;
    }

    pub fn increment(&mut self, kind: NodeKind) {
        *self.count_mut(kind) += 1;
    }

    pub fn total(&self) -> u64 {
        NodeKind::ALL.iter().map(|kind| u64::from(self.count(*kind))).sum()
    }
}

/// Persona names of each kind hosted on one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeInstanceManifest {
    pub android_clients: Vec<String>,
    pub linux_gpu_clients: Vec<String>,
    pub linux_clients: Vec<String>,
    pub linux_gpu_servers: Vec<String>,
    pub linux_servers: Vec<String>,
}

impl NodeInstanceManifest {
    pub fn personas(&self, kind: NodeKind) -> &[String] {
        match kind {
            NodeKind::AndroidClient => &self.android_clients,
            NodeKind::LinuxGpuServer => &self.linux_gpu_servers,
            NodeKind::LinuxGpuClient => &self.linux_gpu_clients,
            NodeKind::LinuxServer => &self.linux_servers,
            NodeKind::LinuxClient => &self.linux_clients,
        }
    }

    pub fn push(&mut self, kind: NodeKind, persona: String) {
        let personas = match kind {
            NodeKind::AndroidClient => &mut self.android_clients,
            NodeKind::LinuxGpuServer => &mut self.linux_gpu_servers,
            NodeKind::LinuxGpuClient => &mut self.linux_gpu_clients,
            NodeKind::LinuxServer => &mut self.linux_servers,
            NodeKind::LinuxClient => &mut self.linux_clients,
        };
        personas.push(persona);
    }

    pub fn total(&self) -> usize {
        NodeKind::ALL.iter().map(|kind| self.personas(*kind).len()).sum()
    }

    pub fn contains(&self, persona: &str) -> bool {
        NodeKind::ALL
            .iter()
            .any(|kind| self.personas(*kind).iter().any(|p| p == persona))
    }
}

/// One ordered list of `T` per instance role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceGroups<T> {
    #[serde(default)]
    pub android_arm64_instances: Vec<T>,
    #[serde(default)]
    pub android_x86_64_instances: Vec<T>,
    #[serde(default)]
    pub linux_gpu_arm64_instances: Vec<T>,
    #[serde(default)]
    pub linux_gpu_x86_64_instances: Vec<T>,
    #[serde(default)]
    pub linux_arm64_instances: Vec<T>,
    #[serde(default)]
    pub linux_x86_64_instances: Vec<T>,
}

/// Per-instance node counts produced by a topology builder.
pub type NodeInstanceTopology = InstanceGroups<NodeInstanceCapacity>;

/// Per-instance persona lists, index-aligned with a [`NodeInstanceTopology`].
pub type NodeInstanceDistribution = InstanceGroups<NodeInstanceManifest>;

impl<T> Default for InstanceGroups<T> {
    fn default() -> Self {
        Self {
            android_arm64_instances: Vec::new(),
            android_x86_64_instances: Vec::new(),
            linux_gpu_arm64_instances: Vec::new(),
            linux_gpu_x86_64_instances: Vec::new(),
            linux_arm64_instances: Vec::new(),
            linux_x86_64_instances: Vec::new(),
        }
    }
}

impl<T> InstanceGroups<T> {
    pub fn get(&self, role: InstanceRole) -> &[T] {
        use crate::roles::Architecture::*;
        match (role.kind, role.architecture) {
            (InstanceKind::Android, Arm64) => &self.android_arm64_instances,
            (InstanceKind::Android, X86_64) => &self.android_x86_64_instances,
            (InstanceKind::LinuxGpu, Arm64) => &self.linux_gpu_arm64_instances,
            (InstanceKind::LinuxGpu, X86_64) => &self.linux_gpu_x86_64_instances,
            (InstanceKind::Linux, Arm64) => &self.linux_arm64_instances,
            (InstanceKind::Linux, X86_64) => &self.linux_x86_64_instances,
        }
    }

    pub fn get_mut(&mut self, role: InstanceRole) -> &mut Vec<T> {
        use crate::roles::Architecture::*;
        match (role.kind, role.architecture) {
            (InstanceKind::Android, Arm64) => &mut self.android_arm64_instances,
            (InstanceKind::Android, X86_64) => &mut self.android_x86_64_instances,
            (InstanceKind::LinuxGpu, Arm64) => &mut self.linux_gpu_arm64_instances,
            (InstanceKind::LinuxGpu, X86_64) => &mut self.linux_gpu_x86_64_instances,
            (InstanceKind::Linux, Arm64) => &mut self.linux_arm64_instances,
            (InstanceKind::Linux, X86_64) => &mut self.linux_x86_64_instances,
        }
    }

    /// Lists in [`InstanceRole::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceRole, &[T])> + '_ {
        InstanceRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }

    pub fn instance_counts(&self) -> InstanceCounts {
        self.iter()
            .map(|(role, instances)| (role, instances.len() as u32))
            .collect()
    }

    pub fn total_instances(&self) -> usize {
        self.iter().map(|(_, instances)| instances.len()).sum()
    }

    /// Build a same-shaped value by mapping every element.
    pub fn map<U>(&self, mut f: impl FnMut(InstanceRole, &T) -> U) -> InstanceGroups<U> {
        let mut mapped = InstanceGroups::default();
        for (role, instances) in self.iter() {
            *mapped.get_mut(role) = instances.iter().map(|item| f(role, item)).collect();
        }
        mapped
    }
}

impl NodeInstanceTopology {
    /// Aggregate node capacity per node role across every instance.
    ///
    /// An instance contributes to the roles of its own architecture only,
    /// whichever instance role it belongs to. Counts saturate at `u32::MAX`.
    pub fn total_node_counts(&self) -> NodeCounts {
        let mut totals = NodeCounts::default();
        for (instance_role, instances) in self.iter() {
            for capacity in instances {
                for kind in NodeKind::ALL {
                    let total = &mut totals[NodeRole::new(kind, instance_role.architecture)];
                    *total = total.saturating_add(capacity.count(kind));
                }
            }
        }
        totals
    }
}

impl NodeInstanceDistribution {
    /// Locate the instance hosting `persona`.
    pub fn host_of(&self, persona: &str) -> Option<(InstanceRole, usize)> {
        self.iter().find_map(|(role, manifests)| {
            manifests
                .iter()
                .position(|manifest| manifest.contains(persona))
                .map(|index| (role, index))
        })
    }

    pub fn total_personas(&self) -> usize {
        self.iter()
            .flat_map(|(_, manifests)| manifests.iter())
            .map(NodeInstanceManifest::total)
            .sum()
    }
}
