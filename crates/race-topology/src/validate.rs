//! Compatibility checks between an existing topology and new demand.

use tracing::{debug, warn};

use crate::roles::{InstanceCounts, InstanceRole, NodeCounts, NodeRole};
use crate::topology::NodeInstanceTopology;

/// Whether `topology` fits within `max_instance_counts` and can host at
/// least `min_node_counts`.
///
/// Shortfalls are logged as warnings rather than returned as errors; callers
/// use the answer to decide between reusing a topology file and building a
/// new one.
pub fn is_topology_compatible_with(
    topology: &NodeInstanceTopology,
    max_instance_counts: &InstanceCounts,
    min_node_counts: &NodeCounts,
) -> bool {
    let instances_ok = fits_instance_limits(topology, max_instance_counts);
    let nodes_ok = covers_node_demand(topology, min_node_counts);
    debug!(instances_ok, nodes_ok, "checked topology compatibility");
    instances_ok && nodes_ok
}

fn fits_instance_limits(topology: &NodeInstanceTopology, max_instance_counts: &InstanceCounts) -> bool {
    let mut ok = true;
    for role in InstanceRole::ALL {
        let used = topology.get(role).len() as u32;
        let allowed = max_instance_counts[role];
        if used > allowed {
            warn!(%role, used, allowed, "topology uses more instances than allowed");
            ok = false;
        }
    }
    ok
}

fn covers_node_demand(topology: &NodeInstanceTopology, min_node_counts: &NodeCounts) -> bool {
    let capacity = topology.total_node_counts();
    let mut ok = true;
    for role in NodeRole::ALL {
        let available = capacity[role];
        let needed = min_node_counts[role];
        if available < needed {
            warn!(
                %role,
                available,
                needed,
                shortfall = needed - available,
                "topology lacks node capacity"
            );
            ok = false;
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{Architecture, InstanceKind, NodeKind};
    use crate::topology::NodeInstanceCapacity;

    fn gpu_server() -> NodeRole {
        NodeRole::new(NodeKind::LinuxGpuServer, Architecture::X86_64)
    }

    fn gpu_x86() -> InstanceRole {
        InstanceRole::new(InstanceKind::LinuxGpu, Architecture::X86_64)
    }

    fn topology() -> NodeInstanceTopology {
        let mut topology = NodeInstanceTopology::default();
        topology.linux_gpu_x86_64_instances = vec![
            NodeInstanceCapacity {
                linux_gpu_server_count: 2,
                ..NodeInstanceCapacity::default()
            },
            NodeInstanceCapacity {
                linux_gpu_server_count: 1,
                ..NodeInstanceCapacity::default()
            },
        ];
        topology
    }

    #[test]
    fn exact_capacity_is_compatible() {
        let max_instances = InstanceCounts::from_iter([(gpu_x86(), 2)]);
        let min_nodes = NodeCounts::from_iter([(gpu_server(), 3)]);
        assert!(is_topology_compatible_with(&topology(), &max_instances, &min_nodes));
    }

    #[test]
    fn insufficient_node_capacity_is_incompatible() {
        let max_instances = InstanceCounts::from_iter([(gpu_x86(), 2)]);
        let min_nodes = NodeCounts::from_iter([(gpu_server(), 4)]);
        assert!(!is_topology_compatible_with(&topology(), &max_instances, &min_nodes));
    }

    #[test]
    fn too_many_instances_is_incompatible() {
        let max_instances = InstanceCounts::from_iter([(gpu_x86(), 1)]);
        let min_nodes = NodeCounts::from_iter([(gpu_server(), 1)]);
        assert!(!is_topology_compatible_with(&topology(), &max_instances, &min_nodes));
    }

    #[test]
    fn capacity_on_other_architecture_does_not_count() {
        let max_instances = InstanceCounts::from_iter([(gpu_x86(), 2)]);
        let arm_server = NodeRole::new(NodeKind::LinuxGpuServer, Architecture::Arm64);
        let min_nodes = NodeCounts::from_iter([(arm_server, 1)]);
        assert!(!is_topology_compatible_with(&topology(), &max_instances, &min_nodes));
    }

    #[test]
    fn empty_demand_is_compatible_with_empty_topology() {
        assert!(is_topology_compatible_with(
            &NodeInstanceTopology::default(),
            &InstanceCounts::default(),
            &NodeCounts::default()
        ));
    }
}
