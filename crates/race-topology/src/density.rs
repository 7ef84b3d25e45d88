//! Topology builder: derive instance or node counts from a nodes-per-instance density.

use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::roles::{InstanceCounts, InstanceRole, NodeCounts, NodeRole};
use crate::spread::create_topology_from_instance_counts;
use crate::topology::NodeInstanceTopology;

/// Build a topology from exactly one of `instance_counts` or `node_counts`
/// and a per-role density.
///
/// Given instance counts, every role gets `density * instances` nodes; this
/// requires colocation because one instance count cannot be divided between
/// clients and servers otherwise. Given node counts, every role needs
/// `ceil(nodes / density)` instances; client and server needs are combined with
/// `max` under colocation and summed without it.
pub fn create_topology_from_nodes_per_instance(
    instance_counts: Option<&InstanceCounts>,
    node_counts: Option<&NodeCounts>,
    nodes_per_instance: &NodeCounts,
    allow_colocation: bool,
) -> TopologyResult<NodeInstanceTopology> {
    match (instance_counts, node_counts) {
        (Some(_), Some(_)) => Err(TopologyError::config_with_hint(
            "both instance counts and node counts were given",
            "pass either instance counts or node counts, not both",
        )),
        (None, None) => Err(TopologyError::config_with_hint(
            "neither instance counts nor node counts were given",
            "pass either instance counts or node counts",
        )),
        (Some(instance_counts), None) => {
            if !allow_colocation {
                return Err(TopologyError::config_with_hint(
                    "node counts cannot be derived from instance counts when colocation is disabled",
                    "allow colocation or pass node counts instead",
                ));
            }
            let node_counts = node_counts_from_instances(instance_counts, nodes_per_instance);
            debug!(nodes = node_counts.total(), "derived node counts from density");
            create_topology_from_instance_counts(instance_counts, &node_counts, allow_colocation)
        }
        (None, Some(node_counts)) => {
            let instance_counts = instance_counts_from_nodes(node_counts, nodes_per_instance, allow_colocation)?;
            debug!(instances = instance_counts.total(), "derived instance counts from density");
            create_topology_from_instance_counts(&instance_counts, node_counts, allow_colocation)
        }
    }
}

/// `density * instances` nodes for every node role.
pub fn node_counts_from_instances(instance_counts: &InstanceCounts, nodes_per_instance: &NodeCounts) -> NodeCounts {
    NodeRole::ALL
        .into_iter()
        .map(|role| {
            let instances = instance_counts[role.instance_role()];
            (role, nodes_per_instance[role].saturating_mul(instances))
        })
        .collect()
}

/// Instances needed per instance role to host `node_counts` at the given density.
pub fn instance_counts_from_nodes(
    node_counts: &NodeCounts,
    nodes_per_instance: &NodeCounts,
    allow_colocation: bool,
) -> TopologyResult<InstanceCounts> {
    let mut instance_counts = InstanceCounts::default();
    for role in InstanceRole::ALL {
        let client_instances = instances_needed(role.client_role(), node_counts, nodes_per_instance)?;
        let server_instances = match role.server_role() {
            Some(server) => instances_needed(server, node_counts, nodes_per_instance)?,
            None => 0,
        };
        instance_counts[role] = if allow_colocation {
            client_instances.max(server_instances)
        } else {
            client_instances.checked_add(server_instances).ok_or_else(|| {
                TopologyError::config(format!(
                    "{role} needs more than {} instances to keep clients and servers apart",
                    u32::MAX
                ))
            })?
        };
    }
    Ok(instance_counts)
}

fn instances_needed(role: NodeRole, node_counts: &NodeCounts, nodes_per_instance: &NodeCounts) -> TopologyResult<u32> {
    let nodes = node_counts[role];
    if nodes == 0 {
        return Ok(0);
    }
    let density = nodes_per_instance[role];
    if density == 0 {
        return Err(TopologyError::config_with_hint(
            format!("{nodes} {role} nodes requested with a density of zero nodes per instance"),
            format!("set a nodes-per-instance value for {role}"),
        ));
    }
    Ok(nodes.div_ceil(density))
}
