//! Topology builder: spread nodes evenly across a fixed number of instances.
//!
//! For `n` nodes on `k` instances every instance receives `n / k` nodes and
//! `n % k` instances receive one more. Clients front-load the extra nodes onto
//! the first instances and servers back-load them onto the last instances, so
//! colocated clients and servers balance each other out.

use tracing::{debug, info};

use crate::error::{TopologyError, TopologyResult};
use crate::roles::{InstanceCounts, InstanceRole, NodeCounts};
use crate::topology::{NodeInstanceCapacity, NodeInstanceTopology};

/// Which end of the instance list receives the remainder nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Front,
    Back,
}

/// Per-instance node counts for `nodes` spread across `instances`.
pub fn spread_evenly(nodes: u32, instances: u32, fill: Fill) -> Vec<u32> {
    if instances == 0 {
        return Vec::new();
    }
    let base = nodes / instances;
    let extra = nodes % instances;
    let switch_index = match fill {
        Fill::Front => extra,
        Fill::Back => instances - extra,
    };
    (0..instances)
        .map(|index| {
            let gets_extra = match fill {
                Fill::Front => index < switch_index,
                Fill::Back => index >= switch_index,
            };
            if gets_extra { base + 1 } else { base }
        })
        .collect()
}

/// Split `instances` between clients and servers in proportion to their
/// node counts. Each side with any nodes gets at least one instance.
///
/// Callers must ensure `instances >= 2` when both sides have nodes.
pub fn split_by_client_ratio(instances: u32, clients: u32, servers: u32) -> (u32, u32) {
    let total = u64::from(clients) + u64::from(servers);
    if total == 0 {
        return (0, instances);
    }
    let mut client_instances = (u64::from(instances) * u64::from(clients) / total) as u32;
    if clients > 0 {
        client_instances = client_instances.max(1);
    }
    if servers > 0 {
        client_instances = client_instances.min(instances.saturating_sub(1));
    }
    (client_instances, instances - client_instances)
}

/// Build a topology by spreading `node_counts` across `instance_counts`.
///
/// With `allow_colocation`, the clients and servers of an instance role share
/// the same instances. Without it, the instances of a role are split between
/// clients and servers by [`split_by_client_ratio`].
pub fn create_topology_from_instance_counts(
    instance_counts: &InstanceCounts,
    node_counts: &NodeCounts,
    allow_colocation: bool,
) -> TopologyResult<NodeInstanceTopology> {
    let mut topology = NodeInstanceTopology::default();
    for role in InstanceRole::ALL {
        let clients = node_counts[role.client_role()];
        let servers = role.server_role().map_or(0, |server| node_counts[server]);
        let capacities = spread_instance_role(role, instance_counts[role], clients, servers, allow_colocation)?;
        *topology.get_mut(role) = capacities;
    }

    info!(
        instances = topology.total_instances(),
        nodes = node_counts.total(),
        allow_colocation,
        "built topology from instance counts"
    );
    Ok(topology)
}

fn spread_instance_role(
    role: InstanceRole,
    instances: u32,
    clients: u32,
    servers: u32,
    allow_colocation: bool,
) -> TopologyResult<Vec<NodeInstanceCapacity>> {
    let client_kind = role.kind.client_kind();
    let server_kind = role.kind.server_kind();

    let nodes = clients.checked_add(servers).ok_or_else(|| {
        TopologyError::config(format!(
            "{clients} clients and {servers} servers exceed the {role} node limit of {}",
            u32::MAX
        ))
    })?;
    if nodes > 0 && instances == 0 {
        return Err(TopologyError::config_with_hint(
            format!("{nodes} {role} nodes requested but no {role} instances are available"),
            format!("set {} to at least 1", role.count_flag()),
        ));
    }

    let mut capacities = vec![NodeInstanceCapacity::default(); instances as usize];

    if allow_colocation || clients == 0 || servers == 0 {
        for (capacity, count) in capacities.iter_mut().zip(spread_evenly(clients, instances, Fill::Front)) {
            capacity.set(client_kind, count);
        }
        if let Some(server_kind) = server_kind {
            for (capacity, count) in capacities.iter_mut().zip(spread_evenly(servers, instances, Fill::Back)) {
                capacity.set(server_kind, count);
            }
        }
        debug!(%role, instances, clients, servers, "spread nodes across shared instances");
        return Ok(capacities);
    }

    if instances < 2 {
        return Err(TopologyError::config_with_hint(
            format!(
                "{clients} clients and {servers} servers cannot share {instances} {role} instance \
                 when colocation is disabled"
            ),
            format!("set {} to at least 2 or allow colocation", role.count_flag()),
        ));
    }

    let (client_instances, server_instances) = split_by_client_ratio(instances, clients, servers);
    let (client_part, server_part) = capacities.split_at_mut(client_instances as usize);
    for (capacity, count) in client_part
        .iter_mut()
        .zip(spread_evenly(clients, client_instances, Fill::Front))
    {
        capacity.set(client_kind, count);
    }
    if let Some(server_kind) = server_kind {
        for (capacity, count) in server_part
            .iter_mut()
            .zip(spread_evenly(servers, server_instances, Fill::Back))
        {
            capacity.set(server_kind, count);
        }
    }
    debug!(
        %role,
        client_instances,
        server_instances,
        clients,
        servers,
        "split instances between clients and servers"
    );
    Ok(capacities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{Architecture, InstanceKind, NodeKind, NodeRole};

    fn linux_x86() -> InstanceRole {
        InstanceRole::new(InstanceKind::Linux, Architecture::X86_64)
    }

    fn client() -> NodeRole {
        NodeRole::new(NodeKind::LinuxClient, Architecture::X86_64)
    }

    fn server() -> NodeRole {
        NodeRole::new(NodeKind::LinuxServer, Architecture::X86_64)
    }

    fn counts(instances: u32, clients: u32, servers: u32) -> (InstanceCounts, NodeCounts) {
        let instance_counts = InstanceCounts::from_iter([(linux_x86(), instances)]);
        let node_counts = NodeCounts::from_iter([(client(), clients), (server(), servers)]);
        (instance_counts, node_counts)
    }

    fn column(topology: &NodeInstanceTopology, kind: NodeKind) -> Vec<u32> {
        topology.get(linux_x86()).iter().map(|c| c.count(kind)).collect()
    }

    #[test]
    fn front_fill_puts_extra_nodes_first() {
        assert_eq!(spread_evenly(7, 3, Fill::Front), vec![3, 2, 2]);
        assert_eq!(spread_evenly(6, 3, Fill::Front), vec![2, 2, 2]);
        assert_eq!(spread_evenly(2, 3, Fill::Front), vec![1, 1, 0]);
    }

    #[test]
    fn back_fill_puts_extra_nodes_last() {
        assert_eq!(spread_evenly(7, 3, Fill::Back), vec![2, 2, 3]);
        assert_eq!(spread_evenly(2, 3, Fill::Back), vec![0, 1, 1]);
    }

    #[test]
    fn spread_over_zero_instances_is_empty() {
        assert!(spread_evenly(0, 0, Fill::Front).is_empty());
    }

    #[test]
    fn client_ratio_split() {
        assert_eq!(split_by_client_ratio(4, 3, 1), (3, 1));
        assert_eq!(split_by_client_ratio(10, 1, 99), (1, 9));
        assert_eq!(split_by_client_ratio(10, 99, 1), (9, 1));
        assert_eq!(split_by_client_ratio(5, 4, 0), (5, 0));
        assert_eq!(split_by_client_ratio(5, 0, 4), (0, 5));
        assert_eq!(split_by_client_ratio(7, 10, 10), (3, 4));
    }

    #[test]
    fn colocated_clients_and_servers_share_instances() {
        let (instances, nodes) = counts(3, 4, 2);
        let topology = create_topology_from_instance_counts(&instances, &nodes, true).unwrap();

        assert_eq!(column(&topology, NodeKind::LinuxClient), vec![2, 1, 1]);
        assert_eq!(column(&topology, NodeKind::LinuxServer), vec![0, 1, 1]);
    }

    #[test]
    fn separated_clients_and_servers_use_disjoint_instances() {
        let (instances, nodes) = counts(4, 7, 2);
        let topology = create_topology_from_instance_counts(&instances, &nodes, false).unwrap();

        assert_eq!(column(&topology, NodeKind::LinuxClient), vec![3, 2, 2, 0]);
        assert_eq!(column(&topology, NodeKind::LinuxServer), vec![0, 0, 0, 2]);
    }

    #[test]
    fn requesting_nodes_without_instances_names_flag() {
        let (instances, nodes) = counts(0, 1, 0);
        let err = create_topology_from_instance_counts(&instances, &nodes, true).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("--linux-x86_64-instance-count"));
    }

    #[test]
    fn oversized_node_counts_are_a_configuration_error() {
        let (instances, nodes) = counts(2, 3_000_000_000, 3_000_000_000);
        let err = create_topology_from_instance_counts(&instances, &nodes, true).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("linux_x86_64"));
        assert_eq!(nodes.total(), 6_000_000_000);
    }

    #[test]
    fn separated_roles_need_two_instances() {
        let (instances, nodes) = counts(1, 1, 1);
        let err = create_topology_from_instance_counts(&instances, &nodes, false).unwrap_err();
        assert!(err.is_configuration());
        assert!(create_topology_from_instance_counts(&instances, &nodes, true).is_ok());
    }

    #[test]
    fn empty_instances_are_kept() {
        let (instances, nodes) = counts(2, 0, 0);
        let topology = create_topology_from_instance_counts(&instances, &nodes, true).unwrap();
        assert_eq!(topology.get(linux_x86()).len(), 2);
        assert_eq!(topology.total_node_counts().total(), 0);
    }

    #[test]
    fn node_counts_are_conserved() {
        for colocate in [true, false] {
            for instances in 2..6 {
                for clients in 0..12 {
                    for servers in 0..5 {
                        let (instance_counts, node_counts) = counts(instances, clients, servers);
                        let topology =
                            create_topology_from_instance_counts(&instance_counts, &node_counts, colocate).unwrap();
                        let totals = topology.total_node_counts();
                        assert_eq!(totals[client()], clients);
                        assert_eq!(totals[server()], servers);
                        assert_eq!(topology.get(linux_x86()).len(), instances as usize);
                    }
                }
            }
        }
    }

    #[test]
    fn fewer_nodes_stay_feasible() {
        let (instances, nodes) = counts(3, 5, 4);
        assert!(create_topology_from_instance_counts(&instances, &nodes, false).is_ok());
        for clients in 0..=5 {
            for servers in 0..=4 {
                let (instances, nodes) = counts(3, clients, servers);
                assert!(create_topology_from_instance_counts(&instances, &nodes, false).is_ok());
            }
        }
    }
}
