//! Persona distribution: assign concrete persona names to topology slots.
//!
//! Every instance of an architecture is a candidate for every persona of that
//! architecture; the instance's topology capacity for the persona's kind gates
//! eligibility. Among eligible instances the one holding the fewest personas
//! of any kind wins, and the first one found wins ties, so identical inputs
//! always produce identical output.

use tracing::{debug, info};

use crate::error::{TopologyError, TopologyResult};
use crate::roles::{Architecture, InstanceRole, NodePersonas, NodeRole};
use crate::topology::{NodeInstanceDistribution, NodeInstanceManifest, NodeInstanceTopology};

/// One instance of a topology: its role and position within that role's list.
type Slot = (InstanceRole, usize);

/// Assign each persona in `personas` to an instance of `topology`.
///
/// Personas are processed in [`NodeRole::ALL`] order and, within a role, in
/// list order. Fails with [`TopologyError::PlacementExhausted`] on the first
/// persona no instance has room for; validating the topology with
/// [`is_topology_compatible_with`](crate::validate::is_topology_compatible_with)
/// beforehand rules this out.
pub fn distribute_personas_to_instances(
    personas: &NodePersonas,
    topology: &NodeInstanceTopology,
) -> TopologyResult<NodeInstanceDistribution> {
    let mut distribution: NodeInstanceDistribution = topology.map(|_, _| NodeInstanceManifest::default());

    for architecture in Architecture::ALL {
        let slots = slots_for(topology, architecture);
        for role in NodeRole::ALL.into_iter().filter(|role| role.architecture == architecture) {
            for persona in personas.get(role) {
                let (instance_role, index) = least_loaded_slot(&slots, role, topology, &distribution).ok_or_else(
                    || TopologyError::PlacementExhausted {
                        persona: persona.clone(),
                        role,
                    },
                )?;
                distribution.get_mut(instance_role)[index].push(role.kind, persona.clone());
            }
            if !personas.get(role).is_empty() {
                debug!(%role, personas = personas.get(role).len(), "distributed personas");
            }
        }
    }

    info!(
        personas = distribution.total_personas(),
        instances = distribution.total_instances(),
        "distributed personas to instances"
    );
    Ok(distribution)
}

/// Every instance of `architecture`, in [`InstanceRole::ALL`] then list order.
fn slots_for(topology: &NodeInstanceTopology, architecture: Architecture) -> Vec<Slot> {
    InstanceRole::ALL
        .into_iter()
        .filter(|role| role.architecture == architecture)
        .flat_map(|role| (0..topology.get(role).len()).map(move |index| (role, index)))
        .collect()
}

fn least_loaded_slot(
    slots: &[Slot],
    role: NodeRole,
    topology: &NodeInstanceTopology,
    distribution: &NodeInstanceDistribution,
) -> Option<Slot> {
    let mut best: Option<(Slot, usize)> = None;
    for &(instance_role, index) in slots {
        let capacity = topology.get(instance_role)[index].count(role.kind) as usize;
        let manifest = &distribution.get(instance_role)[index];
        if manifest.personas(role.kind).len() >= capacity {
            continue;
        }
        let load = manifest.total();
        if best.is_none_or(|(_, best_load)| load < best_load) {
            best = Some(((instance_role, index), load));
        }
    }
    best.map(|(slot, _)| slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{InstanceKind, NodeKind};
    use crate::topology::NodeInstanceCapacity;

    fn linux_client() -> NodeRole {
        NodeRole::new(NodeKind::LinuxClient, Architecture::Arm64)
    }

    fn linux_arm() -> InstanceRole {
        InstanceRole::new(InstanceKind::Linux, Architecture::Arm64)
    }

    fn names(prefix: &str, count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("{prefix}-{i:05}")).collect()
    }

    fn client_topology(capacities: &[u32]) -> NodeInstanceTopology {
        let mut topology = NodeInstanceTopology::default();
        topology.linux_arm64_instances = capacities
            .iter()
            .map(|count| NodeInstanceCapacity {
                linux_client_count: *count,
                ..NodeInstanceCapacity::default()
            })
            .collect();
        topology
    }

    fn clients(distribution: &NodeInstanceDistribution) -> Vec<Vec<String>> {
        distribution
            .get(linux_arm())
            .iter()
            .map(|manifest| manifest.linux_clients.clone())
            .collect()
    }

    #[test]
    fn equal_capacities_alternate() {
        let personas = NodePersonas::from_iter([(linux_client(), names("race-client", 6))]);
        let distribution = distribute_personas_to_instances(&personas, &client_topology(&[3, 3])).unwrap();

        assert_eq!(
            clients(&distribution),
            vec![
                vec!["race-client-00001", "race-client-00003", "race-client-00005"],
                vec!["race-client-00002", "race-client-00004", "race-client-00006"],
            ]
        );
    }

    #[test]
    fn capacity_limits_placement() {
        let personas = NodePersonas::from_iter([(linux_client(), names("race-client", 5))]);
        let distribution = distribute_personas_to_instances(&personas, &client_topology(&[2, 4])).unwrap();

        let sizes: Vec<usize> = clients(&distribution).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 3]);
    }

    #[test]
    fn least_loaded_counts_every_kind() {
        // Instance 0 already holds an Android client, so the first Linux
        // client goes to instance 1.
        let mut topology = NodeInstanceTopology::default();
        topology.android_arm64_instances = vec![NodeInstanceCapacity {
            android_client_count: 1,
            linux_client_count: 1,
            ..NodeInstanceCapacity::default()
        }];
        topology.linux_arm64_instances = vec![NodeInstanceCapacity {
            linux_client_count: 1,
            ..NodeInstanceCapacity::default()
        }];
        let android = NodeRole::new(NodeKind::AndroidClient, Architecture::Arm64);
        let personas = NodePersonas::from_iter([
            (android, names("race-client", 1)),
            (linux_client(), vec!["race-client-00002".to_string()]),
        ]);

        let distribution = distribute_personas_to_instances(&personas, &topology).unwrap();

        assert_eq!(distribution.android_arm64_instances[0].android_clients, vec!["race-client-00001"]);
        assert!(distribution.android_arm64_instances[0].linux_clients.is_empty());
        assert_eq!(distribution.linux_arm64_instances[0].linux_clients, vec!["race-client-00002"]);
    }

    #[test]
    fn architectures_do_not_mix() {
        let x86_client = NodeRole::new(NodeKind::LinuxClient, Architecture::X86_64);
        let personas = NodePersonas::from_iter([(x86_client, names("race-client", 1))]);
        let err = distribute_personas_to_instances(&personas, &client_topology(&[5])).unwrap_err();
        match err {
            TopologyError::PlacementExhausted { persona, role } => {
                assert_eq!(persona, "race-client-00001");
                assert_eq!(role, x86_client);
            }
            other => panic!("expected placement exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn exhaustion_names_the_persona() {
        let personas = NodePersonas::from_iter([(linux_client(), names("race-client", 3))]);
        let err = distribute_personas_to_instances(&personas, &client_topology(&[1, 1])).unwrap_err();
        assert!(err.to_string().contains("race-client-00003"));
    }

    #[test]
    fn distribution_is_deterministic() {
        let personas = NodePersonas::from_iter([(linux_client(), names("race-client", 9))]);
        let topology = client_topology(&[4, 2, 3]);
        let first = distribute_personas_to_instances(&personas, &topology).unwrap();
        let second = distribute_personas_to_instances(&personas, &topology).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn distribution_is_index_aligned_with_topology() {
        let mut topology = client_topology(&[1, 0, 1]);
        topology.linux_gpu_x86_64_instances = vec![NodeInstanceCapacity::default(); 2];
        let personas = NodePersonas::from_iter([(linux_client(), names("race-client", 2))]);

        let distribution = distribute_personas_to_instances(&personas, &topology).unwrap();

        assert_eq!(distribution.instance_counts(), topology.instance_counts());
        assert!(distribution.linux_arm64_instances[1].linux_clients.is_empty());
    }
}
