//! Deterministic persona names for generated deployments.

use crate::roles::{NodeCounts, NodePersonas, NodeRole, NodeType};

pub const CLIENT_PREFIX: &str = "race-client";
pub const SERVER_PREFIX: &str = "race-server";

/// Name `node_counts` personas per role.
///
/// Clients and servers are numbered separately, each continuously across
/// roles in [`NodeRole::ALL`] order, starting from 1.
pub fn generate_personas(node_counts: &NodeCounts) -> NodePersonas {
    let mut personas = NodePersonas::default();
    let mut next_client = 1;
    let mut next_server = 1;
    for role in NodeRole::ALL {
        let (prefix, next) = match role.node_type() {
            NodeType::Client => (CLIENT_PREFIX, &mut next_client),
            NodeType::Server => (SERVER_PREFIX, &mut next_server),
        };
        let names = personas.get_mut(role);
        for _ in 0..node_counts[role] {
            names.push(format!("{prefix}-{:05}", *next));
            *next += 1;
        }
    }
    personas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{Architecture, NodeKind};

    #[test]
    fn clients_and_servers_are_numbered_separately() {
        let android = NodeRole::new(NodeKind::AndroidClient, Architecture::Arm64);
        let client = NodeRole::new(NodeKind::LinuxClient, Architecture::Arm64);
        let server = NodeRole::new(NodeKind::LinuxServer, Architecture::X86_64);
        let counts = NodeCounts::from_iter([(android, 2), (client, 1), (server, 2)]);

        let personas = generate_personas(&counts);

        assert_eq!(personas[android], vec!["race-client-00001", "race-client-00002"]);
        assert_eq!(personas[client], vec!["race-client-00003"]);
        assert_eq!(personas[server], vec!["race-server-00001", "race-server-00002"]);
    }

    #[test]
    fn no_counts_no_personas() {
        let personas = generate_personas(&NodeCounts::default());
        assert!(personas.iter().all(|(_, names)| names.is_empty()));
    }
}
