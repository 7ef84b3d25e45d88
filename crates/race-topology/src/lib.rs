//! race-topology — placement engine for RACE test deployments.
//!
//! Decides which cloud instance hosts which RACE node, given node-role demand
//! and either a fixed instance inventory or per-node resource requirements.
//! Produces a [`NodeInstanceTopology`] (counts per instance) and, once
//! persona names are known, a [`NodeInstanceDistribution`] (names per
//! instance). Both are written as JSON for the provisioning layer.
//!
//! # Components
//!
//! - **`roles`** — node/instance role enumerations and role-indexed maps
//! - **`resources`** — per-node requirements, instance-type facts
//! - **`host`** — capacity tracking for one instance while packing
//! - **`spread`** — even spread across a fixed instance count
//! - **`density`** — nodes-per-instance sizing
//! - **`packing`** — first-fit-descending bin packing by resources
//! - **`distribution`** — best-fit persona assignment
//! - **`validate`** — reuse check for an existing topology
//! - **`file`** — sorted, pretty-printed JSON files
//! - **`config`** — TOML plan files
//!
//! # Pipeline
//!
//! ```text
//! NodeCounts + (InstanceCounts | density | InstanceTypes + ResourceConstraints)
//!   └── builder ──► NodeInstanceTopology
//!                     └── distribute_personas_to_instances ──► NodeInstanceDistribution
//! ```
//!
//! Everything runs synchronously in one pass; builders allocate fresh state
//! per call and share nothing between calls.

pub mod config;
pub mod density;
pub mod distribution;
pub mod error;
pub mod file;
pub mod host;
pub mod packing;
pub mod personas;
pub mod resources;
pub mod roles;
pub mod spread;
pub mod topology;
pub mod validate;

pub use config::{CatalogEntry, PlanConfig};
pub use density::create_topology_from_nodes_per_instance;
pub use distribution::distribute_personas_to_instances;
pub use error::{TopologyError, TopologyResult};
pub use file::{
    read_distribution_from_file, read_personas_from_file, read_topology_from_file, write_distribution_to_file,
    write_topology_to_file,
};
pub use host::{HostInstance, HostRestriction, NodeUnit};
pub use packing::create_topology_from_resource_requirements;
pub use personas::generate_personas;
pub use resources::{
    InstanceTypeDetails, InstanceTypes, KindResources, NodeResourceRequirements, ResourceConstraints,
    management_overhead_ram_mb,
};
pub use roles::{
    Architecture, InstanceCounts, InstanceKind, InstanceRole, NodeCounts, NodeKind, NodePersonas, NodeRole,
    NodeType, Platform, Role, RoleMap,
};
pub use spread::create_topology_from_instance_counts;
pub use topology::{
    InstanceGroups, NodeInstanceCapacity, NodeInstanceDistribution, NodeInstanceManifest, NodeInstanceTopology,
};
pub use validate::is_topology_compatible_with;
