//! Node and instance roles, and role-indexed containers.
//!
//! A node role is a `(platform, gpu, architecture, client/server)` combination.
//! Only ten combinations are valid (Android has neither servers nor GPU
//! variants), so roles are modeled as a [`NodeKind`] plus an [`Architecture`]
//! rather than as four independent fields.
//!
//! [`NodeRole::ALL`] is the processing order used by bin packing and persona
//! distribution: Android clients, GPU servers, GPU clients, servers, clients.
//! The least flexible roles are placed first, so changing this order changes
//! placement outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Dimensions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::Arm64, Architecture::X86_64];

    pub fn name(self) -> &'static str {
        match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86_64",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Linux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Client,
    Server,
}

// ── Kinds (architecture-independent) ───────────────────────────────

/// Architecture-independent node role, declared in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    AndroidClient,
    LinuxGpuServer,
    LinuxGpuClient,
    LinuxServer,
    LinuxClient,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::AndroidClient,
        NodeKind::LinuxGpuServer,
        NodeKind::LinuxGpuClient,
        NodeKind::LinuxServer,
        NodeKind::LinuxClient,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::AndroidClient => "android_client",
            NodeKind::LinuxGpuServer => "linux_gpu_server",
            NodeKind::LinuxGpuClient => "linux_gpu_client",
            NodeKind::LinuxServer => "linux_server",
            NodeKind::LinuxClient => "linux_client",
        }
    }

    pub fn platform(self) -> Platform {
        match self {
            NodeKind::AndroidClient => Platform::Android,
            _ => Platform::Linux,
        }
    }

    pub fn node_type(self) -> NodeType {
        match self {
            NodeKind::LinuxGpuServer | NodeKind::LinuxServer => NodeType::Server,
            _ => NodeType::Client,
        }
    }

    pub fn requires_gpu(self) -> bool {
        matches!(self, NodeKind::LinuxGpuServer | NodeKind::LinuxGpuClient)
    }

    /// Android emulation needs hardware virtualization.
    pub fn requires_bare_metal(self) -> bool {
        self.platform() == Platform::Android
    }

    pub fn instance_kind(self) -> InstanceKind {
        match self {
            NodeKind::AndroidClient => InstanceKind::Android,
            NodeKind::LinuxGpuServer | NodeKind::LinuxGpuClient => InstanceKind::LinuxGpu,
            NodeKind::LinuxServer | NodeKind::LinuxClient => InstanceKind::Linux,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Architecture-independent instance role. One instance kind serves both
/// the client and server node kinds of its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceKind {
    Android,
    LinuxGpu,
    Linux,
}

impl InstanceKind {
    pub fn name(self) -> &'static str {
        match self {
            InstanceKind::Android => "android",
            InstanceKind::LinuxGpu => "linux_gpu",
            InstanceKind::Linux => "linux",
        }
    }

    /// Node kinds hosted by this instance kind, servers first.
    pub fn node_kinds(self) -> &'static [NodeKind] {
        match self {
            InstanceKind::Android => &[NodeKind::AndroidClient],
            InstanceKind::LinuxGpu => &[NodeKind::LinuxGpuServer, NodeKind::LinuxGpuClient],
            InstanceKind::Linux => &[NodeKind::LinuxServer, NodeKind::LinuxClient],
        }
    }

    pub fn client_kind(self) -> NodeKind {
        match self {
            InstanceKind::Android => NodeKind::AndroidClient,
            InstanceKind::LinuxGpu => NodeKind::LinuxGpuClient,
            InstanceKind::Linux => NodeKind::LinuxClient,
        }
    }

    pub fn server_kind(self) -> Option<NodeKind> {
        match self {
            InstanceKind::Android => None,
            InstanceKind::LinuxGpu => Some(NodeKind::LinuxGpuServer),
            InstanceKind::Linux => Some(NodeKind::LinuxServer),
        }
    }

    fn flag_stem(self) -> &'static str {
        match self {
            InstanceKind::Android => "android",
            InstanceKind::LinuxGpu => "linux-gpu",
            InstanceKind::Linux => "linux",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

// ── Roles ──────────────────────────────────────────────────────────

/// One of the ten valid node roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRole {
    pub kind: NodeKind,
    pub architecture: Architecture,
}

impl NodeRole {
    pub const fn new(kind: NodeKind, architecture: Architecture) -> Self {
        Self { kind, architecture }
    }

    /// Every node role in processing order: the arm64 block, then the
    /// x86_64 block, each following [`NodeKind::ALL`].
    pub const ALL: [NodeRole; 10] = [
        NodeRole::new(NodeKind::AndroidClient, Architecture::Arm64),
        NodeRole::new(NodeKind::LinuxGpuServer, Architecture::Arm64),
        NodeRole::new(NodeKind::LinuxGpuClient, Architecture::Arm64),
        NodeRole::new(NodeKind::LinuxServer, Architecture::Arm64),
        NodeRole::new(NodeKind::LinuxClient, Architecture::Arm64),
        NodeRole::new(NodeKind::AndroidClient, Architecture::X86_64),
        NodeRole::new(NodeKind::LinuxGpuServer, Architecture::X86_64),
        NodeRole::new(NodeKind::LinuxGpuClient, Architecture::X86_64),
        NodeRole::new(NodeKind::LinuxServer, Architecture::X86_64),
        NodeRole::new(NodeKind::LinuxClient, Architecture::X86_64),
    ];

    pub fn instance_role(self) -> InstanceRole {
        InstanceRole::new(self.kind.instance_kind(), self.architecture)
    }

    pub fn platform(self) -> Platform {
        self.kind.platform()
    }

    pub fn node_type(self) -> NodeType {
        self.kind.node_type()
    }

    pub fn requires_gpu(self) -> bool {
        self.kind.requires_gpu()
    }

    pub fn requires_bare_metal(self) -> bool {
        self.kind.requires_bare_metal()
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Role::name(*self))
    }
}

/// One of the six valid instance roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceRole {
    pub kind: InstanceKind,
    pub architecture: Architecture,
}

impl InstanceRole {
    pub const fn new(kind: InstanceKind, architecture: Architecture) -> Self {
        Self { kind, architecture }
    }

    pub const ALL: [InstanceRole; 6] = [
        InstanceRole::new(InstanceKind::Android, Architecture::Arm64),
        InstanceRole::new(InstanceKind::Android, Architecture::X86_64),
        InstanceRole::new(InstanceKind::LinuxGpu, Architecture::Arm64),
        InstanceRole::new(InstanceKind::LinuxGpu, Architecture::X86_64),
        InstanceRole::new(InstanceKind::Linux, Architecture::Arm64),
        InstanceRole::new(InstanceKind::Linux, Architecture::X86_64),
    ];

    /// Node roles hosted by this instance role, servers first.
    pub fn node_roles(self) -> impl Iterator<Item = NodeRole> {
        let architecture = self.architecture;
        self.kind
            .node_kinds()
            .iter()
            .map(move |kind| NodeRole::new(*kind, architecture))
    }

    pub fn client_role(self) -> NodeRole {
        NodeRole::new(self.kind.client_kind(), self.architecture)
    }

    pub fn server_role(self) -> Option<NodeRole> {
        self.kind
            .server_kind()
            .map(|kind| NodeRole::new(kind, self.architecture))
    }

    /// CLI flag selecting the instance type for this role.
    pub fn type_flag(self) -> String {
        format!("--{}-{}-instance-type", self.kind.flag_stem(), self.architecture)
    }

    /// CLI flag selecting the instance count for this role.
    pub fn count_flag(self) -> String {
        format!("--{}-{}-instance-count", self.kind.flag_stem(), self.architecture)
    }
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Role::name(*self))
    }
}

/// A closed set of roles usable as keys of a [`RoleMap`].
pub trait Role: Copy + Eq + fmt::Debug + 'static {
    const VARIANTS: &'static [Self];

    /// Position of this role within [`Role::VARIANTS`].
    fn index(self) -> usize;

    /// Stable snake_case name used in config and JSON files.
    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|role| role.name() == name)
    }
}

impl Role for NodeRole {
    const VARIANTS: &'static [Self] = &NodeRole::ALL;

    fn index(self) -> usize {
        self.architecture.index() * NodeKind::ALL.len() + self.kind.index()
    }

    fn name(self) -> &'static str {
        use Architecture::*;
        use NodeKind::*;
        match (self.kind, self.architecture) {
            (AndroidClient, Arm64) => "android_arm64_client",
            (AndroidClient, X86_64) => "android_x86_64_client",
            (LinuxGpuServer, Arm64) => "linux_gpu_arm64_server",
            (LinuxGpuServer, X86_64) => "linux_gpu_x86_64_server",
            (LinuxGpuClient, Arm64) => "linux_gpu_arm64_client",
            (LinuxGpuClient, X86_64) => "linux_gpu_x86_64_client",
            (LinuxServer, Arm64) => "linux_arm64_server",
            (LinuxServer, X86_64) => "linux_x86_64_server",
            (LinuxClient, Arm64) => "linux_arm64_client",
            (LinuxClient, X86_64) => "linux_x86_64_client",
        }
    }
}

impl Role for InstanceRole {
    const VARIANTS: &'static [Self] = &InstanceRole::ALL;

    fn index(self) -> usize {
        self.kind.index() * Architecture::ALL.len() + self.architecture.index()
    }

    fn name(self) -> &'static str {
        use Architecture::*;
        use InstanceKind::*;
        match (self.kind, self.architecture) {
            (Android, Arm64) => "android_arm64",
            (Android, X86_64) => "android_x86_64",
            (LinuxGpu, Arm64) => "linux_gpu_arm64",
            (LinuxGpu, X86_64) => "linux_gpu_x86_64",
            (Linux, Arm64) => "linux_arm64",
            (Linux, X86_64) => "linux_x86_64",
        }
    }
}

// ── RoleMap ────────────────────────────────────────────────────────

/// Dense mapping from every role of `R` to a value.
///
/// Serialized as a map keyed by role name. Missing names read as the
/// default value; unknown names are rejected.
#[derive(Clone, PartialEq, Eq)]
pub struct RoleMap<R: Role, V> {
    values: Vec<V>,
    role: PhantomData<R>,
}

/// Number of nodes per node role.
pub type NodeCounts = RoleMap<NodeRole, u32>;

/// Number of instances per instance role.
pub type InstanceCounts = RoleMap<InstanceRole, u32>;

/// Persona names per node role.
pub type NodePersonas = RoleMap<NodeRole, Vec<String>>;

impl<R: Role, V: Default> Default for RoleMap<R, V> {
    fn default() -> Self {
        Self {
            values: R::VARIANTS.iter().map(|_| V::default()).collect(),
            role: PhantomData,
        }
    }
}

impl<R: Role, V> RoleMap<R, V> {
    pub fn get(&self, role: R) -> &V {
        &self.values[role.index()]
    }

    pub fn get_mut(&mut self, role: R) -> &mut V {
        &mut self.values[role.index()]
    }

    pub fn set(&mut self, role: R, value: V) {
        self.values[role.index()] = value;
    }

    /// Entries in [`Role::VARIANTS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (R, &V)> + '_ {
        R::VARIANTS.iter().copied().zip(self.values.iter())
    }
}

impl<R: Role> RoleMap<R, u32> {
    /// Sum of every count, widened so it cannot overflow.
    pub fn total(&self) -> u64 {
        self.values.iter().map(|count| u64::from(*count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|count| *count == 0)
    }
}

impl<R: Role, V> Index<R> for RoleMap<R, V> {
    type Output = V;

    fn index(&self, role: R) -> &V {
        self.get(role)
    }
}

impl<R: Role, V> IndexMut<R> for RoleMap<R, V> {
    fn index_mut(&mut self, role: R) -> &mut V {
        self.get_mut(role)
    }
}

impl<R: Role, V: Default> FromIterator<(R, V)> for RoleMap<R, V> {
    fn from_iter<I: IntoIterator<Item = (R, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (role, value) in iter {
            map.set(role, value);
        }
        map
    }
}

impl<R: Role, V: fmt::Debug> fmt::Debug for RoleMap<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(role, value)| (role.name(), value)))
            .finish()
    }
}

impl<R: Role, V: Serialize> Serialize for RoleMap<R, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (role, value) in self.iter() {
            map.serialize_entry(role.name(), value)?;
        }
        map.end()
    }
}

impl<'de, R: Role, V: Deserialize<'de> + Default> Deserialize<'de> for RoleMap<R, V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, V>::deserialize(deserializer)?;
        let mut map = Self::default();
        for (name, value) in raw {
            let role = R::from_name(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown role `{name}`")))?;
            map.set(role, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn node_roles_are_exhaustive_and_unique() {
        let unique: HashSet<NodeRole> = NodeRole::ALL.iter().copied().collect();
        assert_eq!(unique.len(), 10);
        for (position, role) in NodeRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), position, "{role} is out of place");
        }
    }

    #[test]
    fn instance_roles_are_exhaustive_and_unique() {
        let unique: HashSet<InstanceRole> = InstanceRole::ALL.iter().copied().collect();
        assert_eq!(unique.len(), 6);
        for (position, role) in InstanceRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), position, "{role} is out of place");
        }
    }

    #[test]
    fn processing_order_places_least_flexible_roles_first() {
        for architecture in Architecture::ALL {
            let kinds: Vec<NodeKind> = NodeRole::ALL
                .iter()
                .filter(|role| role.architecture == architecture)
                .map(|role| role.kind)
                .collect();
            assert_eq!(
                kinds,
                vec![
                    NodeKind::AndroidClient,
                    NodeKind::LinuxGpuServer,
                    NodeKind::LinuxGpuClient,
                    NodeKind::LinuxServer,
                    NodeKind::LinuxClient,
                ]
            );
        }
    }

    #[test]
    fn android_has_no_server_or_gpu_variant() {
        let android = InstanceRole::new(InstanceKind::Android, Architecture::Arm64);
        assert_eq!(android.server_role(), None);
        assert_eq!(android.node_roles().count(), 1);
        assert!(!NodeKind::AndroidClient.requires_gpu());
        assert!(NodeKind::AndroidClient.requires_bare_metal());
    }

    #[test]
    fn every_node_role_maps_to_a_hosting_instance_role() {
        for role in NodeRole::ALL {
            let instance_role = role.instance_role();
            assert_eq!(instance_role.architecture, role.architecture);
            assert!(instance_role.node_roles().any(|r| r == role));
        }
    }

    #[test]
    fn names_round_trip() {
        for role in NodeRole::ALL {
            assert_eq!(NodeRole::from_name(role.name()), Some(role));
        }
        for role in InstanceRole::ALL {
            assert_eq!(InstanceRole::from_name(role.name()), Some(role));
        }
        assert_eq!(NodeRole::from_name("android_arm64_server"), None);
    }

    #[test]
    fn flags_keep_architecture_spelling() {
        let role = InstanceRole::new(InstanceKind::LinuxGpu, Architecture::X86_64);
        assert_eq!(role.type_flag(), "--linux-gpu-x86_64-instance-type");
        assert_eq!(role.count_flag(), "--linux-gpu-x86_64-instance-count");
    }

    #[test]
    fn role_map_reads_names_and_defaults_missing() {
        let counts: NodeCounts =
            serde_json::from_str(r#"{"linux_x86_64_client": 3, "android_arm64_client": 1}"#).unwrap();
        let client = NodeRole::new(NodeKind::LinuxClient, Architecture::X86_64);
        let android = NodeRole::new(NodeKind::AndroidClient, Architecture::Arm64);
        assert_eq!(counts[client], 3);
        assert_eq!(counts[android], 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn role_map_rejects_unknown_names() {
        let err = serde_json::from_str::<NodeCounts>(r#"{"android_arm64_server": 1}"#).unwrap_err();
        assert!(err.to_string().contains("unknown role `android_arm64_server`"));
    }
}
