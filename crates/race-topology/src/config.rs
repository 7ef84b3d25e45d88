//! Deployment plan file parser.
//!
//! A plan is a TOML file carrying everything the builders need: requested
//! node counts, instance counts or densities, the instance type chosen per
//! instance role, the catalog facts for those types, and resource constraints.
//! Every section is optional; each builder reads only what it uses.
//!
//! ```toml
//! [resources]
//! cpu_overcommit = 0.5
//!
//! [resources.linux_client]   # replaces the built-in linux_client defaults
//! ram_mb = 4096              # required
//! cpus = 2.0                 # required
//! gpus = 0.0                 # optional, defaults to 0
//! ```
//!
//! A `[resources.<kind>]` table replaces that kind's defaults as a whole, so
//! it must name `ram_mb` and `cpus`. Kinds without a table keep the defaults
//! of [`ResourceConstraints::default`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::resources::{InstanceTypeDetails, InstanceTypes, ResourceConstraints};
use crate::roles::{Architecture, InstanceCounts, InstanceRole, NodeCounts, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    pub allow_colocation: bool,
    pub node_counts: Option<NodeCounts>,
    pub instance_counts: Option<InstanceCounts>,
    pub nodes_per_instance: Option<NodeCounts>,
    pub max_instance_counts: Option<InstanceCounts>,
    /// Instance role name → instance type name.
    pub instance_types: BTreeMap<String, String>,
    /// Instance type name → provider facts.
    pub catalog: BTreeMap<String, CatalogEntry>,
    pub resources: ResourceConstraints,
}

/// Provider facts for one instance type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub architecture: Architecture,
    pub cpu_count: u32,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub is_bare_metal: bool,
    pub ram_mb: u64,
}

impl CatalogEntry {
    pub fn to_details(&self, name: &str) -> InstanceTypeDetails {
        InstanceTypeDetails {
            name: name.to_string(),
            architecture: self.architecture,
            cpu_count: self.cpu_count,
            gpu_count: self.gpu_count,
            is_bare_metal: self.is_bare_metal,
            ram_mb: self.ram_mb,
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            allow_colocation: true,
            node_counts: None,
            instance_counts: None,
            nodes_per_instance: None,
            max_instance_counts: None,
            instance_types: BTreeMap::new(),
            catalog: BTreeMap::new(),
            resources: ResourceConstraints::default(),
        }
    }
}

impl PlanConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: PlanConfig = toml::from_str(content)?;
        config.resources.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve the instance type of every role through the catalog.
    ///
    /// `overrides` (typically command-line flags) take precedence over the
    /// plan's `[instance_types]` table.
    pub fn resolve_instance_types(&self, overrides: &BTreeMap<InstanceRole, String>) -> TopologyResult<InstanceTypes> {
        for key in self.instance_types.keys() {
            if InstanceRole::from_name(key).is_none() {
                return Err(TopologyError::config(format!("unknown instance role `{key}` in [instance_types]")));
            }
        }

        let mut types = InstanceTypes::new();
        for role in InstanceRole::ALL {
            let name = overrides
                .get(&role)
                .or_else(|| self.instance_types.get(Role::name(role)));
            let Some(name) = name else { continue };
            let entry = self.catalog.get(name).ok_or_else(|| {
                TopologyError::config_with_hint(
                    format!("instance type {name} selected for {role} is not in the catalog"),
                    format!("add a [catalog.\"{name}\"] entry or choose another type for {}", role.type_flag()),
                )
            })?;
            types.insert(role, entry.to_details(name));
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::KindResources;
    use crate::roles::{InstanceKind, NodeKind, NodeRole};

    const PLAN: &str = r#"
allow_colocation = false

[node_counts]
android_arm64_client = 4
linux_arm64_server = 2

[instance_types]
android_arm64 = "c6g.metal"

[catalog."c6g.metal"]
architecture = "arm64"
cpu_count = 64
is_bare_metal = true
ram_mb = 131072

[resources]
ram_overcommit = 0.25

[resources.android_client]
ram_mb = 8192.0
cpus = 4.0
"#;

    #[test]
    fn test_parse_plan() {
        let config = PlanConfig::from_toml_str(PLAN).unwrap();
        assert!(!config.allow_colocation);

        let nodes = config.node_counts.as_ref().unwrap();
        assert_eq!(nodes[NodeRole::new(NodeKind::AndroidClient, Architecture::Arm64)], 4);
        assert_eq!(nodes.total(), 6);
        assert_eq!(config.resources.ram_overcommit, 0.25);
        assert_eq!(config.resources.android_client.ram_mb, 8192.0);
        assert_eq!(config.resources.android_client.gpus, 0.0);
    }

    #[test]
    fn test_parse_minimal() {
        let config = PlanConfig::from_toml_str("").unwrap();
        assert!(config.allow_colocation);
        assert!(config.node_counts.is_none());
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert!(PlanConfig::from_toml_str("[node_counts]\nandroid_arm64_server = 1\n").is_err());
    }

    #[test]
    fn test_partial_resource_table_is_rejected() {
        let err = PlanConfig::from_toml_str("[resources.linux_client]\ncpus = 2.0\n").unwrap_err();
        assert!(err.to_string().contains("ram_mb"));
    }

    #[test]
    fn test_untouched_kinds_keep_defaults() {
        let config = PlanConfig::from_toml_str("[resources.linux_client]\nram_mb = 4096\ncpus = 2.0\n").unwrap();
        let defaults = ResourceConstraints::default();
        assert_eq!(config.resources.linux_client, KindResources::new(4096.0, 2.0, 0.0));
        assert_eq!(config.resources.linux_server, defaults.linux_server);
        assert_eq!(config.resources.android_client, defaults.android_client);
    }

    #[test]
    fn test_rejects_bad_overcommit() {
        assert!(PlanConfig::from_toml_str("[resources]\ngpu_overcommit = 2.0\n").is_err());
    }

    #[test]
    fn test_resolve_instance_types() {
        let config = PlanConfig::from_toml_str(PLAN).unwrap();
        let types = config.resolve_instance_types(&BTreeMap::new()).unwrap();
        let android = InstanceRole::new(InstanceKind::Android, Architecture::Arm64);

        let details = types.get(android).unwrap();
        assert_eq!(details.name, "c6g.metal");
        assert!(details.is_bare_metal);
        assert_eq!(details.gpu_count, 0);
    }

    #[test]
    fn test_override_missing_from_catalog_names_flag() {
        let config = PlanConfig::from_toml_str(PLAN).unwrap();
        let android = InstanceRole::new(InstanceKind::Android, Architecture::Arm64);
        let overrides = BTreeMap::from([(android, "c6g.16xlarge".to_string())]);

        let err = config.resolve_instance_types(&overrides).unwrap_err();
        assert!(err.to_string().contains("--android-arm64-instance-type"));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = PlanConfig::from_toml_str(PLAN).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(PlanConfig::from_toml_str(&text).unwrap(), config);
    }
}
