//! Reading and writing topology and distribution files.
//!
//! Files are pretty-printed JSON with sorted keys, so writing a value that
//! was just read reproduces the file byte for byte.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::roles::NodePersonas;
use crate::topology::{NodeInstanceDistribution, NodeInstanceTopology};

/// Render `value` as pretty-printed JSON with sorted object keys.
pub fn to_sorted_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    // serde_json::Value keeps object keys in a BTreeMap.
    let value = serde_json::to_value(value)?;
    serde_json::to_string_pretty(&value)
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> TopologyResult<()> {
    let text = to_sorted_json(value).map_err(|source| TopologyError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| TopologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote json file");
    Ok(())
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> TopologyResult<T> {
    let text = fs::read_to_string(path).map_err(|source| TopologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| TopologyError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_topology_to_file(path: &Path, topology: &NodeInstanceTopology) -> TopologyResult<()> {
    write_json_file(path, topology)
}

pub fn read_topology_from_file(path: &Path) -> TopologyResult<NodeInstanceTopology> {
    read_json_file(path)
}

pub fn write_distribution_to_file(path: &Path, distribution: &NodeInstanceDistribution) -> TopologyResult<()> {
    write_json_file(path, distribution)
}

pub fn read_distribution_from_file(path: &Path) -> TopologyResult<NodeInstanceDistribution> {
    read_json_file(path)
}

/// Read persona names keyed by node-role name.
pub fn read_personas_from_file(path: &Path) -> TopologyResult<NodePersonas> {
    read_json_file(path)
}
