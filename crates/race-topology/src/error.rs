//! Error types for topology construction and persona distribution.

use std::path::PathBuf;

use thiserror::Error;

use crate::roles::NodeRole;

/// Result type alias for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors produced while building, distributing, or loading a topology.
///
/// None of these are retried internally: every failure is a deterministic
/// function of the inputs.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Contradictory or insufficient input from the caller.
    #[error("{message}{}", remediation_suffix(.remediation))]
    Configuration {
        message: String,
        remediation: Option<String>,
    },

    /// The chosen instance type cannot host even one node of a role.
    #[error("instance type {instance_type} cannot host a single {role} node: {reason}")]
    Infeasible {
        role: NodeRole,
        instance_type: String,
        reason: String,
    },

    /// No instance slot had room for a persona.
    #[error("no instance has free {role} capacity for persona {persona}")]
    PlacementExhausted { persona: String, role: NodeRole },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TopologyError {
    /// A configuration error without a remediation hint.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            remediation: None,
        }
    }

    /// A configuration error with a hint naming what to change.
    pub fn config_with_hint(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            remediation: Some(remediation.into()),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

fn remediation_suffix(remediation: &Option<String>) -> String {
    match remediation {
        Some(hint) => format!(" ({hint})"),
        None => String::new(),
    }
}
