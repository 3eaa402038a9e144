//! Serde model of the error definitions document.
//!
//! The layout matches the `definitions.yaml` file the header generators
//! consume, with an explicit `range` per category so that band violations can
//! be caught when the registry is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How serious an error is considered by the gateway UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Degraded operation, the VCU keeps running.
    Warning,
    /// A peripheral or subsystem failed.
    #[default]
    Error,
    /// The VCU cannot operate safely.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Root of the definitions document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorDefinitions {
    /// Project the codes belong to.
    pub project_name: String,
    /// Prefix prepended to every error name to form the canonical name.
    pub prefix: String,
    /// Version of the definitions document.
    pub version: String,
    /// Subsystem categories keyed by name.
    pub categories: BTreeMap<String, CategoryDef>,
    /// Deprecated name → canonical name.
    #[serde(default)]
    pub legacy_mapping: BTreeMap<String, String>,
}

/// One subsystem category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDef {
    /// Human-readable description.
    pub description: String,
    /// Inclusive numeric band `[low, high]`.
    pub range: [u16; 2],
    /// Errors in this category.
    #[serde(default)]
    pub errors: Vec<ErrorDef>,
}

/// One error entry inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorDef {
    /// Unprefixed name, e.g. `CAN1_INIT`.
    pub name: String,
    /// Numeric code.
    pub code: u16,
    /// Description shown to users.
    pub description: String,
    /// Severity, defaults to `error`.
    #[serde(default)]
    pub severity: Severity,
}
