//! Dispatcher configuration.

use crate::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Settings for a [`Dispatcher`](crate::Dispatcher).
///
/// ```yaml
/// version: "10.0.0"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Protocol version the VCU speaks. Defaults to the newest version in the
    /// command table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ProtocolVersion>,
}

impl DispatchConfig {
    /// Target a specific version.
    pub fn with_version(version: ProtocolVersion) -> Self {
        DispatchConfig {
            version: Some(version),
        }
    }

    /// Parse from a YAML document. Unknown keys and malformed versions are
    /// reported by serde_yaml.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = DispatchConfig::from_yaml_str("version: \"1.2\"").unwrap();
        assert_eq!(config.version, Some(ProtocolVersion::V1_2));

        let config = DispatchConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, DispatchConfig::default());

        let err = DispatchConfig::from_yaml_str("versoin: \"1.2\"").unwrap_err();
        assert!(err.to_string().contains("versoin"));

        let err = DispatchConfig::from_yaml_str("version: \"1.x\"").unwrap_err();
        assert!(err.to_string().contains("1.x"));
    }
}
