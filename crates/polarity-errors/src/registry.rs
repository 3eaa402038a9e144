//! The error code registry.

use crate::{ErrorDefinitions, RegistryError, Result, Severity};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::OnceLock;

/// The definitions shipped with the crate.
pub const BUILTIN_DEFINITIONS: &str = include_str!("../definitions.yaml");

/// Value meaning "no error". Never assigned to a real code.
pub const NO_ERROR: u16 = 0;

/// Highest assignable code. Codes must also fit the single-byte slots of the
/// v1.2 error list.
pub const MAX_CODE: u16 = 254;

/// A subsystem and the numeric band its codes must fall in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsystem {
    /// Subsystem name, e.g. `CAN`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Lowest code in the band.
    pub low: u16,
    /// Highest code in the band.
    pub high: u16,
}

impl Subsystem {
    /// The band as an inclusive range.
    pub fn band(&self) -> RangeInclusive<u16> {
        self.low..=self.high
    }

    /// Whether `code` falls inside this subsystem's band.
    pub fn contains(&self, code: u16) -> bool {
        self.band().contains(&code)
    }
}

/// A canonical error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    /// Numeric value as reported on the wire.
    pub code: u16,
    /// Canonical name, e.g. `POLARITY_ERR_CAN1_INIT`.
    pub name: String,
    /// Name of the owning subsystem.
    pub subsystem: String,
    /// Description shown to users.
    pub description: String,
    /// Severity.
    pub severity: Severity,
    /// Deprecated names that resolve to this code, sorted.
    pub legacy_aliases: Vec<String>,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Immutable lookup tables for error codes.
///
/// Built once from an [`ErrorDefinitions`] document. All lookups are hash map
/// reads, so the registry can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    project_name: String,
    prefix: String,
    version: String,
    /// Sorted by `low`.
    subsystems: Vec<Subsystem>,
    codes: HashMap<u16, ErrorCode>,
    /// Ascending code order for iteration.
    order: Vec<u16>,
    names: HashMap<String, u16>,
    /// Legacy name → canonical name.
    aliases: HashMap<String, String>,
}

impl ErrorRegistry {
    /// The registry built from [`BUILTIN_DEFINITIONS`].
    ///
    /// # Panics
    ///
    /// Panics if the embedded definitions are inconsistent. That is a build
    /// defect and must abort startup.
    pub fn builtin() -> &'static ErrorRegistry {
        static BUILTIN: OnceLock<ErrorRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            ErrorRegistry::from_yaml_str(BUILTIN_DEFINITIONS)
                .unwrap_or_else(|e| panic!("embedded error definitions are invalid: {}", e))
        })
    }

    /// Build a registry from a YAML definitions document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let definitions: ErrorDefinitions = serde_yaml::from_str(yaml)?;
        Self::from_definitions(definitions)
    }

    /// Build a registry from a YAML definitions file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Build a registry from parsed definitions, validating every invariant.
    pub fn from_definitions(definitions: ErrorDefinitions) -> Result<Self> {
        let ErrorDefinitions {
            project_name,
            prefix,
            version,
            categories,
            legacy_mapping,
        } = definitions;

        let mut subsystems = Vec::with_capacity(categories.len());
        for (name, category) in &categories {
            let [low, high] = category.range;
            if low > high {
                return Err(RegistryError::InvertedBand {
                    name: name.clone(),
                    low,
                    high,
                });
            }
            if high > MAX_CODE {
                return Err(RegistryError::collision(
                    high,
                    format!("{} band {}-{} extends past {}", name, low, high, MAX_CODE),
                ));
            }
            subsystems.push(Subsystem {
                name: name.clone(),
                description: category.description.clone(),
                low,
                high,
            });
        }
        subsystems.sort_by_key(|s| s.low);
        for pair in subsystems.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.low <= a.high {
                return Err(RegistryError::OverlappingBands {
                    first: a.name.clone(),
                    first_low: a.low,
                    first_high: a.high,
                    second: b.name.clone(),
                    second_low: b.low,
                    second_high: b.high,
                });
            }
        }

        let mut codes: HashMap<u16, ErrorCode> = HashMap::new();
        let mut names: HashMap<String, u16> = HashMap::new();

        for (subsystem, category) in categories {
            let [low, high] = category.range;
            for def in category.errors {
                let name = format!("{}{}", prefix, def.name);

                if def.code == NO_ERROR {
                    return Err(RegistryError::collision(
                        def.code,
                        format!("{} uses the reserved no-error value", name),
                    ));
                }
                if def.code > MAX_CODE {
                    return Err(RegistryError::collision(
                        def.code,
                        format!("{} exceeds the maximum code {}", name, MAX_CODE),
                    ));
                }
                if !(low..=high).contains(&def.code) {
                    return Err(RegistryError::collision(
                        def.code,
                        format!(
                            "{} lies outside the {} band {}-{}",
                            name, subsystem, low, high
                        ),
                    ));
                }
                if let Some(existing) = codes.get(&def.code) {
                    if existing.name != name {
                        return Err(RegistryError::collision(
                            def.code,
                            format!("claimed by both {} and {}", existing.name, name),
                        ));
                    }
                    return Err(RegistryError::DuplicateName(name));
                }
                if names.contains_key(&name) {
                    return Err(RegistryError::DuplicateName(name));
                }

                names.insert(name.clone(), def.code);
                codes.insert(
                    def.code,
                    ErrorCode {
                        code: def.code,
                        name,
                        subsystem: subsystem.clone(),
                        description: def.description,
                        severity: def.severity,
                        legacy_aliases: Vec::new(),
                    },
                );
            }
        }

        let mut aliases = HashMap::with_capacity(legacy_mapping.len());
        for (alias, target) in legacy_mapping {
            if names.contains_key(&alias) {
                return Err(RegistryError::AliasCollision { alias });
            }
            let Some(&code) = names.get(&target) else {
                return Err(RegistryError::UnknownAliasTarget { alias, target });
            };
            if let Some(entry) = codes.get_mut(&code) {
                entry.legacy_aliases.push(alias.clone());
            }
            aliases.insert(alias, target);
        }
        for entry in codes.values_mut() {
            entry.legacy_aliases.sort();
        }

        let mut order: Vec<u16> = codes.keys().copied().collect();
        order.sort_unstable();

        log::info!(
            "Loaded {} {} error codes (definitions v{}) in {} subsystems with {} legacy aliases",
            codes.len(),
            project_name,
            version,
            subsystems.len(),
            aliases.len()
        );

        Ok(ErrorRegistry {
            project_name,
            prefix,
            version,
            subsystems,
            codes,
            order,
            names,
            aliases,
        })
    }

    /// Look up a numeric code.
    pub fn lookup(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Canonical name for a numeric code.
    pub fn canonical_name(&self, code: u16) -> Option<&str> {
        self.lookup(code).map(|e| e.name.as_str())
    }

    /// Numeric code for a canonical or legacy name.
    pub fn code_for(&self, name: &str) -> Option<u16> {
        if let Some(&code) = self.names.get(name) {
            return Some(code);
        }
        self.aliases
            .get(name)
            .and_then(|canonical| self.names.get(canonical))
            .copied()
    }

    /// Look up an entry by canonical or legacy name.
    pub fn lookup_name(&self, name: &str) -> Option<&ErrorCode> {
        self.code_for(name).and_then(|code| self.lookup(code))
    }

    /// Canonical name for a legacy alias.
    ///
    /// Returns `None` for canonical names and unknown names alike.
    pub fn resolve_legacy(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Whether `name` is a deprecated alias.
    pub fn is_legacy_name(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// The subsystem whose band contains `code`.
    ///
    /// Works for reserved codes inside a band that have no entry of their own.
    pub fn subsystem_of(&self, code: u16) -> Option<&Subsystem> {
        let idx = self.subsystems.partition_point(|s| s.high < code);
        self.subsystems.get(idx).filter(|s| s.contains(code))
    }

    /// All subsystems, ordered by band.
    pub fn subsystems(&self) -> &[Subsystem] {
        &self.subsystems
    }

    /// All entries in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = &ErrorCode> {
        self.order.iter().filter_map(|code| self.codes.get(code))
    }

    /// Number of canonical codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the registry has no codes.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Project name from the definitions.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Canonical name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Definitions document version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(extra_errors: &str, mapping: &str) -> String {
        format!(
            r#"
project_name: Test
prefix: T_ERR_
version: 0.1.0
categories:
  CAN:
    description: CAN errors
    range: [110, 139]
    errors:
      - {{ name: CAN1_INIT, code: 110, description: init }}
{extra_errors}
legacy_mapping:
{mapping}
"#
        )
    }

    #[test]
    fn test_builtin_loads() {
        let registry = ErrorRegistry::builtin();
        assert_eq!(registry.len(), 41);
        assert_eq!(registry.subsystems().len(), 5);
        assert_eq!(registry.prefix(), "POLARITY_ERR_");
    }

    #[test]
    fn test_lookup_and_subsystem() {
        let registry = ErrorRegistry::builtin();
        let err = registry.lookup(211).unwrap();
        assert_eq!(err.name, "POLARITY_ERR_BMS1");
        assert_eq!(err.subsystem, "VCU_GENERAL");
        assert_eq!(err.legacy_aliases, vec!["SKUDAK_ERR_BMS1".to_string()]);
        assert!(registry.lookup(NO_ERROR).is_none());
        assert!(registry.lookup(106).is_none());

        // Reserved codes still belong to a band.
        assert_eq!(registry.subsystem_of(106).unwrap().name, "I2C");
        assert_eq!(registry.subsystem_of(139).unwrap().name, "CAN");
        assert!(registry.subsystem_of(175).is_none());
        assert!(registry.subsystem_of(99).is_none());
    }

    #[test]
    fn test_legacy_resolution() {
        let registry = ErrorRegistry::builtin();
        assert_eq!(
            registry.resolve_legacy("SKUDAK_ERR_CAN1_INIT"),
            Some("POLARITY_ERR_CAN1_INIT")
        );
        assert_eq!(registry.resolve_legacy("POLARITY_ERR_CAN1_INIT"), None);
        assert_eq!(registry.code_for("SKUDAK_ERR_CAN1_INIT"), Some(110));
        assert_eq!(registry.code_for("POLARITY_ERR_CAN1_INIT"), Some(110));
        assert_eq!(registry.code_for("SKUDAK_ERR_NOPE"), None);
    }

    #[test]
    fn test_iter_is_ascending() {
        let codes: Vec<u16> = ErrorRegistry::builtin().iter().map(|e| e.code).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
        assert_eq!(codes.first(), Some(&100));
        assert_eq!(codes.last(), Some(&212));
    }

    #[test]
    fn test_out_of_band_code_rejected() {
        let yaml = minimal(
            "      - { name: CAN_BAD, code: 140, description: wrong band }",
            "  {}",
        );
        let err = ErrorRegistry::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, RegistryError::RangeCollision { code: 140, .. }));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let yaml = minimal(
            "      - { name: CAN9_INIT, code: 110, description: clash }",
            "  {}",
        );
        let err = ErrorRegistry::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, RegistryError::RangeCollision { code: 110, .. }));
    }

    #[test]
    fn test_zero_code_rejected() {
        let yaml = r#"
project_name: Test
prefix: T_
version: 0.1.0
categories:
  NONE:
    description: zero band
    range: [0, 9]
    errors:
      - { name: OK, code: 0, description: not an error }
"#;
        let err = ErrorRegistry::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, RegistryError::RangeCollision { code: 0, .. }));
    }

    #[test]
    fn test_codes_above_254_rejected() {
        let yaml = r#"
project_name: Test
prefix: T_
version: 0.1.0
categories:
  WIDE:
    description: band past the code space
    range: [300, 60000]
    errors:
      - { name: HUGE, code: 60000, description: too large }
"#;
        let err = ErrorRegistry::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, RegistryError::RangeCollision { code: 60000, .. }));

        let yaml = minimal("", "  {}").replace("[110, 139]", "[110, 255]");
        let err = ErrorRegistry::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, RegistryError::RangeCollision { code: 255, .. }));

        let yaml = minimal("", "  {}").replace("[110, 139]", "[110, 254]");
        assert!(ErrorRegistry::from_yaml_str(&yaml).is_ok());
    }

    #[test]
    fn test_alias_errors() {
        let yaml = minimal("", "  OLD_CAN1: T_ERR_CAN7_INIT");
        assert!(matches!(
            ErrorRegistry::from_yaml_str(&yaml).unwrap_err(),
            RegistryError::UnknownAliasTarget { .. }
        ));

        let yaml = minimal("", "  T_ERR_CAN1_INIT: T_ERR_CAN1_INIT");
        assert!(matches!(
            ErrorRegistry::from_yaml_str(&yaml).unwrap_err(),
            RegistryError::AliasCollision { .. }
        ));
    }
}
