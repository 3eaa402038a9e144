//! Error types for registry construction.

use thiserror::Error;

/// Errors raised while building an [`ErrorRegistry`](crate::ErrorRegistry).
///
/// All of these indicate a corrupt or inconsistent definitions file. None of
/// them can occur during a lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A numeric code is claimed twice, lies outside its subsystem band, or is
    /// the reserved zero sentinel.
    #[error("range collision on code {code}: {detail}")]
    RangeCollision {
        /// The offending numeric code.
        code: u16,
        /// What collided.
        detail: String,
    },

    /// Two subsystem bands share at least one code.
    #[error("subsystem bands overlap: {first} ({first_low}-{first_high}) and {second} ({second_low}-{second_high})")]
    OverlappingBands {
        /// First subsystem name.
        first: String,
        /// Lower bound of the first band.
        first_low: u16,
        /// Upper bound of the first band.
        first_high: u16,
        /// Second subsystem name.
        second: String,
        /// Lower bound of the second band.
        second_low: u16,
        /// Upper bound of the second band.
        second_high: u16,
    },

    /// A band whose lower bound exceeds its upper bound.
    #[error("subsystem {name} has an inverted band {low}-{high}")]
    InvertedBand {
        /// Subsystem name.
        name: String,
        /// Declared lower bound.
        low: u16,
        /// Declared upper bound.
        high: u16,
    },

    /// Two canonical entries share a name.
    #[error("duplicate canonical name: {0}")]
    DuplicateName(String),

    /// A legacy alias shadows a canonical name.
    #[error("legacy alias {alias} collides with a canonical name")]
    AliasCollision {
        /// The alias.
        alias: String,
    },

    /// A legacy alias points at a name the registry does not define.
    #[error("legacy alias {alias} targets unknown name {target}")]
    UnknownAliasTarget {
        /// The alias.
        alias: String,
        /// The missing canonical name.
        target: String,
    },

    /// The definitions document could not be parsed.
    #[error("failed to parse error definitions: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The definitions file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Create a range collision error for `code`.
    pub fn collision(code: u16, detail: impl Into<String>) -> Self {
        RegistryError::RangeCollision {
            code,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::collision(110, "claimed by CAN1_INIT and CAN9_INIT");
        assert!(err.to_string().contains("code 110"));
        assert!(err.to_string().contains("CAN9_INIT"));

        let err = RegistryError::UnknownAliasTarget {
            alias: "SKUDAK_ERR_X".to_string(),
            target: "POLARITY_ERR_X".to_string(),
        };
        assert!(err.to_string().contains("POLARITY_ERR_X"));
    }
}
