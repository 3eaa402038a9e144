//! Protocol versions and validity ranges.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// A protocol revision, ordered as `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    /// Major revision. Bumped on wire-incompatible changes.
    pub major: u16,
    /// Minor revision.
    pub minor: u16,
    /// Patch revision.
    pub patch: u16,
}

impl ProtocolVersion {
    /// The original single-address protocol.
    pub const V1_0: ProtocolVersion = ProtocolVersion::new(1, 0, 0);
    /// Extended BMS and diagnostics reads.
    pub const V1_2: ProtocolVersion = ProtocolVersion::new(1, 2, 0);
    /// The dual-address split: writes move to their own bus address.
    pub const V10_0: ProtocolVersion = ProtocolVersion::new(10, 0, 0);

    /// Create a version.
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        ProtocolVersion {
            major,
            minor,
            patch,
        }
    }

    /// Whether this version uses separate read and write bus addresses.
    pub fn has_split_addresses(&self) -> bool {
        *self >= ProtocolVersion::DUAL_ADDRESS_SPLIT
    }

    /// First version with separate read and write addresses.
    pub const DUAL_ADDRESS_SPLIT: ProtocolVersion = ProtocolVersion::V10_0;
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Failure to parse a [`ProtocolVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid protocol version '{0}': expected MAJOR[.MINOR[.PATCH]]")]
pub struct VersionParseError(pub String);

impl FromStr for ProtocolVersion {
    type Err = VersionParseError;

    /// Accepts `10`, `10.0`, `10.0.0` and the same with a leading `v`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let parts: Vec<&str> = body.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(VersionParseError(s.to_string()));
        }

        let mut numbers = [0u16; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| VersionParseError(s.to_string()))?;
        }

        Ok(ProtocolVersion::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}.{}.{}", self.major, self.minor, self.patch))
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-open validity range `[introduced_in, removed_in)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionRange {
    /// First version the entry is valid in.
    pub introduced_in: ProtocolVersion,
    /// First version the entry is no longer valid in, if retired.
    pub removed_in: Option<ProtocolVersion>,
}

impl VersionRange {
    /// A range that is still open.
    pub fn since(introduced_in: ProtocolVersion) -> Self {
        VersionRange {
            introduced_in,
            removed_in: None,
        }
    }

    /// A closed range.
    pub fn between(introduced_in: ProtocolVersion, removed_in: ProtocolVersion) -> Self {
        VersionRange {
            introduced_in,
            removed_in: Some(removed_in),
        }
    }

    /// Whether `version` lies inside the range.
    pub fn contains(&self, version: ProtocolVersion) -> bool {
        version >= self.introduced_in && self.removed_in.map_or(true, |end| version < end)
    }

    /// Whether the range was closed at or before `version`.
    pub fn is_retired_at(&self, version: ProtocolVersion) -> bool {
        self.removed_in.is_some_and(|end| end <= version)
    }

    /// Whether two ranges share at least one version.
    pub fn overlaps(&self, other: &VersionRange) -> bool {
        let self_before_other = self.removed_in.is_some_and(|end| end <= other.introduced_in);
        let other_before_self = other.removed_in.is_some_and(|end| end <= self.introduced_in);
        !self_before_other && !other_before_self
    }

    /// Whether the range contains no version at all.
    pub fn is_empty(&self) -> bool {
        self.removed_in.is_some_and(|end| end <= self.introduced_in)
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.removed_in {
            Some(end) => write!(f, "[{}, {})", self.introduced_in, end),
            None => write!(f, "[{}, ..)", self.introduced_in),
        }
    }
}
