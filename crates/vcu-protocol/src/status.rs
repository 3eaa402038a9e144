//! Status byte of the write-then-status pattern.

use crate::constants::*;

/// Outcome the VCU reports after a status-bearing write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStatus {
    /// The write was applied.
    Success,
    /// The firmware rejected a parameter.
    InvalidParameter,
    /// The firmware did not recognise the command.
    Unknown,
    /// Any other status byte.
    Other(u8),
}

impl WriteStatus {
    /// Whether the write was applied.
    pub fn is_success(&self) -> bool {
        matches!(self, WriteStatus::Success)
    }

    /// The status byte.
    pub fn as_byte(&self) -> u8 {
        match self {
            WriteStatus::Success => STATUS_SUCCESS,
            WriteStatus::InvalidParameter => STATUS_INVALID_PARAM,
            WriteStatus::Unknown => STATUS_UNKNOWN,
            WriteStatus::Other(b) => *b,
        }
    }
}

impl From<u8> for WriteStatus {
    fn from(byte: u8) -> Self {
        match byte {
            STATUS_SUCCESS => WriteStatus::Success,
            STATUS_INVALID_PARAM => WriteStatus::InvalidParameter,
            STATUS_UNKNOWN => WriteStatus::Unknown,
            other => WriteStatus::Other(other),
        }
    }
}

impl std::fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStatus::Success => write!(f, "success"),
            WriteStatus::InvalidParameter => write!(f, "invalid parameter"),
            WriteStatus::Unknown => write!(f, "unknown command"),
            WriteStatus::Other(b) => write!(f, "status 0x{:02X}", b),
        }
    }
}
