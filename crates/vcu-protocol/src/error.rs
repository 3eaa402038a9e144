//! Protocol error types.

use crate::{BusAddress, Direction, ProtocolVersion, VersionRange};
use thiserror::Error;

/// Defects found while building a [`SchemaTable`](crate::SchemaTable).
///
/// These describe an inconsistent command table, never a runtime condition.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two descriptors for one key are live in overlapping versions.
    #[error("range collision on {address} 0x{command_id:02X}: {first} {first_range} overlaps {second} {second_range}")]
    RangeCollision {
        /// Bus address of the key.
        address: BusAddress,
        /// Command id of the key.
        command_id: u8,
        /// Name of the earlier descriptor.
        first: String,
        /// Range of the earlier descriptor.
        first_range: VersionRange,
        /// Name of the later descriptor.
        second: String,
        /// Range of the later descriptor.
        second_range: VersionRange,
    },

    /// A descriptor whose range contains no version.
    #[error("{command}: empty version range {range}")]
    EmptyRange {
        /// Command name.
        command: String,
        /// The offending range.
        range: VersionRange,
    },

    /// Declared frame length differs from the sum of field widths.
    #[error("{command}: declared frame length {declared} but fields cover {actual} bytes")]
    FrameLengthMismatch {
        /// Command name.
        command: String,
        /// Declared length.
        declared: usize,
        /// Sum of field widths.
        actual: usize,
    },

    /// A field width the encoding cannot have.
    #[error("{command}: field {field} has invalid width {width}")]
    InvalidFieldWidth {
        /// Command name.
        command: String,
        /// Field name.
        field: String,
        /// Declared width.
        width: usize,
    },

    /// A value-carrying field without a name.
    #[error("{command}: value field at offset {offset} has no name")]
    UnnamedField {
        /// Command name.
        command: String,
        /// Byte offset of the field.
        offset: usize,
    },

    /// A field that does not start where the previous one ends.
    #[error("{command}: field {field} at offset {offset}, expected {expected}")]
    MisplacedField {
        /// Command name.
        command: String,
        /// Field name.
        field: String,
        /// Declared offset.
        offset: usize,
        /// End of the previous field.
        expected: usize,
    },

    /// Two fields with the same name in one descriptor.
    #[error("{command}: duplicate field {field}")]
    DuplicateField {
        /// Command name.
        command: String,
        /// Field name.
        field: String,
    },

    /// A command on an address its direction is not allowed on.
    #[error("{command}: {direction} command not allowed on the {address} address in {range}")]
    AddressDirectionMismatch {
        /// Command name.
        command: String,
        /// Bus address.
        address: BusAddress,
        /// Direction.
        direction: Direction,
        /// Validity range.
        range: VersionRange,
    },

    /// A write-address frame that is not a tagged 12-byte frame.
    #[error("{command}: invalid write frame layout: {detail}")]
    WriteFrameLayout {
        /// Command name.
        command: String,
        /// What is wrong.
        detail: String,
    },

    /// The table document could not be parsed.
    #[error("failed to parse command table: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The table file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while encoding or decoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input length differs from the descriptor's frame length.
    #[error("{command}: frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLengthMismatch {
        /// Command name.
        command: String,
        /// Frame length of the descriptor.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// A value does not fit its field.
    #[error("field {field}: value {value} exceeds maximum {max}")]
    FieldOutOfRange {
        /// Field name.
        field: String,
        /// Offending value in the field's units.
        value: u64,
        /// Largest representable value.
        max: u64,
    },

    /// A whole-percent field was given a fractional percentage.
    #[error("field {field}: {value} hundredths of a percent cannot be carried in whole percent")]
    PrecisionLoss {
        /// Field name.
        field: String,
        /// Offending value in hundredths of a percent.
        value: u32,
    },

    /// A required field has no value.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A supplied value names no value field of the command.
    #[error("{command}: unexpected field {field}")]
    UnexpectedField {
        /// Command name.
        command: String,
        /// Field name.
        field: String,
    },

    /// A value of the wrong kind for its field.
    #[error("field {field}: expected {expected} value, got {actual}")]
    FieldTypeMismatch {
        /// Field name.
        field: String,
        /// Kind the field carries.
        expected: &'static str,
        /// Kind supplied.
        actual: &'static str,
    },

    /// A decoded frame does not start with the expected command tag.
    #[error("{command}: tag mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    TagMismatch {
        /// Command name.
        command: String,
        /// Expected tag.
        expected: u8,
        /// Tag found.
        actual: u8,
    },

    /// Zero is the terminator and cannot be reported as an error.
    #[error("error code at slot {slot} is zero")]
    ZeroErrorCode {
        /// Slot index.
        slot: usize,
    },

    /// More error codes than the payload has slots.
    #[error("too many error codes: maximum {max}, got {actual}")]
    TooManyErrors {
        /// Slot count.
        max: usize,
        /// Codes supplied.
        actual: usize,
    },
}

/// Errors returned by the dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No descriptor ever existed for this address and id.
    #[error("unknown command 0x{command_id:02X} on the {address} address at {version}")]
    UnknownCommand {
        /// Bus address.
        address: BusAddress,
        /// Command id.
        command_id: u8,
        /// Version dispatched against.
        version: ProtocolVersion,
    },

    /// The command existed but was retired.
    #[error("command 0x{command_id:02X} on the {address} address was removed in {removed_in}")]
    RemovedCommand {
        /// Bus address.
        address: BusAddress,
        /// Command id.
        command_id: u8,
        /// Version the command was retired in.
        removed_in: ProtocolVersion,
    },

    /// The command exists at this version, but on the other address.
    #[error("command 0x{command_id:02X} belongs on the {expected} address, not {requested}, at {version}")]
    WrongBusAddress {
        /// Command id.
        command_id: u8,
        /// Address it was issued on.
        requested: BusAddress,
        /// Address it belongs on.
        expected: BusAddress,
        /// Version dispatched against.
        version: ProtocolVersion,
    },

    /// A write command without a payload.
    #[error("{command}: write command requires a payload")]
    MissingPayload {
        /// Command name.
        command: String,
    },

    /// A read command with a payload.
    #[error("{command}: read command does not take a payload")]
    UnexpectedPayload {
        /// Command name.
        command: String,
    },

    /// Frame encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors from a [`Session`](crate::Session): protocol failures or the
/// transport's own error, passed through untouched.
#[derive(Error, Debug)]
pub enum SessionError<E> {
    /// The request was rejected before or after the bus transaction.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(E),
}

impl<E> From<CodecError> for SessionError<E> {
    fn from(err: CodecError) -> Self {
        SessionError::Protocol(ProtocolError::Codec(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::RemovedCommand {
            address: BusAddress::Read,
            command_id: 0x0C,
            removed_in: ProtocolVersion::V10_0,
        };
        assert_eq!(
            err.to_string(),
            "command 0x0C on the read (0x48) address was removed in v10.0.0"
        );

        let err: ProtocolError = CodecError::FrameLengthMismatch {
            command: "INFO".to_string(),
            expected: 4,
            actual: 3,
        }
        .into();
        assert!(err.to_string().contains("expected 4 bytes, got 3"));
    }
}
