//! Typed view over the error-report frames.
//!
//! The VCU reports latched errors as a zero-terminated list of codes. Since
//! v10.0 the list lives in a 128-byte payload of 64 little-endian `u16`
//! slots; older revisions used shorter lists, which [`from_decoded`] also
//! accepts.
//!
//! [`from_decoded`]: ErrorPayloadFrame::from_decoded

use crate::constants::*;
use crate::{CodecError, FieldValues};
use bytes::{Buf, BufMut};
use polarity_errors::{ErrorCode, ErrorRegistry, Subsystem, NO_ERROR};

/// The reported error codes, in slot order, without the terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayloadFrame {
    codes: Vec<u16>,
}

/// A reported code resolved against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedError<'r> {
    /// The code is in the registry.
    Known(&'r ErrorCode),
    /// The code is not in the registry. Its subsystem is still known when it
    /// falls inside a band.
    Unlisted {
        /// Raw code.
        code: u16,
        /// Subsystem whose band contains the code.
        subsystem: Option<&'r Subsystem>,
    },
}

impl ReportedError<'_> {
    /// Raw code.
    pub fn code(&self) -> u16 {
        match self {
            ReportedError::Known(error) => error.code,
            ReportedError::Unlisted { code, .. } => *code,
        }
    }
}

impl std::fmt::Display for ReportedError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportedError::Known(error) => write!(f, "{}", error),
            ReportedError::Unlisted {
                code,
                subsystem: Some(s),
            } => write!(f, "unlisted {} error ({})", s.name, code),
            ReportedError::Unlisted {
                code,
                subsystem: None,
            } => write!(f, "unlisted error ({})", code),
        }
    }
}

impl ErrorPayloadFrame {
    /// Create from a list of codes. Zero is the terminator and may not appear.
    pub fn new(codes: Vec<u16>) -> Result<Self, CodecError> {
        if codes.len() > ERROR_PAYLOAD_SLOTS {
            return Err(CodecError::TooManyErrors {
                max: ERROR_PAYLOAD_SLOTS,
                actual: codes.len(),
            });
        }
        if let Some(slot) = codes.iter().position(|&c| c == NO_ERROR) {
            return Err(CodecError::ZeroErrorCode { slot });
        }
        Ok(ErrorPayloadFrame { codes })
    }

    /// Decode a 128-byte error payload. Slots after the first zero are
    /// ignored.
    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        if frame.len() != ERROR_PAYLOAD_SIZE {
            return Err(CodecError::FrameLengthMismatch {
                command: "ERR_PAYLOAD".to_string(),
                expected: ERROR_PAYLOAD_SIZE,
                actual: frame.len(),
            });
        }

        let mut buf = frame;
        let mut codes = Vec::new();
        while buf.has_remaining() {
            let code = buf.get_u16_le();
            if code == NO_ERROR {
                break;
            }
            codes.push(code);
        }
        Ok(ErrorPayloadFrame { codes })
    }

    /// Collect the codes from any decoded error-list command.
    ///
    /// Reads `error_0`, `error_1`, ... until a zero slot or the end of the
    /// list. When the frame carries a `count` field, at most that many slots
    /// are read.
    pub fn from_decoded(values: &FieldValues) -> Self {
        let limit = values
            .unsigned("count")
            .map_or(usize::MAX, |count| count as usize);

        let codes = (0..)
            .map_while(|slot| values.unsigned(&format!("error_{}", slot)))
            .take(limit)
            .take_while(|&code| code != u32::from(NO_ERROR))
            .map(|code| code as u16)
            .collect();
        ErrorPayloadFrame { codes }
    }

    /// Encode into a 128-byte payload, zero filling the unused slots.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ERROR_PAYLOAD_SIZE);
        for &code in &self.codes {
            buf.put_u16_le(code);
        }
        buf.put_bytes(0, ERROR_PAYLOAD_SIZE - buf.len());
        buf
    }

    /// Reported codes.
    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    /// Number of reported codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no error is reported.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Resolve every code against `registry`.
    pub fn resolve<'r>(&self, registry: &'r ErrorRegistry) -> Vec<ReportedError<'r>> {
        self.codes
            .iter()
            .map(|&code| match registry.lookup(code) {
                Some(error) => ReportedError::Known(error),
                None => {
                    log::warn!("VCU reported error code {} which is not in the registry", code);
                    ReportedError::Unlisted {
                        code,
                        subsystem: registry.subsystem_of(code),
                    }
                }
            })
            .collect()
    }
}
