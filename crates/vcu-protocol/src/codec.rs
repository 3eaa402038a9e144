//! Fixed-frame encoder and decoder.
//!
//! Both directions are pure functions of a [`CommandDescriptor`]. Multi-byte
//! fields are little-endian. The decoder only accepts frames of exactly the
//! descriptor's length; truncated or padded input is an error.

use crate::constants::PERCENT_FULL_SCALE;
use crate::{CodecError, CommandDescriptor, FieldDescriptor, FieldEncoding, Percent};
use bytes::{Buf, BufMut};

/// A typed field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Unsigned integer.
    Unsigned(u32),
    /// Percentage.
    Percent(Percent),
    /// Raw byte.
    Raw(u8),
}

impl FieldValue {
    /// Short label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Unsigned(_) => "unsigned",
            FieldValue::Percent(_) => "percent",
            FieldValue::Raw(_) => "raw",
        }
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Unsigned(value)
    }
}

impl From<Percent> for FieldValue {
    fn from(value: Percent) -> Self {
        FieldValue::Percent(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Percent(p) => write!(f, "{}", p),
            FieldValue::Raw(b) => write!(f, "0x{:02X}", b),
        }
    }
}

/// Field values in insertion (or wire) order, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    entries: Vec<(String, FieldValue)>,
}

impl FieldValues {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any earlier value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of a field.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Value of an unsigned field.
    pub fn unsigned(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            FieldValue::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    /// Value of a percentage field.
    pub fn percent(&self, name: &str) -> Option<Percent> {
        match self.get(name)? {
            FieldValue::Percent(p) => Some(p),
            _ => None,
        }
    }

    /// Value of a raw field.
    pub fn raw(&self, name: &str) -> Option<u8> {
        match self.get(name)? {
            FieldValue::Raw(b) => Some(b),
            _ => None,
        }
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no values are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<FieldValue>> FromIterator<(N, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut values = FieldValues::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

/// Encode `values` into a frame of exactly `descriptor.frame_length` bytes.
///
/// Tags and padding are filled in; every value field must be supplied.
pub fn encode(descriptor: &CommandDescriptor, values: &FieldValues) -> Result<Vec<u8>, CodecError> {
    if let Some((name, _)) = values
        .iter()
        .find(|(name, _)| !descriptor.value_fields().any(|f| f.name == *name))
    {
        return Err(CodecError::UnexpectedField {
            command: descriptor.name.clone(),
            field: name.to_string(),
        });
    }

    let mut buf = Vec::with_capacity(descriptor.frame_length);
    for field in &descriptor.fields {
        match field.encoding {
            FieldEncoding::Tag(id) => buf.put_u8(id),
            FieldEncoding::Padding => buf.put_bytes(0, field.width),
            _ => {
                let value = values
                    .get(&field.name)
                    .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
                let raw = to_raw(field, value)?;
                buf.put_uint_le(u64::from(raw), field.width);
            }
        }
    }

    debug_assert_eq!(buf.len(), descriptor.frame_length);
    Ok(buf)
}

/// Decode a frame into its value fields, in wire order.
pub fn decode(descriptor: &CommandDescriptor, frame: &[u8]) -> Result<FieldValues, CodecError> {
    if frame.len() != descriptor.frame_length {
        return Err(CodecError::FrameLengthMismatch {
            command: descriptor.name.clone(),
            expected: descriptor.frame_length,
            actual: frame.len(),
        });
    }

    let mut buf = frame;
    let mut values = FieldValues::new();
    for field in &descriptor.fields {
        match field.encoding {
            FieldEncoding::Tag(expected) => {
                let actual = buf.get_u8();
                if actual != expected {
                    return Err(CodecError::TagMismatch {
                        command: descriptor.name.clone(),
                        expected,
                        actual,
                    });
                }
            }
            FieldEncoding::Padding => buf.advance(field.width),
            _ => {
                // Widths are at most 4 bytes, checked when the table is built.
                let raw = buf.get_uint_le(field.width) as u32;
                values.insert(field.name.clone(), from_raw(field, raw)?);
            }
        }
    }

    Ok(values)
}

/// Convert a value to the integer stored in the field.
fn to_raw(field: &FieldDescriptor, value: FieldValue) -> Result<u32, CodecError> {
    match (field.encoding, value) {
        (FieldEncoding::Unsigned, FieldValue::Unsigned(v)) => {
            if u64::from(v) > field.max_raw() {
                return Err(CodecError::FieldOutOfRange {
                    field: field.name.clone(),
                    value: u64::from(v),
                    max: field.max_raw(),
                });
            }
            Ok(v)
        }
        (FieldEncoding::Percent, FieldValue::Percent(p)) => {
            if !p.is_valid() {
                return Err(CodecError::FieldOutOfRange {
                    field: field.name.clone(),
                    value: u64::from(p.hundredths()),
                    max: u64::from(PERCENT_FULL_SCALE),
                });
            }
            if field.width == 1 {
                p.whole().ok_or_else(|| CodecError::PrecisionLoss {
                    field: field.name.clone(),
                    value: p.hundredths(),
                })
            } else {
                Ok(p.hundredths())
            }
        }
        (FieldEncoding::Raw, FieldValue::Raw(b)) => Ok(u32::from(b)),
        (encoding, value) => Err(CodecError::FieldTypeMismatch {
            field: field.name.clone(),
            expected: encoding.label(),
            actual: value.kind(),
        }),
    }
}

/// Convert a stored integer back to a typed value.
fn from_raw(field: &FieldDescriptor, raw: u32) -> Result<FieldValue, CodecError> {
    match field.encoding {
        FieldEncoding::Percent => {
            let (hundredths, max) = if field.width == 1 {
                (raw.saturating_mul(100), PERCENT_FULL_SCALE / 100)
            } else {
                (raw, PERCENT_FULL_SCALE)
            };
            if hundredths > PERCENT_FULL_SCALE {
                return Err(CodecError::FieldOutOfRange {
                    field: field.name.clone(),
                    value: u64::from(raw),
                    max: u64::from(max),
                });
            }
            Ok(FieldValue::Percent(Percent::from_hundredths(hundredths)))
        }
        FieldEncoding::Raw => Ok(FieldValue::Raw(raw as u8)),
        _ => Ok(FieldValue::Unsigned(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{CommandDef, FieldDef};
    use crate::{BusAddress, Direction, ProtocolVersion};

    fn ldu_state() -> CommandDescriptor {
        CommandDef::new(
            "LDU_STATE",
            BusAddress::Read,
            0x02,
            Direction::DeviceToHost,
            ProtocolVersion::V1_0,
        )
        .field(FieldDef::unsigned("current_ma", 2))
        .field(FieldDef::unsigned("voltage_dv", 2))
        .field(FieldDef::unsigned("motor_temp_c", 1))
        .field(FieldDef::unsigned("dcdc_temp_c", 1))
        .field(FieldDef::raw("direction"))
        .build()
        .unwrap()
    }

    fn charge_limit() -> CommandDescriptor {
        CommandDef::new(
            "SET_CHARGE_LIMIT",
            BusAddress::Write,
            0x01,
            Direction::WriteThenStatusRead,
            ProtocolVersion::V10_0,
        )
        .field(FieldDef::tag())
        .field(FieldDef::percent("limit", 1))
        .field(FieldDef::unsigned("max_current_da", 2))
        .field(FieldDef::padding(8))
        .build()
        .unwrap()
    }

    #[test]
    fn test_decode_little_endian() {
        let frame = [0x34, 0x12, 0x10, 0x0E, 45, 30, 0x02];
        let values = decode(&ldu_state(), &frame).unwrap();
        assert_eq!(values.unsigned("current_ma"), Some(0x1234));
        assert_eq!(values.unsigned("voltage_dv"), Some(3600));
        assert_eq!(values.unsigned("motor_temp_c"), Some(45));
        assert_eq!(values.raw("direction"), Some(0x02));
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn test_round_trip_mixed_fields() {
        let descriptor = ldu_state();
        let values = FieldValues::new()
            .with("current_ma", 1500u32)
            .with("voltage_dv", 3987u32)
            .with("motor_temp_c", 61u32)
            .with("dcdc_temp_c", 38u32)
            .with("direction", FieldValue::Raw(0x01));
        let frame = encode(&descriptor, &values).unwrap();
        assert_eq!(frame.len(), 7);
        assert_eq!(decode(&descriptor, &frame).unwrap(), values);
    }

    #[test]
    fn test_write_frame_layout() {
        let values = FieldValues::new()
            .with("limit", Percent::from_whole(80))
            .with("max_current_da", 320u32);
        let frame = encode(&charge_limit(), &values).unwrap();
        assert_eq!(
            frame,
            vec![0x01, 80, 0x40, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(decode(&charge_limit(), &frame).unwrap(), values);
    }

    #[test]
    fn test_percent_widths() {
        let descriptor = CommandDef::new(
            "P",
            BusAddress::Read,
            0x20,
            Direction::DeviceToHost,
            ProtocolVersion::V1_0,
        )
        .field(FieldDef::percent("coarse", 1))
        .field(FieldDef::percent("fine", 2))
        .build()
        .unwrap();

        let values = FieldValues::new()
            .with("coarse", Percent::from_whole(100))
            .with("fine", Percent::from_hundredths(4250));
        let frame = encode(&descriptor, &values).unwrap();
        assert_eq!(frame, vec![100, 0x9A, 0x10]);
        assert_eq!(decode(&descriptor, &frame).unwrap(), values);

        let err = encode(
            &descriptor,
            &FieldValues::new()
                .with("coarse", Percent::from_hundredths(4250))
                .with("fine", Percent::ZERO),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::PrecisionLoss { value: 4250, .. }));
    }

    #[test]
    fn test_percent_above_full_scale() {
        let values = FieldValues::new()
            .with("limit", Percent::from_whole(150))
            .with("max_current_da", 0u32);
        let err = encode(&charge_limit(), &values).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldOutOfRange {
                value: 15000,
                max: 10000,
                ..
            }
        ));

        let mut frame = [0u8; 12];
        frame[0] = 0x01;
        frame[1] = 101;
        let err = decode(&charge_limit(), &frame).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldOutOfRange {
                value: 101,
                max: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_value_exceeds_width() {
        let values = FieldValues::new()
            .with("limit", Percent::ZERO)
            .with("max_current_da", 70_000u32);
        let err = encode(&charge_limit(), &values).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldOutOfRange {
                field: "max_current_da".to_string(),
                value: 70_000,
                max: 0xFFFF,
            }
        );
    }

    #[test]
    fn test_missing_unexpected_and_mismatched_fields() {
        let err = encode(&charge_limit(), &FieldValues::new().with("limit", Percent::FULL))
            .unwrap_err();
        assert_eq!(err, CodecError::MissingField("max_current_da".to_string()));

        let err = encode(
            &charge_limit(),
            &FieldValues::new()
                .with("limit", Percent::FULL)
                .with("max_current_da", 1u32)
                .with("command_id", 1u32),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedField { .. }));

        let err = encode(
            &charge_limit(),
            &FieldValues::new()
                .with("limit", 80u32)
                .with("max_current_da", 1u32),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldTypeMismatch {
                expected: "percent",
                actual: "unsigned",
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let descriptor = ldu_state();
        for len in [0, 6, 8, 64] {
            let err = decode(&descriptor, &vec![0u8; len]).unwrap_err();
            assert_eq!(
                err,
                CodecError::FrameLengthMismatch {
                    command: "LDU_STATE".to_string(),
                    expected: 7,
                    actual: len,
                }
            );
        }
    }

    #[test]
    fn test_tag_mismatch() {
        let mut frame = [0u8; 12];
        frame[0] = 0x02;
        let err = decode(&charge_limit(), &frame).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TagMismatch {
                expected: 0x01,
                actual: 0x02,
                ..
            }
        ));
    }

    #[test]
    fn test_field_values_replace_in_place() {
        let mut values: FieldValues = [("a", 1u32), ("b", 2u32)].into_iter().collect();
        values.insert("a", 9u32);
        let order: Vec<&str> = values.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(values.unsigned("a"), Some(9));
        assert_eq!(values.percent("a"), None);
    }
}
