//! Serde model of the command table document.
//!
//! A table lists every command revision the protocol ever had:
//!
//! ```yaml
//! commands:
//!   - name: INFO
//!     address: read
//!     id: 0x01
//!     direction: device_to_host
//!     introduced_in: "1.0"
//!     fields:
//!       - { name: major, encoding: unsigned }
//!       - { name: error, encoding: unsigned, width: 2, repeat: 64 }
//!       - { encoding: tag }
//!       - { encoding: padding, width: 10 }
//! ```
//!
//! `tag` fields are named `command_id` and carry the command id. Unnamed
//! padding is named `reserved_<offset>`. Repeated fields expand into
//! `<name>_<index>`.

use crate::schema::check_layout;
use crate::{
    BusAddress, CommandDescriptor, Direction, FieldDescriptor, FieldEncoding, ProtocolVersion,
    SchemaError, VersionRange,
};
use serde::{Deserialize, Serialize};

/// Name given to `tag` fields.
pub const TAG_FIELD_NAME: &str = "command_id";

/// Root of the command table document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandTableDef {
    /// Every command revision.
    pub commands: Vec<CommandDef>,
}

/// One revision of one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandDef {
    /// Command name, e.g. `SET_CHARGE_LIMIT`.
    pub name: String,
    /// Bus address.
    pub address: BusAddress,
    /// Command id.
    pub id: u8,
    /// Frame direction.
    pub direction: Direction,
    /// First version the revision is valid in.
    pub introduced_in: ProtocolVersion,
    /// First version the revision is no longer valid in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_in: Option<ProtocolVersion>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared frame length, checked against the fields when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_length: Option<usize>,
    /// Field layout in wire order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Encoding as written in the table document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingDef {
    /// Little-endian unsigned integer.
    Unsigned,
    /// Fixed-point percentage.
    Percent,
    /// Raw byte.
    Raw,
    /// Command id tag.
    Tag,
    /// Reserved zero bytes.
    Padding,
}

/// One field (or run of identical fields) in the table document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    /// Field name. Optional for `tag` and `padding`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Encoding.
    pub encoding: EncodingDef,
    /// Width in bytes of one field.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Number of consecutive copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<usize>,
}

fn default_width() -> usize {
    1
}

impl FieldDef {
    fn new(name: Option<&str>, encoding: EncodingDef, width: usize) -> Self {
        FieldDef {
            name: name.map(str::to_string),
            encoding,
            width,
            repeat: None,
        }
    }

    /// An unsigned integer field.
    pub fn unsigned(name: &str, width: usize) -> Self {
        Self::new(Some(name), EncodingDef::Unsigned, width)
    }

    /// A fixed-point percentage field.
    pub fn percent(name: &str, width: usize) -> Self {
        Self::new(Some(name), EncodingDef::Percent, width)
    }

    /// A raw byte field.
    pub fn raw(name: &str) -> Self {
        Self::new(Some(name), EncodingDef::Raw, 1)
    }

    /// The command id tag.
    pub fn tag() -> Self {
        Self::new(None, EncodingDef::Tag, 1)
    }

    /// Reserved zero bytes.
    pub fn padding(width: usize) -> Self {
        Self::new(None, EncodingDef::Padding, width)
    }

    /// Repeat this field `count` times.
    pub fn repeated(mut self, count: usize) -> Self {
        self.repeat = Some(count);
        self
    }
}

impl CommandDef {
    /// Start a command revision with no fields.
    pub fn new(
        name: &str,
        address: BusAddress,
        id: u8,
        direction: Direction,
        introduced_in: ProtocolVersion,
    ) -> Self {
        CommandDef {
            name: name.to_string(),
            address,
            id,
            direction,
            introduced_in,
            removed_in: None,
            description: None,
            frame_length: None,
            fields: Vec::new(),
        }
    }

    /// Close the revision's range.
    pub fn removed_in(mut self, version: ProtocolVersion) -> Self {
        self.removed_in = Some(version);
        self
    }

    /// Declare the expected frame length.
    pub fn frame_length(mut self, length: usize) -> Self {
        self.frame_length = Some(length);
        self
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Expand the fields, compute offsets, and check the per-descriptor
    /// invariants.
    pub fn build(self) -> Result<CommandDescriptor, SchemaError> {
        let range = VersionRange {
            introduced_in: self.introduced_in,
            removed_in: self.removed_in,
        };
        if range.is_empty() {
            return Err(SchemaError::EmptyRange {
                command: self.name,
                range,
            });
        }

        let mut fields = Vec::new();
        let mut offset = 0usize;

        for def in &self.fields {
            let count = def.repeat.unwrap_or(1);
            for index in 0..count {
                let encoding = match def.encoding {
                    EncodingDef::Unsigned => FieldEncoding::Unsigned,
                    EncodingDef::Percent => FieldEncoding::Percent,
                    EncodingDef::Raw => FieldEncoding::Raw,
                    EncodingDef::Tag => FieldEncoding::Tag(self.id),
                    EncodingDef::Padding => FieldEncoding::Padding,
                };

                let base = match (&def.name, def.encoding) {
                    (Some(name), _) => name.clone(),
                    (None, EncodingDef::Tag) => TAG_FIELD_NAME.to_string(),
                    (None, EncodingDef::Padding) => format!("reserved_{}", offset),
                    (None, _) => {
                        return Err(SchemaError::UnnamedField {
                            command: self.name.clone(),
                            offset,
                        })
                    }
                };
                let name = if def.repeat.is_some() {
                    format!("{}_{}", base, index)
                } else {
                    base
                };

                fields.push(FieldDescriptor {
                    name,
                    width: def.width,
                    encoding,
                    offset,
                });
                offset += def.width;
            }
        }

        if let Some(declared) = self.frame_length {
            if declared != offset {
                return Err(SchemaError::FrameLengthMismatch {
                    command: self.name,
                    declared,
                    actual: offset,
                });
            }
        }

        let descriptor = CommandDescriptor {
            name: self.name,
            address: self.address,
            command_id: self.id,
            direction: self.direction,
            range,
            frame_length: offset,
            fields,
            description: self.description,
        };
        check_layout(&descriptor)?;
        Ok(descriptor)
    }
}
