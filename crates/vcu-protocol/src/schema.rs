//! The version-aware payload schema table.

use crate::constants::*;
use crate::definitions::CommandTableDef;
use crate::{BusAddress, Direction, ProtocolVersion, SchemaError, VersionRange};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

/// The command table shipped with the crate.
pub const BUILTIN_COMMANDS: &str = include_str!("../schema/commands.yaml");

/// How a field's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldEncoding {
    /// Little-endian unsigned integer of 1, 2, or 4 bytes.
    Unsigned,
    /// Fixed-point percentage. One byte carries whole percent, two or four
    /// bytes carry hundredths of a percent.
    Percent,
    /// A single uninterpreted byte.
    Raw,
    /// Constant command id byte at the head of a write frame.
    Tag(u8),
    /// Reserved bytes, zero on the wire.
    Padding,
}

impl FieldEncoding {
    /// Whether callers supply and receive a value for this field.
    pub fn carries_value(&self) -> bool {
        matches!(
            self,
            FieldEncoding::Unsigned | FieldEncoding::Percent | FieldEncoding::Raw
        )
    }

    /// Whether a field of this encoding may be `width` bytes wide.
    pub fn allows_width(&self, width: usize) -> bool {
        match self {
            FieldEncoding::Unsigned | FieldEncoding::Percent => matches!(width, 1 | 2 | 4),
            FieldEncoding::Raw | FieldEncoding::Tag(_) => width == 1,
            FieldEncoding::Padding => width >= 1,
        }
    }

    /// Short label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldEncoding::Unsigned => "unsigned",
            FieldEncoding::Percent => "percent",
            FieldEncoding::Raw => "raw",
            FieldEncoding::Tag(_) => "tag",
            FieldEncoding::Padding => "padding",
        }
    }
}

/// One field of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, unique within the descriptor.
    pub name: String,
    /// Width in bytes.
    pub width: usize,
    /// Encoding.
    pub encoding: FieldEncoding,
    /// Byte offset within the frame.
    pub offset: usize,
}

impl FieldDescriptor {
    /// Byte range within the frame.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }

    /// Largest raw integer the field's bytes can hold.
    pub fn max_raw(&self) -> u64 {
        if self.width >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }
}

/// One revision of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Command name.
    pub name: String,
    /// Bus address.
    pub address: BusAddress,
    /// Command id.
    pub command_id: u8,
    /// Frame direction.
    pub direction: Direction,
    /// Versions the revision is valid in.
    pub range: VersionRange,
    /// Frame length, equal to the sum of field widths.
    pub frame_length: usize,
    /// Fields in wire order, covering the frame without gaps.
    pub fields: Vec<FieldDescriptor>,
    /// Free-text description.
    pub description: Option<String>,
}

impl CommandDescriptor {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that carry a value.
    pub fn value_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.encoding.carries_value())
    }

    /// Whether the revision is valid in `version`.
    pub fn is_live_at(&self, version: ProtocolVersion) -> bool {
        self.range.contains(version)
    }

    /// The `(address, id)` key.
    pub fn key(&self) -> (BusAddress, u8) {
        (self.address, self.command_id)
    }
}

impl std::fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (0x{:02X} on {}, {} bytes, {})",
            self.name, self.command_id, self.address, self.frame_length, self.range
        )
    }
}

/// Result of a schema lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// A descriptor is live at the requested version.
    Found(&'a CommandDescriptor),
    /// The key existed but its last revision was retired.
    Removed {
        /// Version the last revision was retired in.
        retired_in: ProtocolVersion,
        /// The retired revision.
        last: &'a CommandDescriptor,
    },
    /// No revision was ever valid at or before the requested version.
    Unknown,
}

impl<'a> Lookup<'a> {
    /// The descriptor, if found.
    pub fn found(self) -> Option<&'a CommandDescriptor> {
        match self {
            Lookup::Found(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Every command revision, indexed by `(address, id)`.
///
/// Immutable once built, so it can be shared between threads without locking.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    /// Revisions per key, sorted by `introduced_in`.
    entries: HashMap<(BusAddress, u8), Vec<CommandDescriptor>>,
    /// Every version at which some range opens or closes.
    versions: BTreeSet<ProtocolVersion>,
}

impl SchemaTable {
    /// The table built from [`BUILTIN_COMMANDS`].
    ///
    /// # Panics
    ///
    /// Panics if the embedded table is inconsistent. That is a build defect and
    /// must abort startup.
    pub fn builtin() -> &'static SchemaTable {
        static BUILTIN: OnceLock<SchemaTable> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            SchemaTable::from_yaml_str(BUILTIN_COMMANDS)
                .unwrap_or_else(|e| panic!("embedded command table is invalid: {}", e))
        })
    }

    /// Build a table from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let def: CommandTableDef = serde_yaml::from_str(yaml)?;
        Self::from_definitions(def)
    }

    /// Build a table from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Build a table from parsed definitions.
    pub fn from_definitions(def: CommandTableDef) -> Result<Self, SchemaError> {
        let descriptors = def
            .commands
            .into_iter()
            .map(|command| command.build())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_descriptors(descriptors)
    }

    /// Build a table from descriptors, checking each descriptor's layout and
    /// address rules and the cross-descriptor invariants.
    pub fn from_descriptors(descriptors: Vec<CommandDescriptor>) -> Result<Self, SchemaError> {
        let mut entries: HashMap<(BusAddress, u8), Vec<CommandDescriptor>> = HashMap::new();
        let mut versions = BTreeSet::new();

        for descriptor in descriptors {
            check_descriptor(&descriptor)?;
            versions.insert(descriptor.range.introduced_in);
            if let Some(end) = descriptor.range.removed_in {
                versions.insert(end);
            }
            entries.entry(descriptor.key()).or_default().push(descriptor);
        }

        for ((address, command_id), revisions) in entries.iter_mut() {
            revisions.sort_by_key(|d| d.range.introduced_in);
            for pair in revisions.windows(2) {
                let (first, second) = (&pair[0], &pair[1]);
                if first.range.overlaps(&second.range) {
                    return Err(SchemaError::RangeCollision {
                        address: *address,
                        command_id: *command_id,
                        first: first.name.clone(),
                        first_range: first.range,
                        second: second.name.clone(),
                        second_range: second.range,
                    });
                }
            }
        }

        let table = SchemaTable { entries, versions };
        log::info!(
            "Built command table: {} revisions of {} commands across {} versions",
            table.len(),
            table.entries.len(),
            table.versions.len()
        );
        Ok(table)
    }

    /// Resolve `(address, command_id)` at `version`.
    pub fn schema_for(
        &self,
        address: BusAddress,
        command_id: u8,
        version: ProtocolVersion,
    ) -> Lookup<'_> {
        let Some(revisions) = self.entries.get(&(address, command_id)) else {
            return Lookup::Unknown;
        };

        if let Some(descriptor) = revisions.iter().find(|d| d.is_live_at(version)) {
            return Lookup::Found(descriptor);
        }

        revisions
            .iter()
            .filter(|d| d.range.is_retired_at(version))
            .filter_map(|d| d.range.removed_in.map(|end| (end, d)))
            .max_by_key(|(end, _)| *end)
            .map_or(Lookup::Unknown, |(retired_in, last)| Lookup::Removed {
                retired_in,
                last,
            })
    }

    /// Every revision of one key, oldest first.
    pub fn history(&self, address: BusAddress, command_id: u8) -> &[CommandDescriptor] {
        self.entries
            .get(&(address, command_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All descriptors live at `version`, ordered by address then id.
    pub fn commands_at(&self, version: ProtocolVersion) -> Vec<&CommandDescriptor> {
        let mut live: Vec<&CommandDescriptor> = self
            .entries
            .values()
            .flatten()
            .filter(|d| d.is_live_at(version))
            .collect();
        live.sort_by_key(|d| d.key());
        live
    }

    /// The live descriptor called `name` at `version`.
    pub fn find_by_name(&self, name: &str, version: ProtocolVersion) -> Option<&CommandDescriptor> {
        self.entries
            .values()
            .flatten()
            .find(|d| d.name == name && d.is_live_at(version))
    }

    /// Every version at which the table changes, ascending.
    pub fn versions(&self) -> impl Iterator<Item = ProtocolVersion> + '_ {
        self.versions.iter().copied()
    }

    /// The newest version the table knows about.
    pub fn latest_version(&self) -> Option<ProtocolVersion> {
        self.versions.last().copied()
    }

    /// Total number of revisions.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Address and layout rules that apply to a single descriptor.
/// Field layout rules: every field has a width its encoding allows, names are
/// unique, and the fields tile `[0, frame_length)` in order without gaps or
/// overlap.
pub(crate) fn check_layout(descriptor: &CommandDescriptor) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    let mut offset = 0usize;
    for field in &descriptor.fields {
        if !field.encoding.allows_width(field.width) {
            return Err(SchemaError::InvalidFieldWidth {
                command: descriptor.name.clone(),
                field: field.name.clone(),
                width: field.width,
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                command: descriptor.name.clone(),
                field: field.name.clone(),
            });
        }
        if field.offset != offset {
            return Err(SchemaError::MisplacedField {
                command: descriptor.name.clone(),
                field: field.name.clone(),
                offset: field.offset,
                expected: offset,
            });
        }
        offset += field.width;
    }

    if offset != descriptor.frame_length {
        return Err(SchemaError::FrameLengthMismatch {
            command: descriptor.name.clone(),
            declared: descriptor.frame_length,
            actual: offset,
        });
    }
    Ok(())
}

fn check_descriptor(descriptor: &CommandDescriptor) -> Result<(), SchemaError> {
    let range = descriptor.range;
    if range.is_empty() {
        return Err(SchemaError::EmptyRange {
            command: descriptor.name.clone(),
            range,
        });
    }
    check_layout(descriptor)?;

    let address_ok = match (descriptor.address, descriptor.direction.is_write()) {
        (BusAddress::Read, false) => true,
        // Writes shared the read address until the split and must be retired
        // by then.
        (BusAddress::Read, true) => range
            .removed_in
            .is_some_and(|end| end <= ProtocolVersion::DUAL_ADDRESS_SPLIT),
        (BusAddress::Write, true) => range.introduced_in.has_split_addresses(),
        (BusAddress::Write, false) => false,
    };
    if !address_ok {
        return Err(SchemaError::AddressDirectionMismatch {
            command: descriptor.name.clone(),
            address: descriptor.address,
            direction: descriptor.direction,
            range,
        });
    }

    if descriptor.address == BusAddress::Write {
        if descriptor.frame_length != WRITE_FRAME_SIZE {
            return Err(SchemaError::WriteFrameLayout {
                command: descriptor.name.clone(),
                detail: format!(
                    "frame is {} bytes, write frames are {}",
                    descriptor.frame_length, WRITE_FRAME_SIZE
                ),
            });
        }
        let tagged = descriptor
            .fields
            .first()
            .is_some_and(|f| f.encoding == FieldEncoding::Tag(descriptor.command_id));
        if !tagged {
            return Err(SchemaError::WriteFrameLayout {
                command: descriptor.name.clone(),
                detail: "first field must be the command id tag".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{CommandDef, FieldDef};

    fn read_cmd(name: &str, id: u8, from: ProtocolVersion) -> CommandDef {
        CommandDef::new(name, BusAddress::Read, id, Direction::DeviceToHost, from)
            .field(FieldDef::unsigned("value", 2))
    }

    #[test]
    fn test_supersession_at_same_key() {
        let table = SchemaTable::from_definitions(CommandTableDef {
            commands: vec![
                read_cmd("OLD", 0x07, ProtocolVersion::V1_2).removed_in(ProtocolVersion::V10_0),
                read_cmd("NEW", 0x07, ProtocolVersion::V10_0),
            ],
        })
        .unwrap();

        let at = |v| table.schema_for(BusAddress::Read, 0x07, v).found().map(|d| d.name.clone());
        assert_eq!(at(ProtocolVersion::V1_2).as_deref(), Some("OLD"));
        assert_eq!(at(ProtocolVersion::V10_0).as_deref(), Some("NEW"));
        assert_eq!(table.schema_for(BusAddress::Read, 0x07, ProtocolVersion::V1_0), Lookup::Unknown);
        assert_eq!(table.history(BusAddress::Read, 0x07).len(), 2);
    }

    #[test]
    fn test_overlapping_ranges_collide() {
        let err = SchemaTable::from_definitions(CommandTableDef {
            commands: vec![
                read_cmd("OLD", 0x07, ProtocolVersion::V1_0),
                read_cmd("NEW", 0x07, ProtocolVersion::V10_0),
            ],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RangeCollision {
                command_id: 0x07,
                ..
            }
        ));
    }

    #[test]
    fn test_read_command_on_write_address_rejected() {
        let def = CommandDef::new(
            "BAD",
            BusAddress::Write,
            0x05,
            Direction::DeviceToHost,
            ProtocolVersion::V10_0,
        )
        .field(FieldDef::unsigned("value", 1));
        let err = SchemaTable::from_definitions(CommandTableDef {
            commands: vec![def],
        })
        .unwrap_err();
        assert!(matches!(err, SchemaError::AddressDirectionMismatch { .. }));
    }

    #[test]
    fn test_legacy_write_must_retire_at_split() {
        let def = CommandDef::new(
            "LEGACY",
            BusAddress::Read,
            0x0C,
            Direction::HostToDevice,
            ProtocolVersion::V1_0,
        )
        .field(FieldDef::tag())
        .field(FieldDef::percent("limit", 1));
        let err = SchemaTable::from_definitions(CommandTableDef {
            commands: vec![def],
        })
        .unwrap_err();
        assert!(matches!(err, SchemaError::AddressDirectionMismatch { .. }));
    }

    #[test]
    fn test_write_frame_layout_enforced() {
        let short = CommandDef::new(
            "SHORT",
            BusAddress::Write,
            0x01,
            Direction::WriteThenStatusRead,
            ProtocolVersion::V10_0,
        )
        .field(FieldDef::tag())
        .field(FieldDef::padding(3));
        let err = SchemaTable::from_definitions(CommandTableDef {
            commands: vec![short],
        })
        .unwrap_err();
        assert!(matches!(err, SchemaError::WriteFrameLayout { .. }));

        let untagged = CommandDef::new(
            "UNTAGGED",
            BusAddress::Write,
            0x01,
            Direction::WriteThenStatusRead,
            ProtocolVersion::V10_0,
        )
        .field(FieldDef::padding(12));
        let err = SchemaTable::from_definitions(CommandTableDef {
            commands: vec![untagged],
        })
        .unwrap_err();
        assert!(matches!(err, SchemaError::WriteFrameLayout { .. }));
    }

    fn raw_descriptor(fields: Vec<FieldDescriptor>, frame_length: usize) -> CommandDescriptor {
        CommandDescriptor {
            name: "HAND_BUILT".to_string(),
            address: BusAddress::Read,
            command_id: 0x30,
            direction: Direction::DeviceToHost,
            range: VersionRange::since(ProtocolVersion::V1_0),
            frame_length,
            fields,
            description: None,
        }
    }

    fn unsigned_at(name: &str, width: usize, offset: usize) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            width,
            encoding: FieldEncoding::Unsigned,
            offset,
        }
    }

    #[test]
    fn test_hand_built_descriptors_are_checked() {
        let err = SchemaTable::from_descriptors(vec![raw_descriptor(
            vec![unsigned_at("wide", 9, 0)],
            9,
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFieldWidth { width: 9, .. }));

        let err = SchemaTable::from_descriptors(vec![raw_descriptor(
            vec![unsigned_at("a", 2, 0), unsigned_at("b", 2, 0)],
            4,
        )])
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MisplacedField {
                offset: 0,
                expected: 2,
                ..
            }
        ));

        let err = SchemaTable::from_descriptors(vec![raw_descriptor(
            vec![unsigned_at("a", 1, 0), unsigned_at("a", 1, 1)],
            2,
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));

        let err = SchemaTable::from_descriptors(vec![raw_descriptor(
            vec![unsigned_at("a", 2, 0)],
            3,
        )])
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::FrameLengthMismatch {
                declared: 3,
                actual: 2,
                ..
            }
        ));

        let mut empty = raw_descriptor(vec![unsigned_at("a", 1, 0)], 1);
        empty.range = VersionRange::between(ProtocolVersion::V1_2, ProtocolVersion::V1_0);
        assert!(matches!(
            SchemaTable::from_descriptors(vec![empty]).unwrap_err(),
            SchemaError::EmptyRange { .. }
        ));

        let table = SchemaTable::from_descriptors(vec![raw_descriptor(
            vec![unsigned_at("a", 4, 0), unsigned_at("b", 2, 4)],
            6,
        )])
        .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_max_raw() {
        let field = |width| FieldDescriptor {
            name: "f".to_string(),
            width,
            encoding: FieldEncoding::Unsigned,
            offset: 0,
        };
        assert_eq!(field(1).max_raw(), 0xFF);
        assert_eq!(field(2).max_raw(), 0xFFFF);
        assert_eq!(field(4).max_raw(), 0xFFFF_FFFF);
    }
}
