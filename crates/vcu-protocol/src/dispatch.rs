//! Version-aware command dispatch.
//!
//! The dispatcher turns a `(bus address, command id, payload)` request into
//! either an encoded write frame or a pending read, after checking the
//! command against the schema table at the active protocol version.

use crate::constants::STATUS_FRAME_SIZE;
use crate::{
    codec, BusAddress, CodecError, CommandDescriptor, DispatchConfig, FieldValues, Lookup,
    ProtocolError, ProtocolVersion, SchemaTable, WriteStatus,
};

/// Resolves requests against a [`SchemaTable`] at a fixed protocol version.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'t> {
    table: &'t SchemaTable,
    version: ProtocolVersion,
}

/// What the caller must do on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<'t> {
    /// Write a frame, then maybe read a status byte.
    Write(WriteRequest<'t>),
    /// Read a frame.
    Read(PendingRead<'t>),
}

/// An encoded write frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest<'t> {
    /// Descriptor the frame was encoded with.
    pub descriptor: &'t CommandDescriptor,
    frame: Vec<u8>,
}

/// A read the caller still has to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRead<'t> {
    /// Descriptor of the frame to read.
    pub descriptor: &'t CommandDescriptor,
}

/// The status read that follows a write-then-status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStatus<'t> {
    /// Descriptor of the write.
    pub descriptor: &'t CommandDescriptor,
}

impl<'t> Dispatcher<'t> {
    /// Create a dispatcher. Without a configured version, the newest version
    /// in the table is used.
    pub fn new(table: &'t SchemaTable, config: &DispatchConfig) -> Self {
        let version = config
            .version
            .or_else(|| table.latest_version())
            .unwrap_or(ProtocolVersion::DUAL_ADDRESS_SPLIT);
        Dispatcher { table, version }
    }

    /// Create a dispatcher for an explicit version.
    pub fn at_version(table: &'t SchemaTable, version: ProtocolVersion) -> Self {
        Dispatcher { table, version }
    }

    /// The active protocol version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The schema table.
    pub fn table(&self) -> &'t SchemaTable {
        self.table
    }

    /// Resolve a command at the active version.
    pub fn resolve(
        &self,
        address: BusAddress,
        command_id: u8,
    ) -> Result<&'t CommandDescriptor, ProtocolError> {
        self.resolve_at(address, command_id, self.version)
    }

    /// Resolve a command at `version`.
    pub fn resolve_at(
        &self,
        address: BusAddress,
        command_id: u8,
        version: ProtocolVersion,
    ) -> Result<&'t CommandDescriptor, ProtocolError> {
        match self.table.schema_for(address, command_id, version) {
            Lookup::Found(descriptor) => Ok(descriptor),
            Lookup::Removed { retired_in, .. } => Err(ProtocolError::RemovedCommand {
                address,
                command_id,
                removed_in: retired_in,
            }),
            Lookup::Unknown => {
                let other = address.other();
                match self.table.schema_for(other, command_id, version) {
                    Lookup::Found(_) => Err(ProtocolError::WrongBusAddress {
                        command_id,
                        requested: address,
                        expected: other,
                        version,
                    }),
                    _ => Err(ProtocolError::UnknownCommand {
                        address,
                        command_id,
                        version,
                    }),
                }
            }
        }
    }

    /// Check that `command_id` may be issued on `address`, without encoding
    /// anything.
    pub fn validate_address(&self, address: BusAddress, command_id: u8) -> Result<(), ProtocolError> {
        self.resolve(address, command_id).map(|_| ())
    }

    /// Dispatch a request at the active version.
    pub fn handle(
        &self,
        address: BusAddress,
        command_id: u8,
        payload: Option<&FieldValues>,
    ) -> Result<Dispatch<'t>, ProtocolError> {
        self.handle_at(address, command_id, payload, self.version)
    }

    /// Dispatch a request at `version`.
    ///
    /// Writes need a payload and come back encoded. Reads must not carry one.
    pub fn handle_at(
        &self,
        address: BusAddress,
        command_id: u8,
        payload: Option<&FieldValues>,
        version: ProtocolVersion,
    ) -> Result<Dispatch<'t>, ProtocolError> {
        let descriptor = self.resolve_at(address, command_id, version)?;
        match payload {
            None => read_for(descriptor).map(Dispatch::Read),
            Some(payload) => write_for(descriptor, payload).map(Dispatch::Write),
        }
    }

    /// Dispatch a read at the active version. A write command is rejected
    /// with `MissingPayload`.
    pub fn handle_read(
        &self,
        address: BusAddress,
        command_id: u8,
    ) -> Result<PendingRead<'t>, ProtocolError> {
        read_for(self.resolve(address, command_id)?)
    }

    /// Dispatch and encode a write at the active version. A read command is
    /// rejected with `UnexpectedPayload`.
    pub fn handle_write(
        &self,
        address: BusAddress,
        command_id: u8,
        payload: &FieldValues,
    ) -> Result<WriteRequest<'t>, ProtocolError> {
        write_for(self.resolve(address, command_id)?, payload)
    }

    /// Whether `address` only carries reads at the active version.
    pub fn is_read_only(&self, address: BusAddress) -> bool {
        address == BusAddress::Read && self.version.has_split_addresses()
    }

    /// Whether `address` only carries writes at the active version.
    pub fn is_write_only(&self, address: BusAddress) -> bool {
        address == BusAddress::Write && self.version.has_split_addresses()
    }
}

fn read_for(descriptor: &CommandDescriptor) -> Result<PendingRead<'_>, ProtocolError> {
    if descriptor.direction.is_write() {
        return Err(ProtocolError::MissingPayload {
            command: descriptor.name.clone(),
        });
    }
    Ok(PendingRead { descriptor })
}

fn write_for<'t>(
    descriptor: &'t CommandDescriptor,
    payload: &FieldValues,
) -> Result<WriteRequest<'t>, ProtocolError> {
    if !descriptor.direction.is_write() {
        return Err(ProtocolError::UnexpectedPayload {
            command: descriptor.name.clone(),
        });
    }
    let frame = codec::encode(descriptor, payload)?;
    Ok(WriteRequest { descriptor, frame })
}

impl<'t> Dispatch<'t> {
    /// Descriptor of the dispatched command.
    pub fn descriptor(&self) -> &'t CommandDescriptor {
        match self {
            Dispatch::Write(write) => write.descriptor,
            Dispatch::Read(read) => read.descriptor,
        }
    }
}

impl<'t> WriteRequest<'t> {
    /// The encoded frame.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Take the encoded frame.
    pub fn into_frame(self) -> Vec<u8> {
        self.frame
    }

    /// Bus address the frame goes to.
    pub fn address(&self) -> BusAddress {
        self.descriptor.address
    }

    /// Whether a status byte must be read after the write.
    pub fn expects_status(&self) -> bool {
        self.descriptor.direction.expects_status()
    }

    /// The status read to perform after the write, if any.
    pub fn status_read(&self) -> Option<PendingStatus<'t>> {
        self.expects_status().then_some(PendingStatus {
            descriptor: self.descriptor,
        })
    }
}

impl<'t> PendingRead<'t> {
    /// Bus address to read from.
    pub fn address(&self) -> BusAddress {
        self.descriptor.address
    }

    /// Number of bytes to read.
    pub fn expected_length(&self) -> usize {
        self.descriptor.frame_length
    }

    /// Decode the bytes read from the bus.
    pub fn complete(&self, bytes: &[u8]) -> Result<FieldValues, ProtocolError> {
        Ok(codec::decode(self.descriptor, bytes)?)
    }
}

impl<'t> PendingStatus<'t> {
    /// Bus address the status is read from. The status comes back on the
    /// address the write went to.
    pub fn address(&self) -> BusAddress {
        self.descriptor.address
    }

    /// Number of bytes to read.
    pub fn expected_length(&self) -> usize {
        STATUS_FRAME_SIZE
    }

    /// Decode the status reply.
    pub fn complete(&self, bytes: &[u8]) -> Result<WriteStatus, ProtocolError> {
        match bytes {
            [status] => Ok(WriteStatus::from(*status)),
            _ => Err(CodecError::FrameLengthMismatch {
                command: self.descriptor.name.clone(),
                expected: STATUS_FRAME_SIZE,
                actual: bytes.len(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::Percent;

    fn dispatcher(version: ProtocolVersion) -> Dispatcher<'static> {
        Dispatcher::at_version(SchemaTable::builtin(), version)
    }

    #[test]
    fn test_default_version_is_latest() {
        let d = Dispatcher::new(SchemaTable::builtin(), &DispatchConfig::default());
        assert_eq!(d.version(), ProtocolVersion::V10_0);
        let d = Dispatcher::new(
            SchemaTable::builtin(),
            &DispatchConfig::with_version(ProtocolVersion::V1_2),
        );
        assert_eq!(d.version(), ProtocolVersion::V1_2);
    }

    #[test]
    fn test_read_dispatch() {
        let d = dispatcher(ProtocolVersion::V10_0);
        let Dispatch::Read(read) = d.handle(BusAddress::Read, VCU_I2C_INFO, None).unwrap() else {
            panic!("expected a read");
        };
        assert_eq!(read.expected_length(), 4);
        let values = read.complete(&[10, 0, 3, 1]).unwrap();
        assert_eq!(values.unsigned("major"), Some(10));
        assert_eq!(values.unsigned("bms_type"), Some(1));
    }

    #[test]
    fn test_write_dispatch_with_status() {
        let d = dispatcher(ProtocolVersion::V10_0);
        let payload = FieldValues::new().with("duty", Percent::from_whole(55));
        let Dispatch::Write(write) = d
            .handle(BusAddress::Write, VCU_WRITE_SET_PUMP_DUTY, Some(&payload))
            .unwrap()
        else {
            panic!("expected a write");
        };
        assert_eq!(write.frame()[..2], [0x00, 55]);
        assert_eq!(write.frame().len(), WRITE_FRAME_SIZE);

        let status = write.status_read().unwrap();
        assert_eq!(status.address(), BusAddress::Write);
        assert_eq!(status.complete(&[0x01]).unwrap(), WriteStatus::InvalidParameter);
        assert!(matches!(
            status.complete(&[0x00, 0x00]),
            Err(ProtocolError::Codec(CodecError::FrameLengthMismatch { actual: 2, .. }))
        ));
        assert!(status.complete(&[]).is_err());
    }

    #[test]
    fn test_reboot_has_no_status() {
        let d = dispatcher(ProtocolVersion::V10_0);
        let dispatch = d
            .handle(BusAddress::Write, VCU_WRITE_REBOOT, Some(&FieldValues::new()))
            .unwrap();
        let Dispatch::Write(write) = dispatch else {
            panic!("expected a write");
        };
        assert!(!write.expects_status());
        assert!(write.status_read().is_none());
        assert_eq!(write.into_frame(), {
            let mut frame = vec![0u8; WRITE_FRAME_SIZE];
            frame[0] = VCU_WRITE_REBOOT;
            frame
        });
    }

    #[test]
    fn test_payload_presence_enforced() {
        let d = dispatcher(ProtocolVersion::V10_0);
        assert!(matches!(
            d.handle(BusAddress::Write, VCU_WRITE_CLEAR_ERRORS, None),
            Err(ProtocolError::MissingPayload { .. })
        ));
        assert!(matches!(
            d.handle(BusAddress::Read, VCU_I2C_INFO, Some(&FieldValues::new())),
            Err(ProtocolError::UnexpectedPayload { .. })
        ));
    }

    #[test]
    fn test_removed_and_unknown() {
        let d = dispatcher(ProtocolVersion::V10_0);
        assert_eq!(
            d.resolve(BusAddress::Read, VCU_I2C_LEGACY_SET_CHARGE_LIMIT),
            Err(ProtocolError::RemovedCommand {
                address: BusAddress::Read,
                command_id: 0x0C,
                removed_in: ProtocolVersion::V10_0,
            })
        );
        assert!(matches!(
            d.resolve(BusAddress::Read, 0x42),
            Err(ProtocolError::UnknownCommand { command_id: 0x42, .. })
        ));

        // Introduced later is unknown, not removed.
        let old = dispatcher(ProtocolVersion::V1_0);
        assert!(matches!(
            old.resolve(BusAddress::Read, VCU_I2C_BMS_SUMMARY),
            Err(ProtocolError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_wrong_bus_address() {
        let d = dispatcher(ProtocolVersion::V10_0);
        // 0x0D is a read.
        assert_eq!(
            d.validate_address(BusAddress::Write, VCU_I2C_SYSTEM_DIAGNOSTICS),
            Err(ProtocolError::WrongBusAddress {
                command_id: 0x0D,
                requested: BusAddress::Write,
                expected: BusAddress::Read,
                version: ProtocolVersion::V10_0,
            })
        );
        assert!(d.validate_address(BusAddress::Read, VCU_I2C_INFO).is_ok());
    }

    #[test]
    fn test_address_predicates() {
        let new = dispatcher(ProtocolVersion::V10_0);
        assert!(new.is_read_only(BusAddress::Read));
        assert!(new.is_write_only(BusAddress::Write));
        assert!(!new.is_read_only(BusAddress::Write));

        let old = dispatcher(ProtocolVersion::V1_2);
        assert!(!old.is_read_only(BusAddress::Read));
        assert!(!old.is_write_only(BusAddress::Write));
    }

    #[test]
    fn test_legacy_write_before_split() {
        let d = dispatcher(ProtocolVersion::V1_2);
        let payload = FieldValues::new().with("limit", Percent::from_whole(90));
        let dispatch = d
            .handle(BusAddress::Read, VCU_I2C_LEGACY_SET_CHARGE_LIMIT, Some(&payload))
            .unwrap();
        let Dispatch::Write(write) = dispatch else {
            panic!("expected a write");
        };
        assert_eq!(write.address(), BusAddress::Read);
        assert_eq!(write.frame(), &[0x0C, 90]);
        assert!(!write.expects_status());
    }
}
