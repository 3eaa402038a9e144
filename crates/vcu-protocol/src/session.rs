//! Synchronous request/response session over a [`Transport`].

use crate::constants::*;
use crate::{
    BusAddress, Dispatch, Dispatcher, ErrorPayloadFrame, FieldValues, PendingRead,
    ProtocolError, SessionError, Transport, WriteRequest, WriteStatus,
};

/// Result of one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Values decoded from a read.
    Read(FieldValues),
    /// A write went out. Carries the status when the command reads one back.
    Written(Option<WriteStatus>),
}

/// Drives dispatched commands through a transport.
///
/// The session holds the transport mutably, so a write and its status read
/// always run back to back.
#[derive(Debug)]
pub struct Session<'t, T> {
    dispatcher: Dispatcher<'t>,
    transport: T,
}

impl<'t, T: Transport> Session<'t, T> {
    /// Create a session.
    pub fn new(dispatcher: Dispatcher<'t>, transport: T) -> Self {
        Session {
            dispatcher,
            transport,
        }
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<'t> {
        &self.dispatcher
    }

    /// The transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Dispatch and run one command.
    pub fn execute(
        &mut self,
        address: BusAddress,
        command_id: u8,
        payload: Option<&FieldValues>,
    ) -> Result<Outcome, SessionError<T::Error>> {
        match self.dispatcher.handle(address, command_id, payload)? {
            Dispatch::Read(read) => self.run_read(read).map(Outcome::Read),
            Dispatch::Write(write) => self.run_write(write).map(Outcome::Written),
        }
    }

    /// Read a command from the read address.
    pub fn read(&mut self, command_id: u8) -> Result<FieldValues, SessionError<T::Error>> {
        let read = self.dispatcher.handle_read(BusAddress::Read, command_id)?;
        self.run_read(read)
    }

    /// Send a write command.
    ///
    /// Goes to the write address from v10.0 on and to the shared address
    /// before it. Returns the status when the command reads one back.
    pub fn write(
        &mut self,
        command_id: u8,
        payload: &FieldValues,
    ) -> Result<Option<WriteStatus>, SessionError<T::Error>> {
        let address = if self.dispatcher.version().has_split_addresses() {
            BusAddress::Write
        } else {
            BusAddress::Read
        };
        let write = self.dispatcher.handle_write(address, command_id, payload)?;
        self.run_write(write)
    }

    fn run_read(&mut self, read: PendingRead<'t>) -> Result<FieldValues, SessionError<T::Error>> {
        log::debug!(
            "Reading {} ({} bytes) from {}",
            read.descriptor.name,
            read.expected_length(),
            read.address()
        );
        let bytes = self
            .transport
            .read(read.address(), read.expected_length())
            .map_err(SessionError::Transport)?;
        Ok(read.complete(&bytes)?)
    }

    fn run_write(
        &mut self,
        write: WriteRequest<'t>,
    ) -> Result<Option<WriteStatus>, SessionError<T::Error>> {
        log::debug!(
            "Writing {} to {}: {:02X?}",
            write.descriptor.name,
            write.address(),
            write.frame()
        );
        self.transport
            .write(write.address(), write.frame())
            .map_err(SessionError::Transport)?;

        let Some(pending) = write.status_read() else {
            return Ok(None);
        };
        let bytes = self
            .transport
            .read(pending.address(), pending.expected_length())
            .map_err(SessionError::Transport)?;
        let status = pending.complete(&bytes)?;
        log::debug!("{} returned {}", write.descriptor.name, status);
        Ok(Some(status))
    }

    /// Read the latched error list with whichever error command the active
    /// version has.
    pub fn read_errors(&mut self) -> Result<ErrorPayloadFrame, SessionError<T::Error>> {
        let command_id = match self.dispatcher.resolve(BusAddress::Read, VCU_I2C_ERR_PAYLOAD) {
            Ok(_) => VCU_I2C_ERR_PAYLOAD,
            Err(ProtocolError::UnknownCommand { .. }) => VCU_I2C_ERR_CODES,
            Err(err) => return Err(err.into()),
        };
        let values = self.read(command_id)?;
        Ok(ErrorPayloadFrame::from_decoded(&values))
    }
}
