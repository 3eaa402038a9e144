//! The bus transaction boundary.

use crate::BusAddress;

/// One I2C master, as seen by a [`Session`](crate::Session).
///
/// Implementations own the physical bus: addressing, clock stretching,
/// arbitration and retries. Every call is one complete bus transaction.
pub trait Transport {
    /// Transport failure, passed through to the caller untouched.
    type Error;

    /// Write `bytes` to the device at `address`.
    fn write(&mut self, address: BusAddress, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read `expected_length` bytes from the device at `address`.
    ///
    /// May return fewer or more bytes; the session rejects any length other
    /// than the one requested.
    fn read(&mut self, address: BusAddress, expected_length: usize)
        -> Result<Vec<u8>, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn write(&mut self, address: BusAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(address, bytes)
    }

    fn read(
        &mut self,
        address: BusAddress,
        expected_length: usize,
    ) -> Result<Vec<u8>, Self::Error> {
        (**self).read(address, expected_length)
    }
}
