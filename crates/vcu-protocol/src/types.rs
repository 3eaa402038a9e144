//! Common types used in the protocol.

use crate::constants::*;
use serde::{Deserialize, Serialize};

/// The bus address a command is issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusAddress {
    /// Read address. Also the only address before v10.0.
    Read,
    /// Write address (v10.0+).
    Write,
}

impl BusAddress {
    /// The 7-bit I2C address.
    pub fn i2c_address(&self) -> u8 {
        match self {
            BusAddress::Read => READ_ADDRESS,
            BusAddress::Write => WRITE_ADDRESS,
        }
    }

    /// Map a 7-bit I2C address back to a bus address.
    pub fn from_i2c_address(address: u8) -> Option<Self> {
        match address {
            READ_ADDRESS => Some(BusAddress::Read),
            WRITE_ADDRESS => Some(BusAddress::Write),
            _ => None,
        }
    }

    /// The other address.
    pub fn other(&self) -> Self {
        match self {
            BusAddress::Read => BusAddress::Write,
            BusAddress::Write => BusAddress::Read,
        }
    }
}

impl std::fmt::Display for BusAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusAddress::Read => write!(f, "read (0x{:02X})", READ_ADDRESS),
            BusAddress::Write => write!(f, "write (0x{:02X})", WRITE_ADDRESS),
        }
    }
}

/// Which way a command's frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The host reads a frame from the VCU.
    DeviceToHost,
    /// The host writes a frame and reads nothing back.
    HostToDevice,
    /// The host writes a frame, then reads a 1-byte status.
    WriteThenStatusRead,
}

impl Direction {
    /// Whether the host sends the frame.
    pub fn is_write(&self) -> bool {
        !matches!(self, Direction::DeviceToHost)
    }

    /// Whether a status byte is read back after the frame.
    pub fn expects_status(&self) -> bool {
        matches!(self, Direction::WriteThenStatusRead)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::DeviceToHost => write!(f, "device-to-host"),
            Direction::HostToDevice => write!(f, "host-to-device"),
            Direction::WriteThenStatusRead => write!(f, "write-then-status"),
        }
    }
}

/// A fixed-point percentage in hundredths of a percent.
///
/// The value is not range checked here; the codec rejects anything a field
/// cannot carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percent(u32);

impl Percent {
    /// 0 %.
    pub const ZERO: Percent = Percent(0);
    /// 100 %.
    pub const FULL: Percent = Percent(PERCENT_FULL_SCALE);

    /// Create from hundredths of a percent (`4250` is 42.50 %).
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Percent(hundredths)
    }

    /// Create from a whole percentage.
    pub const fn from_whole(percent: u32) -> Self {
        Percent(percent.saturating_mul(100))
    }

    /// Value in hundredths of a percent.
    pub fn hundredths(&self) -> u32 {
        self.0
    }

    /// Whole percentage, if the value has no fractional part.
    pub fn whole(&self) -> Option<u32> {
        (self.0 % 100 == 0).then_some(self.0 / 100)
    }

    /// Whether the value is within 0–100 %.
    pub fn is_valid(&self) -> bool {
        self.0 <= PERCENT_FULL_SCALE
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}
