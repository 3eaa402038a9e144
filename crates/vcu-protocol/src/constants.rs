//! Protocol constants
//!
//! Bus addresses, command identifiers, frame sizes, and status bytes of the
//! VCU I2C protocol. Identifiers are only meaningful together with a bus
//! address and a protocol version; see [`SchemaTable`](crate::SchemaTable).

// ============================================================================
// Bus Addresses (7-bit)
// ============================================================================

/// Address the VCU answers read commands on. Before v10.0 this was the only
/// address and carried writes too.
pub const READ_ADDRESS: u8 = 0x48;
/// Address reserved for write commands since v10.0.
pub const WRITE_ADDRESS: u8 = 0x49;

// ============================================================================
// Read Commands (device → host)
// ============================================================================

/// VCU version and BMS type.
pub const VCU_I2C_INFO: u8 = 0x01;
/// LDU state: current, voltage, temperatures, direction.
pub const VCU_I2C_LDU_STATE: u8 = 0x02;
/// Legacy error list (8 × u16). Retired in v1.2.
pub const VCU_I2C_ERR_CODES: u8 = 0x03;
/// BMS cell voltages.
pub const VCU_I2C_BMS: u8 = 0x04;
/// BMS temperatures.
pub const VCU_I2C_BMS_TEMPS: u8 = 0x05;
/// BMS module presence.
pub const VCU_I2C_BMS_MODULE_INFO: u8 = 0x06;
/// Error count + u8 error list (v1.2 until v10.0).
pub const VCU_I2C_ERR_CODES_V2: u8 = 0x07;
/// 64-slot error payload (v10.0+). Reuses the id of `ERR_CODES_V2`.
pub const VCU_I2C_ERR_PAYLOAD: u8 = 0x07;
/// BMS voltage summary.
pub const VCU_I2C_BMS_SUMMARY: u8 = 0x08;
/// VCU/BMS state, ignition, charging, run, RPM.
pub const VCU_I2C_SYSTEM_STATUS: u8 = 0x09;
/// Heatsink temperature and water pump duty.
pub const VCU_I2C_LDU_EXT: u8 = 0x0A;
/// VW BMS debug counters.
pub const VCU_I2C_VW_BMS_DEBUG: u8 = 0x0B;
/// Uptime, heap, task stats (v10.0+).
pub const VCU_I2C_SYSTEM_DIAGNOSTICS: u8 = 0x0D;

// ============================================================================
// Legacy Single-Address Writes (retired in v10.0)
// ============================================================================

/// Set the charge limit. Moved to [`VCU_WRITE_SET_CHARGE_LIMIT`].
pub const VCU_I2C_LEGACY_SET_CHARGE_LIMIT: u8 = 0x0C;
/// Set the water pump duty. Moved to [`VCU_WRITE_SET_PUMP_DUTY`].
pub const VCU_I2C_LEGACY_SET_PUMP_DUTY: u8 = 0x14;

// ============================================================================
// Write Commands (host → device, write address, v10.0+)
// ============================================================================

/// Set the water pump duty.
pub const VCU_WRITE_SET_PUMP_DUTY: u8 = 0x00;
/// Set the charge limit and maximum charge current.
pub const VCU_WRITE_SET_CHARGE_LIMIT: u8 = 0x01;
/// Clear the latched error list.
pub const VCU_WRITE_CLEAR_ERRORS: u8 = 0x02;
/// Reboot the VCU. No status is read back.
pub const VCU_WRITE_REBOOT: u8 = 0x03;

// ============================================================================
// Frame Sizes
// ============================================================================

/// Every frame on the write address is exactly this long.
pub const WRITE_FRAME_SIZE: usize = 12;
/// Status reply of the write-then-status pattern.
pub const STATUS_FRAME_SIZE: usize = 1;
/// Slots in the error payload.
pub const ERROR_PAYLOAD_SLOTS: usize = 64;
/// Size of the error payload in bytes.
pub const ERROR_PAYLOAD_SIZE: usize = ERROR_PAYLOAD_SLOTS * 2;
/// Size of the system diagnostics frame.
pub const SYSTEM_DIAGNOSTICS_SIZE: usize = 32;
/// Per-task slots in the system diagnostics frame.
pub const DIAGNOSTICS_TASK_SLOTS: usize = 11;

// ============================================================================
// Write Status Codes
// ============================================================================

/// The write was applied.
pub const STATUS_SUCCESS: u8 = 0x00;
/// A parameter was rejected by the firmware.
pub const STATUS_INVALID_PARAM: u8 = 0x01;
/// The firmware did not recognise the command.
pub const STATUS_UNKNOWN: u8 = 0xFF;

// ============================================================================
// Field Limits
// ============================================================================

/// 100 % expressed in hundredths of a percent.
pub const PERCENT_FULL_SCALE: u32 = 10_000;
