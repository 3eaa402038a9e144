//! Polarity VCU error codes
//!
//! The VCU reports faults as small numeric codes. Codes are grouped into fixed
//! bands per subsystem:
//!
//! | Subsystem     | Band      |
//! |---------------|-----------|
//! | `I2C`         | 100-109   |
//! | `CAN`         | 110-139   |
//! | `TIM`         | 140-159   |
//! | `UART`        | 160-169   |
//! | `VCU_GENERAL` | 200-249   |
//!
//! Code `0` is never a valid error; it is the "no error" value and the
//! terminator of error payload frames.
//!
//! Older firmware used `SKUDAK_ERR_*` names for the same codes. Those names are
//! kept as legacy aliases that resolve onto the canonical `POLARITY_ERR_*`
//! entries.
//!
//! # Example
//!
//! ```rust
//! use polarity_errors::ErrorRegistry;
//!
//! let registry = ErrorRegistry::builtin();
//! let err = registry.lookup(110).unwrap();
//! assert_eq!(err.name, "POLARITY_ERR_CAN1_INIT");
//! assert_eq!(registry.code_for("SKUDAK_ERR_CAN1_INIT"), Some(110));
//! ```

mod definitions;
mod error;
mod registry;

pub use definitions::*;
pub use error::*;
pub use registry::*;

/// Result type alias for registry construction.
pub type Result<T> = std::result::Result<T, RegistryError>;
