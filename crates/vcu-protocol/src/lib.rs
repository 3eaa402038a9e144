//! Polarity VCU I2C protocol
//!
//! This crate describes the fixed-frame protocol between the Polarity vehicle
//! control unit (bus slave) and a gateway (bus master), across all of its
//! revisions.
//!
//! # Protocol Overview
//!
//! Every command is keyed by a bus address, a command id and a protocol
//! version:
//!
//! - **Read commands** live on the read address (`0x48`) and return a frame of
//!   fixed length.
//! - **Write commands** live on the write address (`0x49`) since v10.0. Their
//!   frames are exactly 12 bytes, start with the command id, and some are
//!   followed by a 1-byte status read.
//! - Before v10.0 there was a single address and a few writes shared it.
//!
//! The [`SchemaTable`] knows every revision of every command. The
//! [`Dispatcher`] resolves a request against it at one version, and the codec
//! ([`encode`], [`decode`]) turns [`FieldValues`] into frames and back.
//! A [`Session`] runs dispatched commands over a [`Transport`].
//!
//! # Example
//!
//! ```
//! use vcu_protocol::{
//!     BusAddress, DispatchConfig, Dispatcher, FieldValues, Percent, SchemaTable,
//!     VCU_WRITE_SET_CHARGE_LIMIT,
//! };
//!
//! let dispatcher = Dispatcher::new(SchemaTable::builtin(), &DispatchConfig::default());
//! let payload = FieldValues::new()
//!     .with("limit", Percent::from_whole(80))
//!     .with("max_current_da", 320u32);
//!
//! let write = dispatcher.handle_write(BusAddress::Write, VCU_WRITE_SET_CHARGE_LIMIT, &payload)?;
//! assert_eq!(write.frame()[..2], [0x01, 80]);
//! assert!(write.expects_status());
//! # Ok::<(), vcu_protocol::ProtocolError>(())
//! ```

mod codec;
mod config;
mod constants;
mod definitions;
mod dispatch;
mod error;
mod error_frame;
mod schema;
mod session;
mod status;
mod transport;
mod types;
mod version;

pub use codec::*;
pub use config::*;
pub use constants::*;
pub use definitions::*;
pub use dispatch::*;
pub use error::*;
pub use error_frame::*;
pub use schema::*;
pub use session::*;
pub use status::*;
pub use transport::*;
pub use types::*;
pub use version::*;

pub use polarity_errors;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
