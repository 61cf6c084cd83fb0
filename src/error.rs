//! Error types for the Zik control library.
//!
//! This module defines all error types that can occur while talking to a
//! Parrot Zik headset, from framing and transport failures up to decoding of
//! the typed info records, plus Bluetooth and configuration errors.

use bluer::Address;
use thiserror::Error;

use crate::zik::{document::ParseError, frame::FrameDefect, info::RecordKind, protocol::Method};

/// Main error type for the Zik library.
#[derive(Error, Debug)]
pub enum ZikError {
   #[error("Payload too large: {size} bytes (max {max})")]
   PayloadTooLarge { size: usize, max: usize },

   #[error("Malformed frame: {0}")]
   MalformedFrame(#[from] FrameDefect),

   #[error("Transport error: {0}")]
   Transport(std::io::Error),

   #[error("Short write: {written}/{expected} bytes")]
   ShortWrite { written: usize, expected: usize },

   #[error("Connection closed")]
   ConnectionClosed,

   #[error("Malformed reply: {actual} bytes received")]
   MalformedReply { actual: usize },

   #[error("Unexpected frame kind: 0x{0:02x}")]
   UnexpectedFrameKind(u8),

   #[error("Reply parse error: {0}")]
   Parse(#[from] ParseError),

   #[error("Device rejected '{path}/{method}'")]
   DeviceRejected { path: String, method: Method },

   #[error("Malformed {kind} record: {reason}")]
   MalformedRecord { kind: RecordKind, reason: String },

   #[error("Unknown enum value: '{0}'")]
   UnknownEnumValue(String),

   #[error("Invalid argument: {0}")]
   InvalidArgument(String),

   #[error("Bluetooth error: {0}")]
   Bluetooth(#[from] bluer::Error),

   #[error("Device not found: {0}")]
   DeviceNotFound(Address),

   #[error("No Zik headset found")]
   NoDeviceFound,

   #[error("Adapter not found")]
   AdapterNotFound,

   #[error("Request timeout")]
   RequestTimeout,

   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),
}

impl ZikError {
   /// Whether the failure happened while moving bytes over the socket.
   pub const fn is_transport(&self) -> bool {
      matches!(self, Self::Transport(_) | Self::ShortWrite { .. } | Self::ConnectionClosed)
   }
}

/// Convenience type alias for Results with `ZikError`.
pub type Result<T> = std::result::Result<T, ZikError>;
