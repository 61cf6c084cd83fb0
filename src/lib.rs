//! Control library for Parrot Zik headphones.
//!
//! Talks to the headset over its RFCOMM control channel: requests are
//! framed ([`zik::frame`]), answered with XML documents
//! ([`zik::document`]) and decoded into typed records ([`zik::info`]).
//! [`zik::device::Zik`] keeps a snapshot of every synced facet.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod zik;

pub use bluetooth::channel::{Channel, Reply};
pub use error::{Result, ZikError};
pub use zik::{
   device::Zik,
   info::{Info, Record, RecordKind},
};
