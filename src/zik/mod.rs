//! Parrot Zik protocol: framing, reply documents, typed records and the
//! device state built on top of them.

pub mod device;
pub mod document;
pub mod frame;
pub mod info;
pub mod protocol;
