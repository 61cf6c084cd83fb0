//! Frame codec for the Zik RFCOMM protocol.
//!
//! Every message exchanged with the headset is wrapped in a frame:
//!
//! ```text
//! ┌─────────────────────┬────────────┬──────────────────────┐
//! │ Length (2B BE)      │ Id (1B)    │ Payload              │
//! │ header included     │            │ (Length - 3 bytes)   │
//! └─────────────────────┴────────────┴──────────────────────┘
//! ```
//!
//! The length field is 16 bits wide, so a frame never exceeds 65 535 bytes.

use std::fmt;

use thiserror::Error;

use crate::error::{Result, ZikError};

/// Size of the frame header (length + id).
pub const HEADER_SIZE: usize = 3;
/// Largest frame representable by the 16-bit length field.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;
/// Largest payload that still fits in a frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

pub const PKT_OPEN_SESSION: &[u8] = &[0x00, 0x03, 0x00];
pub const PKT_CLOSE_SESSION: &[u8] = &[0x00, 0x03, 0x01];
pub const PKT_ACK: &[u8] = &[0x00, 0x03, 0x02];

/// Message ids carried in the third header byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum FrameKind {
   OpenSession = 0x00,
   CloseSession = 0x01,
   Acknowledge = 0x02,
   Request = 0x80,
}

/// How a received frame answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
   Acknowledge,
   Request,
   Unknown,
}

/// Reason a byte sequence could not be turned into a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameDefect {
   #[error("frame too short: expected at least 3 bytes, got {actual}")]
   TooShort { actual: usize },

   #[error("length mismatch: header declares {declared} bytes, got {actual}")]
   LengthMismatch { declared: usize, actual: usize },
}

/// One length-delimited unit exchanged over the socket.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
   id: u8,
   payload: Vec<u8>,
}

impl fmt::Debug for Frame {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Frame")
         .field("id", &format_args!("0x{:02x}", self.id))
         .field("payload_len", &self.payload.len())
         .finish()
   }
}

impl Frame {
   pub fn new(kind: FrameKind, payload: impl Into<Vec<u8>>) -> Self {
      Self {
         id: kind as u8,
         payload: payload.into(),
      }
   }

   pub fn open_session() -> Self {
      Self::new(FrameKind::OpenSession, Vec::new())
   }

   pub fn close_session() -> Self {
      Self::new(FrameKind::CloseSession, Vec::new())
   }

   pub fn acknowledge() -> Self {
      Self::new(FrameKind::Acknowledge, Vec::new())
   }

   /// Raw message id, including ids this codec has no name for.
   pub const fn id(&self) -> u8 {
      self.id
   }

   pub fn kind(&self) -> Option<FrameKind> {
      FrameKind::from_repr(self.id)
   }

   pub fn payload(&self) -> &[u8] {
      &self.payload
   }

   pub fn into_payload(self) -> Vec<u8> {
      self.payload
   }

   pub fn wire_size(&self) -> usize {
      HEADER_SIZE + self.payload.len()
   }

   pub fn classify(&self) -> Classification {
      classify(self)
   }

   pub fn encode(&self) -> Result<Vec<u8>> {
      encode_raw(self.id, &self.payload)
   }

   pub fn decode(bytes: &[u8]) -> Result<Self> {
      decode(bytes)
   }
}

/// Encodes a payload into a self-delimited frame.
pub fn encode(kind: FrameKind, payload: &[u8]) -> Result<Vec<u8>> {
   encode_raw(kind as u8, payload)
}

fn encode_raw(id: u8, payload: &[u8]) -> Result<Vec<u8>> {
   if payload.len() > MAX_PAYLOAD_SIZE {
      return Err(ZikError::PayloadTooLarge {
         size: payload.len(),
         max: MAX_PAYLOAD_SIZE,
      });
   }
   // Bounded by MAX_FRAME_SIZE above.
   let total = (HEADER_SIZE + payload.len()) as u16;

   let mut buf = Vec::with_capacity(total as usize);
   buf.extend_from_slice(&total.to_be_bytes());
   buf.push(id);
   buf.extend_from_slice(payload);
   Ok(buf)
}

/// Decodes exactly the bytes received from one read into a frame.
pub fn decode(bytes: &[u8]) -> Result<Frame> {
   let Some((header, payload)) = bytes.split_first_chunk::<HEADER_SIZE>() else {
      return Err(FrameDefect::TooShort {
         actual: bytes.len(),
      }
      .into());
   };

   let declared = usize::from(u16::from_be_bytes([header[0], header[1]]));
   if declared != bytes.len() {
      return Err(
         FrameDefect::LengthMismatch {
            declared,
            actual: bytes.len(),
         }
         .into(),
      );
   }

   Ok(Frame {
      id: header[2],
      payload: payload.to_vec(),
   })
}

/// Tells acknowledgements and request replies apart from anything else.
pub fn classify(frame: &Frame) -> Classification {
   match frame.kind() {
      Some(FrameKind::Acknowledge) => Classification::Acknowledge,
      Some(FrameKind::Request) => Classification::Request,
      _ => Classification::Unknown,
   }
}
