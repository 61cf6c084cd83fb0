//! Synchronous request/reply channel to a Zik headset.
//!
//! The channel owns the connected stream and a receive buffer sized to the
//! largest frame. Every call is one blocking round trip; there is never more
//! than one reply outstanding, so replies need no correlation.

use std::io::{ErrorKind, Read, Write};

use log::{debug, trace};

use crate::{
   error::{Result, ZikError},
   zik::{
      document::Document,
      frame::{Classification, Frame, HEADER_SIZE, MAX_FRAME_SIZE},
      protocol::{Method, Request},
   },
};

/// Where the channel is within a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ChannelState {
   Idle,
   Sending,
   AwaitingReply,
   Decoding,
}

/// Outcome of a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
   /// The device answered with an empty frame.
   Acknowledged,
   /// The device answered with a reply document.
   Document(Document),
}

impl Reply {
   pub const fn document(&self) -> Option<&Document> {
      match self {
         Self::Acknowledged => None,
         Self::Document(doc) => Some(doc),
      }
   }

   pub fn into_document(self) -> Option<Document> {
      match self {
         Self::Acknowledged => None,
         Self::Document(doc) => Some(doc),
      }
   }
}

/// Blocking channel over one connected byte stream.
///
/// Methods take `&mut self`; share a channel between threads by wrapping it
/// in a mutex.
pub struct Channel<T> {
   stream: T,
   buf: Box<[u8]>,
   state: ChannelState,
}

impl<T> std::fmt::Debug for Channel<T> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Channel").field("state", &self.state).finish()
   }
}

impl<T: Read + Write> Channel<T> {
   pub fn new(stream: T) -> Self {
      Self {
         stream,
         buf: vec![0u8; MAX_FRAME_SIZE].into_boxed_slice(),
         state: ChannelState::Idle,
      }
   }

   pub const fn state(&self) -> ChannelState {
      self.state
   }

   pub const fn get_ref(&self) -> &T {
      &self.stream
   }

   pub fn into_inner(self) -> T {
      self.stream
   }

   /// Opens a session; the device must acknowledge.
   pub fn open_session(&mut self) -> Result<()> {
      self.control(&Frame::open_session())
   }

   /// Closes the session; the device must acknowledge.
   pub fn close_session(&mut self) -> Result<()> {
      self.control(&Frame::close_session())
   }

   /// Sends `path/method[?arg=args]` and waits for the answer.
   pub fn send_request(&mut self, path: &str, method: Method, args: Option<&str>) -> Result<Reply> {
      self.send(&Request::new(path, method, args))
   }

   pub fn send(&mut self, request: &Request) -> Result<Reply> {
      debug!("Request: {request}");
      let frame = self.round_trip(&request.to_frame())?;

      match frame.classify() {
         Classification::Acknowledge | Classification::Request => {},
         Classification::Unknown => return Err(ZikError::UnexpectedFrameKind(frame.id())),
      }
      if frame.payload().is_empty() {
         return Ok(Reply::Acknowledged);
      }

      let document = Document::parse(frame.payload())?;
      if document.has_error() {
         return Err(ZikError::DeviceRejected {
            path: request.path.clone(),
            method: request.method,
         });
      }
      Ok(Reply::Document(document))
   }

   fn control(&mut self, frame: &Frame) -> Result<()> {
      let reply = self.round_trip(frame)?;
      match reply.classify() {
         Classification::Acknowledge => Ok(()),
         _ => Err(ZikError::UnexpectedFrameKind(reply.id())),
      }
   }

   /// Writes one frame and reads one frame back. The state is back to
   /// `Idle` whatever the outcome.
   fn round_trip(&mut self, frame: &Frame) -> Result<Frame> {
      let result = self.exchange(frame);
      self.transition(ChannelState::Idle);
      result
   }

   fn exchange(&mut self, frame: &Frame) -> Result<Frame> {
      let bytes = frame.encode()?;

      self.transition(ChannelState::Sending);
      debug!("→ {}", hex::encode(&bytes));
      let written = self.stream.write(&bytes).map_err(ZikError::Transport)?;
      if written != bytes.len() {
         return Err(ZikError::ShortWrite {
            written,
            expected: bytes.len(),
         });
      }
      self.stream.flush().map_err(ZikError::Transport)?;

      self.transition(ChannelState::AwaitingReply);
      let n = loop {
         match self.stream.read(&mut self.buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) => return Err(ZikError::Transport(e)),
         }
      };
      if n == 0 {
         return Err(ZikError::ConnectionClosed);
      }
      if n < HEADER_SIZE {
         return Err(ZikError::MalformedReply { actual: n });
      }

      self.transition(ChannelState::Decoding);
      let received = &self.buf[..n];
      debug!("← {}", hex::encode(received));
      Frame::decode(received)
   }

   fn transition(&mut self, next: ChannelState) {
      if self.state != next {
         trace!("Channel {} -> {next}", self.state);
         self.state = next;
      }
   }
}

#[cfg(test)]
pub(crate) mod testing {
   use std::{
      collections::VecDeque,
      io::{self, Read, Write},
   };

   use crate::zik::{
      frame::{Frame, HEADER_SIZE},
      protocol::Request,
   };

   /// In-memory transport that answers each read with the next scripted
   /// chunk and records everything written.
   #[derive(Default)]
   pub struct Scripted {
      pub replies: VecDeque<Vec<u8>>,
      pub written: Vec<u8>,
      pub write_limit: Option<usize>,
      pub read_error: Option<io::ErrorKind>,
   }

   impl Scripted {
      pub fn replying(replies: impl IntoIterator<Item = Vec<u8>>) -> Self {
         Self {
            replies: replies.into_iter().collect(),
            ..Default::default()
         }
      }

      /// Requests found in everything written so far.
      pub fn sent_requests(&self) -> Vec<Request> {
         let mut requests = Vec::new();
         let mut rest = self.written.as_slice();
         while let [hi, lo, ..] = *rest {
            let len = usize::from(u16::from_be_bytes([hi, lo]));
            if len < HEADER_SIZE {
               break;
            }
            let Some((bytes, tail)) = rest.split_at_checked(len) else {
               break;
            };
            if let Some(req) = Frame::decode(bytes)
               .ok()
               .and_then(|frame| Request::parse_payload(frame.payload()))
            {
               requests.push(req);
            }
            rest = tail;
         }
         requests
      }
   }

   impl Read for Scripted {
      fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
         if let Some(kind) = self.read_error {
            return Err(kind.into());
         }
         let Some(reply) = self.replies.pop_front() else {
            return Ok(0);
         };
         buf[..reply.len()].copy_from_slice(&reply);
         Ok(reply.len())
      }
   }

   impl Write for Scripted {
      fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
         let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
         self.written.extend_from_slice(&buf[..n]);
         Ok(n)
      }

      fn flush(&mut self) -> io::Result<()> {
         Ok(())
      }
   }
}
