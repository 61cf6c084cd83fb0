//! RFCOMM transport for the Zik control channel.
//!
//! BlueZ hands out RFCOMM connections through a registered profile. The
//! accepted socket is detached from the async runtime and turned into a
//! plain blocking [`RfcommSocket`] that the synchronous [`Channel`] can own.
//!
//! [`Channel`]: crate::bluetooth::channel::Channel

use std::{
   io::{self, Read, Write},
   mem,
   os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
   time::Duration,
};

use bluer::{
   Address, Device, Session, Uuid,
   rfcomm::{Profile, ProfileHandle, Role, Stream},
};
use futures::StreamExt;
use log::debug;
use tokio::time;

use crate::error::{Result, ZikError};

/// Connected RFCOMM socket in blocking mode.
#[derive(Debug)]
pub struct RfcommSocket {
   fd: OwnedFd,
}

impl RfcommSocket {
   /// Duplicates the descriptor of an accepted stream and clears
   /// `O_NONBLOCK` on it. The stream itself can be dropped afterwards.
   pub fn from_stream(stream: &Stream) -> Result<Self> {
      // SAFETY: the stream is alive for the duration of the borrow, so its
      // descriptor is open.
      let fd = unsafe { BorrowedFd::borrow_raw(stream.as_raw_fd()) }
         .try_clone_to_owned()
         .map_err(ZikError::Transport)?;
      let socket = Self { fd };
      socket.set_blocking().map_err(ZikError::Transport)?;
      Ok(socket)
   }

   fn set_blocking(&self) -> io::Result<()> {
      let fd = self.fd.as_raw_fd();
      // SAFETY: `fd` is an open descriptor owned by `self`.
      let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
      if flags < 0 {
         return Err(io::Error::last_os_error());
      }
      // SAFETY: as above; only the file status flags are changed.
      if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
         return Err(io::Error::last_os_error());
      }
      Ok(())
   }

   /// Bounds every blocking read. `None` waits forever.
   pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
      let timeout = timeout.unwrap_or(Duration::ZERO);
      let tv = libc::timeval {
         tv_sec: timeout.as_secs() as libc::time_t,
         tv_usec: timeout.subsec_micros() as libc::suseconds_t,
      };

      // SAFETY: `tv` is a valid timeval for the duration of the call and
      // `fd` is an open socket owned by `self`.
      let rc = unsafe {
         libc::setsockopt(
            self.fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            (&tv as *const libc::timeval).cast::<libc::c_void>(),
            mem::size_of::<libc::timeval>() as libc::socklen_t,
         )
      };
      if rc < 0 {
         return Err(io::Error::last_os_error());
      }
      Ok(())
   }
}

impl AsFd for RfcommSocket {
   fn as_fd(&self) -> BorrowedFd<'_> {
      self.fd.as_fd()
   }
}

impl Read for RfcommSocket {
   fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
      let n = unsafe {
         libc::recv(
            self.fd.as_raw_fd(),
            buf.as_mut_ptr().cast::<libc::c_void>(),
            buf.len(),
            0,
         )
      };
      if n < 0 {
         let err = io::Error::last_os_error();
         // SO_RCVTIMEO expiry surfaces as EAGAIN.
         return Err(match err.kind() {
            io::ErrorKind::WouldBlock => io::Error::new(io::ErrorKind::TimedOut, err),
            _ => err,
         });
      }
      Ok(n as usize)
   }
}

impl Write for RfcommSocket {
   fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      // SAFETY: `buf` is valid for reads of `buf.len()` bytes.
      let n = unsafe {
         libc::send(
            self.fd.as_raw_fd(),
            buf.as_ptr().cast::<libc::c_void>(),
            buf.len(),
            libc::MSG_NOSIGNAL,
         )
      };
      if n < 0 {
         return Err(io::Error::last_os_error());
      }
      Ok(n as usize)
   }

   fn flush(&mut self) -> io::Result<()> {
      Ok(())
   }
}

/// Connects the Zik control service of `device`.
///
/// Registers a client profile for `service`, asks BlueZ to connect it and
/// accepts the resulting connection. The returned profile handle must be
/// kept alive as long as the socket is in use.
pub async fn connect(
   session: &Session,
   device: &Device,
   service: Uuid,
   timeout: Duration,
) -> Result<(RfcommSocket, ProfileHandle)> {
   let address = device.address();
   debug!("Registering RFCOMM profile {service} for {address}");

   let profile = Profile {
      uuid: service,
      role: Some(Role::Client),
      require_authentication: Some(false),
      require_authorization: Some(false),
      auto_connect: Some(false),
      ..Default::default()
   };
   let mut handle = session.register_profile(profile).await?;

   let stream = time::timeout(timeout, accept(&mut handle, device, address, service))
      .await
      .map_err(|_| ZikError::RequestTimeout)??;
   debug!("RFCOMM connection to {address} established");

   let socket = RfcommSocket::from_stream(&stream)?;
   Ok((socket, handle))
}

async fn accept(
   handle: &mut ProfileHandle,
   device: &Device,
   address: Address,
   service: Uuid,
) -> Result<Stream> {
   let connect = device.connect_profile(&service);
   tokio::pin!(connect);
   let mut requested = false;

   loop {
      tokio::select! {
         res = &mut connect, if !requested => {
            res?;
            requested = true;
         },
         req = handle.next() => {
            let req = req.ok_or(ZikError::ConnectionClosed)?;
            if req.device() != address {
               debug!("Ignoring RFCOMM connection from {}", req.device());
               continue;
            }
            return Ok(req.accept()?);
         },
      }
   }
}
