//! Length-prefixed framing over the control channel
//!
//! The checker and the process that spawned it share an already-connected
//! byte stream (the descriptor passed via `-S`). Every message is a
//! fixed-width native-endian `i32`, optionally followed by a payload. Both
//! ends are the same build on the same host, so no cross-architecture
//! framing is attempted.

use std::io::{ErrorKind, Read, Write};

use zeroize::Zeroizing;

use crate::error::WireError;
use crate::secret::Secret;

/// Hard ceiling for string frames. A peer announcing a longer string is
/// treated as hostile and the channel is torn down.
pub const MAX_STRING_LEN: usize = 4096;

/// Hard ceiling for binary frames (challenge/response extensions).
pub const MAX_BYTES_LEN: usize = 64 * 1024;

/// Framed reader/writer over the byte stream shared with the peer process.
pub struct FramedChannel<S> {
    stream: S,
}

impl<S: Read + Write> FramedChannel<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Read until `buf` is full, the stream ends, or a non-blocking peer
    /// has nothing more to offer. Interrupted reads are retried. Returns
    /// the number of bytes actually read; callers compare it against the
    /// requested count.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<usize, WireError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(WireError::Io(e)),
            }
        }
        Ok(filled)
    }

    /// Write all of `buf` or fail. A short write has no recovery path on
    /// this channel.
    pub fn write_exact(&mut self, buf: &[u8]) -> Result<(), WireError> {
        self.stream.write_all(buf)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Send a fixed-width native-endian integer.
    pub fn send_int(&mut self, v: i32) -> Result<(), WireError> {
        self.write_exact(&v.to_ne_bytes())
    }

    pub fn recv_int(&mut self) -> Result<i32, WireError> {
        let mut raw = [0u8; 4];
        let got = self.read_exact(&mut raw)?;
        if got != raw.len() {
            return Err(WireError::Truncated {
                expected: raw.len(),
                got,
            });
        }
        Ok(i32::from_ne_bytes(raw))
    }

    /// Send a NUL-terminated string frame. `None` is the zero-length frame
    /// and carries no payload bytes at all.
    pub fn send_string(&mut self, s: Option<&str>) -> Result<(), WireError> {
        match s {
            None => self.send_int(0),
            Some(s) => {
                self.send_int(s.len() as i32 + 1)?;
                self.write_exact(s.as_bytes())?;
                self.write_exact(&[0])
            }
        }
    }

    /// Send a raw byte frame, no terminator.
    pub fn send_bytes(&mut self, buf: &[u8]) -> Result<(), WireError> {
        self.send_int(buf.len() as i32)?;
        self.write_exact(buf)
    }

    /// Receive a string frame. The final byte is the enforced terminator,
    /// whatever the peer actually put there, so a peer that omits the NUL
    /// cannot smuggle an unterminated buffer through.
    pub fn recv_string(&mut self) -> Result<Option<String>, WireError> {
        Ok(self
            .recv_frame(MAX_STRING_LEN)?
            .map(|buf| String::from_utf8_lossy(&buf[..buf.len() - 1]).into_owned()))
    }

    /// Like [`FramedChannel::recv_string`], but the payload never leaves
    /// zeroing buffers and is kept as raw bytes.
    pub fn recv_secret(&mut self) -> Result<Option<Secret>, WireError> {
        Ok(self
            .recv_frame(MAX_STRING_LEN)?
            .map(|buf| Secret::copy_from(&buf[..buf.len() - 1])))
    }

    /// Receive a raw byte frame. Binary replies are challenge/response
    /// material and are treated as secrets.
    pub fn recv_bytes(&mut self) -> Result<Option<Secret>, WireError> {
        Ok(self
            .recv_frame(MAX_BYTES_LEN)?
            .map(|buf| Secret::copy_from(&buf)))
    }

    fn recv_frame(&mut self, limit: usize) -> Result<Option<Zeroizing<Vec<u8>>>, WireError> {
        let len = self.recv_int()?;
        if len == 0 {
            return Ok(None);
        }
        if len < 0 || len as usize > limit {
            return Err(WireError::OversizedLength { len, limit });
        }
        let len = len as usize;
        let mut buf = Zeroizing::new(vec![0u8; len]);
        let got = self.read_exact(&mut buf)?;
        if got != len {
            return Err(WireError::Truncated { expected: len, got });
        }
        Ok(Some(buf))
    }
}
