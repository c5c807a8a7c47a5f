//! The conversation abstraction: one capability set, two transports
//!
//! The authentication backend talks to whoever supplies the credentials
//! through a [`Conversation`]. Whether that party is a terminal or a peer
//! process on the other end of the control channel is decided once, at
//! startup; the backend never knows the difference.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{FromRawFd, RawFd};

use crate::error::{ConvError, Result};
use crate::secret::Secret;
use crate::wire::FramedChannel;

/// Request tags on the wire. Replies carry no tag; requests and replies
/// strictly alternate, no pipelining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ConvRequest {
    /// Opaque byte blob; the prompt embeds a 4-byte big-endian length.
    GetBinary = 1,
    /// Visible text, e.g. a username.
    GetNormal = 2,
    /// A secret, e.g. a password.
    GetHidden = 3,
    /// Informational message, no reply.
    PutInfo = 4,
    /// Error message, no reply.
    PutError = 5,
}

impl ConvRequest {
    pub const fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(Self::GetBinary),
            2 => Some(Self::GetNormal),
            3 => Some(Self::GetHidden),
            4 => Some(Self::PutInfo),
            5 => Some(Self::PutError),
            _ => None,
        }
    }
}

/// Prompt/reply capability set shared by the local and remote transports.
///
/// Every `get_*` yields at most one reply; `None` means "no answer
/// available", which callers must treat as authentication cannot proceed.
/// `put_*` never yields a reply. Implementations never log the secret.
pub trait Conversation {
    /// Request an opaque byte blob (binary challenge/response extensions).
    fn get_binary(&mut self, prompt: &[u8]) -> Result<Option<Secret>>;

    /// Request visible text, e.g. a username. With no prompt, the
    /// implementation supplies its own notion of "the user being
    /// authenticated".
    fn get_normal(&mut self, prompt: Option<&str>) -> Result<Option<String>>;

    /// Request a secret, e.g. a password.
    fn get_hidden(&mut self, prompt: Option<&str>) -> Result<Option<Secret>>;

    /// Deliver an informational message.
    fn put_info(&mut self, msg: &str) -> Result<()>;

    /// Deliver an error message.
    fn put_error(&mut self, msg: &str) -> Result<()>;
}

/// Conversation marshalled over the framed channel to the process that
/// spawned the checker with `-S <fd>`.
pub struct RemoteConversation<S> {
    channel: FramedChannel<S>,
}

impl<S: Read + Write> RemoteConversation<S> {
    pub fn new(stream: S) -> Self {
        Self {
            channel: FramedChannel::new(stream),
        }
    }
}

impl RemoteConversation<File> {
    /// Adopt the descriptor passed on the command line. The descriptor is
    /// probed first, so a caller that handed over a closed fd fails here,
    /// before any authentication work happens.
    pub fn from_raw_fd(fd: RawFd) -> Result<Self> {
        // SAFETY: F_GETFD on an arbitrary descriptor number is a pure
        // query; an invalid fd yields EBADF.
        if unsafe { libc::fcntl(fd, libc::F_GETFD) } < 0 {
            return Err(ConvError::BadDescriptor(fd));
        }
        // SAFETY: the `-S` contract transfers ownership of this descriptor
        // to the checker; nothing else in the process uses it.
        let file = unsafe { File::from_raw_fd(fd) };
        Ok(Self::new(file))
    }
}

impl<S: Read + Write> Conversation for RemoteConversation<S> {
    fn get_binary(&mut self, prompt: &[u8]) -> Result<Option<Secret>> {
        if prompt.len() < 4 {
            return Err(ConvError::MalformedBinaryPrompt);
        }
        let declared = u32::from_be_bytes([prompt[0], prompt[1], prompt[2], prompt[3]]) as usize;
        let payload = prompt
            .get(..declared)
            .ok_or(ConvError::MalformedBinaryPrompt)?;
        self.channel.send_int(ConvRequest::GetBinary.tag())?;
        self.channel.send_bytes(payload)?;
        Ok(self.channel.recv_bytes()?)
    }

    fn get_normal(&mut self, prompt: Option<&str>) -> Result<Option<String>> {
        self.channel.send_int(ConvRequest::GetNormal.tag())?;
        self.channel.send_string(prompt)?;
        Ok(self.channel.recv_string()?)
    }

    fn get_hidden(&mut self, prompt: Option<&str>) -> Result<Option<Secret>> {
        self.channel.send_int(ConvRequest::GetHidden.tag())?;
        self.channel.send_string(prompt)?;
        Ok(self.channel.recv_secret()?)
    }

    fn put_info(&mut self, msg: &str) -> Result<()> {
        self.channel.send_int(ConvRequest::PutInfo.tag())?;
        self.channel.send_string(Some(msg))?;
        Ok(())
    }

    fn put_error(&mut self, msg: &str) -> Result<()> {
        self.channel.send_int(ConvRequest::PutError.tag())?;
        self.channel.send_string(Some(msg))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for tag in 1..=5 {
            assert_eq!(ConvRequest::from_tag(tag).unwrap().tag(), tag);
        }
        assert_eq!(ConvRequest::from_tag(0), None);
        assert_eq!(ConvRequest::from_tag(6), None);
    }

    #[test]
    fn test_get_hidden_over_the_wire() {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let peer = thread::spawn(move || {
            let mut chan = FramedChannel::new(theirs);
            assert_eq!(chan.recv_int().unwrap(), ConvRequest::GetHidden.tag());
            assert_eq!(chan.recv_string().unwrap().as_deref(), Some("Password: "));
            chan.send_string(Some("hunter2")).unwrap();
        });

        let mut conv = RemoteConversation::new(ours);
        let secret = conv.get_hidden(Some("Password: ")).unwrap().unwrap();
        assert_eq!(secret.as_bytes(), b"hunter2");
        peer.join().unwrap();
    }

    #[test]
    fn test_get_normal_with_null_prompt() {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let peer = thread::spawn(move || {
            let mut chan = FramedChannel::new(theirs);
            assert_eq!(chan.recv_int().unwrap(), ConvRequest::GetNormal.tag());
            assert_eq!(chan.recv_string().unwrap(), None);
            chan.send_string(Some("alice")).unwrap();
        });

        let mut conv = RemoteConversation::new(ours);
        assert_eq!(conv.get_normal(None).unwrap().as_deref(), Some("alice"));
        peer.join().unwrap();
    }

    #[test]
    fn test_put_error_expects_no_reply() {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let peer = thread::spawn(move || {
            let mut chan = FramedChannel::new(theirs);
            assert_eq!(chan.recv_int().unwrap(), ConvRequest::PutError.tag());
            assert_eq!(
                chan.recv_string().unwrap().as_deref(),
                Some("Authentication failure")
            );
        });

        let mut conv = RemoteConversation::new(ours);
        conv.put_error("Authentication failure").unwrap();
        peer.join().unwrap();
    }

    #[test]
    fn test_get_binary_sends_declared_prefix() {
        // Prompt: 4-byte big-endian length covering the whole blob.
        let mut prompt = vec![0, 0, 0, 7];
        prompt.extend_from_slice(b"abc");
        let expected = prompt.clone();

        let (ours, theirs) = UnixStream::pair().unwrap();
        let peer = thread::spawn(move || {
            let mut chan = FramedChannel::new(theirs);
            assert_eq!(chan.recv_int().unwrap(), ConvRequest::GetBinary.tag());
            let blob = chan.recv_bytes().unwrap().unwrap();
            assert_eq!(blob.as_bytes(), expected.as_slice());
            chan.send_bytes(&[9, 9]).unwrap();
        });

        let mut conv = RemoteConversation::new(ours);
        let reply = conv.get_binary(&prompt).unwrap().unwrap();
        assert_eq!(reply.as_bytes(), &[9, 9]);
        peer.join().unwrap();
    }

    #[test]
    fn test_get_binary_rejects_short_prompt() {
        let (ours, _theirs) = UnixStream::pair().unwrap();
        let mut conv = RemoteConversation::new(ours);
        assert!(matches!(
            conv.get_binary(&[0, 0]),
            Err(ConvError::MalformedBinaryPrompt)
        ));
        // Declared length reaching past the blob is just as malformed.
        assert!(matches!(
            conv.get_binary(&[0, 0, 0, 99, 1, 2]),
            Err(ConvError::MalformedBinaryPrompt)
        ));
    }

    #[test]
    fn test_from_raw_fd_rejects_dead_descriptor() {
        // A descriptor number far above anything this test process has open.
        assert!(matches!(
            RemoteConversation::from_raw_fd(3000),
            Err(ConvError::BadDescriptor(3000))
        ));
    }
}
