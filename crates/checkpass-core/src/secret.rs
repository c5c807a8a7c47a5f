//! Zero-on-drop secret buffers
//!
//! Anything that ever holds a password goes through [`Secret`]: the backing
//! storage is wiped when the value is dropped, on every exit path including
//! panic unwind, and the `Debug` form never shows the contents.

use zeroize::{Zeroize, Zeroizing};

/// An owned secret byte buffer, zeroed on drop.
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Take ownership of an existing buffer. No copy is made, so no
    /// unzeroed duplicate of the contents is left behind.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Take ownership of a `String`'s storage.
    pub fn from_string(s: String) -> Self {
        Self::from_vec(s.into_bytes())
    }

    /// Copy out of a borrowed buffer. The caller stays responsible for the
    /// source; use [`Secret::take_from`] when the source should be wiped as
    /// part of the same operation.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    /// Copy `buf` into a new `Secret` and zero `buf` in place. This is the
    /// one sanctioned way to move a secret out of a working buffer.
    pub fn take_from(buf: &mut [u8]) -> Self {
        let secret = Self::copy_from(buf);
        buf.zeroize();
        secret
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}
