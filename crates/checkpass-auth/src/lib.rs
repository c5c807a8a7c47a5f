//! Authentication backends for the checkpass helper
//!
//! The checker itself never inspects credentials; it hands a username and a
//! [`Conversation`] to an [`Authenticator`] selected by method name and acts
//! on the verdict. Backends are independent modules behind one trait, so a
//! host can swap in PAM- or shadow-style verification without touching the
//! driver.

pub mod classic;

pub use classic::ClassicAuth;

use checkpass_core::{Conversation, Result};

/// Outcome of one authentication attempt.
///
/// `Accepted` and `Rejected` are definitive; `Error` means the backend
/// could not run at all (e.g. its credential store is unreadable) and is
/// surfaced to callers through a distinct exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    Accepted,
    Rejected,
    Error,
}

/// A pluggable credential-verification backend.
pub trait Authenticator {
    /// Method name this backend registers under.
    fn method(&self) -> &'static str;

    /// Verify the user's credentials, prompting through `conv`.
    ///
    /// `username` is the caller-supplied override; backends ask the
    /// conversation when it is absent. A `None` or empty reply from the
    /// conversation means authentication cannot proceed, and the backend
    /// never logs the secret.
    fn authenticate(
        &self,
        username: Option<&str>,
        conv: &mut dyn Conversation,
    ) -> Result<AuthVerdict>;
}

/// Look up a backend by method name.
///
/// `caller` is the identity of the invoking application, for backends that
/// select behavior by caller (a PAM-style backend would use it as the
/// service name); the classic backend has no use for it.
pub fn by_name(method: &str, _caller: Option<&str>) -> Option<Box<dyn Authenticator>> {
    match method {
        "classic" => Some(Box::new(ClassicAuth::new())),
        _ => None,
    }
}
