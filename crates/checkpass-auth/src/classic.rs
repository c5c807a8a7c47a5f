//! Password verification against a PHC-format credential file
//!
//! One line per user, `name:$argon2id$...`, `#` for comments. This backend
//! stands in for the platform credential stores (PAM, shadow) so the
//! checker is usable and testable end to end on its own; swapping in a
//! platform backend means implementing [`Authenticator`] and registering
//! the method name.

use std::fs;
use std::path::PathBuf;

use argon2::{
    password_hash::{Error as HashError, PasswordHash, PasswordVerifier},
    Argon2,
};
use tracing::warn;

use checkpass_core::{Conversation, Result};

use crate::{AuthVerdict, Authenticator};

/// Default per-host credential file.
pub const DEFAULT_CREDENTIALS_PATH: &str = "/etc/checkpass/passwd";

/// The built-in, default authentication method.
pub struct ClassicAuth {
    credentials_path: PathBuf,
}

impl ClassicAuth {
    pub fn new() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
        }
    }

    /// Verify against a different credential file (tests, chroots).
    pub fn with_credentials_path(path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: path.into(),
        }
    }

    /// Stored hash for `user`, or `None` if the file has no such entry.
    fn stored_hash(&self, user: &str) -> std::io::Result<Option<String>> {
        let table = fs::read_to_string(&self.credentials_path)?;
        for line in table.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((name, hash)) = line.split_once(':') {
                if name == user {
                    return Ok(Some(hash.to_owned()));
                }
            }
        }
        Ok(None)
    }
}

impl Default for ClassicAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for ClassicAuth {
    fn method(&self) -> &'static str {
        "classic"
    }

    fn authenticate(
        &self,
        username: Option<&str>,
        conv: &mut dyn Conversation,
    ) -> Result<AuthVerdict> {
        let user = match username {
            Some(u) => u.to_owned(),
            None => match conv.get_normal(None)? {
                Some(u) if !u.is_empty() => u,
                _ => return Ok(AuthVerdict::Error),
            },
        };

        let password = match conv.get_hidden(Some("Password: "))? {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(AuthVerdict::Error),
        };

        let hash = match self.stored_hash(&user) {
            Ok(Some(h)) => h,
            // Readable file with no entry for this user: plain rejection.
            Ok(None) => return Ok(AuthVerdict::Rejected),
            Err(e) => {
                warn!(
                    path = %self.credentials_path.display(),
                    "credential file unreadable: {e}"
                );
                return Ok(AuthVerdict::Error);
            }
        };

        let parsed = match PasswordHash::new(&hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(user = %user, "stored credential hash unparsable: {e}");
                return Ok(AuthVerdict::Error);
            }
        };

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(AuthVerdict::Accepted),
            Err(HashError::Password) => Ok(AuthVerdict::Rejected),
            Err(e) => {
                warn!(user = %user, "credential verification could not run: {e}");
                Ok(AuthVerdict::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use checkpass_core::Secret;
    use tempfile::TempDir;

    use super::*;

    /// Conversation that answers from a fixed script instead of a terminal
    /// or a peer.
    struct ScriptedConv {
        username: Option<&'static str>,
        password: Option<&'static [u8]>,
    }

    impl Conversation for ScriptedConv {
        fn get_binary(&mut self, _prompt: &[u8]) -> Result<Option<Secret>> {
            Ok(None)
        }

        fn get_normal(&mut self, prompt: Option<&str>) -> Result<Option<String>> {
            assert!(prompt.is_none(), "classic only asks for the default user");
            Ok(self.username.map(str::to_owned))
        }

        fn get_hidden(&mut self, prompt: Option<&str>) -> Result<Option<Secret>> {
            assert_eq!(prompt, Some("Password: "));
            Ok(self.password.map(Secret::copy_from))
        }

        fn put_info(&mut self, _msg: &str) -> Result<()> {
            Ok(())
        }

        fn put_error(&mut self, _msg: &str) -> Result<()> {
            Ok(())
        }
    }

    fn hash_for(password: &str) -> String {
        Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string()
    }

    fn credentials_with(tmp: &TempDir, user: &str, password: &str) -> ClassicAuth {
        let path = tmp.path().join("passwd");
        let contents = format!("# test credentials\n{user}:{}\n", hash_for(password));
        fs::write(&path, contents).unwrap();
        ClassicAuth::with_credentials_path(path)
    }

    #[test]
    fn test_correct_password_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let auth = credentials_with(&tmp, "alice", "correct horse");
        let mut conv = ScriptedConv {
            username: None,
            password: Some(b"correct horse"),
        };
        let verdict = auth.authenticate(Some("alice"), &mut conv).unwrap();
        assert_eq!(verdict, AuthVerdict::Accepted);
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let auth = credentials_with(&tmp, "alice", "correct horse");
        let mut conv = ScriptedConv {
            username: None,
            password: Some(b"battery staple"),
        };
        let verdict = auth.authenticate(Some("alice"), &mut conv).unwrap();
        assert_eq!(verdict, AuthVerdict::Rejected);
    }

    #[test]
    fn test_unknown_user_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let auth = credentials_with(&tmp, "alice", "correct horse");
        let mut conv = ScriptedConv {
            username: None,
            password: Some(b"correct horse"),
        };
        let verdict = auth.authenticate(Some("mallory"), &mut conv).unwrap();
        assert_eq!(verdict, AuthVerdict::Rejected);
    }

    #[test]
    fn test_unreadable_credential_file_is_an_error() {
        let auth = ClassicAuth::with_credentials_path("/nonexistent/checkpass/passwd");
        let mut conv = ScriptedConv {
            username: None,
            password: Some(b"whatever"),
        };
        let verdict = auth.authenticate(Some("alice"), &mut conv).unwrap();
        assert_eq!(verdict, AuthVerdict::Error);
    }

    #[test]
    fn test_username_comes_from_conversation_when_absent() {
        let tmp = TempDir::new().unwrap();
        let auth = credentials_with(&tmp, "bob", "swordfish");
        let mut conv = ScriptedConv {
            username: Some("bob"),
            password: Some(b"swordfish"),
        };
        let verdict = auth.authenticate(None, &mut conv).unwrap();
        assert_eq!(verdict, AuthVerdict::Accepted);
    }

    #[test]
    fn test_no_answer_means_cannot_proceed() {
        let tmp = TempDir::new().unwrap();
        let auth = credentials_with(&tmp, "alice", "correct horse");

        let mut no_user = ScriptedConv {
            username: None,
            password: Some(b"correct horse"),
        };
        assert_eq!(
            auth.authenticate(None, &mut no_user).unwrap(),
            AuthVerdict::Error
        );

        let mut no_password = ScriptedConv {
            username: None,
            password: None,
        };
        assert_eq!(
            auth.authenticate(Some("alice"), &mut no_password).unwrap(),
            AuthVerdict::Error
        );

        let mut empty_password = ScriptedConv {
            username: None,
            password: Some(b""),
        };
        assert_eq!(
            auth.authenticate(Some("alice"), &mut empty_password).unwrap(),
            AuthVerdict::Error
        );
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("passwd");
        fs::write(&path, "alice:not-a-phc-hash\n").unwrap();
        let auth = ClassicAuth::with_credentials_path(path);
        let mut conv = ScriptedConv {
            username: None,
            password: Some(b"correct horse"),
        };
        let verdict = auth.authenticate(Some("alice"), &mut conv).unwrap();
        assert_eq!(verdict, AuthVerdict::Error);
    }
}
