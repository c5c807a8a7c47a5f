//! Conversation against the controlling terminal, or stdin when detached

use std::io::{self, BufRead, IsTerminal, Read, Write};

use nix::unistd::{Uid, User};
use tracing::{error, info};
use zeroize::Zeroize;

use checkpass_core::{Conversation, Result, Secret};

use crate::config::Config;

/// Longest secret accepted from a detached stdin read (PAM's response
/// ceiling, minus the terminator).
pub const MAX_SECRET_LEN: usize = 511;

/// Conversation used when no server descriptor was supplied: prompts go to
/// the terminal when one is attached, secrets come from an echo-disabled
/// terminal read or one bounded stdin read.
pub struct LocalConversation {
    username_override: Option<String>,
    real_uid: u32,
    tty: bool,
}

impl LocalConversation {
    pub fn new(config: &Config) -> Self {
        Self {
            username_override: config.username.clone(),
            real_uid: config.real_uid,
            tty: io::stdin().is_terminal(),
        }
    }

    /// Username for the attempt when the backend did not get one: the
    /// command-line override, then LOGNAME/USER (only when they really name
    /// the invoking UID), then a UID lookup. First match wins.
    pub fn derive_username(&self) -> Option<String> {
        if let Some(name) = &self.username_override {
            return Some(name.clone());
        }
        for var in ["LOGNAME", "USER"] {
            if let Ok(name) = std::env::var(var) {
                if !name.is_empty() && names_uid(&name, self.real_uid) {
                    return Some(name);
                }
            }
        }
        User::from_uid(Uid::from_raw(self.real_uid))
            .ok()
            .flatten()
            .map(|u| u.name)
    }

    fn read_hidden_from_stdin(&self) -> Option<Secret> {
        // One bounded read; a detached caller gets no second chance to
        // stream at us.
        let mut buf = [0u8; MAX_SECRET_LEN + 1];
        let n = match io::stdin().lock().read(&mut buf) {
            Ok(n) => n,
            Err(_) => {
                buf.zeroize();
                return None;
            }
        };
        let mut end = n;
        if end > 0 && buf[end - 1] == b'\n' {
            end -= 1;
        }
        let secret = Secret::take_from(&mut buf[..end]);
        buf.zeroize();
        Some(secret)
    }
}

impl Conversation for LocalConversation {
    fn get_binary(&mut self, _prompt: &[u8]) -> Result<Option<Secret>> {
        // Binary challenges only make sense against a remote peer.
        Ok(None)
    }

    fn get_normal(&mut self, prompt: Option<&str>) -> Result<Option<String>> {
        let Some(prompt) = prompt else {
            return Ok(self.derive_username());
        };
        if !self.tty {
            return Ok(None);
        }
        let mut err = io::stderr();
        if write!(err, "{prompt}").and_then(|()| err.flush()).is_err() {
            return Ok(None);
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => Ok(None),
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                Ok(Some(line))
            }
        }
    }

    fn get_hidden(&mut self, prompt: Option<&str>) -> Result<Option<Secret>> {
        if self.tty {
            let read = match prompt {
                Some(p) => rpassword::prompt_password(p),
                None => rpassword::read_password(),
            };
            return Ok(read.ok().map(Secret::from_string));
        }
        Ok(self.read_hidden_from_stdin())
    }

    fn put_info(&mut self, msg: &str) -> Result<()> {
        if self.tty {
            let _ = writeln!(io::stderr(), "{msg}");
        } else {
            info!("{msg}");
        }
        Ok(())
    }

    fn put_error(&mut self, msg: &str) -> Result<()> {
        if self.tty {
            let _ = writeln!(io::stderr(), "{msg}");
        } else {
            error!("{msg}");
        }
        Ok(())
    }
}

fn names_uid(name: &str, uid: u32) -> bool {
    matches!(User::from_name(name), Ok(Some(u)) if u.uid.as_raw() == uid)
}
