//! Runtime configuration
//!
//! Resolved once at startup and threaded explicitly through the driver, the
//! conversation constructors, and the lockout tracker; there is no ambient
//! process-global state.

use std::path::PathBuf;

use nix::unistd::{geteuid, getuid};

use crate::cli::Cli;

/// Environment override for `-c`, honored only when the flag is absent.
pub const CALLER_ENV: &str = "CHECKPASS_CALLER";

/// Environment override for `-U`, honored only when the flag is absent.
pub const USER_ENV: &str = "CHECKPASS_USER";

/// Directory holding the per-UID lockout records.
pub const DEFAULT_LOCKOUT_DIR: &str = "/var/lock";

/// Default authentication method.
pub const DEFAULT_METHOD: &str = "classic";

#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of the calling application, for backends that care.
    pub caller: Option<String>,
    /// Authentication method name.
    pub method: String,
    /// Authenticate this user instead of the invoking user.
    pub username: Option<String>,
    /// Descriptor for remote-conversation mode, if one was supplied.
    pub server_fd: Option<i32>,
    /// Where per-UID lockout records live.
    pub lockout_dir: PathBuf,
    /// UID that invoked us.
    pub real_uid: u32,
    /// UID we run as; differs from `real_uid` only when installed setuid.
    pub effective_uid: u32,
}

impl Config {
    /// Resolve the effective configuration from the parsed CLI plus the
    /// environment compatibility overrides.
    pub fn resolve(cli: Cli) -> Self {
        Self {
            caller: cli.caller.or_else(|| env_override(CALLER_ENV)),
            method: cli.method.unwrap_or_else(|| DEFAULT_METHOD.to_owned()),
            username: cli.username.or_else(|| env_override(USER_ENV)),
            server_fd: cli.server_fd,
            lockout_dir: PathBuf::from(DEFAULT_LOCKOUT_DIR),
            real_uid: getuid().as_raw(),
            effective_uid: geteuid().as_raw(),
        }
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
