//! Process driver
//!
//! Descriptor hygiene, conversation selection, the lockout pass around the
//! verdict, and the verdict-to-exit-code mapping. The exit codes are a
//! stable contract with the callers; nothing else about the process is.

use std::io;

use tracing::{debug, error, warn};

use checkpass_auth::{AuthVerdict, Authenticator};
use checkpass_core::{Conversation, RemoteConversation};

use crate::config::Config;
use crate::conv_local::LocalConversation;
use crate::lockout::LockoutTracker;

/// Authentication succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// Bad credentials.
pub const EXIT_REJECTED: i32 = 1;
/// The credential database could not be read.
pub const EXIT_AUTH_ERROR: i32 = 2;
/// Environment setup failed before authentication could begin.
pub const EXIT_SETUP: i32 = 10;
/// Fatal breakdown on the control channel.
pub const EXIT_WIRE: i32 = 15;

/// Run one authentication attempt and return the process exit code.
pub fn run(config: &Config) -> i32 {
    if let Err(e) = ensure_std_fds() {
        error!("cannot secure standard descriptors: {e}");
        return EXIT_SETUP;
    }

    let Some(authenticator) = checkpass_auth::by_name(&config.method, config.caller.as_deref())
    else {
        error!(method = %config.method, "unknown authentication method");
        return EXIT_SETUP;
    };

    debug!(
        method = %config.method,
        caller = ?config.caller,
        remote = config.server_fd.is_some(),
        "starting authentication"
    );

    match config.server_fd {
        Some(fd) => match RemoteConversation::from_raw_fd(fd) {
            Ok(mut conv) => drive(config, authenticator.as_ref(), &mut conv),
            Err(e) => {
                error!("server descriptor rejected: {e}");
                EXIT_WIRE
            }
        },
        None => {
            let mut conv = LocalConversation::new(config);
            // Locally the invoking user must be determinable up front; a
            // peerless checker has nobody to ask later.
            let mut config = config.clone();
            if config.username.is_none() {
                match conv.derive_username() {
                    Some(user) => config.username = Some(user),
                    None => {
                        error!("cannot determine the invoking user");
                        return EXIT_SETUP;
                    }
                }
            }
            drive(&config, authenticator.as_ref(), &mut conv)
        }
    }
}

/// Authenticate over an already-selected conversation, pay the lockout
/// debt, and map the verdict. Split from [`run`] so tests can drive it with
/// scripted conversations and backends.
pub fn drive(
    config: &Config,
    authenticator: &dyn Authenticator,
    conv: &mut dyn Conversation,
) -> i32 {
    let verdict = match authenticator.authenticate(config.username.as_deref(), conv) {
        Ok(v) => v,
        Err(e) => {
            // Every conversation error is a control-channel casualty; the
            // only safe response left is the reserved exit code.
            error!("conversation failed: {e}");
            return EXIT_WIRE;
        }
    };

    if verdict == AuthVerdict::Rejected {
        warn!(uid = config.real_uid, "authentication failure");
    }

    // Plain invocations (real == effective UID) are not privileged and skip
    // tracking; otherwise any user could fill the lockout directory.
    if config.real_uid != config.effective_uid {
        LockoutTracker::new(&config.lockout_dir, config.real_uid).apply(verdict);
    }

    exit_code(verdict)
}

fn exit_code(verdict: AuthVerdict) -> i32 {
    match verdict {
        AuthVerdict::Accepted => EXIT_SUCCESS,
        AuthVerdict::Rejected => EXIT_REJECTED,
        AuthVerdict::Error => EXIT_AUTH_ERROR,
    }
}

/// Make sure descriptors 0 through 2 exist before anything writes to them.
/// A helper spawned with closed standard descriptors would otherwise write
/// diagnostics into whatever file it opens next.
fn ensure_std_fds() -> io::Result<()> {
    for fd in 0..=2 {
        // SAFETY: F_GETFD on a small integer is a pure query; EBADF just
        // means the slot is free.
        if unsafe { libc::fcntl(fd, libc::F_GETFD) } >= 0 {
            continue;
        }
        // SAFETY: opening /dev/null claims the lowest free descriptor,
        // which is `fd` unless another thread raced a descriptor into
        // existence first.
        let null = unsafe { libc::open(b"/dev/null\0".as_ptr().cast(), libc::O_RDWR) };
        if null < 0 {
            return Err(io::Error::last_os_error());
        }
        if null != fd {
            // SAFETY: both descriptors are valid here; duplicate onto the
            // free slot, then drop the surplus one.
            if unsafe { libc::dup2(null, fd) } < 0 {
                let e = io::Error::last_os_error();
                unsafe { libc::close(null) };
                return Err(e);
            }
            unsafe { libc::close(null) };
        }
    }
    Ok(())
}
