//! Per-UID brute-force lockout
//!
//! The record is two whitespace-separated decimals: the time of the last
//! failure and the consecutive-failure count. Concurrent attempts for the
//! same UID are serialized by a blocking exclusive advisory lock on the
//! record file; that lock is the program's only synchronization point.
//! Missing or damaged records always read as "no prior failures".

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use checkpass_auth::AuthVerdict;

/// Longest failure streak tracked; bounds the backoff exponent.
const FAILURE_CAP: u32 = 20;

/// Failures tolerated before any delay is imposed.
const FREE_FAILURES: u32 = 10;

/// Ceiling on the backoff shift.
const MAX_SHIFT: u32 = 10;

/// One lockout record: when the streak last grew, and how long it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct LockoutRecord {
    last_failure: u64,
    failures: u32,
}

/// Exclusive advisory lock on the record file, released on drop.
struct RecordLock {
    file: File,
}

impl RecordLock {
    /// Open the record file (creating it if absent) and block until the
    /// lock is ours.
    fn acquire(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(path)?;
        // SAFETY: the descriptor comes from an open `File` that outlives
        // this call; LOCK_EX is a valid blocking flock operation.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(Self { file })
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        // SAFETY: same descriptor the lock was taken on; closing would
        // release it anyway, the explicit unlock just keeps the release
        // visible on every exit path.
        unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
    }
}

/// Tracks the failure streak for one UID.
pub struct LockoutTracker {
    dir: PathBuf,
    uid: u32,
}

impl LockoutTracker {
    pub fn new(dir: impl Into<PathBuf>, uid: u32) -> Self {
        Self {
            dir: dir.into(),
            uid,
        }
    }

    /// Path of this UID's record file.
    pub fn record_path(&self) -> PathBuf {
        self.dir.join(format!("checkpass.{}", self.uid))
    }

    /// Pay the backoff delay earned by earlier failures, then fold
    /// `verdict` into the record. Runs after the backend has decided but
    /// before the verdict reaches the caller, so the current attempt is
    /// delayed for the previous attempts' failures.
    ///
    /// Any trouble with the record file skips enforcement: authentication
    /// has already happened, and failing it over a broken /var/lock would
    /// lock everyone out to preserve a rate limit.
    pub fn apply(&self, verdict: AuthVerdict) {
        let path = self.record_path();
        let lock = match RecordLock::acquire(&path) {
            Ok(l) => l,
            Err(e) => {
                warn!(path = %path.display(), "lockout disabled, cannot lock record: {e}");
                return;
            }
        };

        let record = read_record(&lock.file);
        sleep_off_backoff(&record);

        match verdict {
            AuthVerdict::Rejected => {
                let updated = LockoutRecord {
                    last_failure: unix_now(),
                    failures: (record.failures + 1).min(FAILURE_CAP),
                };
                if let Err(e) = write_record(&lock.file, updated) {
                    warn!(path = %path.display(), "cannot update lockout record: {e}");
                }
            }
            AuthVerdict::Accepted => {
                // Full reset: the record disappears, not just the count.
                let _ = fs::remove_file(&path);
            }
            // A backend that could not run is not a brute-force attempt.
            AuthVerdict::Error => {}
        }
    }
}

/// Seconds of delay a streak of `failures` has earned: none through the
/// first ten, then doubling per failure up to the cap.
pub fn backoff_delay(failures: u32) -> u64 {
    if failures <= FREE_FAILURES {
        return 0;
    }
    2u64 << (failures - FREE_FAILURES).min(MAX_SHIFT)
}

fn sleep_off_backoff(record: &LockoutRecord) {
    let delay = backoff_delay(record.failures);
    if delay == 0 {
        return;
    }
    let due = record.last_failure.saturating_add(delay);
    let now = unix_now();
    if due > now {
        thread::sleep(Duration::from_secs(due - now));
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn read_record(file: &File) -> LockoutRecord {
    let mut contents = String::new();
    let mut reader = file;
    if reader.read_to_string(&mut contents).is_err() {
        return LockoutRecord::default();
    }
    let mut fields = contents.split_whitespace();
    let parsed = (|| {
        let last_failure = fields.next()?.parse().ok()?;
        let failures = fields.next()?.parse().ok()?;
        Some(LockoutRecord {
            last_failure,
            failures,
        })
    })();
    parsed.unwrap_or_default()
}

fn write_record(file: &File, record: LockoutRecord) -> std::io::Result<()> {
    let mut writer = file;
    writer.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    writeln!(writer, "{} {}", record.last_failure, record.failures)?;
    writer.flush()
}
