//! Advisory lock files for the case registry and per-case work.
//!
//! A lock is a sibling file with `.lock` appended holding the owner's PID and
//! start time as JSON. Locks left behind by dead processes are reclaimed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{CaseError, CaseResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long an unreadable lock file is assumed to belong to a live writer.
const UNREADABLE_GRACE: Duration = Duration::from_secs(5);

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metadata stored in a lock file to identify the owning process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub started: String,
}

/// Held lock; the lock file is removed on drop if it is still ours.
#[derive(Debug)]
pub struct LockGuard {
    lock_path: PathBuf,
    info: LockInfo,
}

impl LockGuard {
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if read_info(&self.lock_path).as_ref() == Some(&self.info) {
            let _ = fs::remove_file(&self.lock_path);
        } else {
            tracing::warn!(lock = %self.lock_path.display(), "lock file was replaced, leaving it in place");
        }
    }
}

/// What currently sits at a lock path.
enum Holder {
    Absent,
    Live(LockInfo),
    /// Unreadable but recent
    Pending,
    Stale,
}

/// Get the lock file path for a given path.
///
/// The lock path is the original path with `.lock` appended.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

/// Try to take the lock for `path` without waiting.
///
/// Fails with `CaseError::Locked` when a live process holds it. The lock file
/// is written aside and hard-linked into place, so it never appears empty.
/// A stale lock (dead PID, or unreadable and older than a short grace period)
/// is reclaimed and the acquisition retried once.
pub fn acquire(path: &Path) -> CaseResult<LockGuard> {
    acquire_with_grace(path, UNREADABLE_GRACE)
}

fn acquire_with_grace(path: &Path, grace: Duration) -> CaseResult<LockGuard> {
    let lock_path = lock_path_for(path);
    let info = LockInfo {
        pid: std::process::id(),
        started: chrono::Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_string(&info).map_err(|e| CaseError::json("lock info", e))?;
    let locked = |pid: u32| CaseError::Locked {
        path: path.to_path_buf(),
        pid,
    };

    for _ in 0..2 {
        match publish(&lock_path, json.as_bytes()) {
            Ok(()) => {
                tracing::trace!(lock = %lock_path.display(), "lock acquired");
                return Ok(LockGuard { lock_path, info });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                match inspect(&lock_path, grace) {
                    Holder::Live(holder) => return Err(locked(holder.pid)),
                    Holder::Pending => return Err(locked(0)),
                    Holder::Absent => {}
                    Holder::Stale => reclaim(&lock_path, grace).map_err(locked)?,
                }
            }
            Err(e) => {
                return Err(CaseError::io(
                    format!("creating lock file {}", lock_path.display()),
                    e,
                ))
            }
        }
    }

    Err(locked(read_lock(path).map(|info| info.pid).unwrap_or_default()))
}

/// Take the lock for `path`, polling until `timeout` elapses.
///
/// Used for short critical sections such as a registry read-modify-write.
pub fn acquire_within(path: &Path, timeout: Duration) -> CaseResult<LockGuard> {
    let deadline = Instant::now() + timeout;
    loop {
        match acquire(path) {
            Err(CaseError::Locked { .. }) if Instant::now() < deadline => {
                thread::sleep(POLL_INTERVAL);
            }
            other => return other,
        }
    }
}

/// Read lock info if the lock file exists and the owning PID is still alive.
///
/// Returns `None` if the lock file is missing, malformed, or the PID is dead.
pub fn read_lock(path: &Path) -> Option<LockInfo> {
    read_info(&lock_path_for(path)).filter(|info| is_pid_alive(info.pid))
}

fn read_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Write `contents` to a private file and link it to `lock_path`.
///
/// Fails with `AlreadyExists` when the lock is taken.
fn publish(lock_path: &Path, contents: &[u8]) -> io::Result<()> {
    let staged = private_path(lock_path);
    fs::write(&staged, contents)?;
    let linked = fs::hard_link(&staged, lock_path);
    let _ = fs::remove_file(&staged);
    linked
}

fn private_path(lock_path: &Path) -> PathBuf {
    let mut name = lock_path.as_os_str().to_owned();
    name.push(format!(
        ".{}.{}",
        std::process::id(),
        STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(name)
}

fn inspect(lock_path: &Path, grace: Duration) -> Holder {
    let contents = match fs::read_to_string(lock_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Holder::Absent,
        Err(_) => String::new(),
    };
    match serde_json::from_str::<LockInfo>(&contents) {
        Ok(info) if is_pid_alive(info.pid) => Holder::Live(info),
        Ok(_) => Holder::Stale,
        Err(_) if modified_within(lock_path, grace) => Holder::Pending,
        Err(_) => Holder::Stale,
    }
}

fn modified_within(path: &Path, window: Duration) -> bool {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified.elapsed().unwrap_or_default() < window,
        Err(_) => true,
    }
}

/// Move a stale lock aside and delete it.
///
/// The lock is renamed first so a fresh lock published in the meantime is
/// recognised and put back. Returns the holder's PID in that case.
fn reclaim(lock_path: &Path, grace: Duration) -> Result<(), u32> {
    let tombstone = private_path(lock_path);
    if fs::rename(lock_path, &tombstone).is_err() {
        // Already gone, or someone else is reclaiming it
        return Ok(());
    }

    let outcome = match inspect(&tombstone, grace) {
        Holder::Live(holder) => {
            if fs::hard_link(&tombstone, lock_path).is_err() {
                tracing::warn!(lock = %lock_path.display(), pid = holder.pid, "could not restore live lock");
            }
            Err(holder.pid)
        }
        Holder::Pending => {
            let _ = fs::hard_link(&tombstone, lock_path);
            Err(0)
        }
        Holder::Absent | Holder::Stale => {
            tracing::debug!(lock = %lock_path.display(), "removed stale lock");
            Ok(())
        }
    };
    let _ = fs::remove_file(&tombstone);
    outcome
}

/// Check whether a process with the given PID is still running.
///
/// Uses `kill(pid, 0)` which checks for process existence without sending a signal.
/// Returns `true` if the process exists (even if owned by another user, EPERM).
#[cfg(unix)]
pub(crate) fn is_pid_alive(pid: u32) -> bool {
    // SAFETY: kill with signal 0 only checks process existence, no signal is sent.
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if ret == 0 {
        return true;
    }
    // EPERM means the process exists but belongs to another user
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub(crate) fn is_pid_alive(_pid: u32) -> bool {
    false
}
