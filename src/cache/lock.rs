//! Single-instance guard for the backfill driver
//!
//! The lock is a file holding the owner's process id. It is checked and then
//! written, which is not atomic: two runs started at the same moment can both
//! acquire it. Serial scheduled runs never overlap that closely.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
#[cfg(all(unix, not(target_os = "linux")))]
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Answers whether a process id belongs to a running process
pub trait ProcessLiveness {
    fn is_running(&self, pid: u32) -> bool;
}

/// Liveness check against the operating system's process table
///
/// Linux reads `/proc/<pid>`. Other Unix systems send signal 0 with `kill`,
/// which also reports a process owned by another user as not running. Where
/// neither is available every pid counts as dead, so a leftover lock is always
/// taken over.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLiveness;

impl ProcessLiveness for SystemLiveness {
    #[cfg(target_os = "linux")]
    fn is_running(&self, pid: u32) -> bool {
        Path::new("/proc").join(pid.to_string()).exists()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    fn is_running(&self, pid: u32) -> bool {
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    #[cfg(not(unix))]
    fn is_running(&self, pid: u32) -> bool {
        warn!(pid, "process liveness cannot be checked on this platform, treating lock as stale");
        false
    }
}

/// Outcome of trying to take the lock
#[derive(Debug)]
pub enum LockOutcome {
    /// This process now owns the lock
    Acquired(PidLock),
    /// A running process already owns the lock
    Held(u32),
}

/// An acquired lock; the file is removed when this is dropped
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    pid: u32,
}

impl PidLock {
    /// Takes the lock at `path` unless a live process holds it
    ///
    /// A missing file, unreadable contents or a pid reported as not
    /// running all count as a free lock, which is overwritten with this
    /// process's id.
    pub fn acquire(path: &Path, liveness: &impl ProcessLiveness) -> io::Result<LockOutcome> {
        match fs::read_to_string(path) {
            Ok(content) => match content.trim().parse::<u32>() {
                Ok(pid) if liveness.is_running(pid) => return Ok(LockOutcome::Held(pid)),
                Ok(pid) => debug!(pid, path = %path.display(), "removing stale lock"),
                Err(_) => warn!(path = %path.display(), "lock file unreadable, replacing it"),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let pid = process::id();
        fs::write(path, pid.to_string())?;
        Ok(LockOutcome::Acquired(PidLock {
            path: path.to_path_buf(),
            pid,
        }))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}
