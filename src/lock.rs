//! Exclusive repository lock
//!
//! Mutating operations hold a [`RepositoryLock`] on `<state>/LOCK` for their
//! whole duration. The lock file is created with `create_new`, holds the
//! owner's PID and carries an `fs2` exclusive advisory lock. Dropping the
//! guard releases the lock and removes the file.
//!
//! A lock file left behind by a process that no longer exists is reclaimed
//! with a warning; one held by a live process fails with
//! [`VcsError::RepositoryLocked`].

use crate::error::{Result, VcsError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Name of the lock file inside the state directory
pub const LOCK_FILE_NAME: &str = "LOCK";

const MAX_ATTEMPTS: u32 = 3;

/// RAII guard for the repository lock
#[derive(Debug)]
pub struct RepositoryLock {
    file: Option<File>,
    path: PathBuf,
}

impl RepositoryLock {
    /// Acquire the lock in `state_dir`
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(LOCK_FILE_NAME);

        for _ in 0..MAX_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.try_lock_exclusive()
                        .map_err(|_| VcsError::RepositoryLocked(path.clone()))?;
                    writeln!(file, "{}", std::process::id())?;
                    file.flush()?;
                    trace!("Acquired repository lock {:?}", path);
                    return Ok(Self { file: Some(file), path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !Self::reclaim_if_stale(&path)? {
                        return Err(VcsError::RepositoryLocked(path));
                    }
                }
                Err(e) => return Err(VcsError::Io(e)),
            }
        }

        Err(VcsError::RepositoryLocked(path))
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file if its owner is gone; `false` if it is still held
    fn reclaim_if_stale(path: &Path) -> Result<bool> {
        let file = match File::open(path) {
            Ok(file) => file,
            // Released between our open and read
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(_) => return Ok(false),
        };
        if file.try_lock_exclusive().is_err() {
            return Ok(false);
        }
        let _ = FileExt::unlock(&file);

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(_) => return Ok(false),
        };

        match content.trim().parse::<u32>() {
            // Owner is between create and writing its PID
            Err(_) if content.trim().is_empty() => return Ok(false),
            Ok(pid) if is_process_alive(pid) => return Ok(false),
            Ok(pid) => warn!(pid, "Reclaiming stale repository lock from dead process"),
            Err(_) => warn!("Lock file has invalid content, reclaiming"),
        }

        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(VcsError::Io(e)),
        }
    }
}

impl Drop for RepositoryLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        let _ = fs::remove_file(&self.path);
        trace!("Released repository lock {:?}", self.path);
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
