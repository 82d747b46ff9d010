//! Utility functions for snapvcs
//!
//! Hashing, atomic file replacement, human-readable sizes and the path
//! splitting rules shared by the file tree and the repository.
//!
//! ## Hashing
//!
//! All digests are SHA-256, encoded as 64 lowercase hexadecimal characters.
//! The same encoding is used for map keys, file names under the state
//! directory and the HEAD pointer.
//!
//! ```rust,ignore
//! use crate::utils::hash_data;
//!
//! let digest = hash_data(b"hello");
//! assert_eq!(digest.len(), 64);
//! ```

use crate::error::{Result, VcsError};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Length of a hex-encoded digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Name of the hash algorithm recorded in `config.json`
pub const HASH_ALGORITHM: &str = "sha256";

/// Hash arbitrary data using SHA-256
///
/// Returns the digest as a 64-character lowercase hexadecimal string.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

const SHORT_DIGEST_LEN: usize = 10;

/// Check that a string looks like a full digest
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == DIGEST_HEX_LEN
        && digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Short form of a digest for logs and listings
///
/// Input that is not cut cleanly at ten bytes is returned whole.
pub fn short_digest(digest: &str) -> &str {
    digest.get(..SHORT_DIGEST_LEN).unwrap_or(digest)
}

/// Format bytes in human-readable form
///
/// Values below 1024 are printed as whole bytes, larger values with two
/// decimals and a binary (1024-based) unit.
///
/// ```rust,ignore
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created next to `path` so the final rename never
/// crosses a filesystem boundary. Readers see either the old content or the
/// new content, never a partial write.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| VcsError::internal(format!("{:?} has no parent directory", path)))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| VcsError::Io(e.error))?;

    trace!("Atomically wrote {:?} ({} bytes)", path, content.len());
    Ok(())
}

/// Split a relative path into its name segments
///
/// Empty and `.` segments are dropped, as are root and drive prefixes, so
/// `"/src//main.rs"` and `"src/main.rs"` produce the same segments. A `..`
/// segment is rejected: tree paths never climb out of the working directory.
pub fn path_segments(path: &Path) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| VcsError::invalid_argument(format!("{:?} is not valid UTF-8", path)))?;
                segments.push(name.to_string());
            }
            Component::ParentDir => {
                return Err(VcsError::invalid_argument(format!(
                    "path {:?} must not contain '..'",
                    path
                )));
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Ok(segments)
}

/// Make a path relative to a base path
///
/// Tries a lexical strip first so symlinked bases are not resolved, and falls
/// back to comparing canonical paths.
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    if let Ok(relative) = path.strip_prefix(base) {
        return Ok(relative.to_path_buf());
    }

    let path_canon = path.canonicalize()?;
    let base_canon = base.canonicalize()?;

    path_canon
        .strip_prefix(&base_canon)
        .map(|p| p.to_path_buf())
        .map_err(|_| VcsError::internal(format!(
            "Path {:?} is not relative to {:?}",
            path_canon, base_canon
        )))
}

/// Total size in bytes of every regular file below `dir`
pub fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0;
    if !dir.exists() {
        return Ok(0);
    }
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Remove a file or a whole directory tree
pub fn remove_entry(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    trace!("Removed {:?}", path);
    Ok(())
}
