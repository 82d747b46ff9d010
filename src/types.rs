//! Core data types used throughout snapvcs
//!
//! This module contains the records shared across components and returned by
//! [`Repository`](crate::Repository) operations.
//!
//! ## Overview
//!
//! - **Configuration**: [`RepositoryConfig`], [`StorageMetadata`] - builder
//!   output and the persisted `config.json`
//! - **Operations**: [`CommitOutcome`], [`CheckoutResult`], [`CommitDiff`] -
//!   results of commit, checkout and comparison
//! - **Reporting**: [`CommitSummary`], [`RepositoryStatus`], [`RepositoryStats`]
//!
//! ## Examples
//!
//! ```rust
//! use snapvcs::types::RepositoryConfig;
//!
//! let config = RepositoryConfig {
//!     skip_unchanged: true,
//!     ..Default::default()
//! };
//! assert_eq!(config.state_dir_name, ".snapvcs");
//! ```

use crate::commit::Commit;
use crate::diff::TreeDiff;
use crate::node::Node;
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default name of the hidden state directory inside the working directory
pub const DEFAULT_STATE_DIR: &str = ".snapvcs";

/// Storage format version written by this build
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// A history entry: commit digest and the decoded commit
pub type HistoryEntry = (String, Commit);

/// A file history entry: commit digest, commit, and the file's node in that commit
pub type FileHistoryEntry = (String, Commit, Node);

/// Repository behaviour chosen at build time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Name of the state directory under the working directory
    pub state_dir_name: String,
    /// Return HEAD instead of writing a commit when nothing changed
    pub skip_unchanged: bool,
    /// Snapshot symlinked files as their target's content
    pub follow_symlinks: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            state_dir_name: DEFAULT_STATE_DIR.to_string(),
            skip_unchanged: false,
            follow_symlinks: false,
        }
    }
}

/// Metadata stored in `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageMetadata {
    /// Version of the on-disk format
    pub format_version: u32,
    /// Digest algorithm used for every key
    pub hash_algorithm: String,
    /// Length of a hex digest
    pub digest_hex_len: usize,
    /// Crate version that created the storage
    pub crate_version: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Configuration in effect at init
    pub config: RepositoryConfig,
}

impl StorageMetadata {
    /// Metadata for a fresh state directory
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            hash_algorithm: utils::HASH_ALGORITHM.to_string(),
            digest_hex_len: utils::DIGEST_HEX_LEN,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            config,
        }
    }
}

/// Metadata of a commit without its file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Commit message
    pub message: String,
    /// Commit author
    pub author: String,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Parent digest, `None` for the root commit
    pub parent: Option<String>,
    /// Number of files in the snapshot
    pub file_count: usize,
    /// Total bytes of all files in the snapshot
    pub total_size: u64,
}

/// Result of a commit operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOutcome {
    /// Digest of the new commit, or of HEAD when the commit was skipped
    pub digest: String,
    /// Whether a commit was written
    pub created: bool,
    /// Number of files snapshotted
    pub files: usize,
    /// Bytes read from the working directory
    pub bytes: u64,
    /// Blobs written to the object store for the first time
    pub new_objects: usize,
    /// Entries skipped because they could not be read or are not regular files
    pub skipped: usize,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Result of a checkout operation
///
/// Contains statistics about a completed checkout. The counts describe what
/// happened to the working directory, not the target commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    /// Digest of the commit that was checked out
    pub digest: String,
    /// Top-level entries removed from the working directory
    pub entries_removed: usize,
    /// Files written back
    pub files_restored: usize,
    /// Directories created
    pub directories_created: usize,
    /// Total bytes written
    pub bytes_written: u64,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Changes of a single path present in both commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedFile {
    /// Relative path
    pub path: PathBuf,
    /// Digest in the older commit
    pub old_hash: String,
    /// Digest in the newer commit
    pub new_hash: String,
    /// Size in the older commit
    pub old_size: u64,
    /// Size in the newer commit
    pub new_size: u64,
}

/// Difference between two commits
///
/// # Examples
///
/// ```rust,no_run
/// # use snapvcs::Repository;
/// # fn example() -> snapvcs::Result<()> {
/// let repo = Repository::new(".");
/// let history = repo.get_history()?;
/// let diff = repo.compare_commits(&history[1].0, &history[0].0)?;
///
/// for path in &diff.changes.added {
///     println!("Added: {:?}", path);
/// }
/// for file in &diff.changes.modified {
///     println!("Modified: {:?} ({} -> {} bytes)", file.path, file.old_size, file.new_size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDiff {
    /// Digest of the first (older) commit
    pub from_digest: String,
    /// Digest of the second (newer) commit
    pub to_digest: String,
    /// Summary of the first commit
    pub from: CommitSummary,
    /// Summary of the second commit
    pub to: CommitSummary,
    /// Per-path classification
    pub changes: TreeDiff,
}

/// Snapshot of repository state for presentation layers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryStatus {
    /// Whether the working directory holds an initialized repository
    pub is_repository: bool,
    /// Absolute working directory
    pub work_dir: PathBuf,
    /// Current HEAD digest
    pub head_digest: Option<String>,
    /// Message of the HEAD commit
    pub head_message: Option<String>,
    /// Number of commits reachable from HEAD
    pub total_commits: usize,
}

/// Aggregate repository statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryStats {
    /// Commits reachable from HEAD
    pub total_commits: usize,
    /// Distinct authors in history, sorted
    pub unique_authors: Vec<String>,
    /// Largest file count of any commit in history
    pub max_files_in_commit: usize,
    /// Blobs in the object store
    pub object_count: usize,
    /// Bytes held by the object store
    pub object_bytes: u64,
    /// Commits persisted in the commit store, reachable or not
    pub stored_commits: usize,
    /// Total size of the state directory
    pub state_dir_bytes: u64,
}
