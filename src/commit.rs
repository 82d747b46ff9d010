//! Commit definitions and encoding
//!
//! A [`Commit`] is an immutable snapshot of the whole working directory: the
//! [`FileTree`] built while committing, plus who made it, when, why, and the
//! digest of the commit it follows.
//!
//! ## Content addressing
//!
//! Commits are stored under the SHA-256 digest of their own encoded bytes, so
//! a commit's key also verifies it. Each commit names its parent by that key,
//! which makes history a singly-linked chain running backward from HEAD.
//!
//! ## Encoding
//!
//! ```text
//! +--------+---------+-------------------------------+
//! | "SVCM" | version | bincode (standard, serde)     |
//! | 4 B    | 1 B     | Commit                        |
//! +--------+---------+-------------------------------+
//! ```
//!
//! Tree children are kept in sorted maps, so the same commit always encodes to
//! the same bytes.
//!
//! ## Examples
//!
//! ```rust
//! use snapvcs::Commit;
//!
//! let commit = Commit::new("Initial import", "alice", None)?;
//! assert!(commit.is_initial());
//!
//! let bytes = commit.to_bytes()?;
//! let decoded = Commit::from_bytes(&bytes)?;
//! assert_eq!(decoded, commit);
//! assert_eq!(decoded.digest()?, commit.digest()?);
//! # Ok::<(), snapvcs::VcsError>(())
//! ```

use crate::error::{Result, VcsError};
use crate::file_tree::FileTree;
use crate::types::CommitSummary;
use crate::utils;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Magic bytes opening every encoded commit
pub const COMMIT_MAGIC: &[u8; 4] = b"SVCM";

/// Encoding version following the magic
pub const COMMIT_FORMAT_VERSION: u8 = 1;

/// Default length used by [`Commit::short_message`] callers
pub const DEFAULT_SHORT_MESSAGE_LEN: usize = 50;

/// Last timestamp handed out, in nanoseconds since the epoch
static LAST_TIMESTAMP_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// A snapshot of the working directory at a point in time
///
/// Commits are created with an empty tree by [`Commit::new`]; the repository
/// fills the tree while walking the working directory and never changes it
/// once the commit is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    timestamp: DateTime<Utc>,
    message: String,
    author: String,
    parent_commit_hash: Option<String>,
    file_tree: FileTree,
}

impl Commit {
    /// Create a commit with an empty file tree
    ///
    /// Message and author are trimmed. The timestamp is strictly greater than
    /// that of any commit created earlier in this process.
    ///
    /// # Errors
    ///
    /// [`VcsError::InvalidArgument`] if message or author is blank.
    pub fn new(
        message: impl AsRef<str>,
        author: impl AsRef<str>,
        parent_commit_hash: Option<String>,
    ) -> Result<Self> {
        let message = message.as_ref().trim();
        let author = author.as_ref().trim();
        if message.is_empty() {
            return Err(VcsError::invalid_argument("commit message cannot be empty"));
        }
        if author.is_empty() {
            return Err(VcsError::invalid_argument("commit author cannot be empty"));
        }

        Ok(Self {
            timestamp: next_timestamp(),
            message: message.to_string(),
            author: author.to_string(),
            parent_commit_hash,
            file_tree: FileTree::new(),
        })
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Creation time in local time, `YYYY-MM-DD HH:MM:SS`
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Full commit message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message cut to at most `max_len` characters, ending in `...` when cut
    pub fn short_message(&self, max_len: usize) -> String {
        if self.message.chars().count() <= max_len {
            return self.message.clone();
        }
        let kept: String = self.message.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }

    /// Commit author
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Digest of the parent commit
    pub fn parent_commit_hash(&self) -> Option<&str> {
        self.parent_commit_hash.as_deref()
    }

    /// Whether this commit has a parent
    pub fn has_parent(&self) -> bool {
        self.parent_commit_hash.is_some()
    }

    /// Whether this is the root commit
    pub fn is_initial(&self) -> bool {
        !self.has_parent()
    }

    /// Snapshot tree
    pub fn file_tree(&self) -> &FileTree {
        &self.file_tree
    }

    pub(crate) fn file_tree_mut(&mut self) -> &mut FileTree {
        &mut self.file_tree
    }

    /// Number of files in the snapshot
    pub fn file_count(&self) -> usize {
        self.file_tree.file_count()
    }

    /// Total bytes of all files in the snapshot
    pub fn total_size(&self) -> u64 {
        self.file_tree.total_size()
    }

    /// Metadata record without the tree
    pub fn summary(&self) -> CommitSummary {
        CommitSummary {
            message: self.message.clone(),
            author: self.author.clone(),
            timestamp: self.timestamp,
            parent: self.parent_commit_hash.clone(),
            file_count: self.file_count(),
            total_size: self.total_size(),
        }
    }

    /// Format commit for display
    pub fn display_format(&self) -> String {
        format!(
            "{} by {} - {} files, {} - {}",
            self.formatted_timestamp(),
            self.author,
            self.file_count(),
            utils::format_bytes(self.total_size()),
            self.short_message(DEFAULT_SHORT_MESSAGE_LEN)
        )
    }

    /// Encode with the versioned envelope
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        let mut bytes = Vec::with_capacity(COMMIT_MAGIC.len() + 1 + payload.len());
        bytes.extend_from_slice(COMMIT_MAGIC);
        bytes.push(COMMIT_FORMAT_VERSION);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode bytes produced by [`Commit::to_bytes`]
    ///
    /// # Errors
    ///
    /// [`VcsError::CorruptObject`] on a bad magic, an unknown version,
    /// undecodable payload or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header_len = COMMIT_MAGIC.len() + 1;
        if bytes.len() < header_len || &bytes[..COMMIT_MAGIC.len()] != COMMIT_MAGIC {
            return Err(VcsError::corrupt("commit has no valid header"));
        }
        let version = bytes[COMMIT_MAGIC.len()];
        if version != COMMIT_FORMAT_VERSION {
            return Err(VcsError::corrupt(format!("unknown commit format version {}", version)));
        }

        let payload = &bytes[header_len..];
        let (commit, read): (Commit, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())
                .map_err(|e| VcsError::corrupt(format!("cannot decode commit: {}", e)))?;
        if read != payload.len() {
            return Err(VcsError::corrupt(format!(
                "commit has {} trailing bytes",
                payload.len() - read
            )));
        }
        Ok(commit)
    }

    /// SHA-256 of the encoded commit; its storage key
    pub fn digest(&self) -> Result<String> {
        Ok(utils::hash_data(&self.to_bytes()?))
    }
}

/// Current time, bumped past the last value handed out
fn next_timestamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut last = LAST_TIMESTAMP_NANOS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_TIMESTAMP_NANOS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return DateTime::from_timestamp_nanos(next),
            Err(actual) => last = actual,
        }
    }
}
