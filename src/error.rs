//! Error types for snapvcs
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is [`VcsError`]. Variants are grouped the way callers usually need to react
//! to them: repository state (`NotARepository`, `AlreadyExists`), lookups that
//! missed (`CommitNotFound`, `ObjectNotFound`, `PathNotFound`), integrity
//! problems (`CorruptObject`, `TreeConflict`) and plain I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in snapvcs
pub type Result<T> = std::result::Result<T, VcsError>;

/// Main error type for all repository operations
#[derive(Debug, Error)]
pub enum VcsError {
    /// Operation needs an initialized repository
    #[error("Not a repository: {0:?}")]
    NotARepository(PathBuf),

    /// `init()` on a path that already holds a state directory
    #[error("Repository already exists at {0:?}")]
    AlreadyExists(PathBuf),

    /// No persisted commit matches the digest or prefix
    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    /// Blob missing from the object store
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Path missing from the working directory or from a tree
    #[error("Path not found: {0:?}")]
    PathNotFound(PathBuf),

    /// A short digest matched more than one commit
    #[error("Ambiguous commit prefix '{prefix}' matches {matches} commits")]
    AmbiguousCommit {
        /// The prefix that was looked up
        prefix: String,
        /// How many commits share it
        matches: usize,
    },

    /// Persisted data is unreadable or references content that is gone
    #[error("Corrupt object: {0}")]
    CorruptObject(String),

    /// Caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A path cannot be inserted without turning a file into a directory or back
    #[error("Tree conflict at {path:?}: {reason}")]
    TreeConflict {
        /// Path being inserted
        path: PathBuf,
        /// What blocked the insert
        reason: String,
    },

    /// The state directory was written by a newer format
    #[error("Incompatible repository format {found} (supported: {supported})")]
    IncompatibleFormat {
        /// Version recorded on disk
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// Another process holds the repository lock
    #[error("Repository is locked: {0:?}")]
    RepositoryLocked(PathBuf),

    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk errors from the walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Errors reading or writing `config.json`
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors during bincode encoding/decoding
    #[error("Bincode error: {0}")]
    Bincode(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::error::DecodeError> for VcsError {
    fn from(err: bincode::error::DecodeError) -> Self {
        VcsError::Bincode(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for VcsError {
    fn from(err: bincode::error::EncodeError) -> Self {
        VcsError::Bincode(err.to_string())
    }
}

impl VcsError {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        VcsError::InvalidArgument(msg.into())
    }

    /// Create a corrupt-object error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        VcsError::CorruptObject(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        VcsError::Internal(msg.into())
    }

    /// Check if this error is one of the "not found" kinds
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VcsError::CommitNotFound(_) | VcsError::ObjectNotFound(_) | VcsError::PathNotFound(_)
        )
    }

    /// Check if this error indicates damaged repository data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            VcsError::CorruptObject(_) | VcsError::Bincode(_) | VcsError::IncompatibleFormat { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            VcsError::NotARepository(path) => {
                format!("{:?} is not a repository. Run 'snapvcs init' first.", path)
            }
            VcsError::AlreadyExists(path) => {
                format!("A repository already exists at {:?}.", path)
            }
            VcsError::CommitNotFound(id) => {
                format!("Commit '{}' not found. Use 'snapvcs log' to see available commits.", id)
            }
            VcsError::AmbiguousCommit { prefix, matches } => {
                format!(
                    "'{}' matches {} commits. Use a longer prefix.",
                    prefix, matches
                )
            }
            VcsError::RepositoryLocked(path) => {
                format!(
                    "Repository is locked by another process ({:?}). Try again later.",
                    path
                )
            }
            _ => self.to_string(),
        }
    }
}
