//! # snapvcs - Snapshot version control
//!
//! A minimal version-control engine that snapshots a working directory into
//! content-addressed, hash-linked commits and restores any of them on demand.
//!
//! ## Overview
//!
//! snapvcs records the complete state of a directory tree at each commit:
//! - Every commit is a full snapshot; there is no staging area
//! - File content is stored once per unique SHA-256 digest
//! - Commits form a single chain running backward from HEAD
//! - Checkout replaces the working directory with a commit's tree
//! - History can be queried per commit, per file, or as a diff between two commits
//!
//! ## Architecture
//!
//! - **Content store** ([`store`]): blobs keyed by the digest of their bytes
//! - **File tree** ([`file_tree`], [`node`]): an N-ary tree of directories and
//!   file leaves, kept in sorted order
//! - **Commits** ([`commit`]): metadata plus a file tree, encoded in a
//!   versioned binary envelope and keyed by the digest of that encoding
//! - **Storage** ([`storage`]): the `.snapvcs` state directory with objects,
//!   commits, HEAD and `config.json`
//! - **Repository** ([`repository`]): init, commit, checkout and the queries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapvcs::Repository;
//!
//! # fn main() -> snapvcs::Result<()> {
//! let repo = Repository::new("./my_project");
//! repo.init()?;
//!
//! std::fs::write("./my_project/a.txt", "hello")?;
//! let first = repo.commit("Add a.txt", "alice")?;
//!
//! std::fs::write("./my_project/b.txt", "world")?;
//! let second = repo.commit("Add b.txt", "bob")?;
//!
//! for (digest, commit) in repo.get_history()? {
//!     println!("{} {}", &digest[..10], commit.display_format());
//! }
//!
//! let diff = repo.compare_commits(&first, &second)?;
//! println!("added: {:?}", diff.changes.added);
//!
//! // Destructive: b.txt is removed from disk
//! repo.checkout(&first)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust,no_run
//! use snapvcs::RepositoryBuilder;
//!
//! # fn main() -> snapvcs::Result<()> {
//! let repo = RepositoryBuilder::new()
//!     .skip_unchanged(true)
//!     .follow_symlinks(true)
//!     .build("./my_project")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], whose error type [`VcsError`]
//! distinguishes missing repositories, failed lookups, corruption, invalid
//! arguments and I/O failures. [`VcsError::user_message`] renders a message
//! suitable for end users.
//!
//! ## Logging
//!
//! The library logs through `tracing` and never installs a subscriber.
//!
//! ## Module Organization
//!
//! - [`repository`]: the [`Repository`] entry point and its builder
//! - [`commit`]: commit records and their encoding
//! - [`file_tree`], [`node`]: snapshot trees
//! - [`diff`]: tree comparison
//! - [`storage`], [`store`]: on-disk state
//! - [`lock`]: exclusive repository lock
//! - [`types`]: result and configuration records
//! - [`error`]: error type
//! - [`utils`]: hashing and formatting helpers

pub mod commit;
pub mod diff;
pub mod error;
pub mod file_tree;
pub mod lock;
pub mod node;
pub mod repository;
pub mod storage;
pub mod store;
pub mod types;
pub mod utils;

pub use commit::{Commit, DEFAULT_SHORT_MESSAGE_LEN};
pub use diff::TreeDiff;
pub use error::{Result, VcsError};
pub use file_tree::FileTree;
pub use node::{Node, NodeKind};
pub use repository::{Repository, RepositoryBuilder};
pub use types::*;
