//! Tree-level comparison of two snapshots
//!
//! Compares the file leaves of two [`FileTree`]s by path and content digest.
//! Every path present in either tree lands in exactly one bucket:
//!
//! - **added**: only in the newer tree
//! - **removed**: only in the older tree
//! - **modified**: in both, with different digests
//! - **unchanged**: in both, with equal digests
//!
//! Directories are not compared on their own; a directory only shows up
//! through the files below it. Every bucket is sorted by path.
//!
//! ## Examples
//!
//! ```rust
//! use snapvcs::{diff::compare_trees, FileTree};
//! use std::path::{Path, PathBuf};
//!
//! let mut old = FileTree::new();
//! old.insert(Path::new("a.txt"), "11".repeat(32), 5)?;
//! let mut new = old.clone();
//! new.insert(Path::new("b.txt"), "22".repeat(32), 5)?;
//!
//! let diff = compare_trees(&old, &new);
//! assert_eq!(diff.added, vec![PathBuf::from("b.txt")]);
//! assert_eq!(diff.unchanged, vec![PathBuf::from("a.txt")]);
//! # Ok::<(), snapvcs::VcsError>(())
//! ```

use crate::file_tree::FileTree;
use crate::types::ModifiedFile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-path classification between two trees
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    /// Paths only in the newer tree
    pub added: Vec<PathBuf>,
    /// Paths only in the older tree
    pub removed: Vec<PathBuf>,
    /// Paths in both trees whose content differs
    pub modified: Vec<ModifiedFile>,
    /// Paths in both trees with identical content
    pub unchanged: Vec<PathBuf>,
}

impl TreeDiff {
    /// Whether anything differs
    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    /// Number of added, removed and modified paths
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Number of distinct paths across both trees
    pub fn total_paths(&self) -> usize {
        self.change_count() + self.unchanged.len()
    }

    /// Net size change of modified files in bytes
    pub fn modified_size_delta(&self) -> i64 {
        self.modified
            .iter()
            .map(|m| m.new_size as i64 - m.old_size as i64)
            .sum()
    }
}

/// Classify every file path of `old` and `new`
pub fn compare_trees(old: &FileTree, new: &FileTree) -> TreeDiff {
    let old_files = old.file_map();
    let new_files = new.file_map();
    let mut diff = TreeDiff::default();

    for (path, old_node) in &old_files {
        let Some(new_node) = new_files.get(path) else {
            diff.removed.push(path.clone());
            continue;
        };
        // file_map yields file leaves only
        let (Some(old_hash), Some(new_hash)) = (old_node.content_hash(), new_node.content_hash()) else {
            continue;
        };

        if old_hash == new_hash {
            diff.unchanged.push(path.clone());
        } else {
            diff.modified.push(ModifiedFile {
                path: path.clone(),
                old_hash: old_hash.to_string(),
                new_hash: new_hash.to_string(),
                old_size: old_node.file_size(),
                new_size: new_node.file_size(),
            });
        }
    }

    diff.added = new_files
        .keys()
        .filter(|path| !old_files.contains_key(*path))
        .cloned()
        .collect();

    diff
}
