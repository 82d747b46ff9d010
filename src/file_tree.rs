//! N-ary file tree for commit snapshots
//!
//! A [`FileTree`] mirrors the working directory at the moment a commit is
//! taken. Directories are internal nodes, files are leaves carrying a content
//! digest and a size. The root node stands for the working directory itself
//! and is never addressed by name.
//!
//! ## Structure
//!
//! ```text
//! (root)
//! ├── README.md        file, digest + size
//! └── src/             directory
//!     ├── main.rs
//!     └── util/
//!         └── mod.rs
//! ```
//!
//! ## Conflicts
//!
//! A path's kind is fixed once inserted. Inserting `a/b` after `a` was stored
//! as a file (or inserting `a` after `a/b` made it a directory) is a
//! [`VcsError::TreeConflict`]; the tree is left unchanged.
//!
//! ## Examples
//!
//! ```rust
//! use snapvcs::FileTree;
//! use std::path::Path;
//!
//! let mut tree = FileTree::new();
//! tree.insert(Path::new("src/main.rs"), "ab".repeat(32), 12)?;
//! tree.insert(Path::new("README.md"), "cd".repeat(32), 40)?;
//!
//! assert_eq!(tree.file_count(), 2);
//! assert!(tree.find(Path::new("src")).unwrap().is_directory());
//! # Ok::<(), snapvcs::VcsError>(())
//! ```

use crate::error::{Result, VcsError};
use crate::node::Node;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name stored on the root node; never part of a path
const ROOT_NAME: &str = "/";

/// Hierarchical snapshot of a working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    root: Node,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            root: Node::directory(ROOT_NAME),
        }
    }

    /// Root directory node
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Insert a file leaf at `path`, creating intermediate directories
    ///
    /// Re-inserting an existing file path replaces its digest and size.
    ///
    /// # Errors
    ///
    /// - [`VcsError::InvalidArgument`] if `path` has no name segments or contains `..`
    /// - [`VcsError::TreeConflict`] if a file blocks a needed directory, or the
    ///   final segment is already a directory
    pub fn insert(&mut self, path: &Path, content_hash: impl Into<String>, size: u64) -> Result<()> {
        let segments = utils::path_segments(path)?;
        let (file_name, dirs) = segments
            .split_last()
            .ok_or_else(|| VcsError::invalid_argument(format!("cannot insert empty path {:?}", path)))?;

        let mut current = &mut self.root;
        for (depth, segment) in dirs.iter().enumerate() {
            let children = current
                .children_mut()
                .ok_or_else(|| VcsError::internal("walked into a file node"))?;
            let child = children
                .entry(segment.clone())
                .or_insert_with(|| Node::directory(segment.clone()));
            if child.is_file() {
                return Err(VcsError::TreeConflict {
                    path: dirs[..=depth].iter().collect(),
                    reason: format!("file exists where a directory is needed for {:?}", path),
                });
            }
            current = child;
        }

        let children = current
            .children_mut()
            .ok_or_else(|| VcsError::internal("walked into a file node"))?;
        if children.get(file_name).is_some_and(Node::is_directory) {
            return Err(VcsError::TreeConflict {
                path: path.to_path_buf(),
                reason: "directory exists where a file is being inserted".to_string(),
            });
        }
        children.insert(file_name.clone(), Node::file(file_name.clone(), content_hash, size));
        Ok(())
    }

    /// Find the node at `path`
    ///
    /// An empty path resolves to the root. Returns `None` when any segment is
    /// missing.
    pub fn find(&self, path: &Path) -> Option<&Node> {
        let segments = utils::path_segments(path).ok()?;
        let mut current = &self.root;
        for segment in &segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Find the file leaf at `path`; directories resolve to `None`
    pub fn find_file(&self, path: &Path) -> Option<&Node> {
        self.find(path).filter(|node| node.is_file())
    }

    /// All file leaves with their full relative paths, depth-first and name-sorted
    pub fn list_files(&self) -> Vec<(PathBuf, &Node)> {
        let mut files = Vec::new();
        collect_files(&self.root, PathBuf::new(), &mut files);
        files
    }

    /// File leaves keyed by path
    pub fn file_map(&self) -> BTreeMap<PathBuf, &Node> {
        self.list_files().into_iter().collect()
    }

    /// Whether the tree holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.root.children_count() == 0
    }

    /// Number of file leaves
    pub fn file_count(&self) -> usize {
        self.list_files().len()
    }

    /// Number of directory nodes, excluding the root
    pub fn directory_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.children()
                .filter(|c| c.is_directory())
                .map(|c| 1 + count(c))
                .sum()
        }
        count(&self.root)
    }

    /// Sum of all file sizes
    pub fn total_size(&self) -> u64 {
        self.list_files().iter().map(|(_, node)| node.file_size()).sum()
    }

    /// Indented listing of the tree, two spaces per level, directories end in `/`
    pub fn directory_structure(&self) -> Vec<String> {
        let mut lines = Vec::new();
        render(&self.root, 0, &mut lines);
        lines
    }
}

fn collect_files<'a>(node: &'a Node, prefix: PathBuf, files: &mut Vec<(PathBuf, &'a Node)>) {
    for child in node.children() {
        let child_path = prefix.join(child.name());
        if child.is_file() {
            files.push((child_path, child));
        } else {
            collect_files(child, child_path, files);
        }
    }
}

fn render(node: &Node, level: usize, lines: &mut Vec<String>) {
    for child in node.children() {
        let indent = "  ".repeat(level);
        if child.is_file() {
            lines.push(format!("{}{}", indent, child.name()));
        } else {
            lines.push(format!("{}{}/", indent, child.name()));
            render(child, level + 1, lines);
        }
    }
}

impl fmt::Display for FileTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "FileTree(empty)");
        }
        writeln!(f, "FileTree:")?;
        write!(f, "{}", self.directory_structure().join("\n"))
    }
}
