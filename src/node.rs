//! Tree elements of a snapshot
//!
//! A [`Node`] is either a file leaf, carrying the digest and size of its
//! content, or a directory holding named children. The two shapes are kept in
//! [`NodeKind`] so a file can never have children and a directory can never
//! carry a content digest.
//!
//! Children live in a `BTreeMap`, which gives every traversal (listing,
//! diffing, rendering, serialization) the same name-sorted order.

use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a node represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file leaf
    File {
        /// SHA-256 digest of the file content
        content_hash: String,
        /// Size of the content in bytes
        size: u64,
    },
    /// Directory with named children
    Directory {
        /// Children keyed by their name segment
        children: BTreeMap<String, Node>,
    },
}

/// A single element of a [`FileTree`](crate::file_tree::FileTree)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    kind: NodeKind,
}

impl Node {
    /// Create a file leaf
    pub fn file(name: impl Into<String>, content_hash: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File {
                content_hash: content_hash.into(),
                size,
            },
        }
    }

    /// Create an empty directory
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    /// Name segment of this node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying kind
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether this node is a file leaf
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Whether this node is a directory
    pub fn is_directory(&self) -> bool {
        !self.is_file()
    }

    /// Content digest, present only for files
    pub fn content_hash(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content_hash, .. } => Some(content_hash),
            NodeKind::Directory { .. } => None,
        }
    }

    /// File size in bytes; 0 for directories
    pub fn file_size(&self) -> u64 {
        match &self.kind {
            NodeKind::File { size, .. } => *size,
            NodeKind::Directory { .. } => 0,
        }
    }

    /// File size formatted for display
    pub fn formatted_size(&self) -> String {
        utils::format_bytes(self.file_size())
    }

    /// Look up a direct child by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        match &self.kind {
            NodeKind::Directory { children } => children.get(name),
            NodeKind::File { .. } => None,
        }
    }

    /// Whether a direct child with this name exists
    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Children in name order; empty for files
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        let children = match &self.kind {
            NodeKind::Directory { children } => Some(children.values()),
            NodeKind::File { .. } => None,
        };
        children.into_iter().flatten()
    }

    /// Number of direct children
    pub fn children_count(&self) -> usize {
        match &self.kind {
            NodeKind::Directory { children } => children.len(),
            NodeKind::File { .. } => 0,
        }
    }

    /// One-line description used by listings
    pub fn file_info(&self) -> String {
        match &self.kind {
            NodeKind::File { content_hash, size } => format!(
                "{} (file, {}, {})",
                self.name,
                utils::format_bytes(*size),
                utils::short_digest(content_hash)
            ),
            NodeKind::Directory { children } => {
                format!("{}/ (directory, {} entries)", self.name, children.len())
            }
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }
}
