//! Content-addressable blob store
//!
//! Every file snapshotted by a commit is stored here once, under the SHA-256
//! digest of its bytes. Identical content shared by any number of paths or
//! commits occupies a single blob.
//!
//! ## Layout
//!
//! ```text
//! objects/
//! ├── 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
//! └── 486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7
//! ```
//!
//! Blobs are write-once. A blob is written through a temporary file in the
//! same directory and renamed into place, so a crash never leaves a truncated
//! blob under a valid key. Nothing is ever deleted.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use snapvcs::store::ContentStore;
//!
//! let store = ContentStore::new(state_dir.join("objects"));
//! let digest = store.put(b"hello")?;
//! assert_eq!(store.get(&digest)?, b"hello");
//! ```

use crate::error::{Result, VcsError};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Blob storage keyed by content digest
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Store rooted at an existing `objects` directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Directory holding the blobs
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `content` and return its digest
    pub fn put(&self, content: &[u8]) -> Result<String> {
        self.store(content).map(|(digest, _)| digest)
    }

    /// Store `content`, also reporting whether a blob was written
    ///
    /// Returns `(digest, false)` without touching the disk when the blob is
    /// already present.
    pub fn store(&self, content: &[u8]) -> Result<(String, bool)> {
        let digest = utils::hash_data(content);
        let path = self.object_path(&digest);
        if path.exists() {
            trace!("Object {} already stored", utils::short_digest(&digest));
            return Ok((digest, false));
        }

        utils::atomic_write(&path, content)?;
        trace!("Stored object {} ({} bytes)", utils::short_digest(&digest), content.len());
        Ok((digest, true))
    }

    /// Load the blob stored under `digest`
    ///
    /// # Errors
    ///
    /// [`VcsError::ObjectNotFound`] if no such blob exists.
    pub fn get(&self, digest: &str) -> Result<Vec<u8>> {
        if !self.exists(digest) {
            return Err(VcsError::ObjectNotFound(digest.to_string()));
        }
        let content = fs::read(self.object_path(digest))?;
        trace!("Loaded object {} ({} bytes)", utils::short_digest(digest), content.len());
        Ok(content)
    }

    /// Whether a blob with this digest is stored
    pub fn exists(&self, digest: &str) -> bool {
        utils::is_valid_digest(digest) && self.object_path(digest).is_file()
    }

    /// Path of the blob for `digest`
    pub fn object_path(&self, digest: &str) -> PathBuf {
        self.root.join(digest)
    }

    /// All stored digests, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut digests = Vec::new();
        if !self.root.exists() {
            return Ok(digests);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            // Skips leftover temp files from interrupted writes
            if entry.file_type()?.is_file() && utils::is_valid_digest(&name) {
                digests.push(name);
            }
        }
        digests.sort();
        Ok(digests)
    }

    /// Number of stored blobs
    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Total bytes of all stored blobs
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0;
        for digest in self.list()? {
            total += fs::metadata(self.object_path(&digest))?.len();
        }
        Ok(total)
    }
}
