//! On-disk state directory
//!
//! [`Storage`] owns everything under the hidden state directory of a working
//! directory: the blob store, the commit store, the HEAD pointer and the
//! format record.
//!
//! ## Architecture
//!
//! ```text
//! .snapvcs/
//! ├── config.json        # StorageMetadata: format version, hash algorithm, config
//! ├── HEAD               # digest of the current commit
//! ├── LOCK               # present while a writer holds the repository lock
//! ├── commits/
//! │   └── <digest>       # encoded Commit, keyed by the digest of its bytes
//! └── objects/
//!     └── <digest>       # raw file content
//! ```
//!
//! Commits and objects are write-once. HEAD and `config.json` are replaced
//! atomically through a temporary file and a rename.
//!
//! ## Error Handling
//!
//! - A missing `config.json` means the directory is not a repository
//! - A `format_version` newer than this build understands is
//!   [`VcsError::IncompatibleFormat`]
//! - An unreadable commit or a HEAD that is not a digest is
//!   [`VcsError::CorruptObject`]

use crate::commit::Commit;
use crate::error::{Result, VcsError};
use crate::store::ContentStore;
use crate::types::{RepositoryConfig, StorageMetadata, CURRENT_FORMAT_VERSION};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// File holding [`StorageMetadata`]
pub const CONFIG_FILE: &str = "config.json";
/// File holding the current commit digest
pub const HEAD_FILE: &str = "HEAD";
/// Directory of encoded commits
pub const COMMITS_DIR: &str = "commits";
/// Directory of blobs
pub const OBJECTS_DIR: &str = "objects";

/// Handle on an initialized state directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    objects: ContentStore,
    metadata: StorageMetadata,
}

impl Storage {
    /// Create a new state directory at `root`
    ///
    /// # Errors
    ///
    /// - [`VcsError::AlreadyExists`] if `root` already exists
    /// - [`VcsError::Io`] if filesystem operations fail
    pub fn init(root: PathBuf, config: RepositoryConfig) -> Result<Self> {
        if root.exists() {
            return Err(VcsError::AlreadyExists(root));
        }

        fs::create_dir_all(root.join(OBJECTS_DIR))?;
        fs::create_dir_all(root.join(COMMITS_DIR))?;

        let metadata = StorageMetadata::new(config);
        let metadata_json = serde_json::to_string_pretty(&metadata)?;
        utils::atomic_write(&root.join(CONFIG_FILE), metadata_json.as_bytes())?;

        info!("Initialized storage at {:?}", root);

        Ok(Self {
            objects: ContentStore::new(root.join(OBJECTS_DIR)),
            root,
            metadata,
        })
    }

    /// Open an existing state directory
    ///
    /// # Errors
    ///
    /// - [`VcsError::NotARepository`] if `config.json` is missing
    /// - [`VcsError::IncompatibleFormat`] if the format is newer than supported
    /// - [`VcsError::Json`] if `config.json` cannot be parsed
    pub fn open(root: PathBuf) -> Result<Self> {
        let metadata_path = root.join(CONFIG_FILE);
        if !metadata_path.is_file() {
            return Err(VcsError::NotARepository(root));
        }

        let metadata_json = fs::read_to_string(&metadata_path)?;
        let metadata: StorageMetadata = serde_json::from_str(&metadata_json)?;
        if metadata.format_version > CURRENT_FORMAT_VERSION {
            return Err(VcsError::IncompatibleFormat {
                found: metadata.format_version,
                supported: CURRENT_FORMAT_VERSION,
            });
        }

        debug!("Opened storage at {:?}", root);

        Ok(Self {
            objects: ContentStore::new(root.join(OBJECTS_DIR)),
            root,
            metadata,
        })
    }

    /// Persist a commit and return its digest
    ///
    /// Storing a commit that is already present is a no-op.
    pub fn store_commit(&self, commit: &Commit) -> Result<String> {
        let bytes = commit.to_bytes()?;
        let digest = utils::hash_data(&bytes);
        let path = self.commit_path(&digest);
        if !path.exists() {
            utils::atomic_write(&path, &bytes)?;
        }
        debug!("Stored commit {} ({} bytes)", utils::short_digest(&digest), bytes.len());
        Ok(digest)
    }

    /// Load and decode the commit stored under `digest`
    ///
    /// # Errors
    ///
    /// - [`VcsError::CommitNotFound`] if no such commit is stored
    /// - [`VcsError::CorruptObject`] if the stored bytes do not decode
    pub fn load_commit(&self, digest: &str) -> Result<Commit> {
        if !self.commit_exists(digest) {
            return Err(VcsError::CommitNotFound(digest.to_string()));
        }
        let bytes = fs::read(self.commit_path(digest))?;
        trace!("Loaded commit {} ({} bytes)", utils::short_digest(digest), bytes.len());
        Commit::from_bytes(&bytes)
            .map_err(|e| VcsError::corrupt(format!("commit {}: {}", utils::short_digest(digest), e)))
    }

    /// Whether a commit with this digest is stored
    pub fn commit_exists(&self, digest: &str) -> bool {
        utils::is_valid_digest(digest) && self.commit_path(digest).is_file()
    }

    /// All stored commit digests, sorted
    pub fn list_commits(&self) -> Result<Vec<String>> {
        let mut digests = Vec::new();
        let commits_dir = self.root.join(COMMITS_DIR);
        if commits_dir.exists() {
            for entry in fs::read_dir(commits_dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.file_type()?.is_file() && utils::is_valid_digest(&name) {
                    digests.push(name);
                }
            }
        }
        digests.sort();
        Ok(digests)
    }

    /// Current HEAD digest, `None` if HEAD was never written
    ///
    /// # Errors
    ///
    /// [`VcsError::CorruptObject`] if HEAD does not hold a digest.
    pub fn read_head(&self) -> Result<Option<String>> {
        let head_path = self.root.join(HEAD_FILE);
        if !head_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&head_path)?;
        let digest = content.trim();
        if !utils::is_valid_digest(digest) {
            return Err(VcsError::corrupt(format!("HEAD does not hold a digest: {:?}", digest)));
        }
        Ok(Some(digest.to_string()))
    }

    /// Point HEAD at `digest`
    pub fn write_head(&self, digest: &str) -> Result<()> {
        utils::atomic_write(&self.root.join(HEAD_FILE), format!("{}\n", digest).as_bytes())?;
        debug!("HEAD -> {}", utils::short_digest(digest));
        Ok(())
    }

    /// Blob store
    pub fn objects(&self) -> &ContentStore {
        &self.objects
    }

    /// Metadata read from `config.json`
    pub fn metadata(&self) -> &StorageMetadata {
        &self.metadata
    }

    /// State directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn commit_path(&self, digest: &str) -> PathBuf {
        self.root.join(COMMITS_DIR).join(digest)
    }
}
