//! Main repository implementation
//!
//! [`Repository`] is the entry point for every version-control operation. It
//! ties the working directory to its state directory and coordinates the
//! subsystems:
//!
//! - **Storage**: blob store, commit store, HEAD and `config.json`
//! - **FileTree**: the snapshot built while committing
//! - **Diff**: tree comparison between commits
//! - **Lock**: exclusive access for mutating operations
//!
//! ## Lifecycle
//!
//! A repository starts **uninitialized**. [`Repository::init`] creates the
//! state directory and a root commit; from then on commits, checkouts and
//! queries are available. Constructing a [`Repository`] performs no I/O.
//!
//! ## Checkout is destructive
//!
//! [`Repository::checkout`] deletes everything in the working directory except
//! the state directory before rebuilding the target snapshot. Uncommitted work
//! is lost.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use snapvcs::Repository;
//!
//! # fn main() -> snapvcs::Result<()> {
//! let repo = Repository::new("./my_project");
//! repo.init()?;
//!
//! std::fs::write("./my_project/notes.txt", "hello")?;
//! let first = repo.commit("Add notes", "alice")?;
//!
//! std::fs::write("./my_project/notes.txt", "hello again")?;
//! repo.commit("Update notes", "alice")?;
//!
//! // Back to the first version
//! repo.checkout(&first)?;
//! # Ok(())
//! # }
//! ```

use crate::commit::Commit;
use crate::diff;
use crate::error::{Result, VcsError};
use crate::file_tree::FileTree;
use crate::lock::RepositoryLock;
use crate::node::Node;
use crate::storage::{Storage, HEAD_FILE};
use crate::store::ContentStore;
use crate::types::*;
use crate::utils;
use std::collections::{BTreeSet, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, trace, warn};
use walkdir::WalkDir;

/// Message of the commit created by [`Repository::init`]
pub const ROOT_COMMIT_MESSAGE: &str = "initial";
/// Author of the commit created by [`Repository::init`]
pub const ROOT_COMMIT_AUTHOR: &str = "system";
/// Shortest accepted commit prefix
pub const MIN_PREFIX_LEN: usize = 4;

/// A working directory under version control
///
/// # Examples
///
/// ```rust,no_run
/// use snapvcs::Repository;
///
/// # fn main() -> snapvcs::Result<()> {
/// // Default configuration
/// let repo = Repository::new("./project");
///
/// // Custom configuration
/// let repo = Repository::builder()
///     .skip_unchanged(true)
///     .build("./project")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Repository {
    work_dir: PathBuf,
    state_dir: PathBuf,
    config: RepositoryConfig,
}

/// Counters gathered while walking the working directory
#[derive(Debug, Default)]
struct SnapshotStats {
    files: usize,
    bytes: u64,
    new_objects: usize,
    skipped: usize,
}

/// Counters gathered while rebuilding the working directory
#[derive(Debug, Default)]
struct RestoreStats {
    files: usize,
    directories: usize,
    bytes: u64,
}

impl Repository {
    /// Repository for `work_dir` with the default configuration
    ///
    /// Relative paths are made absolute against the current directory.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(work_dir.into(), RepositoryConfig::default())
    }

    /// Start configuring a repository
    pub fn builder() -> RepositoryBuilder {
        RepositoryBuilder::new()
    }

    fn with_config(work_dir: PathBuf, config: RepositoryConfig) -> Self {
        let work_dir = std::path::absolute(&work_dir).unwrap_or(work_dir);
        let state_dir = work_dir.join(&config.state_dir_name);
        Self {
            work_dir,
            state_dir,
            config,
        }
    }

    /// Working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Hidden state directory inside the working directory
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Active configuration
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Whether the state directory and HEAD exist
    pub fn is_repository(&self) -> bool {
        self.state_dir.is_dir() && self.state_dir.join(HEAD_FILE).is_file()
    }

    /// Initialize the repository and create the root commit
    ///
    /// Creates the working directory if needed, the state directory layout and
    /// a parentless commit with an empty tree. Files already present in the
    /// working directory are not committed.
    ///
    /// # Returns
    ///
    /// Digest of the root commit, which HEAD now points to.
    ///
    /// # Errors
    ///
    /// - [`VcsError::AlreadyExists`] if the state directory exists
    /// - [`VcsError::Io`] if the layout cannot be created
    #[instrument(skip(self), fields(work_dir = ?self.work_dir))]
    pub fn init(&self) -> Result<String> {
        info!("Initializing repository at {:?}", self.work_dir);
        if self.state_dir.exists() {
            return Err(VcsError::AlreadyExists(self.state_dir.clone()));
        }

        fs::create_dir_all(&self.work_dir)?;
        let storage = Storage::init(self.state_dir.clone(), self.config.clone())?;
        let _lock = RepositoryLock::acquire(storage.root())?;

        let root = Commit::new(ROOT_COMMIT_MESSAGE, ROOT_COMMIT_AUTHOR, None)?;
        let digest = storage.store_commit(&root)?;
        storage.write_head(&digest)?;

        info!("Initialized repository with root commit {}", utils::short_digest(&digest));
        Ok(digest)
    }

    /// Snapshot the working directory as a new commit
    ///
    /// See [`Repository::commit_with_summary`]; this returns only the digest.
    pub fn commit(&self, message: &str, author: &str) -> Result<String> {
        self.commit_with_summary(message, author).map(|outcome| outcome.digest)
    }

    /// Snapshot the working directory and report statistics
    ///
    /// Walks the working directory in name order, skipping the state
    /// directory. Every regular file is stored in the blob store and recorded
    /// in the new commit's tree; the commit's parent is the current HEAD.
    /// Files that cannot be read are skipped with a warning, as are symlinks
    /// (unless `follow_symlinks` is set) and special files.
    ///
    /// Every call writes a new commit, even when nothing changed, unless the
    /// repository was built with `skip_unchanged(true)`. In that case an
    /// unchanged tree returns HEAD with `created == false`.
    ///
    /// # Errors
    ///
    /// - [`VcsError::NotARepository`] if the repository is not initialized
    /// - [`VcsError::InvalidArgument`] if message or author is blank
    /// - [`VcsError::RepositoryLocked`] if another process holds the lock
    #[instrument(skip(self), fields(work_dir = ?self.work_dir))]
    pub fn commit_with_summary(&self, message: &str, author: &str) -> Result<CommitOutcome> {
        let start = Instant::now();
        let storage = self.open_storage()?;
        let _lock = RepositoryLock::acquire(storage.root())?;
        let parent = self.require_head(&storage)?;
        let mut commit = Commit::new(message, author, Some(parent.clone()))?;

        debug!("Scanning {:?}", self.work_dir);
        let stats = self.snapshot_into(storage.objects(), commit.file_tree_mut())?;

        if self.config.skip_unchanged {
            let head_commit = storage.load_commit(&parent)?;
            if !diff::compare_trees(head_commit.file_tree(), commit.file_tree()).has_changes() {
                info!("No changes since {}, commit skipped", utils::short_digest(&parent));
                return Ok(CommitOutcome {
                    digest: parent,
                    created: false,
                    files: stats.files,
                    bytes: stats.bytes,
                    new_objects: stats.new_objects,
                    skipped: stats.skipped,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }
        }

        let digest = storage.store_commit(&commit)?;
        storage.write_head(&digest)?;

        let duration = start.elapsed();
        info!(
            "Created commit {} in {:?} ({} files, {}, {} new objects)",
            utils::short_digest(&digest),
            duration,
            stats.files,
            utils::format_bytes(stats.bytes),
            stats.new_objects
        );

        Ok(CommitOutcome {
            digest,
            created: true,
            files: stats.files,
            bytes: stats.bytes,
            new_objects: stats.new_objects,
            skipped: stats.skipped,
            duration_ms: duration.as_millis() as u64,
        })
    }

    /// Restore the working directory to the commit `digest`
    ///
    /// All blobs the commit references are checked before anything on disk is
    /// touched. Then every entry of the working directory except the state
    /// directory is deleted and the commit's tree is written back. HEAD moves
    /// to `digest`.
    ///
    /// # Errors
    ///
    /// - [`VcsError::NotARepository`] if the repository is not initialized
    /// - [`VcsError::CommitNotFound`] if no commit has this digest
    /// - [`VcsError::CorruptObject`] if the commit is unreadable or a blob is missing
    ///
    /// # Safety
    ///
    /// Uncommitted files are lost. An interrupted checkout can leave a
    /// partially rebuilt tree; running it again completes it.
    #[instrument(skip(self), fields(work_dir = ?self.work_dir))]
    pub fn checkout(&self, digest: &str) -> Result<CheckoutResult> {
        let start = Instant::now();
        let storage = self.open_storage()?;
        let _lock = RepositoryLock::acquire(storage.root())?;
        let commit = storage.load_commit(digest)?;
        info!("Checking out {}", utils::short_digest(digest));

        for (path, node) in commit.file_tree().list_files() {
            let Some(hash) = node.content_hash() else {
                continue;
            };
            if !storage.objects().exists(hash) {
                return Err(VcsError::corrupt(format!(
                    "blob {} for {:?} is missing",
                    utils::short_digest(hash),
                    path
                )));
            }
        }

        let entries_removed = self.clear_work_dir()?;
        debug!("Removed {} entries from working directory", entries_removed);

        let mut stats = RestoreStats::default();
        restore_node(storage.objects(), commit.file_tree().root(), &self.work_dir, &mut stats)?;
        storage.write_head(digest)?;

        let result = CheckoutResult {
            digest: digest.to_string(),
            entries_removed,
            files_restored: stats.files,
            directories_created: stats.directories,
            bytes_written: stats.bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Checked out {} in {}ms ({} files restored, {} entries removed)",
            utils::short_digest(digest),
            result.duration_ms,
            result.files_restored,
            result.entries_removed
        );
        Ok(result)
    }

    /// Current HEAD digest; `None` for an uninitialized repository
    pub fn head(&self) -> Result<Option<String>> {
        if !self.is_repository() {
            return Ok(None);
        }
        self.open_storage()?.read_head()
    }

    /// Load a commit; `None` if no commit has this digest
    ///
    /// # Errors
    ///
    /// [`VcsError::CorruptObject`] if the commit exists but cannot be decoded.
    pub fn get_commit(&self, digest: &str) -> Result<Option<Commit>> {
        let storage = self.open_storage()?;
        if !storage.commit_exists(digest) {
            return Ok(None);
        }
        storage.load_commit(digest).map(Some)
    }

    /// Resolve `HEAD`, a full digest or a unique prefix to a full digest
    ///
    /// # Errors
    ///
    /// - [`VcsError::InvalidArgument`] for prefixes shorter than four hex characters
    /// - [`VcsError::CommitNotFound`] if nothing matches
    /// - [`VcsError::AmbiguousCommit`] if several commits match
    pub fn resolve_commit(&self, rev: &str) -> Result<String> {
        let storage = self.open_storage()?;
        let rev = rev.trim();
        if rev.eq_ignore_ascii_case("HEAD") {
            return self.require_head(&storage);
        }

        let prefix = rev.to_ascii_lowercase();
        if storage.commit_exists(&prefix) {
            return Ok(prefix);
        }
        if prefix.len() < MIN_PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VcsError::invalid_argument(format!(
                "'{}' is not a commit digest or a prefix of at least {} hex characters",
                rev, MIN_PREFIX_LEN
            )));
        }

        let mut matches: Vec<String> = storage
            .list_commits()?
            .into_iter()
            .filter(|digest| digest.starts_with(&prefix))
            .collect();
        match matches.len() {
            0 => Err(VcsError::CommitNotFound(rev.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(VcsError::AmbiguousCommit {
                prefix: rev.to_string(),
                matches: n,
            }),
        }
    }

    /// Commits reachable from HEAD, most recent first
    ///
    /// Follows parent links until the root commit. A parent that is not in
    /// the commit store ends the history without an error; a parent that
    /// exists but cannot be decoded is an error.
    pub fn get_history(&self) -> Result<Vec<HistoryEntry>> {
        let storage = self.open_storage()?;
        let mut history = Vec::new();
        let mut seen = HashSet::new();
        let mut current = storage.read_head()?;

        while let Some(digest) = current {
            if !storage.commit_exists(&digest) {
                debug!("History ends at missing commit {}", utils::short_digest(&digest));
                break;
            }
            if !seen.insert(digest.clone()) {
                warn!("Parent chain loops back to {}", utils::short_digest(&digest));
                break;
            }
            let commit = storage.load_commit(&digest)?;
            current = commit.parent_commit_hash().map(str::to_string);
            history.push((digest, commit));
        }

        trace!("Loaded {} history entries", history.len());
        Ok(history)
    }

    /// History entries in which `path` is a file, most recent first
    ///
    /// One entry per commit containing the file, whether or not its content
    /// changed in that commit.
    pub fn get_file_history(&self, path: impl AsRef<Path>) -> Result<Vec<FileHistoryEntry>> {
        let path = path.as_ref();
        Ok(self
            .get_history()?
            .into_iter()
            .filter_map(|(digest, commit)| {
                let node = commit.file_tree().find_file(path)?.clone();
                Some((digest, commit, node))
            })
            .collect())
    }

    /// Every file of a commit with its relative path, sorted by path
    pub fn get_all_files_in_commit(&self, digest: &str) -> Result<Vec<(PathBuf, Node)>> {
        let commit = self.open_storage()?.load_commit(digest)?;
        Ok(commit
            .file_tree()
            .list_files()
            .into_iter()
            .map(|(path, node)| (path, node.clone()))
            .collect())
    }

    /// Compare the trees of two commits; `from` is treated as the older one
    pub fn compare_commits(&self, from: &str, to: &str) -> Result<CommitDiff> {
        let storage = self.open_storage()?;
        let from_commit = storage.load_commit(from)?;
        let to_commit = storage.load_commit(to)?;

        let changes = diff::compare_trees(from_commit.file_tree(), to_commit.file_tree());
        debug!(
            "Compared {} -> {}: {} added, {} removed, {} modified",
            utils::short_digest(from),
            utils::short_digest(to),
            changes.added.len(),
            changes.removed.len(),
            changes.modified.len()
        );

        Ok(CommitDiff {
            from_digest: from.to_string(),
            to_digest: to.to_string(),
            from: from_commit.summary(),
            to: to_commit.summary(),
            changes,
        })
    }

    /// Delete a file from the working directory
    ///
    /// Only the working copy is removed; no commit is created, so the file
    /// disappears from the next commit onward.
    ///
    /// # Errors
    ///
    /// - [`VcsError::InvalidArgument`] for absolute paths, paths with `..`,
    ///   paths inside the state directory and directories
    /// - [`VcsError::PathNotFound`] if nothing exists at `path`
    #[instrument(skip(self), fields(work_dir = ?self.work_dir))]
    pub fn remove_file_from_repository(&self, path: impl AsRef<Path> + std::fmt::Debug) -> Result<()> {
        let path = path.as_ref();
        let storage = self.open_storage()?;

        if path.is_absolute() {
            return Err(VcsError::invalid_argument(format!(
                "{:?} must be relative to the working directory",
                path
            )));
        }
        let segments = utils::path_segments(path)?;
        match segments.first() {
            None => return Err(VcsError::invalid_argument("cannot remove an empty path")),
            Some(first) if *first == self.config.state_dir_name => {
                return Err(VcsError::invalid_argument(format!(
                    "{:?} is inside the state directory",
                    path
                )));
            }
            Some(_) => {}
        }

        let _lock = RepositoryLock::acquire(storage.root())?;
        let full_path = segments.iter().fold(self.work_dir.clone(), |acc, s| acc.join(s));
        let metadata = match fs::symlink_metadata(&full_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VcsError::PathNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(VcsError::Io(e)),
        };
        if metadata.is_dir() {
            return Err(VcsError::invalid_argument(format!("{:?} is a directory", path)));
        }

        fs::remove_file(&full_path)?;
        info!("Removed {:?} from working directory", path);
        Ok(())
    }

    /// Repository state for presentation layers
    ///
    /// Never fails on an uninitialized path; `is_repository` is `false` and
    /// the other fields are empty.
    pub fn get_status(&self) -> Result<RepositoryStatus> {
        if !self.is_repository() {
            return Ok(RepositoryStatus {
                is_repository: false,
                work_dir: self.work_dir.clone(),
                ..Default::default()
            });
        }

        let history = self.get_history()?;
        let head_digest = self.head()?;
        let head_message = history.first().map(|(_, commit)| commit.message().to_string());

        Ok(RepositoryStatus {
            is_repository: true,
            work_dir: self.work_dir.clone(),
            head_digest,
            head_message,
            total_commits: history.len(),
        })
    }

    /// Aggregate statistics over history and the state directory
    pub fn stats(&self) -> Result<RepositoryStats> {
        let storage = self.open_storage()?;
        let history = self.get_history()?;

        let unique_authors: BTreeSet<&str> = history.iter().map(|(_, c)| c.author()).collect();
        let max_files_in_commit = history.iter().map(|(_, c)| c.file_count()).max().unwrap_or(0);

        Ok(RepositoryStats {
            total_commits: history.len(),
            unique_authors: unique_authors.into_iter().map(str::to_string).collect(),
            max_files_in_commit,
            object_count: storage.objects().count()?,
            object_bytes: storage.objects().total_size()?,
            stored_commits: storage.list_commits()?.len(),
            state_dir_bytes: utils::dir_size(storage.root())?,
        })
    }

    fn open_storage(&self) -> Result<Storage> {
        if !self.is_repository() {
            return Err(VcsError::NotARepository(self.work_dir.clone()));
        }
        Storage::open(self.state_dir.clone())
    }

    fn require_head(&self, storage: &Storage) -> Result<String> {
        storage
            .read_head()?
            .ok_or_else(|| VcsError::NotARepository(self.work_dir.clone()))
    }

    /// Walk the working directory into `tree`, storing every file's content
    fn snapshot_into(&self, store: &ContentStore, tree: &mut FileTree) -> Result<SnapshotStats> {
        let mut stats = SnapshotStats::default();
        let state_dir_name = OsStr::new(&self.config.state_dir_name);

        let walker = WalkDir::new(&self.work_dir)
            .min_depth(1)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == state_dir_name));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                debug!("Skipping non-regular file {:?}", entry.path());
                stats.skipped += 1;
                continue;
            }

            let relative = utils::make_relative(entry.path(), &self.work_dir)?;
            let content = match fs::read(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping {:?}: {}", relative, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let (digest, written) = store.store(&content)?;
            match tree.insert(&relative, digest, content.len() as u64) {
                Ok(()) => {}
                Err(VcsError::InvalidArgument(reason)) => {
                    warn!("Skipping {:?}: {}", relative, reason);
                    stats.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }

            trace!("Snapshotted {:?}", relative);
            stats.files += 1;
            stats.bytes += content.len() as u64;
            if written {
                stats.new_objects += 1;
            }
        }

        Ok(stats)
    }

    /// Delete every top-level entry except the state directory
    fn clear_work_dir(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.work_dir)? {
            let entry = entry?;
            if entry.file_name() == OsStr::new(&self.config.state_dir_name) {
                continue;
            }
            utils::remove_entry(&entry.path())?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// Recreate the children of `node` below `dir`
fn restore_node(store: &ContentStore, node: &Node, dir: &Path, stats: &mut RestoreStats) -> Result<()> {
    for child in node.children() {
        let path = dir.join(child.name());
        match child.content_hash() {
            None => {
                fs::create_dir_all(&path)?;
                stats.directories += 1;
                restore_node(store, child, &path, stats)?;
            }
            Some(hash) => {
                let content = store.get(hash).map_err(|e| match e {
                    VcsError::ObjectNotFound(missing) => {
                        VcsError::corrupt(format!("blob {} for {:?} is missing", missing, path))
                    }
                    other => other,
                })?;
                fs::write(&path, &content)?;
                stats.files += 1;
                stats.bytes += content.len() as u64;
            }
        }
    }
    Ok(())
}

/// Builder pattern for repository configuration
///
/// # Examples
///
/// ```rust,no_run
/// use snapvcs::RepositoryBuilder;
///
/// # fn main() -> snapvcs::Result<()> {
/// let repo = RepositoryBuilder::new()
///     .state_dir_name(".history")
///     .skip_unchanged(true)
///     .follow_symlinks(false)
///     .build("./my_project")?;
/// # Ok(())
/// # }
/// ```
///
/// # Default Values
///
/// - `state_dir_name`: `.snapvcs`
/// - `skip_unchanged`: false (every commit call writes a commit)
/// - `follow_symlinks`: false (symlinks are skipped)
#[derive(Debug, Clone, Default)]
pub struct RepositoryBuilder {
    config: RepositoryConfig,
}

impl RepositoryBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the state directory inside the working directory
    pub fn state_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.state_dir_name = name.into();
        self
    }

    /// Return HEAD instead of writing a commit when the tree is unchanged
    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.config.skip_unchanged = skip;
        self
    }

    /// Snapshot symlinked files as their target's content
    ///
    /// Symlinks pointing outside the working directory pull outside content
    /// into commits. Checkout writes regular files back, not links.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    /// Build the repository handle; performs no I/O
    ///
    /// # Errors
    ///
    /// [`VcsError::InvalidArgument`] if the state directory name is not a
    /// single path segment.
    pub fn build(self, work_dir: impl Into<PathBuf>) -> Result<Repository> {
        let name = &self.config.state_dir_name;
        let single_segment = utils::path_segments(Path::new(name))
            .map(|segments| segments.len() == 1 && segments[0] == *name)
            .unwrap_or(false);
        if !single_segment {
            return Err(VcsError::invalid_argument(format!(
                "state directory name {:?} must be a single path segment",
                name
            )));
        }
        Ok(Repository::with_config(work_dir.into(), self.config))
    }
}
