//! Chaos tests for snapvcs
//!
//! Damages the state directory in the ways a crash, a full disk or a careless
//! user would, and checks that every operation reports it instead of
//! returning wrong data or destroying the working directory.

use ::snapvcs::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A repository with two commits over a small tree
pub struct DamagedRepo {
    pub repo: Repository,
    pub temp_dir: TempDir,
    pub first: String,
    pub second: String,
}

impl DamagedRepo {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(temp_dir.path());
        repo.init().unwrap();

        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/lib.rs"), "pub fn f() {}").unwrap();
        let first = repo.commit("first", "alice").unwrap();

        fs::write(temp_dir.path().join("b.txt"), "beta").unwrap();
        let second = repo.commit("second", "bob").unwrap();

        Self { repo, temp_dir, first, second }
    }

    pub fn state_path(&self, parts: &[&str]) -> PathBuf {
        parts.iter().fold(self.repo.state_dir().to_path_buf(), |acc, p| acc.join(p))
    }

    pub fn commit_path(&self, digest: &str) -> PathBuf {
        self.state_path(&["commits", digest])
    }

    pub fn blob_path(&self, content: &[u8]) -> PathBuf {
        self.state_path(&["objects", utils::hash_data(content).as_str()])
    }

    /// Names and contents of the top-level working directory files
    pub fn working_files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = fs::read_dir(self.temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| (e.file_name().to_string_lossy().into_owned(), fs::read(e.path()).unwrap()))
            .collect();
        files.sort();
        files
    }
}

impl Default for DamagedRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(path: &Path, len: usize) {
    let bytes = fs::read(path).unwrap();
    fs::write(path, &bytes[..len.min(bytes.len())]).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_missing_blob_leaves_working_tree_untouched() {
        let fixture = DamagedRepo::new();
        fs::remove_file(fixture.blob_path(b"alpha")).unwrap();
        fs::write(fixture.temp_dir.path().join("work.txt"), "unsaved").unwrap();
        let before = fixture.working_files();

        let err = fixture.repo.checkout(&fixture.first).unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {}", err);

        assert_eq!(fixture.working_files(), before);
        assert_eq!(fixture.repo.head().unwrap(), Some(fixture.second.clone()));
    }

    #[test]
    fn test_truncated_commit_is_corrupt() {
        let fixture = DamagedRepo::new();
        let path = fixture.commit_path(&fixture.first);
        let len = fs::metadata(&path).unwrap().len() as usize;
        truncate(&path, len / 2);

        assert!(matches!(
            fixture.repo.get_commit(&fixture.first),
            Err(VcsError::CorruptObject(_))
        ));
        assert!(matches!(
            fixture.repo.checkout(&fixture.first),
            Err(VcsError::CorruptObject(_))
        ));
        // The chain passes through the damaged commit
        assert!(matches!(fixture.repo.get_history(), Err(VcsError::CorruptObject(_))));
        assert!(fixture.temp_dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_commit_without_header_is_corrupt() {
        let fixture = DamagedRepo::new();
        truncate(&fixture.commit_path(&fixture.second), 3);
        assert!(matches!(
            fixture.repo.get_commit(&fixture.second),
            Err(VcsError::CorruptObject(_))
        ));

        fs::write(fixture.commit_path(&fixture.second), b"").unwrap();
        let err = fixture.repo.compare_commits(&fixture.first, &fixture.second).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let fixture = DamagedRepo::new();
        let path = fixture.commit_path(&fixture.first);
        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(b"junk");
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            fixture.repo.get_commit(&fixture.first),
            Err(VcsError::CorruptObject(_))
        ));
    }

    #[test]
    fn test_missing_parent_truncates_history() {
        let fixture = DamagedRepo::new();
        fs::remove_file(fixture.commit_path(&fixture.first)).unwrap();

        let history = fixture.repo.get_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0, fixture.second);
        assert_eq!(history[0].1.parent_commit_hash(), Some(fixture.first.as_str()));

        assert!(matches!(
            fixture.repo.checkout(&fixture.first),
            Err(VcsError::CommitNotFound(_))
        ));
    }

    #[test]
    fn test_garbage_head() {
        let fixture = DamagedRepo::new();
        fs::write(fixture.state_path(&["HEAD"]), "definitely not a digest\n").unwrap();

        assert!(matches!(fixture.repo.head(), Err(VcsError::CorruptObject(_))));
        assert!(matches!(fixture.repo.get_history(), Err(VcsError::CorruptObject(_))));
        assert!(matches!(fixture.repo.commit("x", "y"), Err(VcsError::CorruptObject(_))));

        // Checking out a known commit repairs HEAD
        fixture.repo.checkout(&fixture.second).unwrap();
        assert_eq!(fixture.repo.get_history().unwrap().len(), 3);
    }

    #[test]
    fn test_lock_held_by_live_process() {
        let fixture = DamagedRepo::new();
        let lock_path = fixture.state_path(&["LOCK"]);
        fs::write(&lock_path, format!("{}\n", std::process::id())).unwrap();

        assert!(matches!(
            fixture.repo.commit("blocked", "alice"),
            Err(VcsError::RepositoryLocked(_))
        ));
        assert!(matches!(
            fixture.repo.checkout(&fixture.first),
            Err(VcsError::RepositoryLocked(_))
        ));
        assert!(fixture.temp_dir.path().join("b.txt").exists());
        assert!(lock_path.exists());

        // Readers are not blocked
        assert_eq!(fixture.repo.get_history().unwrap().len(), 3);

        fs::remove_file(&lock_path).unwrap();
        fixture.repo.commit("unblocked", "alice").unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[traced_test]
    fn test_stale_lock_is_reclaimed_with_warning() {
        let fixture = DamagedRepo::new();
        fs::write(fixture.state_path(&["LOCK"]), "999999999\n").unwrap();

        fixture.repo.commit("after crash", "alice").unwrap();
        assert!(!fixture.state_path(&["LOCK"]).exists());
        assert!(logs_contain("Reclaiming stale repository lock"));
    }

    #[test]
    fn test_newer_format_is_rejected() {
        let fixture = DamagedRepo::new();
        let config_path = fixture.state_path(&["config.json"]);
        let mut config: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        config["format_version"] = serde_json::json!(CURRENT_FORMAT_VERSION + 1);
        fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert!(matches!(
            fixture.repo.get_history(),
            Err(VcsError::IncompatibleFormat { .. })
        ));
    }

    #[test]
    fn test_missing_config_is_not_a_repository() {
        let fixture = DamagedRepo::new();
        fs::remove_file(fixture.state_path(&["config.json"])).unwrap();
        assert!(matches!(fixture.repo.get_history(), Err(VcsError::NotARepository(_))));
    }

    #[test]
    fn test_deleted_working_directory_is_rebuilt() {
        let fixture = DamagedRepo::new();
        fs::remove_file(fixture.temp_dir.path().join("a.txt")).unwrap();
        fs::remove_dir_all(fixture.temp_dir.path().join("src")).unwrap();

        fixture.repo.checkout(&fixture.second).unwrap();
        let names: Vec<String> = fixture.working_files().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(fixture.temp_dir.path().join("src/lib.rs").is_file());
    }

    #[cfg(unix)]
    #[test]
    #[traced_test]
    fn test_dangling_symlink_is_skipped_during_commit() {
        let temp_dir = TempDir::new().unwrap();
        let repo = RepositoryBuilder::new()
            .follow_symlinks(true)
            .build(temp_dir.path())
            .unwrap();
        repo.init().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir(temp_dir.path().join("dir")).unwrap();
        fs::write(temp_dir.path().join("dir/b.txt"), "beta").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("nowhere"), temp_dir.path().join("dangling"))
            .unwrap();

        let outcome = repo.commit_with_summary("with dangling link", "alice").unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.files, 2);

        let commit = repo.get_commit(&outcome.digest).unwrap().unwrap();
        assert!(commit.file_tree().find_file(Path::new("a.txt")).is_some());
        assert!(commit.file_tree().find_file(Path::new("dir/b.txt")).is_some());
        assert!(commit.file_tree().find(Path::new("dangling")).is_none());
        assert!(logs_contain("Skipping unreadable entry"));
    }

    #[cfg(unix)]
    #[test]
    #[traced_test]
    fn test_unreadable_file_is_skipped_during_commit() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(temp_dir.path());
        repo.init().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        let secret = temp_dir.path().join("secret.txt");
        fs::write(&secret, "hidden").unwrap();
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop root
        if fs::read(&secret).is_ok() {
            return;
        }

        let outcome = repo.commit_with_summary("with unreadable file", "alice").unwrap();
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.files, 1);
        let commit = repo.get_commit(&outcome.digest).unwrap().unwrap();
        assert!(commit.file_tree().find_file(Path::new("a.txt")).is_some());
        assert!(commit.file_tree().find_file(Path::new("secret.txt")).is_none());
        assert!(logs_contain("secret.txt"));
        assert!(!repo.state_dir().join("objects").join(utils::hash_data(b"hidden")).exists());
    }
}
