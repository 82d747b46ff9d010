//! Main test module for snapvcs
//!
//! This module includes all test suites:
//! - Integration tests for complete workflows
//! - Chaos tests for damaged or contended state directories
//! - Property-based tests for tree and diff invariants
//! - Edge cases for unusual working directories

pub mod chaos;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::snapvcs::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(temp_dir.path());
        repo.init().unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_empty_directory() {
        let (temp_dir, repo) = init_repo();

        // Commit of an empty working directory
        let empty = repo.commit("Empty", "alice").unwrap();
        let commit = repo.get_commit(&empty).unwrap().unwrap();
        assert_eq!(commit.file_count(), 0);

        fs::write(temp_dir.path().join("file.txt"), "content").unwrap();

        // Checkout removes the file again
        repo.checkout(&empty).unwrap();
        assert!(!temp_dir.path().join("file.txt").exists());
        assert!(temp_dir.path().join(DEFAULT_STATE_DIR).is_dir());
    }

    #[test]
    fn test_empty_subdirectories_are_not_recorded() {
        let (temp_dir, repo) = init_repo();
        fs::create_dir_all(temp_dir.path().join("empty/nested")).unwrap();
        fs::write(temp_dir.path().join("kept.txt"), "x").unwrap();

        let digest = repo.commit("dirs", "alice").unwrap();
        let commit = repo.get_commit(&digest).unwrap().unwrap();
        assert!(commit.file_tree().find(Path::new("empty")).is_none());

        repo.checkout(&digest).unwrap();
        assert!(!temp_dir.path().join("empty").exists());
        assert!(temp_dir.path().join("kept.txt").is_file());
    }

    #[test]
    fn test_deeply_nested_directories() {
        let (temp_dir, repo) = init_repo();

        let mut deep = PathBuf::new();
        for i in 0..40 {
            deep.push(format!("level_{}", i));
        }
        fs::create_dir_all(temp_dir.path().join(&deep)).unwrap();
        fs::write(temp_dir.path().join(deep.join("bottom.txt")), "deep").unwrap();

        let digest = repo.commit("deep", "alice").unwrap();
        fs::remove_dir_all(temp_dir.path().join("level_0")).unwrap();

        repo.checkout(&digest).unwrap();
        let restored = fs::read_to_string(temp_dir.path().join(deep.join("bottom.txt"))).unwrap();
        assert_eq!(restored, "deep");

        let commit = repo.get_commit(&digest).unwrap().unwrap();
        assert_eq!(commit.file_tree().directory_count(), 40);
    }

    #[test]
    fn test_binary_and_empty_files() {
        let (temp_dir, repo) = init_repo();
        let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(temp_dir.path().join("blob.bin"), &binary).unwrap();
        fs::write(temp_dir.path().join("empty.txt"), b"").unwrap();

        let digest = repo.commit("binary", "alice").unwrap();
        fs::write(temp_dir.path().join("blob.bin"), b"overwritten").unwrap();
        fs::remove_file(temp_dir.path().join("empty.txt")).unwrap();

        repo.checkout(&digest).unwrap();
        assert_eq!(fs::read(temp_dir.path().join("blob.bin")).unwrap(), binary);
        assert_eq!(fs::read(temp_dir.path().join("empty.txt")).unwrap(), b"");

        let files = repo.get_all_files_in_commit(&digest).unwrap();
        let empty = files.iter().find(|(p, _)| p == Path::new("empty.txt")).unwrap();
        assert_eq!(empty.1.file_size(), 0);
        assert_eq!(empty.1.content_hash(), Some(utils::hash_data(b"").as_str()));
    }

    #[test]
    fn test_unicode_file_names() {
        let (temp_dir, repo) = init_repo();
        let names = ["日本語.txt", "émigré.md", "emoji_🚀.rs", "with space.txt"];
        for name in &names {
            fs::write(temp_dir.path().join(name), name.as_bytes()).unwrap();
        }

        let digest = repo.commit("unicode", "zoë").unwrap();
        for name in &names {
            fs::remove_file(temp_dir.path().join(name)).unwrap();
        }

        repo.checkout(&digest).unwrap();
        for name in &names {
            assert_eq!(fs::read_to_string(temp_dir.path().join(name)).unwrap(), *name);
        }
        assert_eq!(repo.get_commit(&digest).unwrap().unwrap().author(), "zoë");
    }

    #[test]
    fn test_identical_content_is_stored_once() {
        let (temp_dir, repo) = init_repo();
        for i in 0..10 {
            fs::write(temp_dir.path().join(format!("copy_{}.txt", i)), "same bytes").unwrap();
        }

        let outcome = repo.commit_with_summary("copies", "alice").unwrap();
        assert_eq!(outcome.files, 10);
        assert_eq!(outcome.new_objects, 1);

        let stats = repo.stats().unwrap();
        assert_eq!(stats.object_count, 1);
        assert_eq!(stats.object_bytes, "same bytes".len() as u64);
    }

    #[test]
    fn test_blank_message_and_author_rejected() {
        let (_temp_dir, repo) = init_repo();
        assert!(matches!(repo.commit("   ", "alice"), Err(VcsError::InvalidArgument(_))));
        assert!(matches!(repo.commit("msg", "\t"), Err(VcsError::InvalidArgument(_))));
        assert_eq!(repo.get_history().unwrap().len(), 1);
    }

    #[test]
    fn test_custom_state_dir_name() {
        let temp_dir = TempDir::new().unwrap();
        let repo = RepositoryBuilder::new()
            .state_dir_name(".history")
            .build(temp_dir.path())
            .unwrap();
        repo.init().unwrap();
        assert!(temp_dir.path().join(".history").is_dir());
        assert!(!temp_dir.path().join(DEFAULT_STATE_DIR).exists());

        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        let digest = repo.commit("c1", "alice").unwrap();
        let files = repo.get_all_files_in_commit(&digest).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, PathBuf::from("a.txt"));

        // The default handle does not see this repository
        assert!(!Repository::new(temp_dir.path()).is_repository());
    }

    #[test]
    fn test_invalid_state_dir_names() {
        for name in ["", "a/b", "..", "."] {
            let result = RepositoryBuilder::new().state_dir_name(name).build("/tmp/anywhere");
            assert!(matches!(result, Err(VcsError::InvalidArgument(_))), "{:?}", name);
        }
    }

    #[test]
    fn test_nested_state_dir_name_is_regular_content() {
        let (temp_dir, repo) = init_repo();
        // Only the top-level state directory is excluded
        let nested = temp_dir.path().join("sub").join(DEFAULT_STATE_DIR);
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("data"), "x").unwrap();

        let digest = repo.commit("nested", "alice").unwrap();
        let commit = repo.get_commit(&digest).unwrap().unwrap();
        let path = Path::new("sub").join(DEFAULT_STATE_DIR).join("data");
        assert!(commit.file_tree().find_file(&path).is_some());
    }

    #[test]
    fn test_remove_file_validation() {
        let (temp_dir, repo) = init_repo();
        fs::create_dir(temp_dir.path().join("dir")).unwrap();

        let absolute = temp_dir.path().join("dir");
        assert!(matches!(
            repo.remove_file_from_repository(&absolute),
            Err(VcsError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.remove_file_from_repository("../outside.txt"),
            Err(VcsError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.remove_file_from_repository("dir"),
            Err(VcsError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.remove_file_from_repository(Path::new(DEFAULT_STATE_DIR).join("HEAD")),
            Err(VcsError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.remove_file_from_repository("missing.txt"),
            Err(VcsError::PathNotFound(_))
        ));
        assert!(temp_dir.path().join(DEFAULT_STATE_DIR).join("HEAD").is_file());
    }

    #[test]
    fn test_file_history_of_unknown_path() {
        let (temp_dir, repo) = init_repo();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        repo.commit("c1", "alice").unwrap();

        assert!(repo.get_file_history("never.txt").unwrap().is_empty());
        // Directories are not files
        fs::create_dir(temp_dir.path().join("d")).unwrap();
        fs::write(temp_dir.path().join("d/x"), "x").unwrap();
        repo.commit("c2", "alice").unwrap();
        assert!(repo.get_file_history("d").unwrap().is_empty());
        assert_eq!(repo.get_file_history("d/x").unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_commit_inputs() {
        let (temp_dir, repo) = init_repo();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        let digest = repo.commit("c1", "alice").unwrap();

        assert_eq!(repo.resolve_commit("HEAD").unwrap(), digest);
        assert_eq!(repo.resolve_commit(&digest).unwrap(), digest);
        assert_eq!(repo.resolve_commit(&digest.to_uppercase()).unwrap(), digest);
        assert!(matches!(repo.resolve_commit("ab"), Err(VcsError::InvalidArgument(_))));
        assert!(matches!(repo.resolve_commit("not-hex!"), Err(VcsError::InvalidArgument(_))));

        // Two commits: a 12 character prefix is unique with overwhelming probability
        assert_eq!(repo.resolve_commit(&digest[..12]).unwrap(), digest);
        assert!(matches!(
            repo.resolve_commit(&"0".repeat(64)),
            Err(VcsError::CommitNotFound(_))
        ));
    }
}
