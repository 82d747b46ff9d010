//! Property-based testing for snapvcs
//!
//! Uses proptest to check tree, diff, store and encoding invariants across
//! randomly generated paths and contents.

use ::snapvcs::diff::compare_trees;
use ::snapvcs::store::ContentStore;
use ::snapvcs::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generate random relative file paths
pub fn path_strategy() -> impl Strategy<Value = PathBuf> {
    let dirs = prop::collection::vec("[a-d]{1,2}", 0..=3);
    let file = prop_oneof!["file[0-9]\\.txt", "[e-h]{1,3}\\.(rs|md)"];
    (dirs, file).prop_map(|(dirs, file)| {
        let mut path: PathBuf = dirs.into_iter().collect();
        path.push(file);
        path
    })
}

/// Generate a map of paths to small contents
///
/// Directory names and file names use disjoint alphabets and extensions, so
/// no path can be both a file and a directory.
pub fn tree_strategy() -> impl Strategy<Value = BTreeMap<PathBuf, Vec<u8>>> {
    prop::collection::btree_map(path_strategy(), prop::collection::vec(any::<u8>(), 0..64), 0..12)
}

/// Build a tree whose digests come from the contents
pub fn build_tree(files: &BTreeMap<PathBuf, Vec<u8>>) -> FileTree {
    let mut tree = FileTree::new();
    for (path, content) in files {
        tree.insert(path, utils::hash_data(content), content.len() as u64).unwrap();
    }
    tree
}

/// Write `files` below `root`
pub fn write_files(root: &Path, files: &BTreeMap<PathBuf, Vec<u8>>) {
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_list_files_is_sorted_and_complete(files in tree_strategy()) {
            let tree = build_tree(&files);
            let listed: Vec<PathBuf> = tree.list_files().into_iter().map(|(p, _)| p).collect();

            let mut sorted = listed.clone();
            sorted.sort();
            prop_assert_eq!(&listed, &sorted);

            let expected: Vec<PathBuf> = files.keys().cloned().collect();
            let as_set: BTreeSet<PathBuf> = listed.into_iter().collect();
            prop_assert_eq!(as_set.into_iter().collect::<Vec<_>>(), expected);
            prop_assert_eq!(tree.file_count(), files.len());
            prop_assert_eq!(
                tree.total_size(),
                files.values().map(|c| c.len() as u64).sum::<u64>()
            );
        }

        #[test]
        fn prop_insert_order_does_not_matter(files in tree_strategy()) {
            let forward = build_tree(&files);
            let mut backward = FileTree::new();
            for (path, content) in files.iter().rev() {
                backward.insert(path, utils::hash_data(content), content.len() as u64).unwrap();
            }
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_find_file_returns_inserted_leaf(files in tree_strategy()) {
            let tree = build_tree(&files);
            for (path, content) in &files {
                let node = tree.find_file(path);
                prop_assert!(node.is_some());
                let node = node.unwrap();
                let digest = utils::hash_data(content);
                prop_assert_eq!(node.content_hash(), Some(digest.as_str()));
                prop_assert_eq!(node.file_size(), content.len() as u64);
            }
        }

        #[test]
        fn prop_diff_against_self_is_unchanged(files in tree_strategy()) {
            let tree = build_tree(&files);
            let diff = compare_trees(&tree, &tree);
            prop_assert!(!diff.has_changes());
            prop_assert_eq!(diff.unchanged.len(), files.len());
        }

        #[test]
        fn prop_diff_partitions_union(old in tree_strategy(), new in tree_strategy()) {
            let diff = compare_trees(&build_tree(&old), &build_tree(&new));

            let added: BTreeSet<&PathBuf> = diff.added.iter().collect();
            let removed: BTreeSet<&PathBuf> = diff.removed.iter().collect();
            prop_assert!(added.is_disjoint(&removed));

            let mut buckets: Vec<&PathBuf> = diff.added.iter()
                .chain(diff.removed.iter())
                .chain(diff.modified.iter().map(|m| &m.path))
                .chain(diff.unchanged.iter())
                .collect();
            let total = buckets.len();
            buckets.sort();
            buckets.dedup();
            prop_assert_eq!(buckets.len(), total);

            let union: Vec<&PathBuf> = old.keys().chain(new.keys()).collect::<BTreeSet<_>>().into_iter().collect();
            prop_assert_eq!(buckets, union);

            for modified in &diff.modified {
                prop_assert_ne!(&modified.old_hash, &modified.new_hash);
                prop_assert_eq!(modified.new_size, new[&modified.path].len() as u64);
            }
        }

        #[test]
        fn prop_store_is_idempotent(content in prop::collection::vec(any::<u8>(), 0..512)) {
            let temp_dir = TempDir::new().unwrap();
            let store = ContentStore::new(temp_dir.path().to_path_buf());

            let (first, written_first) = store.store(&content).unwrap();
            let (second, written_second) = store.store(&content).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(written_first);
            prop_assert!(!written_second);
            prop_assert_eq!(store.count().unwrap(), 1);
            prop_assert_eq!(store.get(&first).unwrap(), content);
        }

        #[test]
        fn prop_commit_encoding_is_deterministic(
            message in "[a-zA-Z0-9]{1,20}( [a-zA-Z0-9]{1,20}){0,3}",
            author in "[a-z]{1,12}",
        ) {
            let commit = Commit::new(&message, &author, None).unwrap();
            let encoded = commit.to_bytes().unwrap();
            prop_assert_eq!(&encoded, &commit.to_bytes().unwrap());
            prop_assert_eq!(utils::hash_data(&encoded), commit.digest().unwrap());

            let decoded = Commit::from_bytes(&encoded).unwrap();
            prop_assert_eq!(decoded.message(), message.as_str());
            prop_assert_eq!(decoded.to_bytes().unwrap(), encoded);
            prop_assert_eq!(decoded, commit);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_checkout_restores_committed_tree(
            first in tree_strategy(),
            second in tree_strategy(),
        ) {
            let temp_dir = TempDir::new().unwrap();
            let repo = Repository::new(temp_dir.path());
            repo.init().unwrap();

            write_files(temp_dir.path(), &first);
            let target = repo.commit("first", "prop").unwrap();

            for entry in fs::read_dir(temp_dir.path()).unwrap() {
                let entry = entry.unwrap();
                if entry.file_name() != DEFAULT_STATE_DIR {
                    utils::remove_entry(&entry.path()).unwrap();
                }
            }
            write_files(temp_dir.path(), &second);
            repo.commit("second", "prop").unwrap();

            repo.checkout(&target).unwrap();
            let restored: BTreeMap<PathBuf, Vec<u8>> = repo
                .get_all_files_in_commit(&target)
                .unwrap()
                .into_iter()
                .map(|(path, _)| {
                    let content = fs::read(temp_dir.path().join(&path)).unwrap();
                    (path, content)
                })
                .collect();
            prop_assert_eq!(restored, first.clone());

            let on_disk = walkdir::WalkDir::new(temp_dir.path())
                .min_depth(1)
                .into_iter()
                .filter_entry(|e| !(e.depth() == 1 && e.file_name() == DEFAULT_STATE_DIR))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .count();
            prop_assert_eq!(on_disk, first.len());
        }
    }
}
