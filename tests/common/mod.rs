//! Fixture repositories built directly through the library: blobs and
//! trees stored in the object database, commits wired onto branches,
//! and files materialized with a plain checkout.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use switchyard::Repository;
use switchyard::artifacts::branch::branch_name::BranchName;
use switchyard::artifacts::database::database_entry::DatabaseEntry;
use switchyard::artifacts::index::entry_mode::{EntryMode, FileMode};
use switchyard::artifacts::objects::blob::Blob;
use switchyard::artifacts::objects::commit::{Author, Commit};
use switchyard::artifacts::objects::object::Object;
use switchyard::artifacts::objects::object_id::ObjectId;
use switchyard::artifacts::objects::tree::Tree;

pub struct FixtureRepo {
    // dropped last; deletes the directory
    _dir: assert_fs::TempDir,
    pub repository: Repository,
}

impl FixtureRepo {
    /// Initialize an empty repository in a fresh temp directory.
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let dir = assert_fs::TempDir::new().expect("temp directory");
        let repository = Repository::init(dir.path()).expect("repository init");

        FixtureRepo {
            _dir: dir,
            repository,
        }
    }

    /// Store `files` as blobs and nested trees, wrap them in a commit,
    /// and point a new branch at it.
    pub fn commit_branch(&self, branch: &str, files: &[(&str, &str)]) -> ObjectId {
        let files = files
            .iter()
            .map(|(path, content)| (*path, content.as_bytes()))
            .collect::<Vec<_>>();

        self.commit_branch_bytes(branch, &files)
    }

    /// Like [`Self::commit_branch`], for content that is not text.
    pub fn commit_branch_bytes(&self, branch: &str, files: &[(&str, &[u8])]) -> ObjectId {
        let commit_oid = self.store_commit_bytes(files);
        let branch = BranchName::try_parse(branch.to_string()).expect("branch name");
        self.repository
            .refs()
            .create_branch(&branch, &commit_oid)
            .expect("branch creation");

        commit_oid
    }

    /// Store a commit for `files` without any branch pointing at it.
    pub fn store_commit(&self, files: &[(&str, &str)]) -> ObjectId {
        let files = files
            .iter()
            .map(|(path, content)| (*path, content.as_bytes()))
            .collect::<Vec<_>>();

        self.store_commit_bytes(&files)
    }

    pub fn store_commit_bytes(&self, files: &[(&str, &[u8])]) -> ObjectId {
        let files = files
            .iter()
            .map(|(path, content)| (PathBuf::from(path), content.to_vec()))
            .collect::<BTreeMap<_, _>>();

        let tree_oid = self.store_tree(&files);
        let author = Author::new("Fixture Author".to_string(), "fixture@example.com".to_string());
        let commit = Commit::new(vec![], tree_oid, author, "fixture commit".to_string());
        self.repository.database().store(&commit).expect("commit store");

        commit.object_id().expect("commit oid")
    }

    /// Publish a commit under `refs/remotes/<remote>/<branch>` and
    /// register the remote in the config.
    pub fn commit_remote_branch(&self, remote: &str, branch: &str, files: &[(&str, &str)]) {
        let commit_oid = self.store_commit(files);

        if !self.repository.config().has_remote(remote).expect("config") {
            self.repository
                .config()
                .add_remote(remote, &format!("https://example.com/{remote}.git"))
                .expect("remote config");
        }

        let ref_path = self
            .repository
            .refs()
            .remotes_path()
            .join(remote)
            .join(branch)
            .into_boxed_path();
        self.repository
            .refs()
            .update_ref_file(ref_path, commit_oid.as_ref().to_string())
            .expect("remote ref");
    }

    fn store_tree(&self, files: &BTreeMap<PathBuf, Vec<u8>>) -> ObjectId {
        let mut entries = BTreeMap::<String, DatabaseEntry>::new();
        let mut subtrees = BTreeMap::<String, BTreeMap<PathBuf, Vec<u8>>>::new();

        for (path, content) in files {
            let mut components = path.components();
            let first = components
                .next()
                .expect("non-empty path")
                .as_os_str()
                .to_string_lossy()
                .to_string();
            let rest = components.as_path();

            if rest.as_os_str().is_empty() {
                let blob = Blob::new(content.clone());
                self.repository.database().store(&blob).expect("blob store");
                entries.insert(
                    first,
                    DatabaseEntry::new(
                        blob.object_id().expect("blob oid"),
                        EntryMode::File(FileMode::Regular),
                    ),
                );
            } else {
                subtrees
                    .entry(first)
                    .or_default()
                    .insert(rest.to_path_buf(), content.clone());
            }
        }

        for (name, subtree_files) in subtrees {
            let subtree_oid = self.store_tree(&subtree_files);
            entries.insert(name, DatabaseEntry::new(subtree_oid, EntryMode::Directory));
        }

        let tree = Tree::from_entries(entries);
        self.repository.database().store(&tree).expect("tree store");
        tree.object_id().expect("tree oid")
    }

    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.repository.path().join(path)).expect("file read")
    }

    pub fn read_file_bytes(&self, path: &str) -> Vec<u8> {
        std::fs::read(self.repository.path().join(path)).expect("file read")
    }

    pub fn write_file(&self, path: &str, content: &str) {
        let path = self.repository.path().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("parent directories");
        }
        std::fs::write(path, content).expect("file write");
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.repository.path().join(path).is_file()
    }

    pub fn head_contents(&self) -> String {
        std::fs::read_to_string(self.repository.path().join(".git").join("HEAD"))
            .expect("HEAD read")
            .trim()
            .to_string()
    }

    /// All regular files under the working tree, repo-relative, sorted.
    pub fn working_tree_files(&self) -> Vec<PathBuf> {
        let mut files = walk_files(self.repository.path(), self.repository.path());
        files.sort();
        files
    }
}

fn walk_files(root: &Path, dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir).expect("read dir") {
        let entry = entry.expect("dir entry");
        let path = entry.path();

        if path.file_name().is_some_and(|name| name == ".git") {
            continue;
        }

        if path.is_dir() {
            files.extend(walk_files(root, &path));
        } else {
            files.push(path.strip_prefix(root).expect("repo-relative").to_path_buf());
        }
    }

    files
}
