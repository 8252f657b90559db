mod common;

use common::FixtureRepo;
use filetime::FileTime;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use switchyard::CheckoutError;
use switchyard::artifacts::branch::branch_name::BranchName;
use switchyard::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use switchyard::artifacts::objects::blob::Blob;
use switchyard::artifacts::objects::object::Object;

/// Two-branch fixture: `main` has a.txt="1" and c.txt="3", `feature`
/// has a.txt="2" and b.txt="x". The working tree starts on `main`.
fn two_branch_fixture() -> FixtureRepo {
    let fixture = FixtureRepo::new();
    fixture.commit_branch("main", &[("a.txt", "1"), ("c.txt", "3")]);
    fixture.commit_branch("feature", &[("a.txt", "2"), ("b.txt", "x")]);
    fixture.repository.checkout("main", true).unwrap();
    fixture
}

#[test]
fn switching_branches_materializes_target_tree_and_index() {
    let fixture = two_branch_fixture();

    fixture.repository.checkout("feature", false).unwrap();

    assert_eq!(fixture.read_file("a.txt"), "2");
    assert_eq!(fixture.read_file("b.txt"), "x");
    assert!(!fixture.file_exists("c.txt"));
    assert_eq!(fixture.head_contents(), "ref: refs/heads/feature");

    let a_oid = Blob::new("2".to_string()).object_id().unwrap();
    let b_oid = Blob::new("x".to_string()).object_id().unwrap();
    let mut index = fixture.repository.index();
    index.rehydrate().unwrap();
    assert_eq!(index.entry_by_path(Path::new("a.txt")).unwrap().oid, a_oid);
    assert_eq!(index.entry_by_path(Path::new("b.txt")).unwrap().oid, b_oid);
    assert!(index.entry_by_path(Path::new("c.txt")).is_none());
}

#[test]
fn repeated_checkout_performs_no_writes() {
    let fixture = two_branch_fixture();
    fixture.repository.checkout("feature", false).unwrap();

    let mtime_of = |path: &str| {
        let metadata = std::fs::metadata(fixture.repository.path().join(path)).unwrap();
        FileTime::from_last_modification_time(&metadata)
    };
    let mtimes_before = (mtime_of("a.txt"), mtime_of("b.txt"));
    let index_path = fixture.repository.path().join(".git/index");
    let index_bytes_before = std::fs::read(&index_path).unwrap();

    // stamp the index with a sentinel mtime; a rewrite would reset it
    // even when the serialized bytes come out identical
    let sentinel = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&index_path, sentinel).unwrap();

    fixture.repository.checkout("feature", false).unwrap();

    assert_eq!((mtime_of("a.txt"), mtime_of("b.txt")), mtimes_before);
    assert_eq!(mtime_of(".git/index"), sentinel);
    assert_eq!(std::fs::read(&index_path).unwrap(), index_bytes_before);
}

#[test]
fn binary_blob_materializes_byte_identical() {
    let raw: &[u8] = &[0x50, 0x4b, 0x03, 0x04, 0xff, 0xfe, 0x00, 0x9c, 0x01];
    let fixture = FixtureRepo::new();
    fixture.commit_branch("main", &[("readme.txt", "text")]);
    fixture.commit_branch_bytes("assets", &[("report.xlsx", raw), ("readme.txt", b"text")]);
    fixture.repository.checkout("main", true).unwrap();

    fixture.repository.checkout("assets", false).unwrap();

    assert_eq!(fixture.read_file_bytes("report.xlsx"), raw);

    // the binary file must not read as dirty on the way back
    fixture.repository.checkout("main", false).unwrap();
    assert!(!fixture.file_exists("report.xlsx"));
}

#[test]
fn noop_target_preserves_unstaged_edit() {
    let fixture = two_branch_fixture();
    fixture.write_file("a.txt", "1-local");

    fixture.repository.checkout("main", false).unwrap();

    assert_eq!(fixture.read_file("a.txt"), "1-local");
}

#[test]
fn local_edit_present_in_target_tree_survives_switch() {
    let fixture = two_branch_fixture();
    // a.txt exists on both branches; the local edit rides along
    fixture.write_file("a.txt", "1-local");

    fixture.repository.checkout("feature", false).unwrap();

    assert_eq!(fixture.read_file("a.txt"), "1-local");
    assert_eq!(fixture.read_file("b.txt"), "x");
    assert_eq!(fixture.head_contents(), "ref: refs/heads/feature");
}

#[test]
fn edit_missing_from_target_tree_aborts_before_any_mutation() {
    let fixture = two_branch_fixture();
    // c.txt exists on main only; feature would clobber the edit
    fixture.write_file("c.txt", "3-local");
    let index_bytes_before =
        std::fs::read(fixture.repository.path().join(".git/index")).unwrap();

    let error = fixture.repository.checkout("feature", false).unwrap_err();

    match error.downcast_ref::<CheckoutError>() {
        Some(CheckoutError::DirtyWorkingTree(path)) => {
            assert_eq!(path, &PathBuf::from("c.txt"));
        }
        other => panic!("expected DirtyWorkingTree, got {:?}", other),
    }

    assert_eq!(fixture.read_file("a.txt"), "1");
    assert_eq!(fixture.read_file("c.txt"), "3-local");
    assert!(!fixture.file_exists("b.txt"));
    assert_eq!(fixture.head_contents(), "ref: refs/heads/main");
    assert_eq!(
        std::fs::read(fixture.repository.path().join(".git/index")).unwrap(),
        index_bytes_before
    );
}

#[test]
fn stale_staged_entry_is_dropped_and_removed() {
    let fixture = two_branch_fixture();

    // stage a brand-new file by hand; it exists in neither branch tree
    fixture.write_file("staged.txt", "pending");
    let blob = Blob::new("pending".to_string());
    fixture.repository.database().store(&blob).unwrap();
    let metadata = std::fs::metadata(fixture.repository.path().join("staged.txt")).unwrap();
    let stat: EntryMetadata = (Path::new("staged.txt"), metadata).try_into().unwrap();
    {
        let mut index = fixture.repository.index();
        index.rehydrate().unwrap();
        index
            .add(IndexEntry::new(
                PathBuf::from("staged.txt"),
                blob.object_id().unwrap(),
                stat,
            ))
            .unwrap();
        index.write_updates().unwrap();
    }

    fixture.repository.checkout("feature", false).unwrap();

    assert!(!fixture.file_exists("staged.txt"));
    assert_eq!(fixture.read_file("a.txt"), "2");
    let mut index = fixture.repository.index();
    index.rehydrate().unwrap();
    assert!(index.entry_by_path(Path::new("staged.txt")).is_none());
}

#[test]
fn forced_checkout_discards_all_local_divergence() {
    let fixture = two_branch_fixture();
    fixture.write_file("a.txt", "scribbled over");
    fixture.write_file("c.txt", "also scribbled");

    fixture.repository.checkout("feature", true).unwrap();

    assert_eq!(fixture.read_file("a.txt"), "2");
    assert_eq!(fixture.read_file("b.txt"), "x");
    assert!(!fixture.file_exists("c.txt"));
    assert_eq!(
        fixture.working_tree_files(),
        vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
    );
}

#[test]
fn untracked_files_are_left_alone() {
    let fixture = two_branch_fixture();
    fixture.write_file("notes.md", "scratch space");

    fixture.repository.checkout("feature", false).unwrap();

    assert_eq!(fixture.read_file("notes.md"), "scratch space");
}

#[test]
fn directories_emptied_by_the_switch_are_pruned() {
    let fixture = FixtureRepo::new();
    fixture.commit_branch("main", &[("dir/sub/file.txt", "deep"), ("top.txt", "t")]);
    fixture.commit_branch("flat", &[("top.txt", "t")]);
    fixture.repository.checkout("main", true).unwrap();
    assert!(fixture.repository.path().join("dir/sub").is_dir());

    fixture.repository.checkout("flat", false).unwrap();

    assert!(!fixture.file_exists("dir/sub/file.txt"));
    assert!(!fixture.repository.path().join("dir").exists());
    assert_eq!(fixture.read_file("top.txt"), "t");
}

#[test]
fn remote_branch_target_creates_tracking_local_branch() {
    let fixture = FixtureRepo::new();
    fixture.commit_branch("main", &[("a.txt", "1")]);
    fixture.repository.checkout("main", true).unwrap();
    fixture.commit_remote_branch("origin", "topic", &[("a.txt", "1"), ("t.txt", "remote")]);

    fixture.repository.checkout("origin/topic", false).unwrap();

    assert_eq!(fixture.head_contents(), "ref: refs/heads/topic");
    assert!(
        fixture
            .repository
            .path()
            .join(".git/refs/heads/topic")
            .is_file()
    );
    assert_eq!(fixture.read_file("t.txt"), "remote");
}

#[test]
fn remote_branch_target_reuses_existing_local_branch() {
    let fixture = FixtureRepo::new();
    fixture.commit_branch("main", &[("a.txt", "1")]);
    fixture.repository.checkout("main", true).unwrap();
    fixture.commit_remote_branch("origin", "topic", &[("t.txt", "remote")]);

    fixture.repository.checkout("origin/topic", false).unwrap();
    // second resolution of the same remote target must not fail on the
    // now-existing local branch
    fixture.repository.checkout("main", false).unwrap();
    fixture.repository.checkout("origin/topic", false).unwrap();

    assert_eq!(fixture.head_contents(), "ref: refs/heads/topic");
    assert_eq!(fixture.read_file("t.txt"), "remote");
}

#[test]
fn raw_commit_id_detaches_head() {
    let fixture = two_branch_fixture();
    let feature = BranchName::try_parse("feature".to_string()).unwrap();
    let commit_oid = fixture
        .repository
        .refs()
        .read_branch(&feature)
        .unwrap()
        .expect("feature tip");

    fixture
        .repository
        .checkout(commit_oid.as_ref(), false)
        .unwrap();

    assert_eq!(fixture.head_contents(), commit_oid.as_ref());
    assert_eq!(fixture.read_file("a.txt"), "2");
}

#[test]
fn head_marker_rematerializes_without_moving_head() {
    let fixture = two_branch_fixture();
    std::fs::remove_file(fixture.repository.path().join("a.txt")).unwrap();

    fixture.repository.checkout("HEAD", true).unwrap();

    assert_eq!(fixture.head_contents(), "ref: refs/heads/main");
    assert_eq!(fixture.read_file("a.txt"), "1");
}

#[test]
fn unknown_target_is_rejected_without_mutation() {
    let fixture = two_branch_fixture();

    let error = fixture
        .repository
        .checkout("no-such-branch", false)
        .unwrap_err();

    match error.downcast_ref::<CheckoutError>() {
        Some(CheckoutError::UnresolvableTarget(spec)) => {
            assert_eq!(spec, "no-such-branch");
        }
        other => panic!("expected UnresolvableTarget, got {:?}", other),
    }
    assert_eq!(fixture.head_contents(), "ref: refs/heads/main");
    assert_eq!(fixture.read_file("a.txt"), "1");
}
