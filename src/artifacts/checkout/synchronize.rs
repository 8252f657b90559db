//! Checkout orchestration
//!
//! A short sequential pipeline over one repository handle: resolve the
//! target, collect the dirty set, run the conflict check, and only then
//! touch refs, files and the index. The conflict pass completing is the
//! atomicity boundary: nothing on disk changes before it.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::conflict;
use crate::artifacts::checkout::materializer::Materializer;
use crate::artifacts::checkout::target::Target;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::status_info::Status;
use crate::artifacts::walk::TreeWalker;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bring the working tree, index and HEAD in line with `target`.
///
/// Non-forced checkouts preserve local changes the target tree can
/// carry and abort on ones it cannot; forced checkouts discard all
/// local divergence up front.
pub fn synchronize(repository: &Repository, target: &str, force: bool) -> anyhow::Result<()> {
    let mut index = repository.index();
    index.rehydrate()?;

    let target = Target::classify(repository, target)?;
    let target_oid = target.resolve_oid(repository)?;
    let target_tree = repository.database().tree_of(&target_oid)?;
    debug!(
        target = %target.describe(),
        tree = %target_tree.to_short_oid(),
        force,
        "resolved checkout target"
    );

    let current_tree = repository
        .refs()
        .read_head()?
        .map(|oid| repository.database().tree_of(&oid))
        .transpose()?;

    let previously_tracked = collect_previously_tracked(repository, &index, current_tree.as_ref())?;

    let preserved = if force {
        index.reset();
        BTreeSet::new()
    } else {
        let status = Status::new(repository).collect(&mut index)?;
        let dirty_paths = status.dirty_paths();
        debug!(dirty = dirty_paths.len(), "collected dirty set");

        let resolution = conflict::check_safe(
            repository.database(),
            &dirty_paths,
            current_tree.as_ref(),
            &target_tree,
        )?;
        debug!(
            stale = resolution.stale.len(),
            preserved = resolution.preserved.len(),
            "conflict check passed"
        );
        resolution.preserved
    };

    target.update_refs(repository, &target_oid)?;

    Materializer::new(repository).apply(&mut index, &target_tree, previously_tracked, &preserved)?;

    info!(
        target = %target.describe(),
        position = %repository.refs().current_ref(None)?,
        preserved = preserved.len(),
        "checkout complete"
    );

    Ok(())
}

/// Paths tracked before the switch: everything in the index plus
/// everything in the current tree. The cleanup pass removes whichever
/// of these the target tree does not revisit.
fn collect_previously_tracked(
    repository: &Repository,
    index: &Index,
    current_tree: Option<&ObjectId>,
) -> anyhow::Result<BTreeSet<PathBuf>> {
    let mut tracked: BTreeSet<PathBuf> = index.tracked_paths().into_iter().collect();

    for entry in TreeWalker::new(repository.database(), current_tree, false) {
        tracked.insert(entry?.path);
    }

    Ok(tracked)
}
