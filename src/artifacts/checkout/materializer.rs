//! Working-tree materialization
//!
//! Writes the target tree to disk and brings the index in line with it,
//! then removes whatever the switch untracked. Runs only after the
//! conflict detector has committed to proceeding.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::walk::{TreeWalker, WalkEntry};
use derive_new::new;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

#[derive(new)]
pub struct Materializer<'r> {
    repository: &'r Repository,
}

impl Materializer<'_> {
    /// Write every blob reachable from `target_tree`, skipping preserved
    /// dirty paths, then unstage and delete everything in
    /// `previously_tracked` the target tree no longer defines. The index
    /// is persisted once, at the end.
    pub fn apply(
        &self,
        index: &mut Index,
        target_tree: &ObjectId,
        previously_tracked: BTreeSet<PathBuf>,
        preserved: &BTreeSet<PathBuf>,
    ) -> anyhow::Result<()> {
        let visited = self.write_target_tree(index, target_tree, preserved)?;
        self.clean_untracked(index, previously_tracked, &visited, preserved)?;

        if index.is_changed() {
            index.write_updates()?;
        }

        Ok(())
    }

    fn write_target_tree(
        &self,
        index: &mut Index,
        target_tree: &ObjectId,
        preserved: &BTreeSet<PathBuf>,
    ) -> anyhow::Result<BTreeSet<PathBuf>> {
        let mut visited = BTreeSet::new();

        for entry in TreeWalker::new(self.repository.database(), Some(target_tree), false) {
            let entry = entry?;
            visited.insert(entry.path.clone());

            if preserved.contains(&entry.path) {
                debug!(path = %entry.path.display(), "preserving local change");
                continue;
            }

            if self.is_up_to_date(index, &entry)? {
                continue;
            }

            let blob = self
                .repository
                .database()
                .parse_object_as_blob(&entry.oid)?
                .ok_or_else(|| anyhow::anyhow!("object {} is not a blob", entry.oid))?;

            self.repository
                .workspace()
                .write_blob(&entry.path, blob.content(), &entry.mode)?;

            // index reflects the blob just written, with a fresh stat
            let stat = self.repository.workspace().stat_file(&entry.path)?;
            index.add(IndexEntry::new(entry.path, entry.oid, stat))?;
        }

        Ok(visited)
    }

    /// A path needs no write when its index entry already records the
    /// target blob and the on-disk file still matches that entry.
    fn is_up_to_date(&self, index: &Index, entry: &WalkEntry) -> anyhow::Result<bool> {
        let Some(existing) = index.entry_by_path(&entry.path) else {
            return Ok(false);
        };

        if existing.oid != entry.oid
            || existing.metadata.mode != entry.mode
            || !self.repository.workspace().file_exists(&entry.path)
        {
            return Ok(false);
        }

        let stat = self.repository.workspace().stat_file(&entry.path)?;
        Ok(existing.stat_match(&stat) && existing.times_match(&stat))
    }

    /// Unstage and remove paths the switch left behind: anything that
    /// was tracked before but is neither part of the target tree nor a
    /// preserved local change. Directories emptied by a removal are
    /// pruned up to (but never including) the repository root.
    fn clean_untracked(
        &self,
        index: &mut Index,
        previously_tracked: BTreeSet<PathBuf>,
        visited: &BTreeSet<PathBuf>,
        preserved: &BTreeSet<PathBuf>,
    ) -> anyhow::Result<()> {
        for path in previously_tracked {
            if visited.contains(&path) || preserved.contains(&path) {
                continue;
            }

            debug!(path = %path.display(), "removing untracked path");
            index.remove(&path)?;
            self.repository.workspace().remove_file_and_prune(&path)?;
        }

        Ok(())
    }
}
