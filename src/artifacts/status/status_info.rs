use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::status::file_change::{
    FileChange, FileChangeType, IndexChangeType, WorkspaceChangeType,
};
use crate::artifacts::status::inspector::Inspector;
use crate::artifacts::walk::TreeWalker;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub type FileStatSet = BTreeMap<PathBuf, EntryMetadata>;
pub type ChangeSet = BTreeMap<PathBuf, FileChangeType>;
pub type FileSet = BTreeSet<PathBuf>;
pub type HeadTree = BTreeMap<PathBuf, DatabaseEntry>;

/// Snapshot of how the working tree and index relate to the head tree.
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub(crate) file_stats: FileStatSet,
    pub(crate) untracked_files: FileSet,
    pub(crate) changed_files: BTreeMap<PathBuf, FileChange>,
    pub(crate) workspace_changeset: ChangeSet,
    pub(crate) index_changeset: ChangeSet,
    pub(crate) head_tree: HeadTree,
}

impl StatusInfo {
    /// Paths with uncommitted state: staged differences against the head
    /// tree plus working-tree differences against the index. Untracked
    /// files are deliberately excluded; they carry over untouched.
    pub fn dirty_paths(&self) -> FileSet {
        self.workspace_changeset
            .keys()
            .chain(self.index_changeset.keys())
            .cloned()
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.workspace_changeset.is_empty() && self.index_changeset.is_empty()
    }

    pub fn untracked_files(&self) -> &FileSet {
        &self.untracked_files
    }

    pub fn head_tree(&self) -> &HeadTree {
        &self.head_tree
    }

    pub fn workspace_changeset(&self) -> &ChangeSet {
        &self.workspace_changeset
    }

    pub fn index_changeset(&self) -> &ChangeSet {
        &self.index_changeset
    }

    pub fn file_stats(&self) -> &FileStatSet {
        &self.file_stats
    }

    pub fn changed_files(&self) -> &BTreeMap<PathBuf, FileChange> {
        &self.changed_files
    }
}

#[derive(new)]
pub struct Status<'r> {
    repository: &'r Repository,
}

impl Status<'_> {
    /// Scan the working tree, index and head tree and classify every
    /// path. Entries whose content is unchanged but whose stat fields
    /// drifted get their cached stat refreshed in the index.
    pub fn collect(&self, index: &mut Index) -> anyhow::Result<StatusInfo> {
        let inspector = Inspector::new(self.repository);

        let (file_stats, untracked_files) = self.scan_workspace(index)?;
        let head_tree = self.load_head_tree()?;
        let mut changed_files =
            self.check_index_entries(&file_stats, &head_tree, index, &inspector)?;
        self.collect_deleted_head_files(&head_tree, index, &mut changed_files);

        let workspace_changeset = changed_files
            .iter()
            .filter(|(_, change)| change.workspace_change != WorkspaceChangeType::None)
            .map(|(file, change)| {
                (
                    file.clone(),
                    FileChangeType::Workspace(change.workspace_change.clone()),
                )
            })
            .collect::<BTreeMap<_, _>>();
        let index_changeset = changed_files
            .iter()
            .filter(|(_, change)| change.index_change != IndexChangeType::None)
            .map(|(file, change)| {
                (
                    file.clone(),
                    FileChangeType::Index(change.index_change.clone()),
                )
            })
            .collect::<BTreeMap<_, _>>();

        Ok(StatusInfo {
            file_stats,
            untracked_files,
            changed_files,
            workspace_changeset,
            index_changeset,
            head_tree,
        })
    }

    fn scan_workspace(&self, index: &Index) -> anyhow::Result<(FileStatSet, FileSet)> {
        let mut file_stats = FileStatSet::new();
        let mut untracked_files = FileSet::new();

        for path in self.repository.workspace().list_files()? {
            if index.is_directly_tracked(&path) {
                let stat = self.repository.workspace().stat_file(&path)?;
                file_stats.insert(path, stat);
            } else {
                untracked_files.insert(path);
            }
        }

        Ok((file_stats, untracked_files))
    }

    fn load_head_tree(&self) -> anyhow::Result<HeadTree> {
        let mut head_tree = HeadTree::new();

        let Some(head_oid) = self.repository.refs().read_head()? else {
            return Ok(head_tree);
        };

        let tree_oid = self.repository.database().tree_of(&head_oid)?;
        for entry in TreeWalker::new(self.repository.database(), Some(&tree_oid), false) {
            let entry = entry?;
            head_tree.insert(
                entry.path.clone(),
                DatabaseEntry::new(entry.oid, entry.mode),
            );
        }

        Ok(head_tree)
    }

    fn check_index_entries(
        &self,
        file_stats: &FileStatSet,
        head_tree: &HeadTree,
        index: &mut Index,
        inspector: &Inspector<'_>,
    ) -> anyhow::Result<BTreeMap<PathBuf, FileChange>> {
        let mut changed_files = BTreeMap::<PathBuf, FileChange>::new();
        let index_entries = index.entries().cloned().collect::<Vec<_>>();

        for entry in index_entries {
            self.check_index_entry_against_workspace(
                &entry,
                file_stats,
                index,
                inspector,
                &mut changed_files,
            )?;
            self.check_index_entry_against_head_tree(
                &entry,
                head_tree,
                inspector,
                &mut changed_files,
            );
        }

        Ok(changed_files)
    }

    fn check_index_entry_against_workspace(
        &self,
        index_entry: &IndexEntry,
        file_stats: &FileStatSet,
        index: &mut Index,
        inspector: &Inspector<'_>,
        changed_files: &mut BTreeMap<PathBuf, FileChange>,
    ) -> anyhow::Result<()> {
        let stat = file_stats.get(&index_entry.name);
        let status = inspector.check_index_against_workspace(index_entry, stat)?;

        if status != WorkspaceChangeType::None {
            changed_files
                .entry(index_entry.name.clone())
                .or_default()
                .workspace_change = status;
        } else if let Some(stat) = stat {
            index.update_entry_stat(index_entry, stat.clone());
        }

        Ok(())
    }

    fn check_index_entry_against_head_tree(
        &self,
        index_entry: &IndexEntry,
        head_tree: &HeadTree,
        inspector: &Inspector<'_>,
        changed_files: &mut BTreeMap<PathBuf, FileChange>,
    ) {
        let head_entry = head_tree.get(&index_entry.name);
        let status = inspector.check_index_against_head_tree(Some(index_entry), head_entry);

        if status != IndexChangeType::None {
            changed_files
                .entry(index_entry.name.clone())
                .or_default()
                .index_change = status;
        }
    }

    fn collect_deleted_head_files(
        &self,
        head_tree: &HeadTree,
        index: &Index,
        changed_files: &mut BTreeMap<PathBuf, FileChange>,
    ) {
        head_tree.iter().for_each(|(path, _)| {
            if !index.is_directly_tracked(path) {
                changed_files.entry(path.clone()).or_default().index_change =
                    IndexChangeType::Deleted;
            }
        });
    }
}
