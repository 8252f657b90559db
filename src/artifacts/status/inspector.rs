use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use derive_new::new;
use std::borrow::Cow;

/// Pure per-path comparison rules. All judgments about whether a file
/// changed live here; the [`super::status_info::Status`] collector only
/// drives the scans.
#[derive(new)]
pub struct Inspector<'r> {
    repository: &'r Repository,
}

impl Inspector<'_> {
    /// Rehash the working copy and compare against the staged blob.
    /// Only reached when stat bits are inconclusive. Text content goes
    /// through [`normalize_line_endings`] on both sides, so a file
    /// differing only in CRLF counts as unchanged; binary content is
    /// compared byte for byte.
    fn is_content_changed(&self, index_entry: &IndexEntry) -> anyhow::Result<bool> {
        let content = self.repository.workspace().read_file(&index_entry.name)?;
        let oid = Blob::new(content.clone()).object_id()?;

        if oid == index_entry.oid {
            return Ok(false);
        }

        let Some(staged) = self
            .repository
            .database()
            .parse_object_as_blob(&index_entry.oid)?
        else {
            return Ok(true);
        };

        match (
            std::str::from_utf8(&content),
            std::str::from_utf8(staged.content()),
        ) {
            (Ok(working), Ok(staged)) => {
                Ok(normalize_line_endings(working) != normalize_line_endings(staged))
            }
            // binary on either side; the hashes already disagree
            _ => Ok(true),
        }
    }

    pub fn check_index_against_workspace(
        &self,
        entry: &IndexEntry,
        stat: Option<&EntryMetadata>,
    ) -> anyhow::Result<WorkspaceChangeType> {
        match stat {
            None => Ok(WorkspaceChangeType::Deleted),
            Some(stat) if entry.metadata.mode != stat.mode => Ok(WorkspaceChangeType::Modified),
            Some(stat) if entry.stat_match(stat) && entry.times_match(stat) => {
                Ok(WorkspaceChangeType::None)
            }
            Some(_) if self.is_content_changed(entry)? => Ok(WorkspaceChangeType::Modified),
            _ => Ok(WorkspaceChangeType::None),
        }
    }

    pub fn check_index_against_head_tree(
        &self,
        index_entry: Option<&IndexEntry>,
        head_entry: Option<&DatabaseEntry>,
    ) -> IndexChangeType {
        match (index_entry, head_entry) {
            (Some(index_entry), Some(head_entry))
                if head_entry.mode != index_entry.metadata.mode
                    || head_entry.oid != index_entry.oid =>
            {
                IndexChangeType::Modified
            }
            (Some(_), None) => IndexChangeType::Added,
            (None, Some(_)) => IndexChangeType::Deleted,
            _ => IndexChangeType::None,
        }
    }
}

fn normalize_line_endings(content: &str) -> Cow<'_, str> {
    if content.contains("\r\n") {
        Cow::Owned(content.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn crlf_normalizes_to_lf() {
        assert_eq!(normalize_line_endings("a\r\nb\r\n"), "a\nb\n");
        assert_eq!(normalize_line_endings("a\nb\n"), "a\nb\n");
    }
}
