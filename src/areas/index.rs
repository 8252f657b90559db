//! Index (staged file-state cache)
//!
//! Maps repository-relative paths to the state each file had when it was
//! last synchronized with a tree. The checkout engine reads it to detect
//! local modifications and rewrites it after materializing a target tree.
//! Persisted in the binary format described in `artifacts::index`.

use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{
    ENTRY_BLOCK, ENTRY_MIN_SIZE, EntryMetadata, IndexEntry,
};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::{Packable, Unpackable};
use anyhow::anyhow;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// Persisted path → [`IndexEntry`] mapping with directory bookkeeping.
#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    /// Tracked files mapped by path
    entries: BTreeMap<Box<Path>, IndexEntry>,
    /// Directory paths to the entries beneath them
    children: BTreeMap<Box<Path>, BTreeSet<Box<Path>>>,
    header: IndexHeader,
    /// Set when in-memory state diverges from disk
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            header: IndexHeader::new(String::from(SIGNATURE), VERSION, 0),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// True if the path is a tracked file or a directory containing one.
    pub fn is_directly_tracked(&self, path: &Path) -> bool {
        self.entries.contains_key(path) || self.children.contains_key(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.entries.keys().map(|p| p.to_path_buf()).collect()
    }

    /// Whether the in-memory state diverged from what was last read
    /// from or written to disk.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Discard every entry; the caller is expected to repopulate from a
    /// target tree (forced checkout).
    pub fn reset(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.header = IndexHeader::empty();
        self.changed = true;
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.header = IndexHeader::empty();
        self.changed = false;
    }

    /// Load the index from disk, verifying the trailing checksum. A
    /// missing or empty file leaves the index empty. Takes a shared lock
    /// for the duration of the read.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        if !self.path().exists() {
            self.clear();
            std::fs::File::create(self.path())?;
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(self.path())?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        self.clear();

        if lock.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock);
        let entries_count = self.parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;

        reader.verify()
    }

    fn parse_header(&self, reader: &mut Checksum) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(std::io::Cursor::new(header_bytes))?;

        if header.marker != SIGNATURE {
            return Err(anyhow!("Invalid index file signature"));
        }

        if header.version != VERSION {
            return Err(anyhow!(
                "Unsupported index file version: {}",
                header.version
            ));
        }

        Ok(header.entries_count)
    }

    fn parse_entries(&mut self, entries_count: u32, reader: &mut Checksum) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let entry_bytes = reader.read(ENTRY_MIN_SIZE)?;
            let mut entry_bytes = entry_bytes.to_vec();

            // entries are NUL-padded to the block size; keep reading
            // blocks until the terminator shows up
            while entry_bytes[entry_bytes.len() - 1] != 0 {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry = IndexEntry::deserialize(std::io::Cursor::new(Bytes::from(entry_bytes)))?;
            self.store_entry(&entry);
        }

        self.header.entries_count = entries_count;

        Ok(())
    }

    /// Insert or replace an entry, evicting anything it shadows (a file
    /// where one of its parent directories used to be, or children of a
    /// directory it replaces).
    pub fn add(&mut self, entry: IndexEntry) -> anyhow::Result<()> {
        self.discard_conflicts(&entry);
        self.store_entry(&entry);

        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;

        Ok(())
    }

    /// Remove a path and anything tracked beneath it ("unstage").
    pub fn remove(&mut self, path: &Path) -> anyhow::Result<()> {
        self.remove_entry(path);
        self.remove_children(path);

        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;

        Ok(())
    }

    /// Refresh a cached stat snapshot. A snapshot identical to the
    /// cached one leaves the index unmarked, so a checkout that changed
    /// nothing does not rewrite the index file.
    pub fn update_entry_stat(&mut self, entry: &IndexEntry, stat: EntryMetadata) {
        if let Some(existing_entry) = self.entries.get_mut(entry.name.as_path())
            && existing_entry.metadata != stat
        {
            existing_entry.metadata = stat;
            self.changed = true;
        }
    }

    /// Rewrite the index file in full under an exclusive lock, appending
    /// the checksum trailer.
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path())?;
        let lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;

        let mut writer = Checksum::new(lock);

        self.header = IndexHeader {
            entries_count: self.entries.len() as u32,
            ..self.header.clone()
        };
        writer.write(&self.header.serialize()?)?;

        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }

        writer.write_checksum()?;
        self.changed = false;

        Ok(())
    }

    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for parent in entry.parent_dirs() {
            let parent = parent.to_path_buf();
            self.remove_entry(&parent);
        }
        self.remove_children(entry.name.as_path());
    }

    fn store_entry(&mut self, entry: &IndexEntry) {
        let key: Box<Path> = entry.name.clone().into_boxed_path();
        let parents = entry
            .parent_dirs()
            .into_iter()
            .map(|parent| parent.to_path_buf().into_boxed_path())
            .collect::<Vec<_>>();

        self.entries.insert(key.clone(), entry.clone());

        for parent in parents {
            self.children.entry(parent).or_default().insert(key.clone());
        }
    }

    fn remove_children(&mut self, path: &Path) {
        if let Some(children) = self.children.remove(path) {
            for child in children {
                self.remove_entry(&child);
            }
        }
    }

    fn remove_entry(&mut self, path: &Path) {
        let Some(entry) = self.entries.remove(path) else {
            return;
        };

        for parent in entry.parent_dirs() {
            let parent = parent.to_path_buf().into_boxed_path();
            if let Some(children) = self.children.get_mut(&parent) {
                children.remove(path);
                if children.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::objects::object_id::ObjectId;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn entry(name: &str, byte: u8) -> IndexEntry {
        let oid = ObjectId::try_parse(format!("{:02x}", byte).repeat(20)).unwrap();
        let metadata = EntryMetadata {
            mtime: 1_700_000_000,
            size: 3,
            mode: EntryMode::File(FileMode::Regular),
            flags: name.len() as u32,
            ..Default::default()
        };
        IndexEntry::new(PathBuf::from(name), oid, metadata)
    }

    #[test]
    fn written_index_rehydrates_with_verified_checksum() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("index").into_boxed_path();

        let mut index = Index::new(path.clone());
        index.add(entry("a.txt", 0xaa)).unwrap();
        index.add(entry("dir/b.txt", 0xbb)).unwrap();
        index.write_updates().unwrap();

        let mut reloaded = Index::new(path);
        reloaded.rehydrate().unwrap();

        assert_eq!(reloaded.tracked_paths(), index.tracked_paths());
        assert_eq!(
            reloaded.entry_by_path(Path::new("a.txt")).unwrap().oid,
            index.entry_by_path(Path::new("a.txt")).unwrap().oid
        );
        assert!(reloaded.is_directly_tracked(Path::new("dir")));
        assert!(!reloaded.is_changed());
    }

    #[test]
    fn corrupted_index_fails_checksum_verification() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("index").into_boxed_path();

        let mut index = Index::new(path.clone());
        index.add(entry("a.txt", 0xaa)).unwrap();
        index.write_updates().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        let mut reloaded = Index::new(path);
        assert!(reloaded.rehydrate().is_err());
    }

    #[test]
    fn refreshing_an_identical_stat_does_not_mark_the_index_changed() {
        let dir = assert_fs::TempDir::new().unwrap();
        let mut index = Index::new(dir.path().join("index").into_boxed_path());

        let entry = entry("a.txt", 0xaa);
        index.add(entry.clone()).unwrap();
        index.write_updates().unwrap();
        assert!(!index.is_changed());

        index.update_entry_stat(&entry, entry.metadata.clone());
        assert!(!index.is_changed());

        let drifted = EntryMetadata {
            mtime: entry.metadata.mtime + 1,
            ..entry.metadata.clone()
        };
        index.update_entry_stat(&entry, drifted.clone());
        assert!(index.is_changed());
        assert_eq!(
            index.entry_by_path(Path::new("a.txt")).unwrap().metadata,
            drifted
        );
    }

    #[test]
    fn adding_a_file_evicts_a_directory_it_shadows() {
        let dir = assert_fs::TempDir::new().unwrap();
        let mut index = Index::new(dir.path().join("index").into_boxed_path());

        index.add(entry("dir/b.txt", 0xbb)).unwrap();
        index.add(entry("dir", 0xcc)).unwrap();

        assert!(index.entry_by_path(Path::new("dir/b.txt")).is_none());
        assert!(index.entry_by_path(Path::new("dir")).is_some());
    }
}
