//! Recursive tree traversal
//!
//! Depth-first, pre-order walk over a stored tree, yielding
//! repository-relative paths. Children are visited in tree entry order
//! (byte-wise by name). Directories themselves are only yielded when
//! `include_trees` is set; blobs are always yielded.

use crate::areas::database::Database;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;

/// One visited tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub mode: EntryMode,
    pub oid: ObjectId,
}

impl WalkEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

/// Iterator over a tree's contents. A `None` root yields nothing.
pub struct TreeWalker<'d> {
    database: &'d Database,
    include_trees: bool,
    stack: Vec<WalkEntry>,
}

impl<'d> TreeWalker<'d> {
    pub fn new(database: &'d Database, root: Option<&ObjectId>, include_trees: bool) -> Self {
        let stack = root
            .map(|oid| {
                vec![WalkEntry {
                    path: PathBuf::new(),
                    mode: EntryMode::Directory,
                    oid: oid.clone(),
                }]
            })
            .unwrap_or_default();

        TreeWalker {
            database,
            include_trees,
            stack,
        }
    }

    fn push_children(&mut self, parent: &WalkEntry) -> anyhow::Result<()> {
        let tree = self
            .database
            .parse_object_as_tree(&parent.oid)?
            .ok_or_else(|| anyhow::anyhow!("object {} is not a tree", parent.oid))?;

        // pushed in reverse so the stack pops them in entry order
        for (name, entry) in tree.entries().rev() {
            self.stack.push(WalkEntry {
                path: parent.path.join(name),
                mode: entry.mode.clone(),
                oid: entry.oid.clone(),
            });
        }

        Ok(())
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = anyhow::Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = self.stack.pop()?;

            if entry.is_tree() {
                if let Err(error) = self.push_children(&entry) {
                    return Some(Err(error));
                }
                // the synthetic root has an empty path and is never yielded
                if self.include_trees && !entry.path.as_os_str().is_empty() {
                    return Some(Ok(entry));
                }
            } else {
                return Some(Ok(entry));
            }
        }
    }
}
