//! Conflict detection for non-forced checkouts
//!
//! Pure classification: each dirty path is judged against the current
//! and target trees, and the detector folds the classifications into a
//! verdict before anything is mutated.

use crate::areas::database::Database;
use crate::artifacts::checkout::error::CheckoutError;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// How a locally dirty path relates to the tree switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDisposition {
    /// Absent from both trees: a leftover staged entry with no backing
    /// in history. Dropped from the index and the working tree.
    Stale,
    /// Resolvable in the target tree: the local edit survives the
    /// switch because materialization skips the path.
    SafeCarryOver,
    /// Resolvable only in the current tree: the switch would silently
    /// delete a local change. Aborts the checkout.
    Conflicting,
}

/// Outcome of a completed conflict pass: which dirty paths to drop and
/// which to preserve during materialization.
#[derive(Debug, Default)]
pub struct ConflictResolution {
    pub stale: BTreeSet<PathBuf>,
    pub preserved: BTreeSet<PathBuf>,
}

pub fn classify_path(
    database: &Database,
    path: &Path,
    current_tree: Option<&ObjectId>,
    target_tree: &ObjectId,
) -> anyhow::Result<PathDisposition> {
    if database.resolve_path_in_tree(target_tree, path)?.is_some() {
        return Ok(PathDisposition::SafeCarryOver);
    }

    let in_current = match current_tree {
        Some(tree) => database.resolve_path_in_tree(tree, path)?.is_some(),
        None => false,
    };

    if in_current {
        Ok(PathDisposition::Conflicting)
    } else {
        Ok(PathDisposition::Stale)
    }
}

/// Classify every dirty path, aborting on the first conflict. Succeeds
/// only if no path would lose local changes.
pub fn check_safe(
    database: &Database,
    dirty_paths: &BTreeSet<PathBuf>,
    current_tree: Option<&ObjectId>,
    target_tree: &ObjectId,
) -> anyhow::Result<ConflictResolution> {
    let mut resolution = ConflictResolution::default();

    for path in dirty_paths {
        match classify_path(database, path, current_tree, target_tree)? {
            PathDisposition::Stale => {
                resolution.stale.insert(path.clone());
            }
            PathDisposition::SafeCarryOver => {
                resolution.preserved.insert(path.clone());
            }
            PathDisposition::Conflicting => {
                return Err(CheckoutError::DirtyWorkingTree(path.clone()).into());
            }
        }
    }

    Ok(resolution)
}
