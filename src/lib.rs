//! Working-tree checkout engine for fixture repositories.
//!
//! `switchyard` synchronizes a local working directory with a target
//! branch, remote-tracking ref or commit, preserving uncommitted local
//! edits where it safely can and cleaning up files that leave the tree.
//! It operates on an already-populated, git-compatible loose object
//! store and performs no network I/O, commit creation or merging.
//!
//! The main entry point is [`synchronize`], or the equivalent
//! [`Repository::checkout`] convenience method:
//!
//! ```no_run
//! use switchyard::Repository;
//!
//! # fn main() -> anyhow::Result<()> {
//! let repository = Repository::open("/path/to/checkout")?;
//! repository.checkout("feature", false)?;
//! # Ok(())
//! # }
//! ```

pub mod areas;
pub mod artifacts;

pub use areas::repository::Repository;
pub use artifacts::checkout::error::CheckoutError;
pub use artifacts::checkout::synchronize::synchronize;
