//! Core repository components
//!
//! The fundamental building blocks shared by every checkout:
//!
//! - `config`: just enough git-config parsing to answer "is this a remote?"
//! - `database`: loose object store for blobs, trees, and commits
//! - `index`: persisted cache of last-synchronized per-path file state
//! - `refs`: reference management (branches, remote-tracking refs, HEAD)
//! - `repository`: the handle tying the above to one directory
//! - `workspace`: working directory file system operations

pub mod config;
pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
