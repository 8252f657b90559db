use std::path::PathBuf;
use thiserror::Error;

/// Failures a checkout can surface before or during materialization.
/// Both refusal variants are raised strictly before any ref, file or
/// index mutation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Target matches no branch, remote-tracking ref or stored object.
    #[error("cannot resolve checkout target '{0}'")]
    UnresolvableTarget(String),

    /// A non-forced checkout would overwrite a local change.
    #[error("working tree has uncommitted changes at '{}'", .0.display())]
    DirtyWorkingTree(PathBuf),
}
