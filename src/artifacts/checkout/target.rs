//! Checkout target classification
//!
//! A target specifier is classified once, up front, into an exhaustive
//! variant; every later decision (which tree to materialize, what to do
//! with HEAD) matches on the variant instead of re-inspecting the
//! string.

use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::checkout::error::CheckoutError;
use crate::artifacts::objects::object_id::ObjectId;

pub const HEAD_MARKER: &str = "HEAD";

/// What a checkout target specifier names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The literal `HEAD` marker: re-materialize wherever HEAD already
    /// points, without moving it.
    CurrentPosition,
    /// An existing local branch; HEAD attaches to it.
    LocalBranch(BranchName),
    /// `<remote>/<branch>` where the remote is configured; a local
    /// branch of the same name is created (idempotently) and HEAD
    /// attaches to it.
    RemoteBranch { remote: String, branch: BranchName },
    /// A raw object id present in the database; HEAD detaches to it.
    RawId(ObjectId),
}

impl Target {
    /// Classify a specifier. Resolution order: HEAD marker, local
    /// branch, configured `<remote>/<branch>`, raw object id.
    pub fn classify(repository: &Repository, spec: &str) -> anyhow::Result<Target> {
        if spec == HEAD_MARKER {
            return Ok(Target::CurrentPosition);
        }

        if let Ok(branch) = BranchName::try_parse(spec.to_string())
            && repository.refs().branch_exists(&branch)
        {
            return Ok(Target::LocalBranch(branch));
        }

        if let Some((remote, branch_suffix)) = spec.split_once('/')
            && repository.config().has_remote(remote)?
            && let Ok(branch) = BranchName::try_parse(branch_suffix.to_string())
            && repository.refs().read_remote_ref(remote, &branch)?.is_some()
        {
            return Ok(Target::RemoteBranch {
                remote: remote.to_string(),
                branch,
            });
        }

        if let Ok(oid) = ObjectId::try_parse(spec.to_string())
            && repository.database().contains(&oid)
        {
            return Ok(Target::RawId(oid));
        }

        Err(CheckoutError::UnresolvableTarget(spec.to_string()).into())
    }

    /// The commit (or tree) object id this target denotes. Read-only;
    /// HEAD and branch files are not touched here.
    pub fn resolve_oid(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        let oid = match self {
            Target::CurrentPosition => repository.refs().read_head()?,
            Target::LocalBranch(branch) => repository.refs().read_branch(branch)?,
            Target::RemoteBranch { remote, branch } => {
                repository.refs().read_remote_ref(remote, branch)?
            }
            Target::RawId(oid) => Some(oid.clone()),
        };

        oid.ok_or_else(|| CheckoutError::UnresolvableTarget(self.describe()).into())
    }

    /// Move HEAD (and create the tracking branch for remote targets).
    /// Runs only after the conflict check has passed.
    pub fn update_refs(&self, repository: &Repository, oid: &ObjectId) -> anyhow::Result<()> {
        match self {
            Target::CurrentPosition => Ok(()),
            Target::LocalBranch(branch) => repository.refs().set_head_to_branch(branch),
            Target::RemoteBranch { branch, .. } => {
                // racing creations are fine, the branch already pointing
                // somewhere is not an error
                if !repository.refs().branch_exists(branch) {
                    repository.refs().create_branch(branch, oid)?;
                }
                repository.refs().set_head_to_branch(branch)
            }
            Target::RawId(oid) => repository.refs().set_head_detached(oid),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Target::CurrentPosition => HEAD_MARKER.to_string(),
            Target::LocalBranch(branch) => branch.to_string(),
            Target::RemoteBranch { remote, branch } => format!("{remote}/{branch}"),
            Target::RawId(oid) => oid.to_string(),
        }
    }
}
