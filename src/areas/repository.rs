use crate::areas::config::Config;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::checkout::synchronize;
use crate::artifacts::status::status_info::Status;
use std::cell::{RefCell, RefMut};
use std::path::Path;

/// Handle over one on-disk repository: the object database, index,
/// refs, config and working tree rooted at `path`.
pub struct Repository {
    path: Box<Path>,
    index: RefCell<Index>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
    config: Config,
}

impl Repository {
    /// Open an existing repository at `path`.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().canonicalize()?;

        if !path.join(".git").is_dir() {
            anyhow::bail!("not a repository: {}", path.display());
        }

        Ok(Self::assemble(path))
    }

    /// Create the repository skeleton at `path` and open it. HEAD is
    /// attached to `main`, which does not exist yet (unborn branch).
    pub fn init(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        std::fs::create_dir_all(path.join(".git").join("objects"))?;
        std::fs::create_dir_all(path.join(".git").join("refs").join("heads"))?;
        std::fs::create_dir_all(path.join(".git").join("refs").join("remotes"))?;

        let path = path.canonicalize()?;
        let repository = Self::assemble(path);

        repository.refs.update_ref_file(
            repository.refs.head_path(),
            "ref: refs/heads/main".to_string(),
        )?;

        Ok(repository)
    }

    fn assemble(path: std::path::PathBuf) -> Self {
        let git_path = path.join(".git");

        Repository {
            index: RefCell::new(Index::new(git_path.join("index").into_boxed_path())),
            database: Database::new(git_path.join("objects").into_boxed_path()),
            workspace: Workspace::new(path.clone().into_boxed_path()),
            refs: Refs::new(git_path.clone().into_boxed_path()),
            config: Config::new(git_path.join("config").into_boxed_path()),
            path: path.into_boxed_path(),
        }
    }

    /// Synchronize the working tree and index to `target` (a branch
    /// name, `<remote>/<branch>`, raw object id, or the current
    /// position). See [`synchronize::synchronize`].
    pub fn checkout(&self, target: &str, force: bool) -> anyhow::Result<()> {
        synchronize::synchronize(self, target, force)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&'_ self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&'_ self) -> Status<'_> {
        Status::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn init_creates_the_full_ref_skeleton() {
        let dir = assert_fs::TempDir::new().unwrap();

        let repository = Repository::init(dir.path()).unwrap();

        let git = repository.path().join(".git");
        assert!(git.join("objects").is_dir());
        assert!(git.join("refs/heads").is_dir());
        assert!(git.join("refs/remotes").is_dir());
        assert_eq!(
            std::fs::read_to_string(git.join("HEAD")).unwrap().trim(),
            "ref: refs/heads/main"
        );
    }

    #[test]
    fn open_rejects_a_directory_without_a_repository() {
        let dir = assert_fs::TempDir::new().unwrap();

        assert!(Repository::open(dir.path()).is_err());
    }
}
