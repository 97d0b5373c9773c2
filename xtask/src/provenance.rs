//! Build provenance from git.

use std::path::{Path, PathBuf};

use xshell::{Shell, cmd};

use crate::error::{Error, Result};

/// Revision metadata embedded in the boot descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    /// Short revision hash.
    pub revision: String,
    pub branch: String,
    /// The working tree has uncommitted changes.
    pub dirty: bool,
    /// Commit date of `HEAD`, formatted `%Y-%m-%d@%H:%M:%S`.
    pub date: String,
}

/// Something that can describe the current source revision.
pub trait ProvenanceSource {
    fn read(&self) -> Result<Provenance>;
}

/// Reads provenance by shelling out to `git` in the workspace.
pub struct GitProvenance {
    repo: PathBuf,
}

impl GitProvenance {
    pub fn new(repo: &Path) -> Self {
        Self {
            repo: repo.to_path_buf(),
        }
    }
}

impl ProvenanceSource for GitProvenance {
    fn read(&self) -> Result<Provenance> {
        let sh = Shell::new().map_err(git_error)?;
        sh.change_dir(&self.repo);

        let revision = cmd!(sh, "git rev-parse --short HEAD")
            .quiet()
            .read()
            .map_err(git_error)?;
        let branch = cmd!(sh, "git rev-parse --abbrev-ref HEAD")
            .quiet()
            .read()
            .map_err(git_error)?;
        let date = cmd!(
            sh,
            "git --no-pager log -1 --pretty=format:%cd --date=format:%Y-%m-%d@%H:%M:%S"
        )
        .quiet()
        .read()
        .map_err(git_error)?;
        let status = cmd!(sh, "git status --porcelain")
            .quiet()
            .read()
            .map_err(git_error)?;

        Ok(Provenance {
            revision,
            branch,
            dirty: !status.trim().is_empty(),
            date,
        })
    }
}

fn git_error(err: xshell::Error) -> Error {
    Error::Provenance(err.to_string())
}
