use crate::error::{GitpinError, Result};
use std::path::{Component, Path, PathBuf};

/// Path checks for the clone gitpin operates on and the manifests it reads.
pub struct PathValidator;

impl PathValidator {
    /// Canonicalises the repository path given on the command line.
    pub fn validate_repository_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            GitpinError::RepositoryValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(GitpinError::RepositoryValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        Ok(canonical)
    }

    /// Resolves the work tree root reported by `git rev-parse --show-toplevel`
    /// and checks that `requested` lies inside it.
    pub fn resolve_work_tree(requested: &Path, top_level: &str) -> Result<PathBuf> {
        let top_level = top_level.trim();
        if top_level.is_empty() {
            return Err(GitpinError::RepositoryValidation(format!(
                "'{}' has no working tree",
                requested.display()
            )));
        }

        let work_tree = Path::new(top_level).canonicalize().map_err(|e| {
            GitpinError::RepositoryValidation(format!("Invalid work tree '{top_level}': {e}"))
        })?;

        if !requested.starts_with(&work_tree) {
            return Err(GitpinError::RepositoryValidation(format!(
                "'{}' is outside the work tree '{}'",
                requested.display(),
                work_tree.display()
            )));
        }

        Ok(work_tree)
    }

    /// True for a plain relative path such as `requirements.txt` or
    /// `deploy/requirements.txt`; absolute paths and `..` are refused.
    pub fn is_repository_relative(name: &str) -> bool {
        !name.trim().is_empty()
            && Path::new(name)
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }
}
