use crate::error::{GitpinError, Result};
use crate::utils::PathValidator;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".gitpin.toml";

/// Run-wide settings. Every field has a default so `.gitpin.toml` may set
/// only what it needs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub remote: String,
    pub tag_limit: usize,
    pub requirements_file: String,
    pub project_manifest: String,
    pub package_manager: String,
    pub venv_names: Vec<String>,
    pub python: Option<PathBuf>,
    pub maintenance: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            tag_limit: 10,
            requirements_file: "requirements.txt".to_string(),
            project_manifest: "pyproject.toml".to_string(),
            package_manager: "uv".to_string(),
            venv_names: vec![".venv".to_string(), "venv".to_string()],
            python: None,
            maintenance: true,
        }
    }
}

impl Settings {
    /// Load `.gitpin.toml` from the repository root, falling back to defaults
    /// when the file does not exist.
    pub fn load<P: AsRef<Path>>(repo_root: P) -> Result<Self> {
        let path = repo_root.as_ref().join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(GitpinError::Config("remote must not be empty".into()));
        }
        if self.venv_names.iter().any(|name| name.contains(['/', '\\'])) {
            return Err(GitpinError::Config(
                "venv_names must be plain directory names".into(),
            ));
        }
        for file in [&self.requirements_file, &self.project_manifest] {
            if !PathValidator::is_repository_relative(file) {
                return Err(GitpinError::Config(format!(
                    "manifest path '{file}' must be relative to the repository root"
                )));
            }
        }
        Ok(())
    }

    /// Apply command-line overrides on top of file values.
    pub fn with_overrides(mut self, remote: Option<String>, no_maintenance: bool) -> Result<Self> {
        if let Some(remote) = remote {
            self.remote = remote;
        }
        if no_maintenance {
            self.maintenance = false;
        }
        self.validate()?;
        Ok(self)
    }
}
