use crate::agents::update_executor::UpdateResult;
use crate::agents::version_control::VersionControl;
use crate::config::Settings;
use crate::error::{GitpinError, Result};
use crate::utils::verbose::trace;
use similar::TextDiff;
use std::fmt;
use toml_edit::DocumentMut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Plain pip requirements file.
    Requirements,
    /// `pyproject.toml`; only its dependency list is compared.
    ProjectManifest,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Requirements => f.write_str("requirements"),
            ManifestKind::ProjectManifest => f.write_str("project manifest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDelta {
    pub kind: ManifestKind,
    pub file: String,
    pub diff: String,
    pub changed: bool,
}

impl ManifestDelta {
    fn unchanged(kind: ManifestKind, file: &str) -> Self {
        Self {
            kind,
            file: file.to_string(),
            diff: String::new(),
            changed: false,
        }
    }
}

/// The single reconciliation flow an update calls for. A project manifest
/// change always wins over a requirements change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Nothing,
    ProjectManifest(ManifestDelta),
    Requirements(ManifestDelta),
}

impl Reconciliation {
    pub fn delta(&self) -> Option<&ManifestDelta> {
        match self {
            Reconciliation::Nothing => None,
            Reconciliation::ProjectManifest(delta) | Reconciliation::Requirements(delta) => {
                Some(delta)
            }
        }
    }
}

#[derive(Debug)]
pub struct Detection {
    pub reconciliation: Reconciliation,
    /// Non-fatal problems, e.g. a malformed dependency section.
    pub warnings: Vec<GitpinError>,
}

/// Reduce a `pyproject.toml` to its `[project].dependencies` list, one
/// requirement per line, sorted. `Ok(None)` when the file declares none.
pub fn dependency_section(manifest: &str) -> std::result::Result<Option<String>, String> {
    let doc = manifest
        .parse::<DocumentMut>()
        .map_err(|e| format!("invalid TOML: {e}"))?;

    let Some(project) = doc.get("project") else {
        return Ok(None);
    };
    let Some(dependencies) = project.get("dependencies") else {
        return Ok(None);
    };
    let array = dependencies
        .as_array()
        .ok_or_else(|| "project.dependencies must be an array".to_string())?;

    let mut entries = array
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| format!("non-string dependency entry: {}", value.to_string().trim()))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    entries.sort();

    let mut section = entries.join("\n");
    if !section.is_empty() {
        section.push('\n');
    }
    Ok(Some(section))
}

fn unified_diff(file: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .header(&format!("before {file}"), &format!("after {file}"))
        .context_radius(3)
        .to_string()
}

/// Compares tracked dependency manifests between the commits of an update.
pub struct ManifestDiffDetector<'a> {
    vc: &'a dyn VersionControl,
    requirements_file: &'a str,
    project_manifest: &'a str,
    track_project_manifest: bool,
}

impl<'a> ManifestDiffDetector<'a> {
    pub fn new(vc: &'a dyn VersionControl, settings: &'a Settings) -> Self {
        Self {
            vc,
            requirements_file: &settings.requirements_file,
            project_manifest: &settings.project_manifest,
            track_project_manifest: true,
        }
    }

    /// Only compare the project manifest when its package manager can act
    /// on it; otherwise requirements changes are reconciled on their own.
    pub fn track_project_manifest(mut self, enabled: bool) -> Self {
        self.track_project_manifest = enabled;
        self
    }

    pub fn detect(&self, update: &UpdateResult) -> Result<Detection> {
        let mut warnings = Vec::new();
        if !update.moved() {
            return Ok(Detection {
                reconciliation: Reconciliation::Nothing,
                warnings,
            });
        }

        let project = match self.project_delta(update) {
            Ok(delta) => delta,
            Err(err @ GitpinError::ManifestParse { .. }) => {
                warnings.push(err);
                ManifestDelta::unchanged(ManifestKind::ProjectManifest, self.project_manifest)
            }
            Err(err) => return Err(err),
        };
        if project.changed {
            return Ok(Detection {
                reconciliation: Reconciliation::ProjectManifest(project),
                warnings,
            });
        }

        let requirements = self.requirements_delta(update)?;
        let reconciliation = if requirements.changed {
            Reconciliation::Requirements(requirements)
        } else {
            Reconciliation::Nothing
        };
        Ok(Detection {
            reconciliation,
            warnings,
        })
    }

    fn read_pair(&self, update: &UpdateResult, file: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        let before = self.vc.read_file_at(&update.previous_commit, file)?;
        let after = self.vc.read_file_at(&update.new_commit, file)?;
        Ok((before.unwrap_or_default(), after.unwrap_or_default()))
    }

    fn requirements_delta(&self, update: &UpdateResult) -> Result<ManifestDelta> {
        let file = self.requirements_file;
        let (before, after) = self.read_pair(update, file)?;
        if before == after {
            return Ok(ManifestDelta::unchanged(ManifestKind::Requirements, file));
        }

        let diff = unified_diff(
            file,
            &String::from_utf8_lossy(&before),
            &String::from_utf8_lossy(&after),
        );
        trace(format!("{file} changed between commits"));
        Ok(ManifestDelta {
            kind: ManifestKind::Requirements,
            file: file.to_string(),
            diff,
            changed: true,
        })
    }

    fn project_delta(&self, update: &UpdateResult) -> Result<ManifestDelta> {
        let file = self.project_manifest;
        if !self.track_project_manifest {
            trace(format!("{file} not tracked without a package manager"));
            return Ok(ManifestDelta::unchanged(ManifestKind::ProjectManifest, file));
        }
        let (before, after) = self.read_pair(update, file)?;
        if before == after {
            return Ok(ManifestDelta::unchanged(ManifestKind::ProjectManifest, file));
        }

        let section = |bytes: &[u8]| -> Result<String> {
            if bytes.is_empty() {
                return Ok(String::new());
            }
            dependency_section(&String::from_utf8_lossy(bytes))
                .map(Option::unwrap_or_default)
                .map_err(|message| GitpinError::ManifestParse {
                    file: file.to_string(),
                    message,
                })
        };
        let before = section(&before)?;
        let after = section(&after)?;

        if before == after {
            trace(format!("{file} changed outside its dependency section"));
            return Ok(ManifestDelta::unchanged(ManifestKind::ProjectManifest, file));
        }

        Ok(ManifestDelta {
            kind: ManifestKind::ProjectManifest,
            file: file.to_string(),
            diff: unified_diff(&format!("{file} (dependencies)"), &before, &after),
            changed: true,
        })
    }
}
