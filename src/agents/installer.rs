use crate::agents::env_discovery::{DirectoryListing, VirtualEnv, find_virtualenv};
use crate::agents::manifest_diff::Reconciliation;
use crate::agents::presentation::Presenter;
use crate::config::Settings;
use crate::error::{GitpinError, Result};
use crate::utils::verbose::trace;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    PackageManagerNative,
    InterpreterDirect,
}

/// One way of applying a manifest change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOption {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub kind: InstallKind,
    /// Manifest the command reads, relative to the repository root.
    pub manifest: String,
}

impl InstallOption {
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Tools found on this machine that can install dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tooling {
    pub package_manager_name: String,
    pub package_manager: Option<PathBuf>,
    pub interpreter: Option<PathBuf>,
    pub virtualenv: Option<VirtualEnv>,
    pub has_project_manifest: bool,
}

impl Tooling {
    pub fn discover(repo_root: &Path, settings: &Settings, fs: &dyn DirectoryListing) -> Self {
        let package_manager = which::which(&settings.package_manager).ok();
        let interpreter = settings
            .python
            .clone()
            .or_else(|| which::which("python3").ok())
            .or_else(|| which::which("python").ok());
        let virtualenv = find_virtualenv(repo_root, &settings.venv_names, fs);
        let has_project_manifest = fs.is_file(&repo_root.join(&settings.project_manifest));

        trace(format!(
            "tooling: {}={package_manager:?} python={interpreter:?} venv={virtualenv:?}",
            settings.package_manager
        ));
        Self {
            package_manager_name: settings.package_manager.clone(),
            package_manager,
            interpreter,
            virtualenv,
            has_project_manifest,
        }
    }
}

/// Shorten very long interpreter paths for menu labels.
fn format_path(path: &Path) -> String {
    let shown = path.display().to_string();
    if shown.chars().count() <= 120 {
        return shown;
    }
    let parts: Vec<_> = path.components().collect();
    if parts.len() <= 3 {
        return shown;
    }
    let tail: PathBuf = parts[parts.len() - 3..].iter().collect();
    Path::new("...").join(tail).display().to_string()
}

/// Builds install/sync options for a reconciliation and runs the chosen one.
pub struct InstallerOrchestrator<'a> {
    tooling: &'a Tooling,
    work_tree: &'a Path,
}

impl<'a> InstallerOrchestrator<'a> {
    pub fn new(tooling: &'a Tooling, work_tree: &'a Path) -> Self {
        Self { tooling, work_tree }
    }

    pub fn options(&self, reconciliation: &Reconciliation) -> Vec<InstallOption> {
        match reconciliation {
            Reconciliation::Nothing => Vec::new(),
            Reconciliation::ProjectManifest(delta) => self.sync_options(&delta.file),
            Reconciliation::Requirements(delta) => self.requirements_options(&delta.file),
        }
    }

    fn sync_options(&self, manifest: &str) -> Vec<InstallOption> {
        let Some(pm) = &self.tooling.package_manager else {
            return Vec::new();
        };
        vec![InstallOption {
            label: format!("{} sync", self.tooling.package_manager_name),
            program: pm.clone(),
            args: vec!["sync".to_string()],
            kind: InstallKind::PackageManagerNative,
            manifest: manifest.to_string(),
        }]
    }

    fn requirements_options(&self, requirements: &str) -> Vec<InstallOption> {
        let mut options = Vec::new();
        let pm_name = &self.tooling.package_manager_name;
        let pip_args = |prefix: &[&str]| -> Vec<String> {
            prefix
                .iter()
                .copied()
                .chain(["-r", requirements])
                .map(str::to_string)
                .collect()
        };

        if let Some(pm) = &self.tooling.package_manager {
            if self.tooling.has_project_manifest {
                options.push(InstallOption {
                    label: format!("{pm_name} add -r {requirements}"),
                    program: pm.clone(),
                    args: pip_args(&["add"]),
                    kind: InstallKind::PackageManagerNative,
                    manifest: requirements.to_string(),
                });
            }
            options.push(InstallOption {
                label: format!("{pm_name} pip install -r {requirements}"),
                program: pm.clone(),
                args: pip_args(&["pip", "install"]),
                kind: InstallKind::PackageManagerNative,
                manifest: requirements.to_string(),
            });
        }

        if let Some(python) = &self.tooling.interpreter {
            options.push(InstallOption {
                label: format!("Current Python ({})", format_path(python)),
                program: python.clone(),
                args: pip_args(&["-m", "pip", "install"]),
                kind: InstallKind::InterpreterDirect,
                manifest: requirements.to_string(),
            });
        }

        if let Some(venv) = &self.tooling.virtualenv {
            if self.tooling.interpreter.as_ref() != Some(&venv.interpreter) {
                options.push(InstallOption {
                    label: format!("venv ({})", format_path(&venv.interpreter)),
                    program: venv.interpreter.clone(),
                    args: pip_args(&["-m", "pip", "install"]),
                    kind: InstallKind::InterpreterDirect,
                    manifest: requirements.to_string(),
                });
            }
        }

        options
    }

    /// Ask which option to run. `Ok(None)` means the user deferred.
    pub fn select(
        &self,
        presenter: &mut dyn Presenter,
        reconciliation: &Reconciliation,
    ) -> Result<Option<InstallOption>> {
        let mut options = self.options(reconciliation);
        if options.is_empty() {
            return Ok(None);
        }

        let prompt = match reconciliation {
            Reconciliation::ProjectManifest(_) => "Sync dependencies with the updated manifest?",
            _ => "Select install command:",
        };
        let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();
        match presenter.select(prompt, &labels)? {
            Some(index) if index < options.len() => Ok(Some(options.swap_remove(index))),
            _ => Ok(None),
        }
    }

    /// Run the option to completion with the terminal attached.
    pub fn execute(&self, option: &InstallOption) -> Result<()> {
        println!("Executing: {}", option.command_line());
        let status = Command::new(&option.program)
            .current_dir(self.work_tree)
            .args(&option.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| {
                GitpinError::Install(format!("Failed to spawn '{}': {e}", option.command_line()))
            })?;

        if !status.success() {
            return Err(GitpinError::Install(format!(
                "'{}' exited with code {} ({} not applied)",
                option.command_line(),
                status.code().unwrap_or(-1),
                option.manifest
            )));
        }

        Ok(())
    }
}
