use crate::error::{GitpinError, Result};
use crate::utils::PathValidator;
use crate::utils::verbose::trace;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// A tag as listed by git, resolved to the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub target: String,
}

/// Operations the sync pipeline needs from version control.
pub trait VersionControl {
    fn work_tree(&self) -> &Path;

    /// Refresh refs and tags from `remote`. Failures are network errors.
    fn fetch(&self, remote: &str) -> Result<()>;

    fn remote_url(&self, remote: &str) -> Result<Option<String>>;

    /// Checked-out branch, or `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>>;

    fn head_commit(&self) -> Result<String>;

    /// Upstream of the current branch (e.g. `origin/main`), if configured.
    fn upstream(&self) -> Result<Option<String>>;

    /// Default branch of `remote` (without the remote prefix).
    fn default_branch(&self, remote: &str) -> Result<Option<String>>;

    /// Commits only reachable from `local`, and only from `remote`.
    fn ahead_behind(&self, local: &str, remote: &str) -> Result<(usize, usize)>;

    fn list_tags(&self) -> Result<Vec<TagRef>>;

    fn checkout(&self, branch: &str, force: bool) -> Result<()>;

    fn checkout_detached(&self, commit: &str) -> Result<()>;

    fn pull_fast_forward(&self) -> Result<()>;

    fn reset_hard(&self, reference: &str) -> Result<()>;

    /// Content of `path` at `commit`, or `None` if the file does not exist there.
    fn read_file_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Post-update housekeeping (`git gc --auto`).
    fn maintenance(&self) -> Result<()>;
}

/// VersionControlAgent drives the `git` binary with hardened input validation.
pub struct VersionControlAgent {
    work_tree: PathBuf,
}

impl VersionControlAgent {
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self> {
        let path = Self::validate_git_path(repo_path.as_ref())?;
        let probe = Self { work_tree: path };

        let output = probe.run_git(&["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Err(GitpinError::RepositoryValidation(format!(
                "'{}' is not a git repository",
                probe.work_tree.display()
            )));
        }

        let top = String::from_utf8_lossy(&output.stdout);
        let work_tree = PathValidator::resolve_work_tree(&probe.work_tree, &top)?;
        Ok(Self { work_tree })
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        trace(format!("git {}", args.join(" ")));
        Command::new("git")
            .current_dir(&self.work_tree)
            .env("GIT_TERMINAL_PROMPT", "0")
            .args(args)
            .output()
            .map_err(|e| {
                GitpinError::GitOperation(format!(
                    "Failed to execute git command '{}': {e}",
                    args.join(" ")
                ))
            })
    }

    fn run_checked(&self, args: &[&str], command: &str) -> Result<String> {
        let output = self.run_git(args)?;
        Self::ensure_success(&output, command)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn ensure_success(output: &Output, command: &str) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }

        Err(GitpinError::GitOperation(format!(
            "{} failed: {}",
            command,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn validate_git_path(path: &Path) -> Result<PathBuf> {
        let dangerous = [';', '|', '&', '$', '`', '\n', '\r'];
        let path_str = path.to_string_lossy();
        if let Some(ch) = dangerous.iter().find(|c| path_str.contains(**c)) {
            return Err(GitpinError::RepositoryValidation(format!(
                "Path contains dangerous character: '{}'",
                ch
            )));
        }

        if !path.is_absolute() {
            return Err(GitpinError::RepositoryValidation(
                "Only absolute paths are allowed for Git operations".to_string(),
            ));
        }

        PathValidator::validate_repository_path(path)
    }

    /// Refuse anything git could mistake for an option.
    fn validate_ref(reference: &str) -> Result<&str> {
        if reference.is_empty()
            || reference.starts_with('-')
            || reference.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(GitpinError::GitOperation(format!(
                "Refusing unsafe ref name '{reference}'"
            )));
        }
        Ok(reference)
    }

    fn parse_remote_show(output: &str) -> Option<String> {
        output.lines().find_map(|line| {
            let (_, branch) = line.split_once("HEAD branch:")?;
            let branch = branch.trim();
            (!branch.is_empty() && branch != "(unknown)").then(|| branch.to_string())
        })
    }

    fn parse_tag_listing(listing: &str) -> Vec<TagRef> {
        listing
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\0');
                let name = fields.next()?.trim();
                let object = fields.next()?.trim();
                let peeled = fields.next().unwrap_or("").trim();
                if name.is_empty() || object.is_empty() {
                    return None;
                }
                let target = if peeled.is_empty() { object } else { peeled };
                Some(TagRef {
                    name: name.to_string(),
                    target: target.to_string(),
                })
            })
            .collect()
    }
}

impl VersionControl for VersionControlAgent {
    fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        let remote = Self::validate_ref(remote)?;
        let output = self.run_git(&["fetch", "--tags", "--prune", remote])?;
        if output.status.success() {
            return Ok(());
        }
        Err(GitpinError::Network(format!(
            "git fetch {remote} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        let remote = Self::validate_ref(remote)?;
        let output = self.run_git(&["remote", "get-url", remote])?;
        if !output.status.success() {
            return Ok(None);
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!url.is_empty()).then_some(url))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let output = self.run_git(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!branch.is_empty()).then_some(branch))
    }

    fn head_commit(&self) -> Result<String> {
        self.run_checked(&["rev-parse", "HEAD"], "git rev-parse HEAD")
    }

    fn upstream(&self) -> Result<Option<String>> {
        let output = self.run_git(&[
            "rev-parse",
            "--abbrev-ref",
            "--symbolic-full-name",
            "@{upstream}",
        ])?;
        if !output.status.success() {
            return Ok(None);
        }
        let upstream = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!upstream.is_empty()).then_some(upstream))
    }

    fn default_branch(&self, remote: &str) -> Result<Option<String>> {
        let remote = Self::validate_ref(remote)?;
        let head_ref = format!("refs/remotes/{remote}/HEAD");
        let output = self.run_git(&["symbolic-ref", "--quiet", "--short", &head_ref])?;
        if output.status.success() {
            let short = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let prefix = format!("{remote}/");
            if let Some(branch) = short.strip_prefix(&prefix) {
                return Ok(Some(branch.to_string()));
            }
        }

        // origin/HEAD is not always recorded locally; ask the remote.
        let output = self.run_git(&["remote", "show", remote])?;
        if !output.status.success() {
            trace(format!(
                "git remote show {remote} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
            return Ok(None);
        }
        Ok(Self::parse_remote_show(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    fn ahead_behind(&self, local: &str, remote: &str) -> Result<(usize, usize)> {
        let range = format!(
            "{}...{}",
            Self::validate_ref(local)?,
            Self::validate_ref(remote)?
        );
        let counts = self.run_checked(
            &["rev-list", "--left-right", "--count", &range],
            "git rev-list --left-right --count",
        )?;

        let mut parts = counts.split_whitespace().map(str::parse::<usize>);
        match (parts.next(), parts.next()) {
            (Some(Ok(ahead)), Some(Ok(behind))) => Ok((ahead, behind)),
            _ => Err(GitpinError::GitOperation(format!(
                "Unexpected rev-list output: '{counts}'"
            ))),
        }
    }

    fn list_tags(&self) -> Result<Vec<TagRef>> {
        let listing = self.run_checked(
            &[
                "for-each-ref",
                "--format=%(refname:strip=2)%00%(objectname)%00%(*objectname)",
                "refs/tags",
            ],
            "git for-each-ref refs/tags",
        )?;
        Ok(Self::parse_tag_listing(&listing))
    }

    fn checkout(&self, branch: &str, force: bool) -> Result<()> {
        let branch = Self::validate_ref(branch)?;
        let args: &[&str] = if force {
            &["checkout", "--force", branch]
        } else {
            &["checkout", branch]
        };
        let output = self.run_git(args)?;
        Self::ensure_success(&output, "git checkout")
    }

    fn checkout_detached(&self, commit: &str) -> Result<()> {
        let commit = Self::validate_ref(commit)?;
        let output = self.run_git(&["checkout", "--detach", commit])?;
        Self::ensure_success(&output, "git checkout --detach")
    }

    fn pull_fast_forward(&self) -> Result<()> {
        let output = self.run_git(&["pull", "--ff-only"])?;
        Self::ensure_success(&output, "git pull --ff-only")
    }

    fn reset_hard(&self, reference: &str) -> Result<()> {
        let reference = Self::validate_ref(reference)?;
        let output = self.run_git(&["reset", "--hard", reference])?;
        Self::ensure_success(&output, "git reset --hard")
    }

    fn read_file_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let object = format!("{}:{}", Self::validate_ref(commit)?, path);
        let exists = self.run_git(&["cat-file", "-e", &object])?;
        if !exists.status.success() {
            return Ok(None);
        }

        let output = self.run_git(&["cat-file", "blob", &object])?;
        Self::ensure_success(&output, "git cat-file blob")?;
        Ok(Some(output.stdout))
    }

    fn maintenance(&self) -> Result<()> {
        let output = self.run_git(&["gc", "--auto"])?;
        Self::ensure_success(&output, "git gc --auto")
    }
}
