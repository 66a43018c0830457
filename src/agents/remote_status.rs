use crate::agents::version_control::VersionControl;
use crate::error::Result;
use crate::utils::verbose::trace;
use std::fmt;

/// Relationship between the local branch and its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    UpToDate,
    Behind(usize),
    Ahead(usize),
    Diverged { ahead: usize, behind: usize },
    /// Detached HEAD, or a branch without a configured upstream.
    Untracked,
}

impl SyncStatus {
    pub fn classify(ahead: usize, behind: usize) -> Self {
        match (ahead, behind) {
            (0, 0) => SyncStatus::UpToDate,
            (0, behind) => SyncStatus::Behind(behind),
            (ahead, 0) => SyncStatus::Ahead(ahead),
            (ahead, behind) => SyncStatus::Diverged { ahead, behind },
        }
    }
}

/// `1 commit`, `3 commits`.
pub fn commit_count(n: usize) -> String {
    if n == 1 {
        "1 commit".to_string()
    } else {
        format!("{n} commits")
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::UpToDate => f.write_str("up to date"),
            SyncStatus::Behind(n) => write!(f, "{} behind", commit_count(*n)),
            SyncStatus::Ahead(n) => write!(f, "{} ahead", commit_count(*n)),
            SyncStatus::Diverged { ahead, behind } => {
                write!(f, "diverged ({ahead} ahead, {behind} behind)")
            }
            SyncStatus::Untracked => f.write_str("no upstream"),
        }
    }
}

/// Snapshot of the repository taken right after fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: SyncStatus,
    /// `None` when HEAD is detached.
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub head: String,
    pub remote_url: Option<String>,
    pub default_branch: Option<String>,
}

impl ProbeReport {
    pub fn is_detached(&self) -> bool {
        self.branch.is_none()
    }

    /// Remote URL as shown to the user, without the `.git` suffix.
    pub fn display_url(&self) -> Option<&str> {
        self.remote_url
            .as_deref()
            .map(|url| url.strip_suffix(".git").unwrap_or(url))
    }
}

/// Fetches the remote and classifies the current branch against its upstream.
pub struct RemoteStatusProber<'a> {
    vc: &'a dyn VersionControl,
    remote: &'a str,
}

impl<'a> RemoteStatusProber<'a> {
    pub fn new(vc: &'a dyn VersionControl, remote: &'a str) -> Self {
        Self { vc, remote }
    }

    pub fn probe(&self) -> Result<ProbeReport> {
        let remote_url = self.vc.remote_url(self.remote)?;
        self.vc.fetch(self.remote)?;

        let branch = self.vc.current_branch()?;
        let head = self.vc.head_commit()?;
        let upstream = match branch {
            Some(_) => self.vc.upstream()?,
            None => None,
        };
        let default_branch = self.vc.default_branch(self.remote)?;

        let status = match &upstream {
            Some(upstream) => {
                let (ahead, behind) = self.vc.ahead_behind("HEAD", upstream)?;
                SyncStatus::classify(ahead, behind)
            }
            None => SyncStatus::Untracked,
        };
        trace(format!(
            "probe: branch={branch:?} upstream={upstream:?} status={status} default={default_branch:?}"
        ));

        Ok(ProbeReport {
            status,
            branch,
            upstream,
            head,
            remote_url,
            default_branch,
        })
    }

    /// How many commits the remote default branch has that HEAD lacks.
    pub fn default_branch_lead(&self, report: &ProbeReport) -> Result<Option<usize>> {
        let Some(default_branch) = &report.default_branch else {
            return Ok(None);
        };
        let remote_ref = format!("{}/{}", self.remote, default_branch);
        let (_, behind) = self.vc.ahead_behind("HEAD", &remote_ref)?;
        Ok((behind > 0).then_some(behind))
    }
}
