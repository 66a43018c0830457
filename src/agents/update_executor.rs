use crate::agents::action_selector::ActionChoice;
use crate::agents::version_control::VersionControl;
use crate::error::{GitpinError, Result};
use crate::utils::verbose::trace;
use std::fmt;

/// Whether pull-style actions fast-forward or hard-reset to the remote tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    #[default]
    Normal,
    /// Recovery mode for corrupted working trees: discards local commits and
    /// modifications.
    Reset,
}

impl UpdateMode {
    pub fn from_flag(reset: bool) -> Self {
        if reset {
            UpdateMode::Reset
        } else {
            UpdateMode::Normal
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::Normal => f.write_str("normal"),
            UpdateMode::Reset => f.write_str("reset"),
        }
    }
}

/// Commits before and after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub previous_commit: String,
    pub new_commit: String,
    pub mode: UpdateMode,
}

impl UpdateResult {
    pub fn moved(&self) -> bool {
        self.previous_commit != self.new_commit
    }
}

/// Performs the chosen action against the working tree.
///
/// Failures are reported as `UpdateError` and nothing is rolled back: the
/// working tree stays in whatever state git left it.
pub struct UpdateExecutor<'a> {
    vc: &'a dyn VersionControl,
    remote: &'a str,
    mode: UpdateMode,
}

impl<'a> UpdateExecutor<'a> {
    pub fn new(vc: &'a dyn VersionControl, remote: &'a str, mode: UpdateMode) -> Self {
        Self { vc, remote, mode }
    }

    pub fn execute(&self, choice: &ActionChoice) -> Result<UpdateResult> {
        let previous_commit = self.vc.head_commit().map_err(GitpinError::into_update)?;
        trace(format!("update: {choice:?} in {} mode from {previous_commit}", self.mode));

        self.apply(choice).map_err(GitpinError::into_update)?;

        let new_commit = self.vc.head_commit().map_err(GitpinError::into_update)?;
        Ok(UpdateResult {
            previous_commit,
            new_commit,
            mode: self.mode,
        })
    }

    fn apply(&self, choice: &ActionChoice) -> Result<()> {
        match (choice, self.mode) {
            (ActionChoice::CheckoutPullDefault { branch }, UpdateMode::Normal) => {
                self.vc.checkout(branch, false)?;
                self.vc.pull_fast_forward()
            }
            (ActionChoice::CheckoutPullDefault { branch }, UpdateMode::Reset) => {
                self.vc.checkout(branch, true)?;
                self.vc.reset_hard(&format!("{}/{}", self.remote, branch))
            }
            (ActionChoice::Pull { upstream, .. }, UpdateMode::Normal) => {
                let (ahead, behind) = self.vc.ahead_behind("HEAD", upstream)?;
                if ahead > 0 && behind > 0 {
                    return Err(GitpinError::Diverged { ahead, behind });
                }
                self.vc.pull_fast_forward()
            }
            (ActionChoice::Pull { upstream, .. }, UpdateMode::Reset) => {
                self.vc.reset_hard(upstream)
            }
            (ActionChoice::CheckoutTag(tag), _) => self.vc.checkout_detached(&tag.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::tag_catalog::TagEntry;
    use crate::agents::testing::{FakeHead, FakeRepo};

    fn behind_repo(behind: usize) -> (FakeRepo, String, String) {
        let repo = FakeRepo::new();
        let base = repo.commit(None, &[("requirements.txt", "requests==2.0\n")]);
        let tip = repo.extend(&base, behind);
        repo.set_local_branch("main", &base);
        repo.set_remote_branch("main", &tip);
        repo.track("main", "main");
        repo.set_head_branch("main");
        repo.set_default_branch("main");
        (repo, base, tip)
    }

    fn pull_main() -> ActionChoice {
        ActionChoice::Pull {
            branch: "main".into(),
            upstream: "origin/main".into(),
        }
    }

    #[test]
    fn pull_moves_to_remote_tip() {
        let (repo, base, tip) = behind_repo(3);
        let result = UpdateExecutor::new(&repo, "origin", UpdateMode::Normal)
            .execute(&pull_main())
            .unwrap();
        assert_eq!(result.previous_commit, base);
        assert_eq!(result.new_commit, tip);
        assert_eq!(result.mode, UpdateMode::Normal);
        assert!(result.moved());
    }

    #[test]
    fn reset_and_normal_converge_without_divergence() {
        let (normal_repo, _, tip) = behind_repo(2);
        let (reset_repo, _, reset_tip) = behind_repo(2);
        assert_eq!(tip, reset_tip);

        let normal = UpdateExecutor::new(&normal_repo, "origin", UpdateMode::Normal)
            .execute(&pull_main())
            .unwrap();
        let reset = UpdateExecutor::new(&reset_repo, "origin", UpdateMode::Reset)
            .execute(&pull_main())
            .unwrap();
        assert_eq!(normal.new_commit, reset.new_commit);

        let default = ActionChoice::CheckoutPullDefault {
            branch: "main".into(),
        };
        let (normal_repo, _, _) = behind_repo(2);
        let (reset_repo, _, _) = behind_repo(2);
        let normal = UpdateExecutor::new(&normal_repo, "origin", UpdateMode::Normal)
            .execute(&default)
            .unwrap();
        let reset = UpdateExecutor::new(&reset_repo, "origin", UpdateMode::Reset)
            .execute(&default)
            .unwrap();
        assert_eq!(normal.new_commit, reset.new_commit);
    }

    #[test]
    fn pull_refuses_diverged_history() {
        let repo = FakeRepo::new();
        let base = repo.commit(None, &[]);
        let local = repo.extend(&base, 2);
        let remote = repo.extend(&base, 1);
        repo.set_local_branch("main", &local);
        repo.set_remote_branch("main", &remote);
        repo.track("main", "main");
        repo.set_head_branch("main");

        let err = UpdateExecutor::new(&repo, "origin", UpdateMode::Normal)
            .execute(&pull_main())
            .unwrap_err();
        assert!(matches!(
            err,
            GitpinError::Diverged {
                ahead: 2,
                behind: 1
            }
        ));
        assert_eq!(repo.head_commit().unwrap(), local);
    }

    #[test]
    fn reset_discards_diverged_local_commits() {
        let repo = FakeRepo::new();
        let base = repo.commit(None, &[]);
        let local = repo.extend(&base, 2);
        let remote = repo.extend(&base, 1);
        repo.set_local_branch("main", &local);
        repo.set_remote_branch("main", &remote);
        repo.track("main", "main");
        repo.set_head_branch("main");
        repo.set_default_branch("main");
        repo.set_dirty(true);

        let result = UpdateExecutor::new(&repo, "origin", UpdateMode::Reset)
            .execute(&ActionChoice::CheckoutPullDefault {
                branch: "main".into(),
            })
            .unwrap();

        assert_eq!(result.previous_commit, local);
        assert_eq!(result.new_commit, remote);
        assert!(!repo.ancestry(&result.new_commit).contains(&local));
        assert!(repo.reflog().contains(&local));
    }

    #[test]
    fn checkout_tag_detaches_and_is_idempotent() {
        let (repo, base, _) = behind_repo(2);
        let tag = TagEntry::new("v1.0.0", base.clone());
        let executor = UpdateExecutor::new(&repo, "origin", UpdateMode::Normal);

        let first = executor.execute(&ActionChoice::CheckoutTag(tag.clone())).unwrap();
        let second = executor.execute(&ActionChoice::CheckoutTag(tag)).unwrap();
        assert_eq!(first.new_commit, base);
        assert_eq!(second.new_commit, first.new_commit);
        assert!(!second.moved());
        assert_eq!(repo.head(), Some(FakeHead::Detached(base)));
    }

    #[test]
    fn checkout_conflict_is_an_update_error() {
        let (repo, _, _) = behind_repo(1);
        repo.set_dirty(true);
        let err = UpdateExecutor::new(&repo, "origin", UpdateMode::Normal)
            .execute(&ActionChoice::CheckoutPullDefault {
                branch: "main".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), "UpdateError");
        assert!(err.to_string().contains("local changes"));
    }

    #[test]
    fn checkout_default_branch_from_detached_head() {
        let (repo, base, tip) = behind_repo(2);
        repo.set_head_detached(&base);
        let result = UpdateExecutor::new(&repo, "origin", UpdateMode::Normal)
            .execute(&ActionChoice::CheckoutPullDefault {
                branch: "main".into(),
            })
            .unwrap();
        assert_eq!(result.new_commit, tip);
        assert_eq!(repo.head(), Some(FakeHead::Branch("main".into())));
    }
}
