use crate::agents::presentation::Presenter;
use crate::agents::remote_status::{ProbeReport, SyncStatus, commit_count};
use crate::agents::tag_catalog::{TagCatalog, TagEntry};
use crate::agents::update_executor::UpdateMode;
use crate::error::Result;
use crate::utils::verbose::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Check out the remote default branch and bring it up to the remote tip.
    CheckoutPullDefault,
    /// Fast-forward the current branch.
    Pull,
    /// Check out a tag (detached HEAD).
    CheckoutTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferedAction {
    pub kind: ActionKind,
    /// True when executing it may discard local commits or modifications.
    pub destructive: bool,
}

/// The closed table of actions each status allows. Tag checkout is always
/// available; ahead/diverged clones are only ever realigned to the remote
/// default branch, never merged.
pub fn offered_actions(status: SyncStatus, mode: UpdateMode) -> Vec<OfferedAction> {
    let reset = mode == UpdateMode::Reset;
    let kinds: &[ActionKind] = match status {
        SyncStatus::UpToDate | SyncStatus::Untracked => &[ActionKind::CheckoutTag],
        SyncStatus::Behind(_) => &[ActionKind::Pull, ActionKind::CheckoutTag],
        SyncStatus::Ahead(_) | SyncStatus::Diverged { .. } => {
            &[ActionKind::CheckoutPullDefault, ActionKind::CheckoutTag]
        }
    };

    kinds
        .iter()
        .map(|&kind| OfferedAction {
            kind,
            destructive: reset && kind != ActionKind::CheckoutTag,
        })
        .collect()
}

/// A concrete, executable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionChoice {
    CheckoutPullDefault { branch: String },
    Pull { branch: String, upstream: String },
    CheckoutTag(TagEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub choice: ActionChoice,
}

/// Builds the labelled menu for one run and takes the user's pick.
pub struct ActionSelector<'a> {
    report: &'a ProbeReport,
    catalog: &'a TagCatalog,
    mode: UpdateMode,
    remote: &'a str,
    tag_limit: usize,
}

impl<'a> ActionSelector<'a> {
    pub fn new(
        report: &'a ProbeReport,
        catalog: &'a TagCatalog,
        mode: UpdateMode,
        remote: &'a str,
        tag_limit: usize,
    ) -> Self {
        Self {
            report,
            catalog,
            mode,
            remote,
            tag_limit,
        }
    }

    pub fn menu(&self) -> Vec<MenuEntry> {
        let mut entries = Vec::new();
        for offered in offered_actions(self.report.status, self.mode) {
            let mut expanded: Vec<MenuEntry> = match offered.kind {
                ActionKind::CheckoutPullDefault => self.default_branch_entry().into_iter().collect(),
                ActionKind::Pull => self.pull_entry().into_iter().collect(),
                ActionKind::CheckoutTag => self.tag_entries(),
            };
            if offered.destructive {
                for entry in &mut expanded {
                    entry.label.push_str(" (discards local changes)");
                }
            }
            entries.append(&mut expanded);
        }
        entries
    }

    fn default_branch_entry(&self) -> Option<MenuEntry> {
        let Some(branch) = self.report.default_branch.clone() else {
            trace("remote default branch unknown; not offering checkout+pull");
            return None;
        };
        let label = match self.mode {
            UpdateMode::Normal => format!("★ Checkout and pull latest remote ({branch})"),
            UpdateMode::Reset => {
                format!("★ Checkout and reset to latest remote ({}/{branch})", self.remote)
            }
        };
        Some(MenuEntry {
            label,
            choice: ActionChoice::CheckoutPullDefault { branch },
        })
    }

    fn pull_entry(&self) -> Option<MenuEntry> {
        let branch = self.report.branch.clone()?;
        let upstream = self.report.upstream.clone()?;
        let mut label = match self.mode {
            UpdateMode::Normal => format!("★ Pull {branch}"),
            UpdateMode::Reset => format!("★ Reset {branch} to {upstream}"),
        };
        if let SyncStatus::Behind(n) = self.report.status {
            label.push_str(&format!(" ({} behind)", commit_count(n)));
        }
        Some(MenuEntry {
            label,
            choice: ActionChoice::Pull { branch, upstream },
        })
    }

    fn tag_entries(&self) -> Vec<MenuEntry> {
        let Some(latest) = self.catalog.latest() else {
            return Vec::new();
        };
        let current = self.catalog.current_tag(&self.report.head);

        let mut entries = Vec::new();
        let mut latest_label = latest.name.clone();
        match current {
            Some(current) if current.name == latest.name => latest_label.push_str(" (current)"),
            Some(current) if self.catalog.latest_is_newer_than(current) => {
                latest_label.push_str(" (Latest)")
            }
            _ => {}
        }
        entries.push(MenuEntry {
            label: latest_label,
            choice: ActionChoice::CheckoutTag(latest.clone()),
        });

        for tag in self.catalog.older(self.tag_limit) {
            let label = match current {
                Some(current) if current.name == tag.name => format!("{} (current)", tag.name),
                _ => tag.name.clone(),
            };
            entries.push(MenuEntry {
                label,
                choice: ActionChoice::CheckoutTag(tag.clone()),
            });
        }
        entries
    }

    /// Present the menu. `Ok(None)` means there was nothing to offer or the
    /// user cancelled.
    pub fn select(&self, presenter: &mut dyn Presenter) -> Result<Option<ActionChoice>> {
        let mut entries = self.menu();
        if entries.is_empty() {
            return Ok(None);
        }

        let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
        match presenter.select("Select an action:", &labels)? {
            Some(index) if index < entries.len() => Ok(Some(entries.swap_remove(index).choice)),
            _ => Ok(None),
        }
    }
}
