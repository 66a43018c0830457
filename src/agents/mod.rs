pub mod action_selector;
pub mod env_discovery;
pub mod installer;
pub mod manifest_diff;
pub mod presentation;
pub mod remote_status;
pub mod tag_catalog;
pub mod update_executor;
pub mod version_control;

#[cfg(test)]
pub mod testing;

pub use action_selector::{ActionChoice, ActionSelector};
pub use env_discovery::RealFs;
pub use installer::{InstallerOrchestrator, Tooling};
pub use manifest_diff::{ManifestDiffDetector, ManifestKind, Reconciliation};
pub use presentation::{Presenter, TerminalPresenter};
pub use remote_status::{ProbeReport, RemoteStatusProber, SyncStatus};
pub use tag_catalog::TagCatalog;
pub use update_executor::{UpdateExecutor, UpdateMode, UpdateResult};
pub use version_control::{VersionControl, VersionControlAgent};
