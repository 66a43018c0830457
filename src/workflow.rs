use crate::agents::remote_status::commit_count;
use crate::agents::{
    ActionChoice, ActionSelector, InstallerOrchestrator, ManifestDiffDetector, ManifestKind,
    Presenter, ProbeReport, Reconciliation, RealFs, RemoteStatusProber, SyncStatus, TagCatalog,
    TerminalPresenter, Tooling, UpdateExecutor, UpdateMode, UpdateResult, VersionControl,
    VersionControlAgent,
};
use crate::config::Settings;
use crate::error::Result;
use crate::utils::PathValidator;
use crate::utils::verbose::spinner;
use colored::Colorize;
use std::fmt;
use std::path::Path;

/// Command-line inputs for a run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub reset: bool,
    pub check: bool,
    pub remote: Option<String>,
    pub no_maintenance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    NotNeeded,
    Installed(String),
    /// Manifest changed but nothing was installed.
    Pending(ManifestKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    NothingToDo,
    Cancelled,
    Updated {
        update: UpdateResult,
        reconciliation: ReconciliationOutcome,
    },
}

fn short(commit: &str) -> &str {
    &commit[..commit.len().min(8)]
}

/// Execute the interactive sync workflow
pub fn execute_sync<P: AsRef<Path>>(repo_path: P, options: SyncOptions) -> Result<()> {
    let repo_path = PathValidator::validate_repository_path(repo_path)?;
    let vc = VersionControlAgent::new(&repo_path)?;
    let settings =
        Settings::load(vc.work_tree())?.with_overrides(options.remote.clone(), options.no_maintenance)?;

    if options.check {
        return execute_check(&vc, &settings);
    }

    let mode = UpdateMode::from_flag(options.reset);
    let mut presenter = TerminalPresenter::stdin();
    let discover = || Tooling::discover(vc.work_tree(), &settings, &RealFs);

    let outcome = run_pipeline(&vc, &mut presenter, &settings, mode, &discover)?;
    if let SyncOutcome::Updated {
        reconciliation: ReconciliationOutcome::Pending(kind),
        ..
    } = outcome
    {
        println!(
            "\n{}",
            format!("Note: {kind} changes are not installed yet; reconciliation is pending.")
                .yellow()
        );
    }

    println!("\n{}", "All operations have been completed.".green().bold());
    Ok(())
}

/// Probe, select, update, reconcile and compact, in that order.
pub fn run_pipeline(
    vc: &dyn VersionControl,
    presenter: &mut dyn Presenter,
    settings: &Settings,
    mode: UpdateMode,
    discover: &dyn Fn() -> Tooling,
) -> Result<SyncOutcome> {
    // Step 1: Probe remote status
    println!(
        "{}",
        format!("1. Fetching latest info from remote ({})...", settings.remote).yellow()
    );
    if mode == UpdateMode::Reset {
        println!(
            "{}",
            "⚠ Reset mode is enabled: local changes will be discarded".red()
        );
    }
    let report = {
        let pb = spinner("Fetching...");
        let probed = RemoteStatusProber::new(vc, &settings.remote).probe();
        pb.finish_and_clear();
        probed?
    };
    print_report(&report);

    // Step 2: Read tags
    let catalog = TagCatalog::load(vc)?;
    let current_tags: Vec<&str> = catalog
        .tags_at(&report.head)
        .into_iter()
        .map(|t| t.name.as_str())
        .collect();
    if !current_tags.is_empty() {
        println!("   Currently checked out tag: {}", current_tags.join(", ").cyan());
    }

    // Step 3: Choose an action
    println!("\n{}", "2. Choosing an action...".yellow());
    let selector = ActionSelector::new(&report, &catalog, mode, &settings.remote, settings.tag_limit);
    if selector.menu().is_empty() {
        println!("{}", "✓ No updates available.".green());
        return Ok(SyncOutcome::NothingToDo);
    }
    let Some(choice) = selector.select(presenter)? else {
        println!("{}", "Cancelled.".yellow());
        return Ok(SyncOutcome::Cancelled);
    };

    // Step 4: Apply it
    println!("\n{}", "3. Updating working tree...".yellow());
    print_intent(&choice, mode);
    let update = UpdateExecutor::new(vc, &settings.remote, mode).execute(&choice)?;
    if update.moved() {
        println!(
            "{}",
            format!(
                "✓ Done: {} → {}",
                short(&update.previous_commit),
                short(&update.new_commit)
            )
            .green()
        );
    } else {
        print_unmoved(&report, &choice, &settings.remote, &update.new_commit);
    }

    // Step 5: Reconcile dependency manifests
    println!("\n{}", "4. Checking dependency manifests...".yellow());
    // pyproject.toml is only followed when its package manager is installed
    let tooling = if update.moved() {
        discover()
    } else {
        Tooling::default()
    };
    let detection = ManifestDiffDetector::new(vc, settings)
        .track_project_manifest(tooling.package_manager.is_some())
        .detect(&update)?;
    for warning in &detection.warnings {
        println!("{}", format!("⚠ {warning}; skipping it").red());
    }
    let reconciliation = reconcile(vc, presenter, &detection.reconciliation, &tooling)?;

    // Step 6: Maintenance
    if settings.maintenance {
        println!("\n{}", "5. Performing repository maintenance...".yellow());
        match vc.maintenance() {
            Ok(()) => println!("{}", "✓ Maintenance finished".green()),
            Err(err) => println!("{}", format!("⚠ Maintenance skipped: {err}").red()),
        }
    }

    Ok(SyncOutcome::Updated {
        update,
        reconciliation,
    })
}

fn print_report(report: &ProbeReport) {
    if let Some(url) = report.display_url() {
        println!("   Remote URL: {}", url.dimmed());
    }
    if report.is_detached() {
        println!("   HEAD is detached at {}", short(&report.head).cyan());
        if let Some(default_branch) = &report.default_branch {
            println!(
                "   {}",
                format!("To follow '{default_branch}' again: git checkout {default_branch}, then rerun gitpin")
                    .dimmed()
            );
        }
        return;
    }
    match (&report.branch, report.status) {
        (None, _) => {}
        (Some(branch), SyncStatus::UpToDate) => {
            println!("{}", format!("✓ Current branch '{branch}' is up to date").green())
        }
        (Some(branch), SyncStatus::Untracked) => println!(
            "   Branch '{}' has no upstream; only tag checkout is available",
            branch.cyan()
        ),
        (Some(branch), status) => {
            println!("   Branch '{}' is {}", branch.cyan(), status.to_string().bold())
        }
    }
}

fn print_intent(choice: &ActionChoice, mode: UpdateMode) {
    let message = match (choice, mode) {
        (ActionChoice::CheckoutTag(tag), _) => format!("Checking out tag '{}'...", tag.name),
        (ActionChoice::Pull { branch, .. }, UpdateMode::Normal) => {
            format!("Pulling branch '{branch}'...")
        }
        (ActionChoice::Pull { branch, upstream }, UpdateMode::Reset) => {
            format!("Resetting '{branch}' to '{upstream}'...")
        }
        (ActionChoice::CheckoutPullDefault { branch }, UpdateMode::Normal) => {
            format!("Checking out and pulling branch '{branch}'...")
        }
        (ActionChoice::CheckoutPullDefault { branch }, UpdateMode::Reset) => {
            format!("Checking out and resetting branch '{branch}'...")
        }
    };
    println!("   {message}");
}

fn print_unmoved(report: &ProbeReport, choice: &ActionChoice, remote: &str, head: &str) {
    println!("   HEAD is unchanged at {}", short(head).cyan());
    let local_only = matches!(
        report.status,
        SyncStatus::Ahead(_) | SyncStatus::Diverged { .. }
    );
    if let (ActionChoice::CheckoutPullDefault { branch }, true) = (choice, local_only) {
        println!(
            "{}",
            format!(
                "⚠ Local-only commits remain on '{branch}'; rerun with --reset to realign it with {remote}/{branch}"
            )
            .yellow()
        );
    }
}

fn reconcile(
    vc: &dyn VersionControl,
    presenter: &mut dyn Presenter,
    reconciliation: &Reconciliation,
    tooling: &Tooling,
) -> Result<ReconciliationOutcome> {
    let Some(delta) = reconciliation.delta() else {
        println!("{}", "✓ No dependency changes".green());
        return Ok(ReconciliationOutcome::NotNeeded);
    };

    let title = match delta.kind {
        ManifestKind::ProjectManifest => format!("{} (dependencies)", delta.file),
        ManifestKind::Requirements => delta.file.clone(),
    };
    presenter.show_diff(&title, &delta.diff);

    let orchestrator = InstallerOrchestrator::new(tooling, vc.work_tree());
    if orchestrator.options(reconciliation).is_empty() {
        println!(
            "{}",
            format!("⚠ No install tool found for {}", delta.file).red()
        );
        return Ok(ReconciliationOutcome::Pending(delta.kind));
    }

    let Some(option) = orchestrator.select(presenter, reconciliation)? else {
        println!("{}", "Skipped: installation cancelled by user.".yellow());
        return Ok(ReconciliationOutcome::Pending(delta.kind));
    };

    println!("Installing using: {}", option.label.cyan());
    orchestrator.execute(&option)?;
    println!("{}", "✓ Dependencies installed successfully".green());
    Ok(ReconciliationOutcome::Installed(option.label))
}

/// An update that `--check` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateNotice {
    BranchBehind {
        branch: String,
        upstream: String,
        behind: usize,
    },
    NewerTag {
        current: String,
        latest: String,
    },
    DefaultBranchAhead {
        branch: String,
        ahead: usize,
    },
}

impl fmt::Display for UpdateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateNotice::BranchBehind {
                branch,
                upstream,
                behind,
            } => write!(f, "{branch} is {} behind {upstream}", commit_count(*behind)),
            UpdateNotice::NewerTag { current, latest } => write!(f, "{current} -> {latest}"),
            UpdateNotice::DefaultBranchAhead { branch, ahead } => {
                write!(f, "{branch} is {} ahead of HEAD", commit_count(*ahead))
            }
        }
    }
}

/// Collect available updates without touching the working tree.
pub fn check_for_updates(vc: &dyn VersionControl, settings: &Settings) -> Result<Vec<UpdateNotice>> {
    let prober = RemoteStatusProber::new(vc, &settings.remote);
    let report = prober.probe()?;
    let catalog = TagCatalog::load(vc)?;
    let mut notices = Vec::new();

    if let (SyncStatus::Behind(behind), Some(branch), Some(upstream)) =
        (report.status, &report.branch, &report.upstream)
    {
        notices.push(UpdateNotice::BranchBehind {
            branch: branch.clone(),
            upstream: upstream.clone(),
            behind,
        });
    }

    if let (Some(current), Some(latest)) = (catalog.current_tag(&report.head), catalog.latest()) {
        if catalog.latest_is_newer_than(current) {
            notices.push(UpdateNotice::NewerTag {
                current: current.name.clone(),
                latest: latest.name.clone(),
            });
        }
    }

    let on_default = report.branch.is_some() && report.branch == report.default_branch;
    if !on_default {
        if let (Some(branch), Some(ahead)) = (
            report.default_branch.clone(),
            prober.default_branch_lead(&report)?,
        ) {
            notices.push(UpdateNotice::DefaultBranchAhead { branch, ahead });
        }
    }

    Ok(notices)
}

fn execute_check(vc: &dyn VersionControl, settings: &Settings) -> Result<()> {
    println!(
        "{}",
        format!("Checking for updates on remote ({})...", settings.remote)
            .cyan()
            .bold()
    );
    let notices = {
        let pb = spinner("Fetching...");
        let checked = check_for_updates(vc, settings);
        pb.finish_and_clear();
        checked?
    };

    if notices.is_empty() {
        println!("\n{}", "✨ Repository is up to date!".green().bold());
        return Ok(());
    }

    println!("\n{}", "📦 Available Updates:".cyan().bold());
    for notice in &notices {
        println!("  • {notice}");
    }
    println!("\n{}", "To apply an update, run gitpin without --check".dimmed());
    Ok(())
}
