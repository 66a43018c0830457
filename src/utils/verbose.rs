use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const VERBOSE_ENV: &str = "GITPIN_VERBOSE";

pub fn is_verbose() -> bool {
    std::env::var(VERBOSE_ENV).is_ok()
}

/// Echo a diagnostic line to stderr when `--verbose` is active.
pub fn trace(message: impl AsRef<str>) {
    if is_verbose() {
        eprintln!("[VERBOSE] {}", message.as_ref());
    }
}

/// Spinner shown while waiting on the network.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
