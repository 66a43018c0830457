mod agents;
mod cli;
mod config;
mod error;
mod utils;
mod version;
mod workflow;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use std::process;
use utils::verbose::VERBOSE_ENV;
use workflow::SyncOptions;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var(VERBOSE_ENV, "1");
        }
    }

    let options = SyncOptions {
        reset: cli.reset,
        check: cli.check,
        remote: cli.remote,
        no_maintenance: cli.no_maintenance,
    };

    if let Err(e) = workflow::execute_sync(&cli.path, options) {
        eprintln!("{} {}", format!("Error [{}]:", e.kind()).red().bold(), e);
        process::exit(1);
    }
}
