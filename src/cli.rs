use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "gitpin",
    about = "Keep a deployed git clone on the latest commit or pin it to a release tag",
    version
)]
pub struct Cli {
    /// Path to the git repository (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// Use `git reset --hard` instead of checkout/pull (discards local changes)
    #[arg(long)]
    pub reset: bool,

    /// Only report whether an update is available, without prompting
    #[arg(long)]
    pub check: bool,

    /// Remote to compare against (overrides .gitpin.toml)
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Skip `git gc --auto` after updating
    #[arg(long)]
    pub no_maintenance: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}
