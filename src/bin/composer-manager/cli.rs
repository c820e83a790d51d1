//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Composer Manager - consolidated Composer dependencies for a modular site
#[derive(Parser)]
#[command(name = "composer-manager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Site root (defaults to the current directory)
    #[arg(long, global = true, env = "COMPOSER_MANAGER_ROOT")]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Regenerate the consolidated composer.json
    Rebuild(RebuildArgs),

    /// Compare module requirements with installed packages
    Status(StatusArgs),

    /// List required packages and the modules requiring them
    Required(RequiredArgs),

    /// List installed packages
    Installed(InstalledArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct RebuildArgs {
    /// Rebuild even when automatic rebuilding is disabled
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RequiredArgs {
    /// Only list required packages that are not installed
    #[arg(long)]
    pub missing: bool,
}

#[derive(Args)]
pub struct InstalledArgs {
    /// Print the packages as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
