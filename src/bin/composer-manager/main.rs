//! Composer Manager CLI - consolidated Composer dependencies for a modular site

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use composer_manager::util::diagnostic::emit;
use composer_manager::{GlobalContext, RegistryError};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        match e.downcast_ref::<RegistryError>() {
            Some(err) => emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("composer_manager=debug")
    } else {
        EnvFilter::new("composer_manager=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let color = !cli.no_color;
    let root = cli.root;

    match cli.command {
        Commands::Rebuild(args) => commands::rebuild::execute(args, context(root)?),
        Commands::Status(args) => commands::status::execute(args, context(root)?, color),
        Commands::Required(args) => commands::required::execute(args, context(root)?),
        Commands::Installed(args) => commands::installed::execute(args, context(root)?),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn context(root: Option<PathBuf>) -> Result<GlobalContext> {
    match root {
        Some(root) => GlobalContext::new(root),
        None => GlobalContext::from_cwd(),
    }
}
