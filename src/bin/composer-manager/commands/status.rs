//! `composer-manager status` command

use anyhow::Result;

use crate::cli::StatusArgs;
use composer_manager::core::manifest::to_pretty_json;
use composer_manager::ops::{status, PackageState, StatusReport};
use composer_manager::util::diagnostic::{emit, suggestions, Diagnostic};
use composer_manager::{GlobalContext, PackageRegistry};

pub fn execute(args: StatusArgs, ctx: GlobalContext, color: bool) -> Result<()> {
    let registry = PackageRegistry::for_site(ctx);
    let report = status(&registry)?;

    if args.json {
        println!("{}", String::from_utf8(to_pretty_json(&report)?)?);
        return Ok(());
    }

    print_report(&report);

    let missing = report.missing().count();
    if missing > 0 {
        let diag = Diagnostic::warning(format!("{} required package(s) not installed", missing))
            .with_suggestion(suggestions::MISSING_PACKAGES);
        emit(&diag, color);
    }
    let autoloader = registry.context().autoload_path();
    if !autoloader.is_file() {
        let diag = Diagnostic::warning("Composer autoloader not found")
            .with_location(autoloader)
            .with_suggestion(suggestions::MISSING_PACKAGES);
        emit(&diag, color);
    }
    if report.stale {
        let diag = Diagnostic::warning("composer.json is out of date")
            .with_location(registry.context().composer_json_path())
            .with_suggestion(suggestions::STALE_MANIFEST);
        emit(&diag, color);
    }

    Ok(())
}

fn print_report(report: &StatusReport) {
    if report.packages.is_empty() {
        println!("No packages required or installed");
        return;
    }

    let width = report
        .packages
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0);

    for package in &report.packages {
        let version = package.installed_version.as_deref().unwrap_or("-");
        let requesters: Vec<&str> = package.requesters().into_iter().collect();

        let mut line = format!(
            "{:width$}  {:10}  {:10}",
            package.name,
            version,
            package.state.to_string(),
            width = width
        );
        if !requesters.is_empty() {
            line.push_str(&format!("  required by {}", requesters.join(", ")));
        }
        if package.state == PackageState::Installed && !package.dependents.is_empty() {
            line.push_str(&format!("  (used by {})", package.dependents.join(", ")));
        }
        println!("{}", line.trim_end());
    }
}
