//! `composer-manager installed` command

use anyhow::Result;

use crate::cli::InstalledArgs;
use composer_manager::core::manifest::to_pretty_json;
use composer_manager::{GlobalContext, PackageRegistry};

pub fn execute(args: InstalledArgs, ctx: GlobalContext) -> Result<()> {
    let registry = PackageRegistry::for_site(ctx);
    let installed = registry.get_installed()?;

    if args.json {
        println!("{}", String::from_utf8(to_pretty_json(&installed)?)?);
        return Ok(());
    }

    if installed.is_empty() {
        println!("No packages installed");
        return Ok(());
    }

    let width = installed.keys().map(String::len).max().unwrap_or(0);
    for (name, info) in &installed {
        if info.description.is_empty() {
            println!("{:width$}  {}", name, info.version, width = width);
        } else {
            println!(
                "{:width$}  {}  {}",
                name,
                info.version,
                info.description,
                width = width
            );
        }
    }

    Ok(())
}
