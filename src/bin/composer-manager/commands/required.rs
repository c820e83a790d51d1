//! `composer-manager required` command

use anyhow::Result;

use crate::cli::RequiredArgs;
use composer_manager::{GlobalContext, PackageRegistry};

pub fn execute(args: RequiredArgs, ctx: GlobalContext) -> Result<()> {
    let registry = PackageRegistry::for_site(ctx);

    if args.missing {
        for name in registry.get_install_required()? {
            println!("{}", name);
        }
        return Ok(());
    }

    for (name, constraints) in registry.get_required()? {
        for (constraint, modules) in constraints {
            println!("{} {} ({})", name, constraint, modules.join(", "));
        }
    }

    Ok(())
}
