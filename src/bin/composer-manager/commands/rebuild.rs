//! `composer-manager rebuild` command

use anyhow::Result;

use crate::cli::RebuildArgs;
use composer_manager::util::fs::relative_path;
use composer_manager::{GlobalContext, PackageRegistry};

pub fn execute(args: RebuildArgs, ctx: GlobalContext) -> Result<()> {
    if !ctx.autobuild() && !args.force {
        eprintln!(
            "automatic rebuilding is disabled (build.autobuild = false)\n\
             help: Run `composer-manager rebuild --force` to rebuild anyway"
        );
        return Ok(());
    }

    let registry = PackageRegistry::for_site(ctx);
    let bytes = registry.write_composer_json_file()?;

    let ctx = registry.context();
    println!(
        "Wrote {} ({} bytes)",
        relative_path(ctx.root(), &ctx.composer_json_path()).display(),
        bytes
    );

    Ok(())
}
