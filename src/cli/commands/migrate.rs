//! `larder migrate` command - Move legacy local recipes into the recipe book

use chrono::Utc;
use console::style;
use miette::Result;

use crate::cli::commands::utils::Workspace;
use crate::cli::GlobalOpts;
use crate::core::notify::ConsoleNotifier;

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    /// Only report how many legacy recipes are waiting
    #[arg(long)]
    pub check: bool,
}

pub async fn run(args: MigrateArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;
    let legacy = ws.legacy();
    let pending = legacy.pending();

    if args.check {
        if global.quiet {
            println!("{}", pending);
        } else if pending == 0 {
            println!("{} No local recipes waiting", style("✓").green());
        } else {
            println!(
                "{} {} local recipe(s) to save to the recipe book",
                style("!").yellow(),
                style(pending).cyan()
            );
        }
        return Ok(());
    }

    if !legacy.path().exists() {
        if !global.quiet {
            println!("{} No local recipes to migrate", style("✓").green());
        }
        return Ok(());
    }

    let migrated = legacy
        .migrate(&ws.store, ws.collection.as_ref(), &ConsoleNotifier, Utc::now())
        .await?;

    if !global.quiet {
        println!(
            "{} Migration complete: {} recipe(s) saved to the recipe book",
            style("✓").green(),
            style(migrated).cyan()
        );
        println!(
            "   {} recipe(s) in the book now",
            style(ws.store.len()).cyan()
        );
    }
    Ok(())
}
