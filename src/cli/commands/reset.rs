//! `larder reset` command - Delete all local recipe data

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::find_project;
use crate::cli::helpers::confirm;
use crate::cli::GlobalOpts;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ResetArgs {
    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(args: ResetArgs, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global)?;
    let config = Config::load_for(Some(&project));

    let db = config.database_path(&project);
    let mut targets: Vec<PathBuf> = ["", "-wal", "-shm"]
        .iter()
        .map(|suffix| {
            let mut name = db.clone().into_os_string();
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect();
    targets.push(config.legacy_store_path(&project));
    targets.retain(|p| p.exists());

    if targets.is_empty() {
        if !global.quiet {
            println!("{} Nothing to reset", style("✓").green());
        }
        return Ok(());
    }

    if !args.yes {
        println!("This permanently deletes:");
        for path in &targets {
            println!("  {}", style(path.display()).dim());
        }
        if !confirm("All recipes in this book will be lost.")? {
            return Ok(());
        }
    }

    for path in &targets {
        std::fs::remove_file(path).into_diagnostic()?;
        tracing::debug!("removed {}", path.display());
    }

    if !global.quiet {
        println!(
            "{} Reset recipe book at {}",
            style("✓").green(),
            style(project.root().display()).cyan()
        );
    }
    Ok(())
}
