//! Shared utilities for CLI commands

use console::style;
use miette::Result;
use std::sync::Arc;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::legacy::LegacyStore;
use crate::core::notify::ConsoleNotifier;
use crate::core::project::Project;
use crate::core::remote::SqliteCollection;
use crate::core::store::{LookupError, RecipeStore};
use crate::core::Config;
use crate::entities::Recipe;

/// Everything a recipe command needs: the project, its configuration, the
/// collection behind it, and a loaded store
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub collection: Arc<SqliteCollection>,
    pub store: RecipeStore,
}

impl Workspace {
    /// Locate the project and load every recipe
    pub async fn open(global: &GlobalOpts) -> Result<Self> {
        let project = find_project(global)?;
        let config = Config::load_for(Some(&project));

        let db_path = config.database_path(&project);
        let collection = Arc::new(
            SqliteCollection::open(&db_path).map_err(|e| miette::miette!("{}", e))?,
        );
        let store = RecipeStore::open(collection.clone(), Arc::new(ConsoleNotifier)).await;

        Ok(Self {
            project,
            config,
            collection,
            store,
        })
    }

    /// The legacy local store configured for this project
    pub fn legacy(&self) -> LegacyStore {
        LegacyStore::new(self.config.legacy_store_path(&self.project))
    }

    /// Find a recipe by id, id prefix, or title
    pub fn resolve(&self, query: &str) -> Result<Recipe> {
        self.store.resolve(query).map_err(|e| match e {
            LookupError::Ambiguous { query, matches } => {
                let listing: Vec<String> = matches
                    .iter()
                    .map(|r| format!("  {}  {}", r.id, r.title))
                    .collect();
                miette::miette!(
                    "'{}' matches {} recipes:\n{}\nUse a longer id prefix.",
                    query,
                    matches.len(),
                    listing.join("\n")
                )
            }
            other => miette::miette!("{}", other),
        })
    }

    /// Output format after applying the configured default
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        match global.format {
            OutputFormat::Auto => self
                .config
                .default_format
                .as_deref()
                .and_then(OutputFormat::from_config)
                .unwrap_or(OutputFormat::Auto),
            f => f,
        }
    }
}

/// Project from `--project`, or discovered from the current directory
pub fn find_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Mention legacy recipes still waiting for migration
pub fn print_legacy_banner(legacy: &LegacyStore) {
    let pending = legacy.pending();
    if pending > 0 {
        eprintln!(
            "{} {} local recipe(s) to save to the recipe book. Run {}",
            style("!").yellow(),
            style(pending).cyan(),
            style("larder migrate").yellow()
        );
    }
}
