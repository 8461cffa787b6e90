//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::project::LARDER_DIR;
use crate::core::quantity::Servings;
use crate::core::Project;
use crate::entities::recipe::{DEFAULT_COLOR, DEFAULT_EMOJI};

/// Larder configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recipe database path, relative to the project root
    pub database: Option<PathBuf>,

    /// Legacy local recipe document, relative to the project root
    pub legacy_store: Option<PathBuf>,

    /// Base servings for new recipes
    pub default_servings: Option<u32>,

    /// Emoji for new recipes
    pub default_emoji: Option<String>,

    /// Color tag for new recipes
    pub default_color: Option<String>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (applied by the accessors)

        // 2. Global user config (~/.config/larder/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.larder/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.larder_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(database) = std::env::var("LARDER_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }
        if let Ok(legacy) = std::env::var("LARDER_LEGACY_STORE") {
            config.legacy_store = Some(PathBuf::from(legacy));
        }
        if let Ok(servings) = std::env::var("LARDER_SERVINGS") {
            match servings.trim().parse() {
                Ok(n) => config.default_servings = Some(n),
                Err(_) => tracing::warn!("ignoring LARDER_SERVINGS={:?}: not a number", servings),
            }
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "larder")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.legacy_store.is_some() {
            self.legacy_store = other.legacy_store;
        }
        if other.default_servings.is_some() {
            self.default_servings = other.default_servings;
        }
        if other.default_emoji.is_some() {
            self.default_emoji = other.default_emoji;
        }
        if other.default_color.is_some() {
            self.default_color = other.default_color;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Absolute path of the recipe database for `project`
    pub fn database_path(&self, project: &Project) -> PathBuf {
        let path = self
            .database
            .clone()
            .unwrap_or_else(|| Path::new(LARDER_DIR).join("recipes.db"));
        project.resolve(&path)
    }

    /// Absolute path of the legacy recipe document for `project`
    pub fn legacy_store_path(&self, project: &Project) -> PathBuf {
        let path = self
            .legacy_store
            .clone()
            .unwrap_or_else(|| Path::new(LARDER_DIR).join("my-recipes-v2.json"));
        project.resolve(&path)
    }

    /// Base servings for new recipes; zero falls back to the built-in default
    pub fn servings(&self) -> Servings {
        self.default_servings
            .and_then(Servings::new)
            .unwrap_or_default()
    }

    pub fn emoji(&self) -> String {
        self.default_emoji
            .clone()
            .unwrap_or_else(|| DEFAULT_EMOJI.to_string())
    }

    pub fn color(&self) -> String {
        self.default_color
            .clone()
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let config = Config::default();

        assert_eq!(
            config.database_path(&project),
            project.root().join(".larder/recipes.db")
        );
        assert_eq!(
            config.legacy_store_path(&project),
            project.root().join(".larder/my-recipes-v2.json")
        );
        assert_eq!(config.servings().get(), 4);
        assert_eq!(config.emoji(), "🍳");
        assert_eq!(config.color(), "bg-orange-100");
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base: Config = serde_yml::from_str("default_servings: 2\ndefault_emoji: \"🥗\"").unwrap();
        let over: Config = serde_yml::from_str("default_servings: 6").unwrap();
        base.merge(over);

        assert_eq!(base.servings().get(), 6);
        assert_eq!(base.emoji(), "🥗");
    }

    #[test]
    fn test_zero_servings_uses_default() {
        let config: Config = serde_yml::from_str("default_servings: 0").unwrap();
        assert_eq!(config.servings().get(), 4);
    }

    #[test]
    fn test_project_config_file_is_read() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(
            project.larder_dir().join("config.yaml"),
            "database: data/book.db\ndefault_color: bg-green-100\n",
        )
        .unwrap();

        let config = Config::load_for(Some(&project));
        assert_eq!(config.color(), "bg-green-100");
        assert!(config.database_path(&project).ends_with("data/book.db"));
    }
}
