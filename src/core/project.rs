//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project state directory
pub const LARDER_DIR: &str = ".larder";

/// Represents a larder project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .larder/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(LARDER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(LARDER_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_skeleton(root)
    }

    /// Initialize even if .larder/ exists, rewriting the default config
    ///
    /// Recipe data already in the project is left alone.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        Self::write_skeleton(root)
    }

    fn write_skeleton(root: PathBuf) -> Result<Self, ProjectError> {
        let larder_dir = root.join(LARDER_DIR);
        std::fs::create_dir_all(&larder_dir)
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(larder_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Larder Project Configuration

# Recipe database, relative to the project root
# database: .larder/recipes.db

# Legacy local recipe document picked up by `larder migrate`
# legacy_store: .larder/my-recipes-v2.json

# Defaults for new recipes
# default_servings: 4
# default_emoji: "🍳"
# default_color: bg-orange-100

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .larder state directory
    pub fn larder_dir(&self) -> PathBuf {
        self.root.join(LARDER_DIR)
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a larder project (searched from {searched_from:?}). Run 'larder init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("larder project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.larder_dir().is_dir());
        assert!(project.larder_dir().join("config.yaml").exists());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_init_force_keeps_data() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let db = project.larder_dir().join("recipes.db");
        std::fs::write(&db, b"data").unwrap();

        Project::init_force(tmp.path()).unwrap();
        assert!(db.exists());
    }

    #[test]
    fn test_project_discover_finds_larder_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_larder_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let rel = project.resolve(Path::new(".larder/recipes.db"));
        assert!(rel.starts_with(project.root()));

        let abs = tmp.path().join("elsewhere.db");
        assert_eq!(project.resolve(&abs), abs);
    }
}
