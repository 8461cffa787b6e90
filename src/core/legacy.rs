//! Legacy local recipe store and its one-shot migration
//!
//! Before recipes lived in the shared collection they were kept in a local
//! JSON document under the key `my-recipes-v2`: an array of recipe records,
//! some of which predate the creation timestamp. Migration pushes every
//! record to the collection with an upsert and deletes the local document
//! once the collection has accepted them.

use chrono::{DateTime, TimeZone, Utc};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::RecipeId;
use crate::core::notify::Notifier;
use crate::core::remote::{RecipeCollection, RemoteError};
use crate::core::store::RecipeStore;
use crate::entities::{Recipe, RecipeFields};

/// Key the legacy document was stored under
pub const LEGACY_KEY: &str = "my-recipes-v2";

/// Legacy document that is not a valid array of recipe records
#[derive(Debug, Error, Diagnostic)]
#[error("malformed legacy recipe data: {message}")]
#[diagnostic(code(larder::legacy::parse))]
pub struct LegacyParseError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl LegacyParseError {
    fn from_json_error(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        let offset = line_col_to_offset(source, err.line(), err.column());
        let help = match err.classify() {
            serde_json::error::Category::Eof => {
                Some("the document ends early; it may have been truncated".to_string())
            }
            serde_json::error::Category::Data => {
                Some("each record needs at least an id and a title".to_string())
            }
            _ => None,
        };

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message: err.to_string(),
        }
    }
}

/// Errors from reading or migrating legacy data
#[derive(Debug, Error, Diagnostic)]
pub enum LegacyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] LegacyParseError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("migration upload failed: {0}")]
    Remote(#[from] RemoteError),
}

/// Byte offset of a 1-based line/column position
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();

    let rest = &source[line_start.min(source.len())..];
    let in_line = rest
        .char_indices()
        .nth(column.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());

    (line_start + in_line).min(source.len().saturating_sub(1))
}

/// A record as found in the legacy document
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRecipe {
    pub id: RecipeId,

    #[serde(flatten)]
    pub fields: RecipeFields,

    /// Epoch milliseconds; absent on the oldest records
    #[serde(default, rename = "createdAt")]
    pub created_at_ms: Option<i64>,

    /// Same stamp under the collection's column name; some records carry both
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl LegacyRecipe {
    /// Convert to a full recipe, stamping `now` when no usable timestamp exists
    ///
    /// `createdAt` wins over `created_at` when both are set.
    pub fn into_recipe(self, now: DateTime<Utc>) -> Recipe {
        let created_at = [self.created_at_ms, self.created_at]
            .into_iter()
            .flatten()
            .filter(|&ms| ms != 0)
            .find_map(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(now);
        Recipe::from_fields(self.id, self.fields, created_at)
    }
}

/// The legacy JSON document on disk
#[derive(Debug, Clone)]
pub struct LegacyStore {
    path: PathBuf,
}

impl LegacyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of legacy records waiting to be migrated
    ///
    /// A missing document counts as zero. So does a malformed one, after a
    /// warning is logged.
    pub fn pending(&self) -> usize {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!("cannot read {}: {}", self.path.display(), e);
                return 0;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(serde_json::Value::Array(items)) => items.len(),
            Ok(_) => {
                tracing::warn!("{} is not a JSON array, ignoring", self.path.display());
                0
            }
            Err(e) => {
                tracing::warn!("error parsing local recipes in {}: {}", self.path.display(), e);
                0
            }
        }
    }

    /// Parse every legacy record; a missing document yields none
    pub fn load(&self) -> Result<Vec<LegacyRecipe>, LegacyError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| {
            LegacyParseError::from_json_error(&e, &contents, &self.path.display().to_string())
                .into()
        })
    }

    /// Remove the legacy document if present
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Upload every legacy record to `collection` and drop the local copy
    ///
    /// Records without a timestamp are stamped with `now`. After the upload
    /// succeeds the document is deleted and `store` is refreshed. On failure
    /// the document stays, the user is notified, and the error is returned.
    /// Ids are kept, so running it again after a partial failure is safe.
    pub async fn migrate(
        &self,
        store: &RecipeStore,
        collection: &dyn RecipeCollection,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
    ) -> Result<usize, LegacyError> {
        if !self.path.exists() {
            return Ok(0);
        }

        let batch: Vec<Recipe> = match self.load() {
            Ok(records) => records.into_iter().map(|r| r.into_recipe(now)).collect(),
            Err(e) => {
                tracing::error!("legacy migration failed: {}", e);
                notifier.notify("Migration failed: the local recipe data could not be read");
                return Err(e);
            }
        };

        if let Err(e) = collection.upsert(&batch).await {
            tracing::error!("legacy migration failed: {}", e);
            notifier.notify("Migration failed: local recipes were kept, try again later");
            return Err(e.into());
        }

        self.clear()?;
        tracing::debug!("migrated {} legacy recipe(s)", batch.len());

        store.refresh().await;
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notify::RecordingNotifier;
    use crate::core::quantity::Unit;
    use crate::core::remote::{RemoteResult, SqliteCollection};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::tempdir;

    const LEGACY_DOC: &str = r#"[
        {
            "id": 1712345678901,
            "title": "Crêpes",
            "baseServings": 6,
            "emoji": "🥞",
            "ingredients": [
                {"quantity": "250", "unit": "g", "name": "farine"},
                {"quantity": "0.5", "unit": "l", "name": "lait"}
            ],
            "steps": ["Mélanger", "Reposer"],
            "color": "bg-yellow-100",
            "createdAt": 1700000000000
        },
        {
            "id": "b9b4c1f2-4c35-4d7e-9a55-0b8f6a1d2e3f",
            "title": "Omelette",
            "ingredients": [{"quantity": "3", "unit": "u", "name": "oeufs"}],
            "category": "Rapide"
        }
    ]"#;

    struct DownCollection;

    #[async_trait]
    impl RecipeCollection for DownCollection {
        async fn select_all(&self) -> RemoteResult<Vec<Recipe>> {
            Err(RemoteError::Unavailable("offline".into()))
        }
        async fn insert(&self, _: &[Recipe]) -> RemoteResult<()> {
            Err(RemoteError::Unavailable("offline".into()))
        }
        async fn update(&self, _: &RecipeId, _: &RecipeFields) -> RemoteResult<()> {
            Err(RemoteError::Unavailable("offline".into()))
        }
        async fn delete(&self, _: &RecipeId) -> RemoteResult<()> {
            Err(RemoteError::Unavailable("offline".into()))
        }
        async fn upsert(&self, _: &[Recipe]) -> RemoteResult<()> {
            Err(RemoteError::Unavailable("offline".into()))
        }
    }

    fn legacy_in(dir: &Path, contents: &str) -> LegacyStore {
        let path = dir.join(format!("{}.json", LEGACY_KEY));
        fs::write(&path, contents).unwrap();
        LegacyStore::new(path)
    }

    fn store_over(db: &SqliteCollection, notifier: Arc<RecordingNotifier>) -> RecipeStore {
        RecipeStore::new(Arc::new(db.clone()), notifier)
    }

    #[test]
    fn test_pending_counts_records() {
        let tmp = tempdir().unwrap();
        assert_eq!(legacy_in(tmp.path(), LEGACY_DOC).pending(), 2);
    }

    #[test]
    fn test_pending_missing_or_malformed_is_zero() {
        let tmp = tempdir().unwrap();
        assert_eq!(LegacyStore::new(tmp.path().join("absent.json")).pending(), 0);
        assert_eq!(legacy_in(tmp.path(), "[{ not json").pending(), 0);
        assert_eq!(legacy_in(tmp.path(), r#"{"id": "x"}"#).pending(), 0);
        assert_eq!(legacy_in(tmp.path(), "[]").pending(), 0);
    }

    #[test]
    fn test_load_reports_location() {
        let tmp = tempdir().unwrap();
        let legacy = legacy_in(tmp.path(), "[\n  {\"id\": \"a\", \"title\": }\n]");

        let err = legacy.load().unwrap_err();
        match err {
            LegacyError::Parse(parse) => {
                // Points into the second line
                assert!(parse.span.offset() > 2);
                assert!(parse.message.contains("line 2"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_into_recipe_timestamps() {
        let now = Utc::now();
        let records: Vec<LegacyRecipe> = serde_json::from_str(LEGACY_DOC).unwrap();
        let recipes: Vec<Recipe> = records.into_iter().map(|r| r.into_recipe(now)).collect();

        assert_eq!(recipes[0].created_at.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(recipes[0].base_servings.get(), 6);
        assert_eq!(recipes[0].ingredients[1].unit, Unit::Liter);
        assert_eq!(recipes[1].created_at, now);
        assert_eq!(recipes[1].base_servings.get(), 4);
        assert_eq!(recipes[1].category(), Some("Rapide"));
    }

    #[test]
    fn test_into_recipe_accepts_both_timestamp_keys() {
        let now = Utc::now();
        let records: Vec<LegacyRecipe> = serde_json::from_str(
            r#"[
                {"id": "a", "title": "Flan", "createdAt": 1700000000000, "created_at": 1600000000000},
                {"id": "b", "title": "Far", "created_at": 1600000000000},
                {"id": "c", "title": "Kouign", "createdAt": 0, "created_at": 1600000000000}
            ]"#,
        )
        .unwrap();
        let recipes: Vec<Recipe> = records.into_iter().map(|r| r.into_recipe(now)).collect();

        assert_eq!(recipes[0].created_at.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(recipes[1].created_at.timestamp_millis(), 1_600_000_000_000);
        assert_eq!(recipes[2].created_at.timestamp_millis(), 1_600_000_000_000);
    }

    #[test]
    fn test_load_accepts_free_form_ids_and_numeric_quantities() {
        let tmp = tempdir().unwrap();
        let legacy = legacy_in(
            tmp.path(),
            r#"[{"id": "my recipe", "title": "Riz au lait",
                 "ingredients": [{"quantity": 200, "unit": "g", "name": "riz"},
                                 {"quantity": 0.5, "unit": "l", "name": "lait"}]}]"#,
        );

        let records = legacy.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "my recipe");
        assert_eq!(records[0].fields.ingredients[0].quantity, "200");
        assert_eq!(records[0].fields.ingredients[1].quantity, "0.5");
    }

    #[tokio::test]
    async fn test_migrate_uploads_and_clears() {
        let tmp = tempdir().unwrap();
        let legacy = legacy_in(tmp.path(), LEGACY_DOC);
        let db = SqliteCollection::in_memory().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let store = store_over(&db, notifier.clone());

        let migrated = legacy
            .migrate(&store, &db, notifier.as_ref(), Utc::now())
            .await
            .unwrap();

        assert_eq!(migrated, 2);
        assert!(!legacy.path().exists());
        assert_eq!(legacy.pending(), 0);
        assert_eq!(db.count().await.unwrap(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.resolve("1712345678901").is_ok());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_migrate_twice_is_idempotent() {
        let tmp = tempdir().unwrap();
        let db = SqliteCollection::in_memory().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let store = store_over(&db, notifier.clone());
        let now = Utc::now();

        let first = legacy_in(tmp.path(), LEGACY_DOC);
        first.migrate(&store, &db, notifier.as_ref(), now).await.unwrap();
        let second = legacy_in(tmp.path(), LEGACY_DOC);
        second.migrate(&store, &db, notifier.as_ref(), now).await.unwrap();

        assert_eq!(db.count().await.unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_migrate_failure_keeps_document() {
        let tmp = tempdir().unwrap();
        let legacy = legacy_in(tmp.path(), LEGACY_DOC);
        let notifier = Arc::new(RecordingNotifier::new());
        let store = RecipeStore::new(Arc::new(DownCollection), notifier.clone());

        let err = legacy
            .migrate(&store, &DownCollection, notifier.as_ref(), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, LegacyError::Remote(_)));
        assert!(legacy.path().exists());
        assert_eq!(legacy.pending(), 2);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_migrate_without_document_is_noop() {
        let tmp = tempdir().unwrap();
        let legacy = LegacyStore::new(tmp.path().join("absent.json"));
        let db = SqliteCollection::in_memory().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let store = store_over(&db, notifier.clone());

        let migrated = legacy
            .migrate(&store, &db, notifier.as_ref(), Utc::now())
            .await
            .unwrap();
        assert_eq!(migrated, 0);
        assert_eq!(store.phase(), crate::core::store::StorePhase::Uninitialized);
    }
}
