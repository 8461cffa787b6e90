//! SQLite-backed recipe collection

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::schema::init_schema;
use super::{RecipeCollection, RemoteError, RemoteResult};
use crate::core::identity::RecipeId;
use crate::core::quantity::Servings;
use crate::entities::{Ingredient, Recipe, RecipeFields};

/// Current schema version
pub(super) const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str =
    "id, title, base_servings, emoji, ingredients, steps, color, category, created_at";

/// Recipe collection stored in a SQLite database
#[derive(Clone)]
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCollection {
    /// Open or create the collection database at `path`
    pub fn open(path: &Path) -> RemoteResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        init_schema(&conn)?;

        tracing::debug!("opened recipe collection at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// A throwaway in-memory collection
    pub fn in_memory() -> RemoteResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Number of stored records
    pub async fn count(&self) -> RemoteResult<usize> {
        let conn = self.conn.lock().await;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// Encoded column values for one record
struct Row {
    ingredients: String,
    steps: String,
    servings: i64,
    created_at: i64,
}

impl Row {
    fn encode(recipe: &Recipe) -> RemoteResult<Self> {
        Ok(Self {
            ingredients: serde_json::to_string(&recipe.ingredients)?,
            steps: serde_json::to_string(&recipe.steps)?,
            servings: i64::from(recipe.base_servings.get()),
            created_at: recipe.created_at.timestamp_millis(),
        })
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Raw column values as read from the table
type RawRow = (
    String,
    String,
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
);

fn decode(raw: RawRow) -> RemoteResult<Recipe> {
    let (id, title, servings, emoji, ingredients, steps, color, category, created_at) = raw;

    let decode_err = |message: String| RemoteError::Decode {
        id: id.clone(),
        message,
    };

    let ingredients: Vec<Ingredient> =
        serde_json::from_str(&ingredients).map_err(|e| decode_err(format!("ingredients: {e}")))?;
    let steps: Vec<String> =
        serde_json::from_str(&steps).map_err(|e| decode_err(format!("steps: {e}")))?;
    let created_at = Utc
        .timestamp_millis_opt(created_at)
        .single()
        .ok_or_else(|| decode_err(format!("created_at out of range: {created_at}")))?;
    let recipe_id = RecipeId::parse(&id).map_err(|e| decode_err(e.to_string()))?;

    let fields = RecipeFields {
        title,
        base_servings: Servings::from(servings),
        emoji,
        ingredients,
        steps,
        color,
        category,
    };

    Ok(Recipe::from_fields(recipe_id, fields, created_at))
}

#[async_trait]
impl RecipeCollection for SqliteCollection {
    async fn select_all(&self) -> RemoteResult<Vec<Recipe>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM recipes ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], |row| -> rusqlite::Result<RawRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })?;

        let mut recipes = Vec::new();
        for raw in rows {
            recipes.push(decode(raw?)?);
        }
        Ok(recipes)
    }

    async fn insert(&self, records: &[Recipe]) -> RemoteResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for recipe in records {
            let row = Row::encode(recipe)?;
            tx.execute(
                "INSERT INTO recipes (id, title, base_servings, emoji, ingredients, steps, color, category, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    recipe.id.as_str(),
                    recipe.title,
                    row.servings,
                    recipe.emoji,
                    row.ingredients,
                    row.steps,
                    recipe.color,
                    recipe.category,
                    row.created_at,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    RemoteError::Conflict(recipe.id.to_string())
                } else {
                    RemoteError::Database(e)
                }
            })?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn update(&self, id: &RecipeId, fields: &RecipeFields) -> RemoteResult<()> {
        let ingredients = serde_json::to_string(&fields.ingredients)?;
        let steps = serde_json::to_string(&fields.steps)?;

        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE recipes
             SET title = ?1, base_servings = ?2, emoji = ?3, ingredients = ?4,
                 steps = ?5, color = ?6, category = ?7
             WHERE id = ?8",
            params![
                fields.title,
                i64::from(fields.base_servings.get()),
                fields.emoji,
                ingredients,
                steps,
                fields.color,
                fields.category,
                id.as_str(),
            ],
        )?;

        if changed == 0 {
            tracing::debug!("update matched no record for {}", id);
        }
        Ok(())
    }

    async fn delete(&self, id: &RecipeId) -> RemoteResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM recipes WHERE id = ?1", params![id.as_str()])?;
        Ok(())
    }

    async fn upsert(&self, records: &[Recipe]) -> RemoteResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for recipe in records {
            let row = Row::encode(recipe)?;
            tx.execute(
                "INSERT INTO recipes (id, title, base_servings, emoji, ingredients, steps, color, category, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    base_servings = excluded.base_servings,
                    emoji = excluded.emoji,
                    ingredients = excluded.ingredients,
                    steps = excluded.steps,
                    color = excluded.color,
                    category = excluded.category,
                    created_at = excluded.created_at",
                params![
                    recipe.id.as_str(),
                    recipe.title,
                    row.servings,
                    recipe.emoji,
                    row.ingredients,
                    row.steps,
                    recipe.color,
                    recipe.category,
                    row.created_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quantity::Unit;
    use chrono::Duration;
    use tempfile::tempdir;

    fn recipe(title: &str, minutes_ago: i64) -> Recipe {
        let fields = RecipeFields::new(title)
            .with_ingredients(vec![Ingredient::new("200", Unit::Gram, "sucre")])
            .with_steps(vec!["Mélanger".to_string()]);
        Recipe::from_fields(
            RecipeId::new(),
            fields,
            Utc::now() - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn test_insert_and_select_newest_first() {
        let db = SqliteCollection::in_memory().unwrap();
        let old = recipe("Ancienne", 60);
        let new = recipe("Nouvelle", 1);
        db.insert(&[old.clone(), new.clone()]).await.unwrap();

        let all = db.select_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, new.id);
        assert_eq!(all[1].id, old.id);
        assert_eq!(all[0].ingredients, new.ingredients);
        assert_eq!(
            all[0].created_at.timestamp_millis(),
            new.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_insert_existing_id_conflicts() {
        let db = SqliteCollection::in_memory().unwrap();
        let r = recipe("Tarte", 5);
        db.insert(&[r.clone()]).await.unwrap();

        let err = db.insert(&[r.clone()]).await.unwrap_err();
        assert!(matches!(err, RemoteError::Conflict(id) if id == r.id.to_string()));
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let db = SqliteCollection::in_memory().unwrap();
        let r = recipe("Tarte", 5);
        db.insert(&[r.clone()]).await.unwrap();

        let fields = RecipeFields::new("Tarte aux pommes").with_category(Some("Desserts".into()));
        db.update(&r.id, &fields).await.unwrap();

        let all = db.select_all().await.unwrap();
        assert_eq!(all[0].title, "Tarte aux pommes");
        assert_eq!(all[0].category(), Some("Desserts"));
        assert_eq!(
            all[0].created_at.timestamp_millis(),
            r.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_ok() {
        let db = SqliteCollection::in_memory().unwrap();
        let fields = RecipeFields::new("Fantôme");
        db.update(&RecipeId::new(), &fields).await.unwrap();
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = SqliteCollection::in_memory().unwrap();
        let r = recipe("Tarte", 5);
        db.insert(&[r.clone()]).await.unwrap();
        db.delete(&r.id).await.unwrap();
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let db = SqliteCollection::in_memory().unwrap();
        let batch = vec![recipe("Un", 3), recipe("Deux", 2)];

        db.upsert(&batch).await.unwrap();
        db.upsert(&batch).await.unwrap();

        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_select_keeps_free_form_ids() {
        let db = SqliteCollection::in_memory().unwrap();
        let fields = RecipeFields::new("Soupe");
        let r = Recipe::from_fields(RecipeId::parse("ma soupe").unwrap(), fields, Utc::now());
        db.insert(&[r, recipe("Tarte", 5)]).await.unwrap();

        let all = db.select_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id.as_str(), "ma soupe");
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/recipes.db");
        let r = recipe("Gratin", 1);

        {
            let db = SqliteCollection::open(&path).unwrap();
            db.insert(&[r.clone()]).await.unwrap();
        }

        let db = SqliteCollection::open(&path).unwrap();
        let all = db.select_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Gratin");
    }
}
