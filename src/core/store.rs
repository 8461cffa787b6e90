//! The recipe store: in-memory recipe list with optimistic remote writes
//!
//! The store owns the authoritative in-memory copy of every recipe. All
//! mutations go through it:
//! - the in-memory list changes immediately, before the remote call starts
//! - the remote write runs as a spawned task
//! - a failed remote write is logged and reported through the [`Notifier`],
//!   but the local change is kept (no rollback)
//!
//! Readers only ever get snapshots (`Vec<Recipe>` clones). Concurrent
//! `refresh` calls are not serialized; whichever resolves last wins.
//!
//! Mutations spawn onto the current tokio runtime and must be called from
//! within one.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::core::identity::RecipeId;
use crate::core::notify::Notifier;
use crate::core::remote::{RecipeCollection, RemoteResult};
use crate::entities::{Recipe, RecipeFields};

/// Lifecycle phase of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    /// No fetch has been attempted yet
    Uninitialized,
    /// A full fetch is in flight; the list is indeterminate
    Loading,
    /// Steady state (possibly stale or empty after a failed fetch)
    Ready,
}

impl std::fmt::Display for StorePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorePhase::Uninitialized => write!(f, "uninitialized"),
            StorePhase::Loading => write!(f, "loading"),
            StorePhase::Ready => write!(f, "ready"),
        }
    }
}

/// Which remote write a task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl WriteKind {
    fn failure_message(self, title: &str) -> String {
        match self {
            WriteKind::Insert => format!("Could not save '{}' to the recipe store", title),
            WriteKind::Update => format!("Could not update '{}' in the recipe store", title),
            WriteKind::Delete => format!("Could not delete '{}' from the recipe store", title),
        }
    }
}

/// Final state of a remote write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote collection accepted the write
    Persisted,
    /// The remote write failed; the local change was kept
    Failed(String),
}

impl WriteOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteOutcome::Persisted)
    }
}

/// Handle to a remote write in flight
///
/// Dropping the handle does not cancel the write.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<WriteOutcome>,
}

impl PendingWrite {
    /// Wait for the remote write to finish
    pub async fn wait(self) -> WriteOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => WriteOutcome::Failed(format!("write task did not complete: {}", e)),
        }
    }

    /// Whether the remote write has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Filter for browsing recipes
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
}

impl RecipeFilter {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        let category_ok = match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(cat) => recipe.category() == Some(cat),
            None => true,
        };
        let search_ok = match self.search.as_deref().filter(|s| !s.is_empty()) {
            Some(q) => recipe.title.to_lowercase().contains(&q.to_lowercase()),
            None => true,
        };
        category_ok && search_ok
    }
}

/// Distinct non-empty categories across `recipes`, sorted
pub fn derive_categories(recipes: &[Recipe]) -> Vec<String> {
    recipes
        .iter()
        .filter_map(|r| r.category())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Errors from looking up a recipe by id or title
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no recipe found matching '{0}'")]
    NotFound(String),

    #[error("ambiguous query '{query}' matches {} recipes", .matches.len())]
    Ambiguous { query: String, matches: Vec<Recipe> },
}

struct StoreInner {
    recipes: RwLock<Vec<Recipe>>,
    loading: AtomicBool,
    fetched: AtomicBool,
    remote: Arc<dyn RecipeCollection>,
    notifier: Arc<dyn Notifier>,
}

/// The single authoritative in-memory cache of all recipes
#[derive(Clone)]
pub struct RecipeStore {
    inner: Arc<StoreInner>,
}

impl RecipeStore {
    /// Create an empty, uninitialized store
    pub fn new(remote: Arc<dyn RecipeCollection>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                recipes: RwLock::new(Vec::new()),
                loading: AtomicBool::new(false),
                fetched: AtomicBool::new(false),
                remote,
                notifier,
            }),
        }
    }

    /// Create a store and run the initial fetch
    pub async fn open(remote: Arc<dyn RecipeCollection>, notifier: Arc<dyn Notifier>) -> Self {
        let store = Self::new(remote, notifier);
        store.refresh().await;
        store
    }

    fn read_list(&self) -> RwLockReadGuard<'_, Vec<Recipe>> {
        self.inner
            .recipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_list(&self) -> RwLockWriteGuard<'_, Vec<Recipe>> {
        self.inner
            .recipes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Remote fetch
    // ------------------------------------------------------------------

    /// Reload every recipe from the remote collection, newest first
    ///
    /// On failure the in-memory list is left as it was and the error is
    /// logged. `loading` is cleared either way.
    pub async fn refresh(&self) {
        self.inner.loading.store(true, Ordering::SeqCst);

        match self.inner.remote.select_all().await {
            Ok(recipes) => {
                tracing::debug!("fetched {} recipe(s)", recipes.len());
                *self.write_list() = recipes;
            }
            Err(e) => {
                tracing::error!("error fetching recipes: {}", e);
            }
        }

        self.inner.fetched.store(true, Ordering::SeqCst);
        self.inner.loading.store(false, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Optimistic mutations
    // ------------------------------------------------------------------

    /// Create a recipe: it becomes the head of the list immediately, and an
    /// insert is submitted to the remote collection
    pub fn add(&self, fields: RecipeFields) -> (Recipe, PendingWrite) {
        let recipe = Recipe::from_fields(RecipeId::new(), fields, Utc::now());
        self.write_list().insert(0, recipe.clone());

        let remote = Arc::clone(&self.inner.remote);
        let record = recipe.clone();
        let pending = self.spawn_write(WriteKind::Insert, &recipe.title, async move {
            remote.insert(std::slice::from_ref(&record)).await
        });

        (recipe, pending)
    }

    /// Replace the editable fields of a recipe, keeping its id and creation
    /// time, and submit the update to the remote collection
    ///
    /// An id missing from the local list changes nothing locally; the remote
    /// update is still submitted.
    pub fn update(&self, id: &RecipeId, fields: RecipeFields) -> PendingWrite {
        {
            let mut list = self.write_list();
            match list.iter_mut().find(|r| &r.id == id) {
                Some(slot) => *slot = slot.merged(fields.clone()),
                None => tracing::debug!("update for {} not in local list", id),
            }
        }

        let remote = Arc::clone(&self.inner.remote);
        let target = id.clone();
        let title = fields.title.clone();
        self.spawn_write(WriteKind::Update, &title, async move {
            remote.update(&target, &fields).await
        })
    }

    /// Remove a recipe locally and submit the delete to the remote collection
    pub fn delete(&self, id: &RecipeId) -> PendingWrite {
        let removed_title = {
            let mut list = self.write_list();
            let title = list
                .iter()
                .find(|r| &r.id == id)
                .map(|r| r.title.clone());
            list.retain(|r| &r.id != id);
            title
        };

        let remote = Arc::clone(&self.inner.remote);
        let target = id.clone();
        let title = removed_title.unwrap_or_else(|| id.to_string());
        self.spawn_write(WriteKind::Delete, &title, async move {
            remote.delete(&target).await
        })
    }

    fn spawn_write<F>(&self, kind: WriteKind, title: &str, write: F) -> PendingWrite
    where
        F: Future<Output = RemoteResult<()>> + Send + 'static,
    {
        let notifier = Arc::clone(&self.inner.notifier);
        let title = title.to_string();

        let handle = tokio::spawn(async move {
            match write.await {
                Ok(()) => {
                    tracing::debug!("{:?} of '{}' persisted", kind, title);
                    WriteOutcome::Persisted
                }
                Err(e) => {
                    tracing::error!("{:?} of '{}' failed: {}", kind, title, e);
                    notifier.notify(&kind.failure_message(&title));
                    WriteOutcome::Failed(e.to_string())
                }
            }
        });

        PendingWrite { handle }
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    /// Snapshot of every recipe, newest first
    pub fn recipes(&self) -> Vec<Recipe> {
        self.read_list().clone()
    }

    pub fn len(&self) -> usize {
        self.read_list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_list().is_empty()
    }

    /// Snapshot of one recipe
    pub fn get(&self, id: &RecipeId) -> Option<Recipe> {
        self.read_list().iter().find(|r| &r.id == id).cloned()
    }

    /// Find a recipe by full id, id prefix, or title substring
    ///
    /// An exact id always wins, then a unique id prefix. Only when no id
    /// starts with the query are titles searched (case-insensitive
    /// substring). A blank query matches nothing.
    pub fn resolve(&self, query: &str) -> Result<Recipe, LookupError> {
        if query.trim().is_empty() {
            return Err(LookupError::NotFound(query.to_string()));
        }

        let list = self.read_list();

        if let Some(exact) = list.iter().find(|r| r.id.as_str() == query) {
            return Ok(exact.clone());
        }

        let mut matches: Vec<Recipe> = list
            .iter()
            .filter(|r| r.id.as_str().starts_with(query))
            .cloned()
            .collect();

        if matches.is_empty() {
            let needle = query.to_lowercase();
            matches = list
                .iter()
                .filter(|r| r.title.to_lowercase().contains(&needle))
                .cloned()
                .collect();
        }

        match matches.len() {
            0 => Err(LookupError::NotFound(query.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(LookupError::Ambiguous {
                query: query.to_string(),
                matches,
            }),
        }
    }

    /// Known categories, derived from the current recipes
    pub fn categories(&self) -> Vec<String> {
        derive_categories(&self.read_list())
    }

    /// Recipes matching a filter, in list order
    pub fn filter(&self, filter: &RecipeFilter) -> Vec<Recipe> {
        self.read_list()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Whether a full fetch is in flight
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> StorePhase {
        if self.is_loading() {
            StorePhase::Loading
        } else if self.inner.fetched.load(Ordering::SeqCst) {
            StorePhase::Ready
        } else {
            StorePhase::Uninitialized
        }
    }
}
