//! Core module - fundamental types and services

pub mod config;
pub mod identity;
pub mod legacy;
pub mod notify;
pub mod project;
pub mod quantity;
pub mod remote;
pub mod store;

pub use config::Config;
pub use identity::{IdParseError, RecipeId};
pub use legacy::{LegacyError, LegacyStore};
pub use notify::{ConsoleNotifier, Notifier};
pub use project::{Project, ProjectError};
pub use quantity::{ScaledQuantity, Servings, Unit};
pub use remote::{RecipeCollection, RemoteError, SqliteCollection};
pub use store::{PendingWrite, RecipeFilter, RecipeStore, StorePhase, WriteOutcome};
