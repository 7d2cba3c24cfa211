//! Persistence seam between the analysis pass and its storage.
//!
//! The engine works on in-memory [`Catalog`] and [`RecipeStore`] values; a [`Persistence`]
//! implementation loads them and writes back records and catalog updates. Two backends
//! are interchangeable: [`DatabaseStore`] (`SQLite` through `SeaORM`) and [`JsonFileStore`]
//! (two JSON files).

/// `SeaORM` backed store
pub mod database;
/// JSON file backed store
pub mod json_file;

pub use database::DatabaseStore;
pub use json_file::JsonFileStore;

use crate::config::{AppConfig, StorageBackend};
use crate::core::reconciliation::CatalogUpdate;
use crate::errors::Result;
use crate::models::{Catalog, IngredientRecord, RecipeRecord, RecipeStore};
use async_trait::async_trait;
use tracing::info;

/// Storage for the catalog and the recipes.
///
/// Saves are idempotent upserts keyed by name.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Loads every catalog record.
    async fn load_catalog(&self) -> Result<Catalog>;

    /// Loads every recipe.
    async fn load_recipes(&self) -> Result<RecipeStore>;

    /// Finds one catalog record by exact name.
    async fn find_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>>;

    /// Finds one recipe by exact name.
    async fn find_recipe(&self, name: &str) -> Result<Option<RecipeRecord>>;

    /// Validates and upserts a catalog record, returning it as stored.
    async fn save_ingredient(&self, record: &IngredientRecord) -> Result<IngredientRecord>;

    /// Validates and upserts a recipe with all of its lines.
    async fn save_recipe(&self, recipe: &RecipeRecord) -> Result<()>;

    /// Removes a catalog record. Returns whether it existed.
    async fn delete_ingredient(&self, name: &str) -> Result<bool>;

    /// Removes a recipe. Returns whether it existed.
    async fn delete_recipe(&self, name: &str) -> Result<bool>;

    /// Applies the updates of a pass and returns how many changed the catalog.
    ///
    /// Placeholders are inserted only when the name is still absent. Fetched nutrients
    /// are written only when the stored record still has none. Applying the same
    /// updates again changes nothing.
    async fn apply_catalog_updates(&self, updates: &[CatalogUpdate]) -> Result<usize>;
}

/// Opens the backend selected in `config`.
///
/// # Errors
/// Returns an error if the database cannot be opened or the JSON directory cannot be
/// created.
pub async fn open_store(config: &AppConfig) -> Result<Box<dyn Persistence>> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let db = crate::config::database::init_database(&config.storage.database_url).await?;
            info!("Using SQLite store");
            Ok(Box::new(DatabaseStore::new(db)))
        }
        StorageBackend::Json => {
            let store = JsonFileStore::open(&config.storage.json_dir).await?;
            info!("Using JSON store in {}", config.storage.json_dir.display());
            Ok(Box::new(store))
        }
    }
}
