//! JSON file implementation of [`Persistence`].
//!
//! The catalog lives in `ingredients.json` and the recipes in `recipes.json`, both
//! pretty-printed maps keyed by name. Every write goes to a temporary file first and is
//! then renamed over the old one, so a crash never leaves a half-written file. A mutex
//! serializes read-modify-write cycles within the process.

use super::Persistence;
use crate::core::reconciliation::CatalogUpdate;
use crate::errors::Result;
use crate::models::{Catalog, IngredientRecord, RecipeRecord, RecipeStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

const INGREDIENTS_FILE: &str = "ingredients.json";
const RECIPES_FILE: &str = "recipes.json";

/// Store backed by two JSON files in one directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the store directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_file<T>(&self, file_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.dir.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                Ok(T::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file<T>(&self, file_name: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let path = self.dir.join(file_name);
        let tmp = self.dir.join(format!("{file_name}.tmp"));
        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Ingredient file contents, kept undecoded so an entry that fails to parse survives
/// writes to its neighbours.
type RawCatalog = BTreeMap<String, Value>;

fn decode_entry(name: &str, value: &Value) -> Option<IngredientRecord> {
    match serde_json::from_value(value.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping ingredient '{}': {}", name, e);
            None
        }
    }
}

#[async_trait]
impl Persistence for JsonFileStore {
    /// Loads the catalog, skipping entries that do not decode.
    async fn load_catalog(&self) -> Result<Catalog> {
        let raw: RawCatalog = self.read_file(INGREDIENTS_FILE).await?;
        Ok(raw
            .iter()
            .filter_map(|(name, value)| decode_entry(name, value))
            .collect())
    }

    async fn load_recipes(&self) -> Result<RecipeStore> {
        self.read_file(RECIPES_FILE).await
    }

    async fn find_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>> {
        let raw: RawCatalog = self.read_file(INGREDIENTS_FILE).await?;
        Ok(raw.get(name).cloned().map(serde_json::from_value).transpose()?)
    }

    async fn find_recipe(&self, name: &str) -> Result<Option<RecipeRecord>> {
        Ok(self.load_recipes().await?.get(name).cloned())
    }

    #[instrument(skip(self, record), fields(name = %record.name))]
    async fn save_ingredient(&self, record: &IngredientRecord) -> Result<IngredientRecord> {
        record.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut raw: RawCatalog = self.read_file(INGREDIENTS_FILE).await?;
        let mut stored = record.clone();
        stored.name = stored.name.trim().to_string();
        stored.last_updated = Utc::now();
        raw.insert(stored.name.clone(), serde_json::to_value(&stored)?);
        self.write_file(INGREDIENTS_FILE, &raw).await?;
        Ok(stored)
    }

    #[instrument(skip(self, recipe), fields(name = %recipe.name))]
    async fn save_recipe(&self, recipe: &RecipeRecord) -> Result<()> {
        recipe.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut recipes = self.load_recipes().await?;
        recipes.insert(recipe.clone());
        self.write_file(RECIPES_FILE, &recipes).await
    }

    async fn delete_ingredient(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut raw: RawCatalog = self.read_file(INGREDIENTS_FILE).await?;
        if raw.remove(name).is_none() {
            return Ok(false);
        }
        self.write_file(INGREDIENTS_FILE, &raw).await?;
        Ok(true)
    }

    async fn delete_recipe(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut recipes = self.load_recipes().await?;
        if recipes.remove(name).is_none() {
            return Ok(false);
        }
        self.write_file(RECIPES_FILE, &recipes).await?;
        Ok(true)
    }

    /// Applies all updates under one lock with a single write.
    async fn apply_catalog_updates(&self, updates: &[CatalogUpdate]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut raw: RawCatalog = self.read_file(INGREDIENTS_FILE).await?;
        let now = Utc::now();
        let mut applied = 0;
        for update in updates {
            match update {
                CatalogUpdate::Placeholder(record) => {
                    if !raw.contains_key(&record.name) {
                        record.validate()?;
                        let mut stored = record.clone();
                        stored.last_updated = now;
                        raw.insert(stored.name.clone(), serde_json::to_value(&stored)?);
                        applied += 1;
                    }
                }
                CatalogUpdate::FillNutrients { name, nutrients } => {
                    let existing = raw.get(name).and_then(|value| decode_entry(name, value));
                    if let Some(mut stored) = existing {
                        if stored.nutrients_per_100g.is_none() {
                            stored.nutrients_per_100g = Some(*nutrients);
                            stored.last_updated = now;
                            raw.insert(name.clone(), serde_json::to_value(&stored)?);
                            applied += 1;
                        }
                    }
                }
            }
        }
        if applied > 0 {
            self.write_file(INGREDIENTS_FILE, &raw).await?;
        } else {
            debug!("No catalog updates to write");
        }
        Ok(applied)
    }
}
