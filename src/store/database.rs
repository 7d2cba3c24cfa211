//! `SQLite` implementation of [`Persistence`].

use super::Persistence;
use crate::core::reconciliation::CatalogUpdate;
use crate::core::{ingredient, recipe};
use crate::errors::Result;
use crate::models::{Catalog, IngredientRecord, RecipeRecord, RecipeStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, instrument};

/// Store backed by a `SeaORM` connection.
#[derive(Debug)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Replaces a record only if it is unchanged since `expected`.
    ///
    /// # Errors
    /// See [`ingredient::update_ingredient_if_unchanged`].
    pub async fn update_ingredient_if_unchanged(
        &self,
        record: &IngredientRecord,
        expected: DateTime<Utc>,
    ) -> Result<IngredientRecord> {
        ingredient::update_ingredient_if_unchanged(&self.db, record, expected).await
    }
}

#[async_trait]
impl Persistence for DatabaseStore {
    async fn load_catalog(&self) -> Result<Catalog> {
        ingredient::load_catalog(&self.db).await
    }

    async fn load_recipes(&self) -> Result<RecipeStore> {
        recipe::get_all_recipes(&self.db).await
    }

    async fn find_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>> {
        ingredient::get_ingredient_by_name(&self.db, name).await
    }

    async fn find_recipe(&self, name: &str) -> Result<Option<RecipeRecord>> {
        recipe::get_recipe_by_name(&self.db, name).await
    }

    async fn save_ingredient(&self, record: &IngredientRecord) -> Result<IngredientRecord> {
        ingredient::save_ingredient(&self.db, record).await
    }

    async fn save_recipe(&self, recipe: &RecipeRecord) -> Result<()> {
        recipe::save_recipe(&self.db, recipe).await
    }

    async fn delete_ingredient(&self, name: &str) -> Result<bool> {
        ingredient::delete_ingredient(&self.db, name).await
    }

    async fn delete_recipe(&self, name: &str) -> Result<bool> {
        recipe::delete_recipe(&self.db, name).await
    }

    /// Applies all updates in one transaction using conditional statements, so a record
    /// completed by another writer in the meantime is never overwritten.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn apply_catalog_updates(&self, updates: &[CatalogUpdate]) -> Result<usize> {
        let txn = self.db.begin().await?;
        let mut applied = 0;
        for update in updates {
            let changed = match update {
                CatalogUpdate::Placeholder(record) => {
                    ingredient::insert_placeholder_if_absent(&txn, record).await?
                }
                CatalogUpdate::FillNutrients { name, nutrients } => {
                    ingredient::fill_missing_nutrients(&txn, name, *nutrients).await?
                }
            };
            if changed {
                applied += 1;
            } else {
                debug!("Skipped update for '{}'", update.name());
            }
        }
        txn.commit().await?;
        Ok(applied)
    }
}
