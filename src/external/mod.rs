//! External collaborators: nutrition lookup and recipe import.
//!
//! The engine only sees the [`NutritionLookup`] and [`RecipeImport`] traits. Calls always go
//! through [`lookup_with_timeout`] and [`import_with_timeout`], which bound the wait and turn
//! every failure into a "not found" style outcome so a remote problem never aborts an
//! analysis.

/// Spoonacular recipe search client
pub mod spoonacular;
/// USDA `FoodData` Central nutrition client
pub mod usda;

use crate::errors::Result;
use crate::models::{Nutrients, RecipeRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub use spoonacular::{SpoonacularClient, SpoonacularConfig};
pub use usda::{UsdaClient, UsdaConfig};

/// Source of nutrient densities (per 100 g) for an ingredient name.
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// Finds nutrients for `ingredient_name`. `Ok(None)` means no match.
    async fn lookup(&self, ingredient_name: &str) -> Result<Option<Nutrients>>;
}

/// Source of complete recipes for a free-text query.
#[async_trait]
pub trait RecipeImport: Send + Sync {
    /// Finds the best recipe for `query`. `Ok(None)` means no match.
    async fn import_recipe(&self, query: &str) -> Result<Option<RecipeRecord>>;
}

/// Outcome of a bounded nutrition lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Nutrients were found
    Found(Nutrients),
    /// The collaborator answered but had no match
    NotFound,
    /// The collaborator failed or did not answer in time
    Unavailable(String),
}

/// Runs `lookup` for `ingredient_name`, giving up after `timeout`.
pub async fn lookup_with_timeout(
    lookup: &dyn NutritionLookup,
    ingredient_name: &str,
    timeout: Duration,
) -> LookupOutcome {
    match tokio::time::timeout(timeout, lookup.lookup(ingredient_name)).await {
        Ok(Ok(Some(nutrients))) => {
            debug!("Nutrition lookup matched '{}'", ingredient_name);
            LookupOutcome::Found(nutrients)
        }
        Ok(Ok(None)) => {
            debug!("Nutrition lookup found nothing for '{}'", ingredient_name);
            LookupOutcome::NotFound
        }
        Ok(Err(e)) => {
            warn!("Nutrition lookup failed for '{}': {}", ingredient_name, e);
            LookupOutcome::Unavailable(e.to_string())
        }
        Err(_) => {
            warn!(
                "Nutrition lookup for '{}' timed out after {:?}",
                ingredient_name, timeout
            );
            LookupOutcome::Unavailable(format!("timed out after {}s", timeout.as_secs_f64()))
        }
    }
}

/// Runs `importer` for `query`, giving up after `timeout`. Failures are logged and
/// reported as no match.
pub async fn import_with_timeout(
    importer: &dyn RecipeImport,
    query: &str,
    timeout: Duration,
) -> Option<RecipeRecord> {
    match tokio::time::timeout(timeout, importer.import_recipe(query)).await {
        Ok(Ok(recipe)) => recipe,
        Ok(Err(e)) => {
            warn!("Recipe import failed for '{}': {}", query, e);
            None
        }
        Err(_) => {
            warn!("Recipe import for '{}' timed out after {:?}", query, timeout);
            None
        }
    }
}

/// Fixed nutrition table, matched case-insensitively.
///
/// Used for `[[nutrition]]` overrides in the config file and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticNutritionLookup {
    entries: HashMap<String, Nutrients>,
}

impl StaticNutritionLookup {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    #[must_use]
    pub fn with_entry(mut self, name: &str, nutrients: Nutrients) -> Self {
        self.insert(name, nutrients);
        self
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, name: &str, nutrients: Nutrients) {
        self.entries.insert(name.trim().to_lowercase(), nutrients);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl NutritionLookup for StaticNutritionLookup {
    async fn lookup(&self, ingredient_name: &str) -> Result<Option<Nutrients>> {
        Ok(self
            .entries
            .get(&ingredient_name.trim().to_lowercase())
            .copied())
    }
}

/// Tries each lookup in order and returns the first match.
///
/// Errors from one source are logged and the next source is tried; the chain only fails
/// when every source failed.
pub struct ChainedNutritionLookup {
    sources: Vec<Box<dyn NutritionLookup>>,
}

impl ChainedNutritionLookup {
    /// Creates a chain from its sources, highest priority first.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn NutritionLookup>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl NutritionLookup for ChainedNutritionLookup {
    async fn lookup(&self, ingredient_name: &str) -> Result<Option<Nutrients>> {
        let mut last_error = None;
        let mut any_answered = false;
        for source in &self.sources {
            match source.lookup(ingredient_name).await {
                Ok(Some(nutrients)) => return Ok(Some(nutrients)),
                Ok(None) => any_answered = true,
                Err(e) => {
                    warn!("Nutrition source failed for '{}': {}", ingredient_name, e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if !any_answered => Err(e),
            _ => Ok(None),
        }
    }
}
