//! Catalog seeding from the `[[ingredients]]` entries of config.toml.
//!
//! Seeds only fill gaps: a name that already exists in the store is left untouched, so
//! edits made through the command line survive every restart.

use crate::core::units::Unit;
use crate::errors::Result;
use crate::models::{IngredientRecord, Nutrients};
use crate::store::Persistence;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

fn default_unit() -> String {
    Unit::Gram.as_str().to_string()
}

/// Configuration for a single seeded ingredient.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngredientSeed {
    /// Catalog key
    pub name: String,
    /// Price of one package, if known
    #[serde(default)]
    pub price: Option<f64>,
    /// Package size in `unit`
    pub package_weight: f64,
    /// Unit name or abbreviation (defaults to grams)
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Grams in one `unit`
    #[serde(default)]
    pub weight_per_unit: Option<f64>,
    /// kcal per 100 g
    #[serde(default)]
    pub calories: Option<f64>,
    /// Protein grams per 100 g
    #[serde(default)]
    pub protein: Option<f64>,
    /// Fat grams per 100 g
    #[serde(default)]
    pub fat: Option<f64>,
    /// Carbohydrate grams per 100 g
    #[serde(default)]
    pub carbs: Option<f64>,
}

impl IngredientSeed {
    /// Converts the seed into a validated catalog record.
    ///
    /// Nutrients are only set when all four values are given.
    ///
    /// # Errors
    /// Returns an error if the unit is unknown or the record is invalid.
    pub fn to_record(&self) -> Result<IngredientRecord> {
        let nutrients_per_100g = match (self.calories, self.protein, self.fat, self.carbs) {
            (Some(calories), Some(protein), Some(fat), Some(carbs)) => {
                Some(Nutrients::new(calories, protein, fat, carbs))
            }
            _ => None,
        };
        let record = IngredientRecord {
            name: self.name.trim().to_string(),
            price: self.price,
            package_weight: self.package_weight,
            unit: self.unit.parse()?,
            weight_per_unit: self.weight_per_unit,
            nutrients_per_100g,
            last_updated: Utc::now(),
        };
        record.validate()?;
        Ok(record)
    }
}

/// Inserts every seed whose name is not in the store yet.
///
/// Returns the number of records inserted.
///
/// # Errors
/// Returns an error if a seed is invalid or a store operation fails.
pub async fn seed_catalog(store: &dyn Persistence, seeds: &[IngredientSeed]) -> Result<usize> {
    let mut inserted = 0;
    for seed in seeds {
        let record = seed.to_record()?;
        if store.find_ingredient(&record.name).await?.is_some() {
            debug!("Seed '{}' already in catalog, skipping", record.name);
            continue;
        }
        store.save_ingredient(&record).await?;
        inserted += 1;
    }
    if inserted > 0 {
        info!("Seeded {} ingredients from config", inserted);
    }
    Ok(inserted)
}
