//! Ingredient entity - One row of the price and nutrition catalog.
//!
//! Price and the four nutrient densities are nullable: `NULL` means "not yet known",
//! which is different from a stored zero. `unit` holds the canonical unit name.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    /// Unique identifier for the ingredient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog key (e.g., "Egg", "Rolled Oats"), case-sensitive
    #[sea_orm(unique)]
    pub name: String,
    /// Price of one package, if known
    pub price: Option<f64>,
    /// Package size expressed in `unit`
    pub package_weight: f64,
    /// Canonical unit name (e.g., `"gram"`, `"piece"`)
    pub unit: String,
    /// Grams in one `unit`, for non-gram units
    pub weight_per_unit: Option<f64>,
    /// kcal per 100 g
    pub calories: Option<f64>,
    /// Protein grams per 100 g
    pub protein: Option<f64>,
    /// Fat grams per 100 g
    pub fat: Option<f64>,
    /// Carbohydrate grams per 100 g
    pub carbs: Option<f64>,
    /// When the row was last written
    pub updated_at: DateTimeUtc,
}

/// Ingredients have no foreign keys; recipe lines refer to them by name
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
