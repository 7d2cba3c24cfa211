//! Shared test utilities for the meal cost analyzer.
//!
//! This module provides common helper functions for setting up test databases
//! and creating catalog records and recipes with sensible defaults.

use crate::{
    core::units::Unit,
    errors::Result,
    models::{IngredientRecord, Nutrients, RecipeLine, RecipeRecord},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a complete gram-based ingredient.
///
/// # Defaults
/// * price: 4.5 for a 2500 g package
/// * nutrients per 100 g: 364 kcal, 10 g protein, 1 g fat, 76 g carbs
pub fn test_ingredient(name: &str) -> IngredientRecord {
    IngredientRecord::per_gram(name, 4.5, 2500.0, Nutrients::new(364.0, 10.0, 1.0, 76.0))
}

/// Creates an ingredient sold by the piece: a dozen eggs at 3.0, 60 g each.
pub fn test_egg() -> IngredientRecord {
    IngredientRecord {
        name: "Egg".to_string(),
        price: Some(3.0),
        package_weight: 12.0,
        unit: Unit::Piece,
        weight_per_unit: Some(60.0),
        nutrients_per_100g: Some(Nutrients::new(155.0, 13.0, 11.0, 1.1)),
        last_updated: Utc::now(),
    }
}

/// Creates a valid two-line recipe with 2 servings.
pub fn test_recipe(name: &str) -> RecipeRecord {
    RecipeRecord {
        name: name.to_string(),
        servings: 2,
        items: vec![
            RecipeLine::new("Egg", 3.0, "piece"),
            RecipeLine::new("Flour", 50.0, "g"),
        ],
        instructions: None,
    }
}
