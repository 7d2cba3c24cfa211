//! Domain records shared by the engine, the stores, and the external collaborators.
//!
//! These are plain values with no storage concerns. [`Catalog`] and [`RecipeStore`] are
//! the in-memory snapshots the analysis pass works on; the SQL entities in
//! [`crate::entities`] map onto them in [`crate::core::ingredient`] and
//! [`crate::core::recipe`].

use crate::core::units::Unit;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Macro-nutrient densities per 100 g of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrients {
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Fat in grams
    pub fat: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
}

impl Nutrients {
    /// Builds a nutrient set from its four components.
    #[must_use]
    pub const fn new(calories: f64, protein: f64, fat: f64, carbs: f64) -> Self {
        Self {
            calories,
            protein,
            fat,
            carbs,
        }
    }

    /// Multiplies every component by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            fat: self.fat * factor,
            carbs: self.carbs * factor,
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, amount) in [
            ("calories", self.calories),
            ("protein", self.protein),
            ("fat", self.fat),
            ("carbs", self.carbs),
        ] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidAmount { field, amount });
            }
        }
        Ok(())
    }
}

/// One catalog entry: what a package costs, how much it holds, and its nutrient density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    /// Unique, case-sensitive catalog key
    pub name: String,
    /// Price of one package; `None` when not yet known
    pub price: Option<f64>,
    /// Amount one package holds, expressed in `unit`
    pub package_weight: f64,
    /// Unit the package is measured in
    pub unit: Unit,
    /// Grams represented by one `unit`; ignored for grams
    pub weight_per_unit: Option<f64>,
    /// Nutrient densities per 100 g; `None` when not yet measured
    pub nutrients_per_100g: Option<Nutrients>,
    /// Time of the last write
    pub last_updated: DateTime<Utc>,
}

impl IngredientRecord {
    /// Creates a fully specified gram-based record.
    #[must_use]
    pub fn per_gram(name: impl Into<String>, price: f64, package_grams: f64, nutrients: Nutrients) -> Self {
        Self {
            name: name.into(),
            price: Some(price),
            package_weight: package_grams,
            unit: Unit::Gram,
            weight_per_unit: None,
            nutrients_per_100g: Some(nutrients),
            last_updated: Utc::now(),
        }
    }

    /// Auto-created stand-in for an ingredient a recipe references but the catalog lacks.
    /// Price and nutrients are unset so the record reads as incomplete until edited.
    #[must_use]
    pub fn placeholder(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            price: None,
            package_weight: 1.0,
            unit,
            weight_per_unit: None,
            nutrients_per_100g: None,
            last_updated: Utc::now(),
        }
    }

    /// Grams in one `unit`, if known.
    ///
    /// Gram records always use exactly 1. Other units use `weight_per_unit` when supplied,
    /// falling back to the fixed factor of mass units (kilogram, ounce, pound).
    #[must_use]
    pub fn grams_per_unit(&self) -> Option<f64> {
        if self.unit == Unit::Gram {
            return Some(1.0);
        }
        self.weight_per_unit
            .filter(|w| w.is_finite() && *w > 0.0)
            .or_else(|| self.unit.intrinsic_grams())
    }

    /// Checks the record invariants enforced on every save.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an empty name and [`Error::InvalidAmount`] for a
    /// non-positive package weight, a negative price, a non-positive weight per unit, or
    /// negative nutrient densities.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Ingredient name cannot be empty"));
        }
        if !self.package_weight.is_finite() || self.package_weight <= 0.0 {
            return Err(Error::InvalidAmount {
                field: "package weight",
                amount: self.package_weight,
            });
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(Error::InvalidAmount {
                    field: "price",
                    amount: price,
                });
            }
        }
        if let Some(weight) = self.weight_per_unit {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(Error::InvalidAmount {
                    field: "weight per unit",
                    amount: weight,
                });
            }
        }
        if let Some(nutrients) = &self.nutrients_per_100g {
            nutrients.validate()?;
        }
        Ok(())
    }
}

/// One ingredient reference within a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    /// Catalog key of the ingredient
    pub ingredient_name: String,
    /// Amount, in `unit`
    pub quantity: f64,
    /// Unit text as the recipe expressed it; parsed during normalization
    pub unit: String,
}

impl RecipeLine {
    /// Builds a line from its parts.
    #[must_use]
    pub fn new(ingredient_name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            ingredient_name: ingredient_name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

/// A named recipe with ordered lines and a serving count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Unique recipe key
    pub name: String,
    /// Number of servings the lines make
    pub servings: u32,
    /// Ordered ingredient lines
    pub items: Vec<RecipeLine>,
    /// Free-form preparation text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl RecipeRecord {
    /// Rejects structurally invalid recipes before they reach the engine.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRecipe`] for an empty name, zero servings, no lines, or a line
    /// without an ingredient name, and [`Error::InvalidAmount`] for a negative or non-finite
    /// quantity.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_recipe("recipe name cannot be empty"));
        }
        if self.servings == 0 {
            return Err(Error::invalid_recipe(format!(
                "'{}' must have at least one serving",
                self.name
            )));
        }
        if self.items.is_empty() {
            return Err(Error::invalid_recipe(format!(
                "'{}' has no ingredient lines",
                self.name
            )));
        }
        for line in &self.items {
            if line.ingredient_name.trim().is_empty() {
                return Err(Error::invalid_recipe(format!(
                    "'{}' has a line without an ingredient name",
                    self.name
                )));
            }
            if !line.quantity.is_finite() || line.quantity < 0.0 {
                return Err(Error::InvalidAmount {
                    field: "quantity",
                    amount: line.quantity,
                });
            }
        }
        Ok(())
    }
}

/// In-memory ingredient catalog keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    records: BTreeMap<String, IngredientRecord>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a record by its exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IngredientRecord> {
        self.records.get(name)
    }

    /// Whether `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Inserts or replaces a record, returning the previous one.
    pub fn insert(&mut self, record: IngredientRecord) -> Option<IngredientRecord> {
        self.records.insert(record.name.clone(), record)
    }

    /// Removes a record.
    pub fn remove(&mut self, name: &str) -> Option<IngredientRecord> {
        self.records.remove(name)
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &IngredientRecord> {
        self.records.values()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<IngredientRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = IngredientRecord>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

/// In-memory recipe collection keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeStore {
    recipes: BTreeMap<String, RecipeRecord>,
}

impl RecipeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a recipe by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RecipeRecord> {
        self.recipes.get(name)
    }

    /// Inserts or replaces a recipe.
    pub fn insert(&mut self, recipe: RecipeRecord) -> Option<RecipeRecord> {
        self.recipes.insert(recipe.name.clone(), recipe)
    }

    /// Removes a recipe.
    pub fn remove(&mut self, name: &str) -> Option<RecipeRecord> {
        self.recipes.remove(name)
    }

    /// Recipes in name order.
    pub fn iter(&self) -> impl Iterator<Item = &RecipeRecord> {
        self.recipes.values()
    }

    /// Number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl FromIterator<RecipeRecord> for RecipeStore {
    fn from_iter<I: IntoIterator<Item = RecipeRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for recipe in iter {
            store.insert(recipe);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn egg() -> IngredientRecord {
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

    #[test]
    fn test_grams_per_unit_gram_ignores_weight_per_unit() {
        let mut flour = IngredientRecord::per_gram("Flour", 2.0, 1000.0, Nutrients::default());
        flour.weight_per_unit = Some(42.0);
        assert_eq!(flour.grams_per_unit(), Some(1.0));
    }

    #[test]
    fn test_grams_per_unit_uses_weight_per_unit() {
        assert_eq!(egg().grams_per_unit(), Some(60.0));
    }

    #[test]
    fn test_grams_per_unit_falls_back_to_mass_factor() {
        let mut rice = IngredientRecord::per_gram("Rice", 5.0, 2.0, Nutrients::default());
        rice.unit = Unit::Kilogram;
        assert_eq!(rice.grams_per_unit(), Some(1000.0));
    }

    #[test]
    fn test_grams_per_unit_missing_for_count_without_weight() {
        let mut banana = egg();
        banana.weight_per_unit = None;
        assert_eq!(banana.grams_per_unit(), None);
    }

    #[test]
    fn test_ingredient_validation() {
        assert!(egg().validate().is_ok());

        let mut record = egg();
        record.name = "  ".to_string();
        assert!(matches!(record.validate(), Err(Error::Config { .. })));

        let mut record = egg();
        record.package_weight = 0.0;
        assert!(matches!(
            record.validate(),
            Err(Error::InvalidAmount {
                field: "package weight",
                ..
            })
        ));

        let mut record = egg();
        record.price = Some(-1.0);
        assert!(matches!(
            record.validate(),
            Err(Error::InvalidAmount { field: "price", .. })
        ));

        let mut record = egg();
        record.weight_per_unit = Some(0.0);
        assert!(matches!(
            record.validate(),
            Err(Error::InvalidAmount {
                field: "weight per unit",
                ..
            })
        ));

        let mut record = egg();
        record.nutrients_per_100g = Some(Nutrients::new(100.0, f64::NAN, 0.0, 0.0));
        assert!(matches!(
            record.validate(),
            Err(Error::InvalidAmount {
                field: "protein",
                ..
            })
        ));
    }

    #[test]
    fn test_placeholder_is_incomplete_but_valid() {
        let placeholder = IngredientRecord::placeholder("Saffron", Unit::Gram);
        assert!(placeholder.price.is_none());
        assert!(placeholder.nutrients_per_100g.is_none());
        assert!(placeholder.validate().is_ok());
    }

    #[test]
    fn test_recipe_validation() {
        let recipe = RecipeRecord {
            name: "Omelette".to_string(),
            servings: 1,
            items: vec![RecipeLine::new("Egg", 2.0, "piece")],
            instructions: None,
        };
        assert!(recipe.validate().is_ok());

        let mut no_servings = recipe.clone();
        no_servings.servings = 0;
        assert!(matches!(
            no_servings.validate(),
            Err(Error::InvalidRecipe { .. })
        ));

        let mut no_items = recipe.clone();
        no_items.items.clear();
        assert!(matches!(no_items.validate(), Err(Error::InvalidRecipe { .. })));

        let mut negative = recipe;
        negative.items[0].quantity = -1.0;
        assert!(matches!(
            negative.validate(),
            Err(Error::InvalidAmount {
                field: "quantity",
                ..
            })
        ));
    }

    #[test]
    fn test_catalog_is_keyed_by_exact_name() {
        let catalog: Catalog = [egg()].into_iter().collect();
        assert!(catalog.contains("Egg"));
        assert!(!catalog.contains("egg"));
        assert_eq!(catalog.len(), 1);
    }
}
