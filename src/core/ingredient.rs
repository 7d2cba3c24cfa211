//! Ingredient business logic - Handles all catalog operations against the database.
//!
//! This module provides functions for reading, saving, and deleting catalog records, plus
//! the two conditional writes the analysis pass relies on: inserting a placeholder only
//! when the name is still free, and filling nutrients only when the stored row still has
//! none. Both are single statements, so replaying them is harmless.

use crate::{
    entities::{Ingredient, ingredient},
    errors::{Error, Result},
    models::{Catalog, IngredientRecord, Nutrients},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, QueryOrder, Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, instrument, warn};

/// Converts a stored row into a catalog record.
///
/// Nutrients are only considered known when all four columns are set.
///
/// # Errors
/// Returns [`Error::UnrecognizedUnit`] when the stored unit name does not parse.
pub fn model_to_record(model: ingredient::Model) -> Result<IngredientRecord> {
    let nutrients_per_100g = match (model.calories, model.protein, model.fat, model.carbs) {
        (Some(calories), Some(protein), Some(fat), Some(carbs)) => {
            Some(Nutrients::new(calories, protein, fat, carbs))
        }
        _ => None,
    };
    Ok(IngredientRecord {
        unit: model.unit.parse()?,
        name: model.name,
        price: model.price,
        package_weight: model.package_weight,
        weight_per_unit: model.weight_per_unit,
        nutrients_per_100g,
        last_updated: model.updated_at,
    })
}

/// Copies every record field into an active model and stamps `updated_at`.
fn fill_active_model(active: &mut ingredient::ActiveModel, record: &IngredientRecord, now: DateTime<Utc>) {
    let nutrients = record.nutrients_per_100g;
    active.name = Set(record.name.trim().to_string());
    active.price = Set(record.price);
    active.package_weight = Set(record.package_weight);
    active.unit = Set(record.unit.as_str().to_string());
    active.weight_per_unit = Set(record.weight_per_unit);
    active.calories = Set(nutrients.map(|n| n.calories));
    active.protein = Set(nutrients.map(|n| n.protein));
    active.fat = Set(nutrients.map(|n| n.fat));
    active.carbs = Set(nutrients.map(|n| n.carbs));
    active.updated_at = Set(now);
}

/// Retrieves all catalog records, ordered alphabetically by name.
///
/// Rows whose stored unit no longer parses are skipped with a warning, so one bad row
/// never hides the rest of the catalog.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_ingredients<C>(db: &C) -> Result<Vec<IngredientRecord>>
where
    C: ConnectionTrait,
{
    let models = Ingredient::find()
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?;

    let mut records = Vec::with_capacity(models.len());
    for model in models {
        let name = model.name.clone();
        match model_to_record(model) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping ingredient '{}': {}", name, e),
        }
    }
    Ok(records)
}

/// Loads the whole catalog into memory, skipping unreadable rows.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn load_catalog<C>(db: &C) -> Result<Catalog>
where
    C: ConnectionTrait,
{
    Ok(get_all_ingredients(db).await?.into_iter().collect())
}

/// Finds a record by its exact name, returning None if not found.
///
/// # Errors
/// Returns an error if the database query fails or the stored unit is invalid.
pub async fn get_ingredient_by_name<C>(db: &C, name: &str) -> Result<Option<IngredientRecord>>
where
    C: ConnectionTrait,
{
    Ingredient::find()
        .filter(ingredient::Column::Name.eq(name))
        .one(db)
        .await?
        .map(model_to_record)
        .transpose()
}

/// Inserts or replaces the record with the same name, after validation.
///
/// Returns the record as stored, with a fresh `last_updated`.
///
/// # Errors
/// Returns an error if:
/// - The record fails [`IngredientRecord::validate`]
/// - The database write fails
#[instrument(skip(db, record), fields(name = %record.name))]
pub async fn save_ingredient<C>(db: &C, record: &IngredientRecord) -> Result<IngredientRecord>
where
    C: ConnectionTrait,
{
    record.validate()?;

    let now = Utc::now();
    let existing = Ingredient::find()
        .filter(ingredient::Column::Name.eq(record.name.trim()))
        .one(db)
        .await?;

    let model = match existing {
        Some(model) => {
            let mut active: ingredient::ActiveModel = model.into();
            fill_active_model(&mut active, record, now);
            active.update(db).await?
        }
        None => {
            let mut active = ingredient::ActiveModel {
                ..Default::default()
            };
            fill_active_model(&mut active, record, now);
            active.insert(db).await?
        }
    };
    debug!("Saved ingredient '{}'", model.name);
    model_to_record(model)
}

/// Inserts `record` unless a row with the same name already exists.
///
/// Returns whether a row was inserted.
///
/// # Errors
/// Returns an error if the record is invalid or the database write fails.
pub async fn insert_placeholder_if_absent<C>(db: &C, record: &IngredientRecord) -> Result<bool>
where
    C: ConnectionTrait,
{
    record.validate()?;

    let mut active = ingredient::ActiveModel {
        ..Default::default()
    };
    fill_active_model(&mut active, record, Utc::now());

    let inserted = Ingredient::insert(active)
        .on_conflict(
            OnConflict::column(ingredient::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

/// Stores `nutrients` for `name` only if the row still lacks nutrient data.
///
/// Returns whether a row was changed. A record completed since the pass began is left
/// as it is.
///
/// # Errors
/// Returns an error if the database write fails.
pub async fn fill_missing_nutrients<C>(db: &C, name: &str, nutrients: Nutrients) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Ingredient::update_many()
        .col_expr(ingredient::Column::Calories, Expr::value(nutrients.calories))
        .col_expr(ingredient::Column::Protein, Expr::value(nutrients.protein))
        .col_expr(ingredient::Column::Fat, Expr::value(nutrients.fat))
        .col_expr(ingredient::Column::Carbs, Expr::value(nutrients.carbs))
        .col_expr(ingredient::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(ingredient::Column::Name.eq(name))
        .filter(
            Condition::any()
                .add(ingredient::Column::Calories.is_null())
                .add(ingredient::Column::Protein.is_null())
                .add(ingredient::Column::Fat.is_null())
                .add(ingredient::Column::Carbs.is_null()),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Replaces the stored record only if it has not changed since `expected`.
///
/// This is a compare-and-swap on `updated_at`, for callers that read a record, let a
/// user edit it, and write it back while others may be editing too.
///
/// # Errors
/// Returns an error if:
/// - The record fails validation
/// - No record with that name exists ([`Error::UnknownIngredient`])
/// - The stored record changed after `expected` ([`Error::StaleRecord`])
/// - The database write fails
#[instrument(skip(db, record), fields(name = %record.name))]
pub async fn update_ingredient_if_unchanged<C>(
    db: &C,
    record: &IngredientRecord,
    expected: DateTime<Utc>,
) -> Result<IngredientRecord>
where
    C: ConnectionTrait,
{
    record.validate()?;

    let now = Utc::now();
    let nutrients = record.nutrients_per_100g;
    let result = Ingredient::update_many()
        .col_expr(ingredient::Column::Price, Expr::value(record.price))
        .col_expr(ingredient::Column::PackageWeight, Expr::value(record.package_weight))
        .col_expr(ingredient::Column::Unit, Expr::value(record.unit.as_str()))
        .col_expr(ingredient::Column::WeightPerUnit, Expr::value(record.weight_per_unit))
        .col_expr(ingredient::Column::Calories, Expr::value(nutrients.map(|n| n.calories)))
        .col_expr(ingredient::Column::Protein, Expr::value(nutrients.map(|n| n.protein)))
        .col_expr(ingredient::Column::Fat, Expr::value(nutrients.map(|n| n.fat)))
        .col_expr(ingredient::Column::Carbs, Expr::value(nutrients.map(|n| n.carbs)))
        .col_expr(ingredient::Column::UpdatedAt, Expr::value(now))
        .filter(ingredient::Column::Name.eq(record.name.as_str()))
        .filter(ingredient::Column::UpdatedAt.eq(expected))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return match get_ingredient_by_name(db, &record.name).await? {
            Some(_) => Err(Error::StaleRecord {
                name: record.name.clone(),
                expected,
            }),
            None => Err(Error::UnknownIngredient {
                name: record.name.clone(),
            }),
        };
    }

    get_ingredient_by_name(db, &record.name)
        .await?
        .ok_or_else(|| Error::UnknownIngredient {
            name: record.name.clone(),
        })
}

/// Deletes the record with this name. Returns whether a row was removed.
///
/// # Errors
/// Returns an error if the database delete fails.
pub async fn delete_ingredient<C>(db: &C, name: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Ingredient::delete_many()
        .filter(ingredient::Column::Name.eq(name))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::units::Unit;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_save_ingredient_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut record = test_ingredient("Flour");
        record.name = "   ".to_string();
        let result = save_ingredient(&db, &record).await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        let mut record = test_ingredient("Flour");
        record.price = Some(-1.0);
        let result = save_ingredient(&db, &record).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { field: "price", amount } if amount == -1.0
        ));

        let mut record = test_ingredient("Flour");
        record.package_weight = 0.0;
        assert!(save_ingredient(&db, &record).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_get_ingredient_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let saved = save_ingredient(&db, &test_egg()).await?;
        assert_eq!(saved.name, "Egg");
        assert_eq!(saved.unit, Unit::Piece);
        assert_eq!(saved.weight_per_unit, Some(60.0));

        let found = get_ingredient_by_name(&db, "Egg").await?.unwrap();
        assert_eq!(found, saved);

        // Names are case-sensitive
        assert!(get_ingredient_by_name(&db, "egg").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_save_ingredient_replaces_by_name() -> Result<()> {
        let db = setup_test_db().await?;

        save_ingredient(&db, &test_ingredient("Flour")).await?;
        let mut updated = test_ingredient("Flour");
        updated.price = Some(5.25);
        updated.nutrients_per_100g = None;
        save_ingredient(&db, &updated).await?;

        let all = get_all_ingredients(&db).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].price, Some(5.25));
        assert!(all[0].nutrients_per_100g.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_zero_values_are_kept_distinct_from_unset() -> Result<()> {
        let db = setup_test_db().await?;

        let mut water = test_ingredient("Water");
        water.price = Some(0.0);
        water.nutrients_per_100g = Some(Nutrients::default());
        save_ingredient(&db, &water).await?;

        let found = get_ingredient_by_name(&db, "Water").await?.unwrap();
        assert_eq!(found.price, Some(0.0));
        assert_eq!(found.nutrients_per_100g, Some(Nutrients::default()));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_ingredients_ordered() -> Result<()> {
        let db = setup_test_db().await?;

        save_ingredient(&db, &test_ingredient("Sugar")).await?;
        save_ingredient(&db, &test_ingredient("Butter")).await?;
        save_ingredient(&db, &test_ingredient("Flour")).await?;

        let names: Vec<String> = get_all_ingredients(&db)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Butter", "Flour", "Sugar"]);

        let catalog = load_catalog(&db).await?;
        assert_eq!(catalog.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_unit_row_is_skipped_on_load() -> Result<()> {
        let db = setup_test_db().await?;
        save_ingredient(&db, &test_ingredient("Flour")).await?;
        save_ingredient(&db, &test_ingredient("Nutmeg")).await?;

        // Simulate a row edited outside the application
        Ingredient::update_many()
            .col_expr(ingredient::Column::Unit, Expr::value("pinch"))
            .filter(ingredient::Column::Name.eq("Nutmeg"))
            .exec(&db)
            .await?;

        let catalog = load_catalog(&db).await?;
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("Flour"));

        // A direct lookup still reports the problem
        let result = get_ingredient_by_name(&db, "Nutmeg").await;
        assert!(matches!(result, Err(Error::UnrecognizedUnit { ref unit }) if unit == "pinch"));

        Ok(())
    }

    #[tokio::test]
    async fn test_insert_placeholder_if_absent() -> Result<()> {
        let db = setup_test_db().await?;

        let placeholder = IngredientRecord::placeholder("Saffron", Unit::Gram);
        assert!(insert_placeholder_if_absent(&db, &placeholder).await?);
        assert!(!insert_placeholder_if_absent(&db, &placeholder).await?);

        // An edited record is never replaced by a placeholder
        let mut saffron = get_ingredient_by_name(&db, "Saffron").await?.unwrap();
        saffron.price = Some(12.0);
        save_ingredient(&db, &saffron).await?;
        assert!(!insert_placeholder_if_absent(&db, &placeholder).await?);

        let stored = get_ingredient_by_name(&db, "Saffron").await?.unwrap();
        assert_eq!(stored.price, Some(12.0));
        assert_eq!(get_all_ingredients(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_fill_missing_nutrients_only_when_unset() -> Result<()> {
        let db = setup_test_db().await?;

        let mut oats = test_ingredient("Oats");
        oats.nutrients_per_100g = None;
        save_ingredient(&db, &oats).await?;

        let fetched = Nutrients::new(379.0, 13.2, 6.5, 67.7);
        assert!(fill_missing_nutrients(&db, "Oats", fetched).await?);
        assert!(!fill_missing_nutrients(&db, "Oats", Nutrients::new(1.0, 1.0, 1.0, 1.0)).await?);
        assert!(!fill_missing_nutrients(&db, "Missing", fetched).await?);

        let stored = get_ingredient_by_name(&db, "Oats").await?.unwrap();
        assert_eq!(stored.nutrients_per_100g, Some(fetched));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_if_unchanged() -> Result<()> {
        let db = setup_test_db().await?;

        let saved = save_ingredient(&db, &test_ingredient("Flour")).await?;
        let read_at = saved.last_updated;

        let mut edit = saved.clone();
        edit.price = Some(6.0);
        let updated = update_ingredient_if_unchanged(&db, &edit, read_at).await?;
        assert_eq!(updated.price, Some(6.0));

        // A second writer still holding the old timestamp loses
        let mut late_edit = saved;
        late_edit.price = Some(7.0);
        let result = update_ingredient_if_unchanged(&db, &late_edit, read_at).await;
        assert!(matches!(result, Err(Error::StaleRecord { ref name, .. }) if name == "Flour"));

        let stored = get_ingredient_by_name(&db, "Flour").await?.unwrap();
        assert_eq!(stored.price, Some(6.0));

        let ghost = test_ingredient("Ghost");
        let result = update_ingredient_if_unchanged(&db, &ghost, read_at).await;
        assert!(matches!(result, Err(Error::UnknownIngredient { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_ingredient() -> Result<()> {
        let db = setup_test_db().await?;

        save_ingredient(&db, &test_ingredient("Flour")).await?;
        assert!(delete_ingredient(&db, "Flour").await?);
        assert!(!delete_ingredient(&db, "Flour").await?);
        assert!(get_ingredient_by_name(&db, "Flour").await?.is_none());

        Ok(())
    }
}
