//! Recipe business logic - Stores and loads recipes with their ordered ingredient lines.
//!
//! A recipe is written as one database transaction: the recipe row is upserted, its old
//! lines are removed, and the new lines are inserted with their positions. Loading orders
//! lines by position so a round trip preserves the order the recipe was written in.

use crate::{
    entities::{Recipe, RecipeItem, recipe, recipe_item},
    errors::{Error, Result},
    models::{RecipeLine, RecipeRecord, RecipeStore},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

async fn load_items<C>(db: &C, recipe_id: i64) -> Result<Vec<RecipeLine>>
where
    C: ConnectionTrait,
{
    let items = RecipeItem::find()
        .filter(recipe_item::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_item::Column::Position)
        .all(db)
        .await?;
    Ok(items
        .into_iter()
        .map(|item| RecipeLine::new(item.ingredient_name, item.quantity, item.unit))
        .collect())
}

async fn model_to_record<C>(db: &C, model: recipe::Model) -> Result<RecipeRecord>
where
    C: ConnectionTrait,
{
    let items = load_items(db, model.id).await?;
    Ok(RecipeRecord {
        servings: u32::try_from(model.servings).map_err(|_| {
            Error::invalid_recipe(format!(
                "'{}' has a stored serving count of {}",
                model.name, model.servings
            ))
        })?,
        name: model.name,
        items,
        instructions: model.instructions,
    })
}

/// Finds a recipe by name together with its lines, returning None if not found.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_recipe_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<RecipeRecord>> {
    let Some(model) = Recipe::find()
        .filter(recipe::Column::Name.eq(name))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    model_to_record(db, model).await.map(Some)
}

/// Retrieves all recipes, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_recipes(db: &DatabaseConnection) -> Result<RecipeStore> {
    let models = Recipe::find()
        .order_by_asc(recipe::Column::Name)
        .all(db)
        .await?;
    let mut store = RecipeStore::new();
    for model in models {
        store.insert(model_to_record(db, model).await?);
    }
    Ok(store)
}

/// Inserts or replaces the recipe with the same name, including all of its lines.
///
/// The write is atomic: either the new recipe and every line are stored or nothing
/// changes.
///
/// # Errors
/// Returns an error if:
/// - The recipe fails [`RecipeRecord::validate`]
/// - Any database operation fails
#[instrument(skip(db, record), fields(name = %record.name))]
pub async fn save_recipe(db: &DatabaseConnection, record: &RecipeRecord) -> Result<()> {
    record.validate()?;
    let servings = i32::try_from(record.servings).map_err(|_| {
        Error::invalid_recipe(format!("'{}' has too many servings", record.name))
    })?;

    let txn = db.begin().await?;
    let now = Utc::now();

    let existing = Recipe::find()
        .filter(recipe::Column::Name.eq(record.name.as_str()))
        .one(&txn)
        .await?;

    let recipe_id = match existing {
        Some(model) => {
            let recipe_id = model.id;
            let mut active: recipe::ActiveModel = model.into();
            active.servings = Set(servings);
            active.instructions = Set(record.instructions.clone());
            active.updated_at = Set(now);
            active.update(&txn).await?;

            RecipeItem::delete_many()
                .filter(recipe_item::Column::RecipeId.eq(recipe_id))
                .exec(&txn)
                .await?;
            recipe_id
        }
        None => {
            let active = recipe::ActiveModel {
                name: Set(record.name.clone()),
                servings: Set(servings),
                instructions: Set(record.instructions.clone()),
                updated_at: Set(now),
                ..Default::default()
            };
            active.insert(&txn).await?.id
        }
    };

    for (position, line) in record.items.iter().enumerate() {
        let item = recipe_item::ActiveModel {
            recipe_id: Set(recipe_id),
            position: Set(i32::try_from(position).map_err(|_| {
                Error::invalid_recipe(format!("'{}' has too many lines", record.name))
            })?),
            ingredient_name: Set(line.ingredient_name.clone()),
            quantity: Set(line.quantity),
            unit: Set(line.unit.clone()),
            ..Default::default()
        };
        item.insert(&txn).await?;
    }

    txn.commit().await?;
    debug!("Saved recipe '{}' with {} lines", record.name, record.items.len());
    Ok(())
}

/// Deletes a recipe and its lines. Returns whether the recipe existed.
///
/// # Errors
/// Returns an error if any database operation fails.
pub async fn delete_recipe(db: &DatabaseConnection, name: &str) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(model) = Recipe::find()
        .filter(recipe::Column::Name.eq(name))
        .one(&txn)
        .await?
    else {
        return Ok(false);
    };

    RecipeItem::delete_many()
        .filter(recipe_item::Column::RecipeId.eq(model.id))
        .exec(&txn)
        .await?;
    Recipe::delete_by_id(model.id).exec(&txn).await?;

    txn.commit().await?;
    Ok(true)
}
