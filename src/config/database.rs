//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Creation uses `IF NOT EXISTS` because the
//! command line opens the same database file on every run.

use crate::entities::{Ingredient, Recipe, RecipeItem};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::debug;

/// Database used when neither config.toml nor `DATABASE_URL` name one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://meal_cost.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the ingredient, recipe and recipe item tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let ingredient_table = schema
        .create_table_from_entity(Ingredient)
        .if_not_exists()
        .to_owned();
    let recipe_table = schema
        .create_table_from_entity(Recipe)
        .if_not_exists()
        .to_owned();
    let recipe_item_table = schema
        .create_table_from_entity(RecipeItem)
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&ingredient_table)).await?;
    db.execute(builder.build(&recipe_table)).await?;
    db.execute(builder.build(&recipe_item_table)).await?;

    Ok(())
}

/// Connects to `database_url` and makes sure every table exists.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{IngredientModel, RecipeItemModel, RecipeModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<IngredientModel> = Ingredient::find().limit(1).all(&db).await?;
        let _: Vec<RecipeModel> = Recipe::find().limit(1).all(&db).await?;
        let _: Vec<RecipeItemModel> = RecipeItem::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_twice() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_init_database_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite").display());
        let db = init_database(&url).await?;
        let _: Vec<IngredientModel> = Ingredient::find().limit(1).all(&db).await?;
        Ok(())
    }
}
