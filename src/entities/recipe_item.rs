//! Recipe item entity - One ingredient line of a recipe.
//!
//! Lines reference ingredients by name rather than by id so a recipe can mention an
//! ingredient the catalog does not have yet. `unit` keeps the text as the recipe wrote it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the recipe this line belongs to
    pub recipe_id: i64,
    /// Zero-based order of the line within the recipe
    pub position: i32,
    /// Catalog name of the ingredient
    pub ingredient_name: String,
    /// Amount in `unit`
    pub quantity: f64,
    /// Unit text as written in the recipe
    pub unit: String,
}

/// Defines relationships between `RecipeItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id",
        on_delete = "Cascade"
    )]
    Recipe,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
