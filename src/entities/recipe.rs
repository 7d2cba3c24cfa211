//! Recipe entity - A named recipe with a serving count.
//!
//! The ingredient lines live in `recipe_items`, ordered by `position`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique recipe name
    #[sea_orm(unique)]
    pub name: String,
    /// Number of servings the recipe makes
    pub servings: i32,
    /// Free-form preparation text
    #[sea_orm(column_type = "Text", nullable)]
    pub instructions: Option<String>,
    /// When the recipe was last written
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One recipe has many ingredient lines
    #[sea_orm(has_many = "super::recipe_item::Entity")]
    Items,
}

impl Related<super::recipe_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
