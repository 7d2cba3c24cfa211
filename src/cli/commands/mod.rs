/// `analyze` command
pub mod analyze;
/// `ingredient` subcommands
pub mod ingredient;
/// `recipe` subcommands
pub mod recipe;

pub use analyze::AnalyzeArgs;
pub use ingredient::IngredientCommand;
pub use recipe::{RecipeCommand, parse_recipe_line};
