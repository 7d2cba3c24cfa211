//! Recipe commands - `recipe add|list|show|delete|import`.

use crate::{
    cli::CliContext,
    core::report,
    errors::{Error, Result},
    external::{self, RecipeImport, SpoonacularClient, SpoonacularConfig},
    models::{RecipeLine, RecipeRecord},
};
use clap::Subcommand;
use std::fmt::Write as _;
use tracing::info;

/// `recipe` subcommands.
#[derive(Subcommand, Debug)]
pub enum RecipeCommand {
    /// Add a recipe or replace the one with the same name
    Add {
        /// Unique recipe name
        name: String,
        /// Number of servings the recipe makes
        #[arg(short, long, default_value_t = 1)]
        servings: u32,
        /// Ingredient line as name:quantity:unit, e.g. "Egg:2:piece" (repeatable)
        #[arg(short = 'i', long = "item", required = true, value_parser = parse_recipe_line)]
        items: Vec<RecipeLine>,
        /// Preparation text
        #[arg(long)]
        instructions: Option<String>,
    },
    /// List stored recipes
    List,
    /// Show a recipe's lines
    Show {
        /// Recipe name
        name: String,
    },
    /// Delete a recipe
    Delete {
        /// Recipe name
        name: String,
    },
    /// Import the best Spoonacular match for a query
    Import {
        /// Free-text search, e.g. "banana bread"
        query: String,
        /// Store under this name instead of the recipe's title
        #[arg(long)]
        name: Option<String>,
        /// Show the imported recipe without saving it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Parses a `name:quantity:unit` recipe line.
///
/// The name may itself contain colons; the last two fields are always quantity and unit.
///
/// # Errors
/// Returns [`Error::InvalidRecipe`] for a malformed line and [`Error::InvalidAmount`] for a
/// negative or non-finite quantity.
pub fn parse_recipe_line(input: &str) -> Result<RecipeLine> {
    let mut parts = input.rsplitn(3, ':');
    let (Some(unit), Some(quantity), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::invalid_recipe(format!(
            "expected name:quantity:unit, got '{input}'"
        )));
    };

    let name = name.trim();
    let unit = unit.trim();
    if name.is_empty() || unit.is_empty() {
        return Err(Error::invalid_recipe(format!(
            "expected name:quantity:unit, got '{input}'"
        )));
    }
    let quantity: f64 = quantity.trim().parse().map_err(|_| {
        Error::invalid_recipe(format!("'{}' is not a quantity in '{input}'", quantity.trim()))
    })?;
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(Error::InvalidAmount {
            field: "quantity",
            amount: quantity,
        });
    }
    Ok(RecipeLine::new(name, quantity, unit))
}

/// Lists the names `recipe` references that the catalog does not contain.
async fn missing_from_catalog(ctx: &CliContext, recipe: &RecipeRecord) -> Result<Vec<String>> {
    let catalog = ctx.store.load_catalog().await?;
    let mut missing: Vec<String> = recipe
        .items
        .iter()
        .filter(|line| !catalog.contains(&line.ingredient_name))
        .map(|line| line.ingredient_name.clone())
        .collect();
    missing.dedup();
    Ok(missing)
}

async fn save_and_describe(ctx: &CliContext, recipe: &RecipeRecord) -> Result<String> {
    ctx.store.save_recipe(recipe).await?;
    info!("Saved recipe '{}'", recipe.name);

    let mut out = format!("Saved {}", report::format_recipe_summary(recipe)?);
    let missing = missing_from_catalog(ctx, recipe).await?;
    if !missing.is_empty() {
        writeln!(out, "Not in catalog yet: {}", missing.join(", "))?;
    }
    Ok(out)
}

/// Imports through `importer` and saves the result unless `dry_run` is set.
///
/// # Errors
/// Returns an error if the imported recipe is invalid or cannot be saved.
pub async fn import_recipe(
    ctx: &CliContext,
    importer: &dyn RecipeImport,
    query: &str,
    name: Option<String>,
    dry_run: bool,
) -> Result<String> {
    let timeout = ctx.config.analysis.import_timeout();
    let Some(mut recipe) = external::import_with_timeout(importer, query, timeout).await else {
        return Ok(format!("No recipe found for '{query}'."));
    };
    if let Some(name) = name {
        recipe.name = name;
    }
    recipe.validate()?;

    if dry_run {
        return report::format_recipe_summary(&recipe);
    }
    save_and_describe(ctx, &recipe).await
}

fn spoonacular_client(ctx: &CliContext) -> Result<SpoonacularClient> {
    let settings = &ctx.config.spoonacular;
    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| Error::config("SPOONACULAR_API_KEY is not set"))?;
    let mut config = SpoonacularConfig {
        api_key,
        ..SpoonacularConfig::default()
    };
    if let Some(base_url) = &settings.base_url {
        config.base_url.clone_from(base_url);
    }
    Ok(SpoonacularClient::new(config))
}

/// Runs one `recipe` subcommand.
///
/// # Errors
/// Returns an error for invalid input, an unknown recipe, missing import credentials, or a
/// store failure.
pub async fn run(ctx: &CliContext, command: RecipeCommand) -> Result<String> {
    match command {
        RecipeCommand::Add {
            name,
            servings,
            items,
            instructions,
        } => {
            let recipe = RecipeRecord {
                name: name.trim().to_string(),
                servings,
                items,
                instructions,
            };
            save_and_describe(ctx, &recipe).await
        }
        RecipeCommand::List => {
            let recipes = ctx.store.load_recipes().await?;
            if recipes.is_empty() {
                return Ok("No recipes stored.".to_string());
            }
            let mut out = String::new();
            for recipe in recipes.iter() {
                writeln!(
                    out,
                    "{} ({} servings, {} lines)",
                    recipe.name,
                    recipe.servings,
                    recipe.items.len()
                )?;
            }
            Ok(out)
        }
        RecipeCommand::Show { name } => {
            let recipe = ctx
                .store
                .find_recipe(&name)
                .await?
                .ok_or(Error::RecipeNotFound { name })?;
            report::format_recipe_summary(&recipe)
        }
        RecipeCommand::Delete { name } => {
            if ctx.store.delete_recipe(&name).await? {
                Ok(format!("Deleted recipe '{name}'."))
            } else {
                Err(Error::RecipeNotFound { name })
            }
        }
        RecipeCommand::Import {
            query,
            name,
            dry_run,
        } => {
            let client = spoonacular_client(ctx)?;
            import_recipe(ctx, &client, &query, name, dry_run).await
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::cli::commands::testing::test_context;
    use crate::external::testing::{FailingImporter, FixedImporter};
    use crate::test_utils::{test_egg, test_recipe};

    #[test]
    fn test_parse_recipe_line() {
        assert_eq!(
            parse_recipe_line("Egg:2:piece").unwrap(),
            RecipeLine::new("Egg", 2.0, "piece")
        );
        assert_eq!(
            parse_recipe_line(" Olive Oil : 1.5 : Tbsp ").unwrap(),
            RecipeLine::new("Olive Oil", 1.5, "Tbsp")
        );
        assert_eq!(
            parse_recipe_line("Sauce: Base:100:g").unwrap(),
            RecipeLine::new("Sauce: Base", 100.0, "g")
        );
    }

    #[test]
    fn test_parse_recipe_line_errors() {
        assert!(matches!(
            parse_recipe_line("Egg:2"),
            Err(Error::InvalidRecipe { .. })
        ));
        assert!(matches!(
            parse_recipe_line("Egg:two:piece"),
            Err(Error::InvalidRecipe { .. })
        ));
        assert!(matches!(
            parse_recipe_line(":2:piece"),
            Err(Error::InvalidRecipe { .. })
        ));
        assert!(matches!(
            parse_recipe_line("Egg:-1:piece"),
            Err(Error::InvalidAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_show_list_delete() -> Result<()> {
        let ctx = test_context().await?;
        ctx.store.save_ingredient(&test_egg()).await?;

        let recipe = test_recipe("Omelette");
        let out = run(
            &ctx,
            RecipeCommand::Add {
                name: recipe.name.clone(),
                servings: recipe.servings,
                items: recipe.items.clone(),
                instructions: None,
            },
        )
        .await?;
        assert!(out.starts_with("Saved Omelette (2 servings)"));
        assert!(out.contains("Not in catalog yet: Flour"));

        let list = run(&ctx, RecipeCommand::List).await?;
        assert_eq!(list.trim(), "Omelette (2 servings, 2 lines)");

        let shown = run(
            &ctx,
            RecipeCommand::Show {
                name: "Omelette".to_string(),
            },
        )
        .await?;
        assert!(shown.contains("  - 3 piece Egg"));

        let delete = || RecipeCommand::Delete {
            name: "Omelette".to_string(),
        };
        run(&ctx, delete()).await?;
        assert!(matches!(
            run(&ctx, delete()).await,
            Err(Error::RecipeNotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_rejects_zero_servings() -> Result<()> {
        let ctx = test_context().await?;
        let result = run(
            &ctx,
            RecipeCommand::Add {
                name: "Nothing".to_string(),
                servings: 0,
                items: vec![RecipeLine::new("Egg", 1.0, "piece")],
                instructions: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidRecipe { .. })));
        assert!(ctx.store.load_recipes().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_import_saves_recipe() -> Result<()> {
        let ctx = test_context().await?;
        let importer = FixedImporter(Some(test_recipe("Imported Omelette")));

        let preview = import_recipe(&ctx, &importer, "omelette", None, true).await?;
        assert!(preview.starts_with("Imported Omelette"));
        assert!(ctx.store.load_recipes().await?.is_empty());

        import_recipe(&ctx, &importer, "omelette", Some("Omelette".to_string()), false).await?;
        let saved = ctx.store.find_recipe("Omelette").await?.unwrap();
        assert_eq!(saved.items, test_recipe("x").items);

        Ok(())
    }

    #[tokio::test]
    async fn test_import_failures_are_no_match() -> Result<()> {
        let ctx = test_context().await?;

        let out = import_recipe(&ctx, &FailingImporter, "omelette", None, false).await?;
        assert_eq!(out, "No recipe found for 'omelette'.");
        let out = import_recipe(&ctx, &FixedImporter(None), "omelette", None, false).await?;
        assert_eq!(out, "No recipe found for 'omelette'.");

        // No key configured
        assert!(matches!(
            run(
                &ctx,
                RecipeCommand::Import {
                    query: "omelette".to_string(),
                    name: None,
                    dry_run: false,
                },
            )
            .await,
            Err(Error::Config { .. })
        ));

        Ok(())
    }
}
