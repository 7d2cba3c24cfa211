//! Ingredient commands - `ingredient add|list|show|delete`.
//!
//! `add` doubles as the edit command: flags left out keep the stored values, so a
//! placeholder created during analysis can be completed one field at a time.

use crate::{
    cli::CliContext,
    core::{report, units::Unit},
    errors::{Error, Result},
    models::{IngredientRecord, Nutrients},
};
use clap::{Args, Subcommand};
use chrono::Utc;
use std::fmt::Write as _;
use tracing::info;

/// `ingredient` subcommands.
#[derive(Subcommand, Debug)]
pub enum IngredientCommand {
    /// Add an ingredient or change fields of an existing one
    Add(IngredientArgs),
    /// List the catalog
    List,
    /// Show one ingredient
    Show {
        /// Ingredient name
        name: String,
    },
    /// Remove an ingredient from the catalog
    Delete {
        /// Ingredient name
        name: String,
    },
}

/// Fields accepted by `ingredient add`.
#[derive(Args, Debug, Default)]
pub struct IngredientArgs {
    /// Unique ingredient name (case-sensitive)
    pub name: String,
    /// Price of one package
    #[arg(long)]
    pub price: Option<f64>,
    /// Package size, in `--unit` (required for a new ingredient)
    #[arg(long)]
    pub package_weight: Option<f64>,
    /// Package unit, e.g. g, kg, ml, piece (defaults to g for a new ingredient)
    #[arg(long)]
    pub unit: Option<String>,
    /// Grams in one unit, for volume and count units
    #[arg(long)]
    pub weight_per_unit: Option<f64>,
    /// kcal per 100 g
    #[arg(long)]
    pub calories: Option<f64>,
    /// Protein grams per 100 g
    #[arg(long)]
    pub protein: Option<f64>,
    /// Fat grams per 100 g
    #[arg(long)]
    pub fat: Option<f64>,
    /// Carbohydrate grams per 100 g
    #[arg(long)]
    pub carbs: Option<f64>,
}

impl IngredientArgs {
    /// Applies the given flags on top of `existing` (or a new record).
    fn merge(self, existing: Option<IngredientRecord>) -> Result<IngredientRecord> {
        let is_new = existing.is_none();
        let name = self.name.trim().to_string();
        let mut record = existing.unwrap_or_else(|| IngredientRecord::placeholder(&name, Unit::Gram));

        if is_new && self.package_weight.is_none() {
            return Err(Error::config(format!(
                "--package-weight is required for new ingredient '{name}'"
            )));
        }
        if let Some(unit) = &self.unit {
            record.unit = unit.parse()?;
        }
        if let Some(package_weight) = self.package_weight {
            record.package_weight = package_weight;
        }
        if self.price.is_some() {
            record.price = self.price;
        }
        if self.weight_per_unit.is_some() {
            record.weight_per_unit = self.weight_per_unit;
        }

        let given = [self.calories, self.protein, self.fat, self.carbs];
        if given.iter().any(Option::is_some) {
            let base = match record.nutrients_per_100g {
                Some(current) => current,
                None if given.iter().all(Option::is_some) => Nutrients::default(),
                None => {
                    return Err(Error::config(format!(
                        "'{name}' has no nutrients yet: give all of --calories, --protein, --fat and --carbs"
                    )));
                }
            };
            record.nutrients_per_100g = Some(Nutrients::new(
                self.calories.unwrap_or(base.calories),
                self.protein.unwrap_or(base.protein),
                self.fat.unwrap_or(base.fat),
                self.carbs.unwrap_or(base.carbs),
            ));
        }

        record.last_updated = Utc::now();
        record.validate()?;
        Ok(record)
    }
}

/// Runs one `ingredient` subcommand.
///
/// # Errors
/// Returns an error for invalid input, an unknown ingredient, or a store failure.
pub async fn run(ctx: &CliContext, command: IngredientCommand) -> Result<String> {
    let currency = &ctx.config.currency;
    match command {
        IngredientCommand::Add(args) => {
            let existing = ctx.store.find_ingredient(args.name.trim()).await?;
            let verb = if existing.is_some() { "Updated" } else { "Added" };
            let record = args.merge(existing)?;
            let saved = ctx.store.save_ingredient(&record).await?;
            info!("{} ingredient '{}'", verb, saved.name);
            Ok(format!(
                "{verb} {}",
                report::format_ingredient_summary(&saved, currency)
            ))
        }
        IngredientCommand::List => {
            let catalog = ctx.store.load_catalog().await?;
            if catalog.is_empty() {
                return Ok("No ingredients in the catalog.".to_string());
            }
            let mut out = String::new();
            for record in catalog.iter() {
                writeln!(out, "{}", report::format_ingredient_summary(record, currency))?;
            }
            Ok(out)
        }
        IngredientCommand::Show { name } => {
            let record = ctx
                .store
                .find_ingredient(&name)
                .await?
                .ok_or(Error::UnknownIngredient { name })?;
            let mut out = report::format_ingredient_summary(&record, currency);
            if let Some(n) = record.nutrients_per_100g {
                write!(
                    out,
                    "\nPer 100 g: {} | protein {} | fat {} | carbs {}",
                    report::format_calories(n.calories),
                    report::format_grams(n.protein),
                    report::format_grams(n.fat),
                    report::format_grams(n.carbs)
                )?;
            }
            write!(
                out,
                "\nLast updated: {}",
                record.last_updated.format("%Y-%m-%d %H:%M UTC")
            )?;
            Ok(out)
        }
        IngredientCommand::Delete { name } => {
            if ctx.store.delete_ingredient(&name).await? {
                Ok(format!("Deleted ingredient '{name}'."))
            } else {
                Err(Error::UnknownIngredient { name })
            }
        }
    }
}
