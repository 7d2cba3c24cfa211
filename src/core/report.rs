//! Report rendering.
//!
//! This module turns a [`RecipeAnalysis`] and catalog records into plain text for the
//! command line. All functions are pure and return text; the CLI layer decides where
//! they are printed.

use crate::core::aggregation::Contribution;
use crate::core::analysis::{LineAnalysis, RecipeAnalysis};
use crate::core::reconciliation::ReferenceState;
use crate::errors::Result;
use crate::models::{IngredientRecord, RecipeRecord};
use std::fmt::Write as _;

/// Formats a cost with the currency symbol and two decimals.
///
/// # Arguments
/// * `amount` - Cost in the configured currency
/// * `currency` - Symbol placed before the amount, e.g. `$` or `€`
///
/// # Returns
/// Formatted string like "$1.45"
#[must_use]
pub fn format_cost(amount: f64, currency: &str) -> String {
    if amount < 0.0 {
        format!("-{currency}{:.2}", amount.abs())
    } else {
        format!("{currency}{amount:.2}")
    }
}

/// Formats energy as whole kilocalories, e.g. "186 kcal".
#[must_use]
pub fn format_calories(kcal: f64) -> String {
    format!("{kcal:.0} kcal")
}

/// Formats a mass in grams with one decimal, e.g. "15.6 g".
#[must_use]
pub fn format_grams(grams: f64) -> String {
    format!("{grams:.1} g")
}

/// One-line summary of a contribution: cost, energy, and the three macros.
#[must_use]
pub fn format_contribution(contribution: &Contribution, currency: &str) -> String {
    format!(
        "{} | {} | protein {} | fat {} | carbs {}",
        format_cost(contribution.cost, currency),
        format_calories(contribution.calories),
        format_grams(contribution.protein),
        format_grams(contribution.fat),
        format_grams(contribution.carbs),
    )
}

fn format_states(states: &[ReferenceState]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the per-line breakdown table.
///
/// # Errors
/// Returns an error if writing to the output buffer fails.
pub fn format_breakdown_table(lines: &[LineAnalysis], currency: &str) -> Result<String> {
    let name_width = lines
        .iter()
        .map(|line| line.line.ingredient_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Ingredient".len());

    let mut out = String::new();
    writeln!(
        out,
        "{:<name_width$}  {:>14}  {:>9}  {:>9}  {:>9}  Status",
        "Ingredient", "Quantity", "Grams", "Cost", "kcal"
    )?;
    for line in lines {
        let quantity = format!("{} {}", line.line.quantity, line.line.unit);
        let grams = line
            .grams
            .map_or_else(|| "?".to_string(), |g| format!("{g:.1}"));
        writeln!(
            out,
            "{:<name_width$}  {:>14}  {:>9}  {:>9}  {:>9.0}  {}",
            line.line.ingredient_name,
            quantity,
            grams,
            format_cost(line.contribution.cost, currency),
            line.contribution.calories,
            format_states(&line.states),
        )?;
    }
    Ok(out)
}

/// Renders the full analysis report.
///
/// # Arguments
/// * `analysis` - Result of the pass
/// * `currency` - Currency symbol for costs
/// * `breakdown` - Whether to append the per-line table
///
/// # Errors
/// Returns an error if writing to the output buffer fails.
pub fn format_recipe_report(
    analysis: &RecipeAnalysis,
    currency: &str,
    breakdown: bool,
) -> Result<String> {
    let mut out = String::new();
    let servings = analysis.servings.get();
    writeln!(
        out,
        "{} ({} serving{})",
        analysis.recipe_name,
        servings,
        if servings == 1 { "" } else { "s" }
    )?;
    writeln!(
        out,
        "Per serving: {}",
        format_contribution(&analysis.per_serving, currency)
    )?;
    writeln!(out, "Total:       {}", format_contribution(&analysis.totals, currency))?;

    let mut incomplete = Vec::new();
    if !analysis.cost_complete() {
        incomplete.push("cost");
    }
    if !analysis.nutrition_complete() {
        incomplete.push("nutrition");
    }
    if !incomplete.is_empty() {
        writeln!(out, "Incomplete:  {}", incomplete.join(", "))?;
    }

    let absent = analysis.absent_ingredients();
    if !absent.is_empty() {
        writeln!(out, "Not in catalog: {}", absent.join(", "))?;
    }

    let mut warnings = analysis.warnings().peekable();
    if warnings.peek().is_some() {
        writeln!(out, "Warnings:")?;
        for (name, warning) in warnings {
            writeln!(out, "  - {name}: {warning}")?;
        }
    }

    if breakdown {
        writeln!(out)?;
        out.push_str(&format_breakdown_table(&analysis.lines, currency)?);
    }
    Ok(out)
}

/// One-line summary of a catalog record for listings.
#[must_use]
pub fn format_ingredient_summary(record: &IngredientRecord, currency: &str) -> String {
    let price = record
        .price
        .map_or_else(|| "no price".to_string(), |p| format_cost(p, currency));
    let per_unit = match record.weight_per_unit {
        Some(w) if record.unit != crate::core::units::Unit::Gram => format!(" ({w} g each)"),
        _ => String::new(),
    };
    let nutrients = record.nutrients_per_100g.map_or_else(
        || "no nutrients".to_string(),
        |n| format!("{} per 100 g", format_calories(n.calories)),
    );
    format!(
        "{}: {} for {} {}{} | {}",
        record.name,
        price,
        record.package_weight,
        record.unit.abbreviation(),
        per_unit,
        nutrients
    )
}

/// Multi-line description of a recipe for `recipe show`.
///
/// # Errors
/// Returns an error if writing to the output buffer fails.
pub fn format_recipe_summary(recipe: &RecipeRecord) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{} ({} servings)", recipe.name, recipe.servings)?;
    for line in &recipe.items {
        writeln!(out, "  - {} {} {}", line.quantity, line.unit, line.ingredient_name)?;
    }
    if let Some(instructions) = &recipe.instructions {
        writeln!(out)?;
        writeln!(out, "{instructions}")?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::analysis::analyze_recipe;
    use crate::core::reconciliation::ReconciliationPolicy;
    use crate::core::units::Unit;
    use crate::models::{Catalog, Nutrients, RecipeLine};
    use chrono::Utc;

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(1.449, "$"), "$1.45");
        assert_eq!(format_cost(0.0, "€"), "€0.00");
        assert_eq!(format_cost(-2.5, "$"), "-$2.50");
    }

    #[test]
    fn test_format_nutrients() {
        assert_eq!(format_calories(186.2), "186 kcal");
        assert_eq!(format_grams(15.62), "15.6 g");
        assert_eq!(format_grams(0.0), "0.0 g");
    }

    #[test]
    fn test_format_contribution() {
        let contribution = Contribution {
            cost: 0.5,
            calories: 186.0,
            protein: 15.6,
            fat: 13.2,
            carbs: 1.32,
        };
        assert_eq!(
            format_contribution(&contribution, "$"),
            "$0.50 | 186 kcal | protein 15.6 g | fat 13.2 g | carbs 1.3 g"
        );
    }

    #[test]
    fn test_ingredient_summary() {
        let egg = IngredientRecord {
            name: "Egg".to_string(),
            price: Some(3.0),
            package_weight: 12.0,
            unit: Unit::Piece,
            weight_per_unit: Some(60.0),
            nutrients_per_100g: Some(Nutrients::new(155.0, 13.0, 11.0, 1.1)),
            last_updated: Utc::now(),
        };
        assert_eq!(
            format_ingredient_summary(&egg, "$"),
            "Egg: $3.00 for 12 pc (60 g each) | 155 kcal per 100 g"
        );

        let placeholder = IngredientRecord::placeholder("Saffron", Unit::Gram);
        assert_eq!(
            format_ingredient_summary(&placeholder, "$"),
            "Saffron: no price for 1 g | no nutrients"
        );
    }

    #[test]
    fn test_recipe_summary_keeps_line_order() {
        let recipe = RecipeRecord {
            name: "Omelette".to_string(),
            servings: 1,
            items: vec![
                RecipeLine::new("Egg", 3.0, "piece"),
                RecipeLine::new("Butter", 10.0, "g"),
            ],
            instructions: Some("Whisk and fry.".to_string()),
        };
        assert_eq!(
            format_recipe_summary(&recipe).unwrap(),
            "Omelette (1 servings)\n  - 3 piece Egg\n  - 10 g Butter\n\nWhisk and fry.\n"
        );
    }

    #[tokio::test]
    async fn test_recipe_report_lists_gaps() {
        let catalog: Catalog = [IngredientRecord::per_gram(
            "Flour",
            4.5,
            2500.0,
            Nutrients::new(364.0, 10.0, 1.0, 76.0),
        )]
        .into_iter()
        .collect();
        let recipe = RecipeRecord {
            name: "Flatbread".to_string(),
            servings: 2,
            items: vec![
                RecipeLine::new("Flour", 300.0, "g"),
                RecipeLine::new("Za'atar", 1.0, "tbsp"),
            ],
            instructions: None,
        };
        let analysis = analyze_recipe(&recipe, &catalog, ReconciliationPolicy::default())
            .await
            .unwrap();
        let report = format_recipe_report(&analysis, "$", true).unwrap();

        assert!(report.starts_with("Flatbread (2 servings)\n"));
        assert!(report.contains("Per serving: $0.27 | 546 kcal"));
        assert!(report.contains("Total:       $0.54 | 1092 kcal"));
        assert!(report.contains("Incomplete:  cost, nutrition"));
        assert!(report.contains("Not in catalog: Za'atar"));
        assert!(report.contains("  - Za'atar: cost incomplete: ingredient not in catalog"));
        assert!(report.contains("Ingredient"));
        assert!(report.contains("not in catalog, missing price, missing nutrients"));
    }
}
