//! The analysis pass: validate a recipe, reconcile and normalize each line, aggregate.
//!
//! A pass fails only on a structurally invalid recipe. Everything else (unknown
//! ingredients, missing prices or nutrients, odd units, lookup outages) ends up as
//! warnings on the affected lines while the numbers are still produced.

use crate::core::aggregation::{self, Contribution};
use crate::core::normalizer::Warning;
use crate::core::reconciliation::{
    CatalogUpdate, ReconciliationPass, ReconciliationPolicy, ReferenceState,
};
use crate::errors::{Error, Result};
use crate::models::{Catalog, RecipeLine, RecipeRecord};
use crate::store::Persistence;
use std::num::NonZeroU32;
use tracing::{info, instrument, warn};

/// Outcome for one recipe line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineAnalysis {
    /// The line as written in the recipe
    pub line: RecipeLine,
    /// Reference states
    pub states: Vec<ReferenceState>,
    /// Gram equivalent, when known
    pub grams: Option<f64>,
    /// Cost and nutrients contributed
    pub contribution: Contribution,
    /// Incomplete or assumed inputs
    pub warnings: Vec<Warning>,
}

impl LineAnalysis {
    /// Whether the line's cost is fully known.
    #[must_use]
    pub fn cost_complete(&self) -> bool {
        !self.warnings.iter().any(Warning::affects_cost)
    }

    /// Whether the line's nutrients are fully known.
    #[must_use]
    pub fn nutrition_complete(&self) -> bool {
        !self.warnings.iter().any(Warning::affects_nutrition)
    }
}

/// Result of one pass over a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeAnalysis {
    /// Name of the analyzed recipe
    pub recipe_name: String,
    /// Serving count used for the per-serving figures
    pub servings: NonZeroU32,
    /// Per-line outcomes in recipe order
    pub lines: Vec<LineAnalysis>,
    /// Sum over all lines
    pub totals: Contribution,
    /// Totals divided by servings
    pub per_serving: Contribution,
    /// Catalog changes the pass would make
    pub catalog_updates: Vec<CatalogUpdate>,
}

impl RecipeAnalysis {
    /// Whether every line's cost is fully known.
    #[must_use]
    pub fn cost_complete(&self) -> bool {
        self.lines.iter().all(LineAnalysis::cost_complete)
    }

    /// Whether every line's nutrients are fully known.
    #[must_use]
    pub fn nutrition_complete(&self) -> bool {
        self.lines.iter().all(LineAnalysis::nutrition_complete)
    }

    /// All warnings paired with the ingredient they concern, in line order.
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &Warning)> {
        self.lines.iter().flat_map(|line| {
            line.warnings
                .iter()
                .map(move |w| (line.line.ingredient_name.as_str(), w))
        })
    }

    /// Names of ingredients that were not in the catalog.
    #[must_use]
    pub fn absent_ingredients(&self) -> Vec<&str> {
        self.catalog_updates
            .iter()
            .filter_map(|update| match update {
                CatalogUpdate::Placeholder(record) => Some(record.name.as_str()),
                CatalogUpdate::FillNutrients { .. } => None,
            })
            .collect()
    }
}

/// Runs one pass of `recipe` against `catalog`.
///
/// # Errors
/// Returns [`Error::InvalidRecipe`] or [`Error::InvalidAmount`] when the recipe is
/// structurally invalid. No other condition fails the pass.
#[instrument(skip(recipe, catalog, policy), fields(recipe = %recipe.name))]
pub async fn analyze_recipe(
    recipe: &RecipeRecord,
    catalog: &Catalog,
    policy: ReconciliationPolicy<'_>,
) -> Result<RecipeAnalysis> {
    recipe.validate()?;
    let servings = NonZeroU32::new(recipe.servings).ok_or_else(|| {
        Error::invalid_recipe(format!("'{}' must have at least one serving", recipe.name))
    })?;

    let mut pass = ReconciliationPass::new(policy);
    let mut lines = Vec::with_capacity(recipe.items.len());
    for item in &recipe.items {
        let reconciled = pass.reconcile_line(catalog, item).await;
        lines.push(LineAnalysis {
            line: item.clone(),
            states: reconciled.states,
            grams: reconciled.normalized.grams,
            contribution: reconciled.normalized.contribution,
            warnings: reconciled.normalized.warnings,
        });
    }

    let totals = aggregation::aggregate(lines.iter().map(|line| &line.contribution));
    let per_serving = aggregation::per_serving(&totals, servings);
    let catalog_updates = pass.finish();

    let analysis = RecipeAnalysis {
        recipe_name: recipe.name.clone(),
        servings,
        lines,
        totals,
        per_serving,
        catalog_updates,
    };
    if !analysis.cost_complete() || !analysis.nutrition_complete() {
        warn!(
            "Analysis of '{}' is incomplete ({} warnings)",
            recipe.name,
            analysis.warnings().count()
        );
    }
    Ok(analysis)
}

/// Loads `recipe_name` and the catalog from `store`, runs a pass, and applies the
/// resulting catalog updates when `persist_updates` is set.
///
/// # Errors
/// Returns [`Error::RecipeNotFound`] for an unknown recipe, a storage error from the
/// store, or a validation error from [`analyze_recipe`].
#[instrument(skip(store, policy))]
pub async fn analyze_stored_recipe(
    store: &dyn Persistence,
    recipe_name: &str,
    policy: ReconciliationPolicy<'_>,
    persist_updates: bool,
) -> Result<RecipeAnalysis> {
    let recipe = store
        .find_recipe(recipe_name)
        .await?
        .ok_or_else(|| Error::RecipeNotFound {
            name: recipe_name.to_string(),
        })?;
    let catalog = store.load_catalog().await?;

    let analysis = analyze_recipe(&recipe, &catalog, policy).await?;

    if persist_updates && !analysis.catalog_updates.is_empty() {
        let applied = store.apply_catalog_updates(&analysis.catalog_updates).await?;
        info!(
            "Applied {} of {} catalog updates from '{}'",
            applied,
            analysis.catalog_updates.len(),
            recipe_name
        );
    }
    Ok(analysis)
}
