//! `analyze` command - runs one reconciliation pass over a stored recipe and prints the
//! report.

use crate::{
    cli::CliContext,
    config::AppConfig,
    core::{
        analysis,
        reconciliation::{CatalogUpdate, ReconciliationPolicy},
        report,
    },
    errors::Result,
    external::{ChainedNutritionLookup, NutritionLookup, UsdaClient, UsdaConfig},
};
use clap::Args;
use std::fmt::Write as _;
use tracing::debug;

/// Arguments of `analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Recipe name
    pub recipe: String,
    /// Print the per-line table
    #[arg(long)]
    pub breakdown: bool,
    /// Do not look up missing nutrients
    #[arg(long)]
    pub no_lookup: bool,
    /// Do not write placeholders or looked-up nutrients back to the catalog
    #[arg(long)]
    pub dry_run: bool,
}

/// Builds the lookup chain: `[[nutrition]]` overrides first, then USDA when a key is set.
/// Returns `None` when neither is configured.
#[must_use]
pub fn build_lookup(config: &AppConfig) -> Option<Box<dyn NutritionLookup>> {
    let mut sources: Vec<Box<dyn NutritionLookup>> = Vec::new();

    let overrides = config.nutrition_overrides();
    if !overrides.is_empty() {
        debug!("Using {} nutrition overrides", overrides.len());
        sources.push(Box::new(overrides));
    }
    if let Some(api_key) = &config.usda.api_key {
        let mut usda = UsdaConfig {
            api_key: api_key.clone(),
            ..UsdaConfig::default()
        };
        if let Some(base_url) = &config.usda.base_url {
            usda.base_url.clone_from(base_url);
        }
        sources.push(Box::new(UsdaClient::new(usda)));
    }

    match sources.len() {
        0 => None,
        1 => sources.pop(),
        _ => Some(Box::new(ChainedNutritionLookup::new(sources))),
    }
}

fn describe_updates(updates: &[CatalogUpdate]) -> String {
    updates
        .iter()
        .map(|update| match update {
            CatalogUpdate::Placeholder(record) => format!("placeholder for {}", record.name),
            CatalogUpdate::FillNutrients { name, .. } => format!("nutrients for {name}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Analyzes a stored recipe using `lookup` for missing nutrients.
///
/// # Errors
/// Returns an error if the recipe does not exist, is invalid, or the store fails.
pub async fn analyze_with(
    ctx: &CliContext,
    args: &AnalyzeArgs,
    lookup: Option<&dyn NutritionLookup>,
) -> Result<String> {
    let settings = &ctx.config.analysis;
    let policy = match lookup {
        Some(lookup) if !args.no_lookup => ReconciliationPolicy::with_lookup(
            lookup,
            settings.lookup_timeout(),
            settings.count_unit_policy,
        ),
        _ => ReconciliationPolicy::offline(settings.count_unit_policy),
    };

    let analysis =
        analysis::analyze_stored_recipe(ctx.store.as_ref(), &args.recipe, policy, !args.dry_run)
            .await?;

    let mut out = report::format_recipe_report(&analysis, &ctx.config.currency, args.breakdown)?;
    if !analysis.catalog_updates.is_empty() {
        let verb = if args.dry_run { "Not saved (dry run)" } else { "Catalog updated" };
        writeln!(
            out,
            "{verb}: {}",
            describe_updates(&analysis.catalog_updates)
        )?;
    }
    Ok(out)
}

/// Runs `analyze` with the lookup chain from the configuration.
///
/// # Errors
/// Returns an error if the recipe does not exist, is invalid, or the store fails.
pub async fn run(ctx: &CliContext, args: &AnalyzeArgs) -> Result<String> {
    let lookup = if args.no_lookup {
        None
    } else {
        build_lookup(&ctx.config)
    };
    analyze_with(ctx, args, lookup.as_deref()).await
}
