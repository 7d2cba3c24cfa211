//! Spoonacular recipe search client.
//!
//! Uses `/recipes/complexSearch` with `addRecipeInformation=true` (plus `fillIngredients`
//! unless disabled) and keeps the first result. Ingredient lines come from the metric
//! measures of `extendedIngredients`.

use super::RecipeImport;
use crate::errors::{Error, Result};
use crate::models::{RecipeLine, RecipeRecord};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

const SERVICE: &str = "Spoonacular API";

/// Spoonacular API client configuration
#[derive(Debug, Clone)]
pub struct SpoonacularConfig {
    /// API key sent as `apiKey`
    pub api_key: String,
    /// Base URL (default: <https://api.spoonacular.com>)
    pub base_url: String,
    /// Also request `fillIngredients`, which adds ingredient detail to each result
    pub fill_ingredients: bool,
}

impl Default for SpoonacularConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.spoonacular.com".to_string(),
            fill_ingredients: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    title: String,
    #[serde(default)]
    servings: Option<u32>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    extended_ingredients: Vec<ExtendedIngredient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtendedIngredient {
    #[serde(default)]
    name: String,
    #[serde(default)]
    name_clean: Option<String>,
    measures: Measures,
}

#[derive(Debug, Deserialize)]
struct Measures {
    metric: Measure,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Measure {
    amount: f64,
    #[serde(default)]
    unit_short: String,
}

/// Capitalizes the first letter of every word and lowercases the rest.
fn title_case(name: &str) -> String {
    let mut previous_is_letter = false;
    name.chars()
        .flat_map(|c| {
            let mapped: Vec<char> = if previous_is_letter {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            previous_is_letter = c.is_alphabetic();
            mapped
        })
        .collect()
}

impl SearchResult {
    fn into_recipe(self) -> RecipeRecord {
        let mut items: Vec<RecipeLine> = Vec::new();
        for ingredient in self.extended_ingredients {
            let raw_name = ingredient
                .name_clean
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(ingredient.name);
            let name = title_case(raw_name.trim());
            let metric = ingredient.measures.metric;
            if name.is_empty() || !metric.amount.is_finite() || metric.amount < 0.0 {
                warn!("Skipping unusable ingredient '{}' in '{}'", name, self.title);
                continue;
            }
            let unit = if metric.unit_short.trim().is_empty() {
                "g".to_string()
            } else {
                metric.unit_short
            };

            // A repeated name replaces the earlier line in place
            if let Some(existing) = items.iter_mut().find(|l| l.ingredient_name == name) {
                existing.quantity = metric.amount;
                existing.unit = unit;
            } else {
                items.push(RecipeLine::new(name, metric.amount, unit));
            }
        }

        RecipeRecord {
            name: self.title.trim().to_string(),
            servings: self.servings.filter(|s| *s > 0).unwrap_or(1),
            items,
            instructions: self.instructions.filter(|i| !i.trim().is_empty()),
        }
    }
}

/// Spoonacular API client
pub struct SpoonacularClient {
    config: SpoonacularConfig,
    http_client: reqwest::Client,
}

impl SpoonacularClient {
    /// Create a new Spoonacular API client
    #[must_use]
    pub fn new(config: SpoonacularConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let url = format!("{}/recipes/complexSearch", self.config.base_url);
        let mut params = vec![
            ("apiKey", self.config.api_key.as_str()),
            ("query", query),
            ("addRecipeInformation", "true"),
            ("number", "1"),
        ];
        if self.config.fill_ingredients {
            params.push(("fillIngredients", "true"));
        }

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::external(
                SERVICE,
                format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("JSON parse error: {e}")))
    }
}

/// Parses a `complexSearch` body into the first recipe it contains.
///
/// # Errors
/// Returns [`Error::Serialization`] if the body does not have the expected shape.
pub fn recipe_from_search(body: &str) -> Result<Option<RecipeRecord>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .next()
        .map(SearchResult::into_recipe))
}

#[async_trait]
impl RecipeImport for SpoonacularClient {
    #[instrument(skip(self))]
    async fn import_recipe(&self, query: &str) -> Result<Option<RecipeRecord>> {
        let response = self.search(query.trim()).await?;
        let Some(result) = response.results.into_iter().next() else {
            debug!("No Spoonacular results for '{}'", query);
            return Ok(None);
        };
        Ok(Some(result.into_recipe()))
    }
}
