//! USDA `FoodData` Central client.
//!
//! Searches `/foods/search` for the ingredient name and reads energy, protein, fat and
//! carbohydrate per 100 g from the first food that reports energy. Answers (including
//! "no match") are cached in memory per lower-cased name for the life of the client.
//!
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use super::NutritionLookup;
use crate::errors::{Error, Result};
use crate::models::Nutrients;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

const SERVICE: &str = "USDA API";

/// Energy in kcal
const NUTRIENT_ENERGY: u32 = 1008;
/// Energy, Atwater general factors (kcal)
const NUTRIENT_ENERGY_ATWATER_GENERAL: u32 = 2047;
/// Energy, Atwater specific factors (kcal)
const NUTRIENT_ENERGY_ATWATER_SPECIFIC: u32 = 2048;
const NUTRIENT_PROTEIN: u32 = 1003;
const NUTRIENT_FAT: u32 = 1004;
const NUTRIENT_CARBS: u32 = 1005;

/// USDA API client configuration
#[derive(Debug, Clone)]
pub struct UsdaConfig {
    /// USDA API key (free from <https://fdc.nal.usda.gov/api-key-signup.html>)
    pub api_key: String,
    /// Base URL for USDA API (default: <https://api.nal.usda.gov/fdc/v1>)
    pub base_url: String,
    /// Foods requested per search
    pub page_size: u32,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            page_size: 5,
        }
    }
}

/// USDA API search response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    #[serde(default)]
    description: String,
    #[serde(default)]
    food_nutrients: Vec<SearchNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNutrient {
    nutrient_id: u32,
    value: Option<f64>,
}

impl SearchFood {
    fn amount(&self, nutrient_id: u32) -> Option<f64> {
        self.food_nutrients
            .iter()
            .find(|n| n.nutrient_id == nutrient_id)
            .and_then(|n| n.value)
            .filter(|v| v.is_finite() && *v >= 0.0)
    }

    fn nutrients(&self) -> Option<Nutrients> {
        let calories = self
            .amount(NUTRIENT_ENERGY)
            .or_else(|| self.amount(NUTRIENT_ENERGY_ATWATER_GENERAL))
            .or_else(|| self.amount(NUTRIENT_ENERGY_ATWATER_SPECIFIC))?;
        Some(Nutrients::new(
            calories,
            self.amount(NUTRIENT_PROTEIN).unwrap_or(0.0),
            self.amount(NUTRIENT_FAT).unwrap_or(0.0),
            self.amount(NUTRIENT_CARBS).unwrap_or(0.0),
        ))
    }
}

impl SearchResponse {
    /// Nutrients of the first food that reports energy.
    #[must_use]
    pub fn best_match(&self) -> Option<Nutrients> {
        self.foods.iter().find_map(|food| {
            let nutrients = food.nutrients()?;
            debug!("USDA match: {}", food.description);
            Some(nutrients)
        })
    }
}

/// USDA `FoodData` Central API Client
pub struct UsdaClient {
    config: UsdaConfig,
    http_client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, Option<Nutrients>>>>,
}

impl UsdaClient {
    /// Create a new USDA API client
    #[must_use]
    pub fn new(config: UsdaConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Searches for `query` and returns the raw response.
    ///
    /// # Errors
    /// Returns [`Error::ExternalService`] when the request fails, the service answers
    /// with a non-success status, or the body is not the expected JSON.
    pub async fn search_foods(&self, query: &str) -> Result<SearchResponse> {
        let url = format!("{}/foods/search", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", &self.config.page_size.to_string()),
                ("api_key", &self.config.api_key),
            ])
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

    /// Number of cached answers.
    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl NutritionLookup for UsdaClient {
    #[instrument(skip(self))]
    async fn lookup(&self, ingredient_name: &str) -> Result<Option<Nutrients>> {
        let key = ingredient_name.trim().to_lowercase();
        if key.is_empty() {
            return Ok(None);
        }
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&key) {
                return Ok(*cached);
            }
        }

        let nutrients = self.search_foods(&key).await?.best_match();

        {
            let mut cache = self.cache.write().await;
            cache.insert(key, nutrients);
        }
        Ok(nutrients)
    }
}
