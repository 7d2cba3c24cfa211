//! Application settings loaded from config.toml and the environment.
//!
//! Every field has a default, so a missing config file is not an error. Secrets (API keys)
//! and the database URL can come from the environment (or `.env` through `dotenvy`), which
//! takes precedence over the file.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::config::seed::IngredientSeed;
use crate::core::normalizer::CountUnitPolicy;
use crate::errors::{Error, Result};
use crate::external::StaticNutritionLookup;
use crate::models::Nutrients;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Path read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `SQLite` through `SeaORM`
    #[default]
    Sqlite,
    /// Two JSON files in a directory
    Json,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,
    /// `SeaORM` connection string for the `sqlite` backend
    pub database_url: String,
    /// Directory holding `ingredients.json` and `recipes.json` for the `json` backend
    pub json_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            json_dir: PathBuf::from("data"),
        }
    }
}

/// `[analysis]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How count units scale without a gram equivalent
    pub count_unit_policy: CountUnitPolicy,
    /// Seconds to wait for one nutrition lookup
    pub lookup_timeout_secs: u64,
    /// Seconds to wait for one recipe import
    pub import_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            count_unit_policy: CountUnitPolicy::default(),
            lookup_timeout_secs: 5,
            import_timeout_secs: 10,
        }
    }
}

impl AnalysisConfig {
    /// Lookup bound as a [`Duration`].
    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Import bound as a [`Duration`].
    #[must_use]
    pub const fn import_timeout(&self) -> Duration {
        Duration::from_secs(self.import_timeout_secs)
    }
}

/// `[usda]` and `[spoonacular]` sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Override of the service base URL
    pub base_url: Option<String>,
    /// API key; usually supplied through the environment instead
    pub api_key: Option<String>,
}

/// One `[[nutrition]]` entry: fixed densities for an ingredient name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NutritionOverride {
    /// Ingredient name, matched case-insensitively
    pub name: String,
    /// kcal per 100 g
    pub calories: f64,
    /// Protein grams per 100 g
    pub protein: f64,
    /// Fat grams per 100 g
    pub fat: f64,
    /// Carbohydrate grams per 100 g
    pub carbs: f64,
}

/// Configuration structure representing the entire config.toml file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Currency symbol printed before costs
    pub currency: String,
    /// Persistence settings
    pub storage: StorageConfig,
    /// Analysis settings
    pub analysis: AnalysisConfig,
    /// USDA `FoodData` Central client settings
    pub usda: ServiceConfig,
    /// Spoonacular client settings
    pub spoonacular: ServiceConfig,
    /// Catalog records inserted when absent
    pub ingredients: Vec<IngredientSeed>,
    /// Fixed nutrition data consulted before the USDA client
    pub nutrition: Vec<NutritionOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            currency: "$".to_string(),
            storage: StorageConfig::default(),
            analysis: AnalysisConfig::default(),
            usda: ServiceConfig::default(),
            spoonacular: ServiceConfig::default(),
            ingredients: Vec::new(),
            nutrition: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parses a config file's contents.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the TOML is malformed or a value is out of range.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides through `var`, which maps a variable name to its value.
    ///
    /// Reads `DATABASE_URL`, `USDA_API_KEY` and `SPOONACULAR_API_KEY`.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            debug!("Using DATABASE_URL from the environment");
            self.storage.database_url = url;
        }
        if let Some(key) = var("USDA_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.usda.api_key = Some(key);
        }
        if let Some(key) = var("SPOONACULAR_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.spoonacular.api_key = Some(key);
        }
    }

    /// Builds the static lookup table from the `[[nutrition]]` entries.
    #[must_use]
    pub fn nutrition_overrides(&self) -> StaticNutritionLookup {
        let mut lookup = StaticNutritionLookup::new();
        for entry in &self.nutrition {
            lookup.insert(
                &entry.name,
                Nutrients::new(entry.calories, entry.protein, entry.fat, entry.carbs),
            );
        }
        lookup
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.lookup_timeout_secs == 0 {
            return Err(Error::config("analysis.lookup_timeout_secs must be at least 1"));
        }
        if self.analysis.import_timeout_secs == 0 {
            return Err(Error::config("analysis.import_timeout_secs must be at least 1"));
        }
        for entry in &self.nutrition {
            let values = [entry.calories, entry.protein, entry.fat, entry.carbs];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(Error::config(format!(
                    "nutrition entry '{}' has a negative or non-finite value",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file.
///
/// A missing file yields the defaults.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    AppConfig::from_toml_str(&contents)
}

/// Loads the file at `path` (or [`DEFAULT_CONFIG_PATH`]) and applies the environment.
///
/// # Errors
/// Returns an error if the config file cannot be read or parsed.
pub fn load_app_configuration(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let mut config = load_config(path)?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::units::Unit;
    use crate::external::NutritionLookup;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.currency, "$");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.analysis.lookup_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.analysis.count_unit_policy,
            CountUnitPolicy::RequireGramEquivalent
        );
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            currency = "€"

            [storage]
            backend = "json"
            json_dir = "/tmp/meals"

            [analysis]
            count_unit_policy = "scale_by_count"
            lookup_timeout_secs = 2

            [usda]
            base_url = "http://localhost:9000"

            [[ingredients]]
            name = "Egg"
            price = 3.0
            package_weight = 12.0
            unit = "pcs"
            weight_per_unit = 60.0
            calories = 155.0
            protein = 13.0
            fat = 11.0
            carbs = 1.1

            [[ingredients]]
            name = "Flour"
            price = 4.5
            package_weight = 2500.0

            [[nutrition]]
            name = "Rolled Oats"
            calories = 379.0
            protein = 13.2
            fat = 6.5
            carbs = 67.7
        "#;

        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.currency, "€");
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.storage.json_dir, PathBuf::from("/tmp/meals"));
        assert_eq!(config.analysis.count_unit_policy, CountUnitPolicy::ScaleByCount);
        assert_eq!(config.analysis.lookup_timeout_secs, 2);
        assert_eq!(config.analysis.import_timeout_secs, 10);
        assert_eq!(config.usda.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.ingredients.len(), 2);

        let egg = config.ingredients[0].to_record().unwrap();
        assert_eq!(egg.unit, Unit::Piece);
        assert_eq!(egg.grams_per_unit(), Some(60.0));
        let flour = config.ingredients[1].to_record().unwrap();
        assert_eq!(flour.unit, Unit::Gram);
        assert!(flour.nutrients_per_100g.is_none());

        assert_eq!(config.nutrition_overrides().len(), 1);
    }

    #[tokio::test]
    async fn test_nutrition_overrides_lookup() {
        let config = AppConfig::from_toml_str(
            r#"
            [[nutrition]]
            name = "Rolled Oats"
            calories = 379.0
            protein = 13.2
            fat = 6.5
            carbs = 67.7
            "#,
        )
        .unwrap();
        let lookup = config.nutrition_overrides();
        let found = lookup.lookup("rolled oats").await.unwrap().unwrap();
        assert_eq!(found.calories, 379.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = AppConfig::from_toml_str("[analysis]\nlookup_timeout_secs = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = AppConfig::from_toml_str("[storage]\nbackend = \"postgres\"\n");
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = AppConfig::from_toml_str(
            "[[nutrition]]\nname = \"x\"\ncalories = -1.0\nprotein = 0.0\nfat = 0.0\ncarbs = 0.0\n",
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("USDA_API_KEY", "usda-key"),
            ("SPOONACULAR_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| env.get(name).map(ToString::to_string));

        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.usda.api_key.as_deref(), Some("usda-key"));
        assert_eq!(config.spoonacular.api_key, None);
    }

    #[test]
    fn test_example_config_parses() {
        let config =
            AppConfig::from_toml_str(include_str!("../../config.example.toml")).unwrap();
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.ingredients.len(), 2);
        assert!(config.ingredients.iter().all(|seed| seed.to_record().is_ok()));
        assert_eq!(config.nutrition_overrides().len(), 1);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "currency = \"£\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.currency, "£");
    }
}
