//! Unified error type for the analyzer.
//!
//! These are the conditions that stop an operation. Recoverable problems found while
//! analyzing a recipe (missing prices, unit mismatches, failed lookups) are reported as
//! [`crate::core::normalizer::Warning`] values attached to the result instead.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by store, configuration, and validation operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration, or an invalid record field
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Error reported by the SQL backend
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// File system error (JSON backend, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing report text failed
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// A numeric field is negative, zero where it must be positive, or not finite
    #[error("Invalid {field}: {amount}")]
    InvalidAmount {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        amount: f64,
    },

    /// Structural recipe problem (no lines, zero servings, empty names)
    #[error("Invalid recipe: {message}")]
    InvalidRecipe {
        /// Human-readable description of the problem
        message: String,
    },

    /// Unit text that does not map to any known unit
    #[error("Unrecognized unit: '{unit}'")]
    UnrecognizedUnit {
        /// The unit text as given
        unit: String,
    },

    /// Ingredient referenced by name is not in the catalog
    #[error("Unknown ingredient: {name}")]
    UnknownIngredient {
        /// Ingredient name as referenced
        name: String,
    },

    /// Recipe referenced by name is not in the store
    #[error("Recipe not found: {name}")]
    RecipeNotFound {
        /// Recipe name as referenced
        name: String,
    },

    /// Optimistic update rejected because the stored record changed
    #[error("Ingredient '{name}' was modified after {expected}")]
    StaleRecord {
        /// Ingredient name
        name: String,
        /// The `last_updated` value the caller based its edit on
        expected: DateTime<Utc>,
    },

    /// Failure talking to a remote collaborator
    #[error("{service} request failed: {message}")]
    ExternalService {
        /// Name of the remote service
        service: &'static str,
        /// Failure detail
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::InvalidRecipe`].
    pub fn invalid_recipe(message: impl Into<String>) -> Self {
        Self::InvalidRecipe {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::ExternalService`].
    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
