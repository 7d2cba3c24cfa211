/// Database connection and table creation
pub mod database;

/// Catalog seeding from config.toml
pub mod seed;

/// Application settings from config.toml and the environment
pub mod settings;

pub use settings::{AppConfig, StorageBackend, load_app_configuration};
