//! Command-line layer - argument parsing and command dispatch.
//!
//! The commands are thin: they parse input, call into [`crate::core`] and the store, and
//! render the result with [`crate::core::report`]. Each returns the text to print on
//! stdout; logging goes to stderr.

/// Command implementations (ingredient, recipe, analyze)
pub mod commands;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::store::Persistence;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::{AnalyzeArgs, IngredientCommand, RecipeCommand};

/// Recipe cost and nutrition analyzer.
#[derive(Parser, Debug)]
#[command(name = "meal-cost", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config.toml (defaults to ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the ingredient catalog
    Ingredient {
        /// Ingredient action
        #[command(subcommand)]
        action: IngredientCommand,
    },
    /// Manage stored recipes
    Recipe {
        /// Recipe action
        #[command(subcommand)]
        action: RecipeCommand,
    },
    /// Compute cost and nutrition totals for a stored recipe
    Analyze(AnalyzeArgs),
}

/// Shared state available to all commands.
pub struct CliContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// Selected persistence backend
    pub store: Box<dyn Persistence>,
}

impl CliContext {
    /// Creates a new context from its parts.
    #[must_use]
    pub fn new(config: AppConfig, store: Box<dyn Persistence>) -> Self {
        Self { config, store }
    }
}

/// Runs `command` and returns the text to print.
///
/// # Errors
/// Returns an error if the command's input is invalid or a store operation fails.
pub async fn run(ctx: &CliContext, command: Command) -> Result<String> {
    match command {
        Command::Ingredient { action } => commands::ingredient::run(ctx, action).await,
        Command::Recipe { action } => commands::recipe::run(ctx, action).await,
        Command::Analyze(args) => commands::analyze::run(ctx, &args).await,
    }
}
