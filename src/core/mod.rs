//! Core business logic, independent of the command line and of the storage backend
//! (apart from the SeaORM functions in [`ingredient`] and [`recipe`]).

/// Totals, per-serving values and compensated summation
pub mod aggregation;
/// The analysis pass over one recipe
pub mod analysis;
/// Catalog operations against the database
pub mod ingredient;
/// Recipe operations against the database
pub mod recipe;
/// Per-reference classification, lookups and catalog updates
pub mod reconciliation;
/// Plain-text rendering of analyses and records
pub mod report;
/// Per-line cost and nutrient normalization
pub mod normalizer;
/// Measurement units and the conversion table
pub mod units;
