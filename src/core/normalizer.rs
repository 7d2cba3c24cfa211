//! Unit normalizer: turns one recipe line plus its catalog record into cost and nutrients.
//!
//! The normalizer never fails on bad catalog data. Missing prices, missing gram
//! equivalents, zero package weights, and unit mismatches all produce a number together
//! with a [`Warning`] saying which part of it is incomplete or assumed. The only errors are
//! an unparseable unit and an ingredient that is not in the catalog ([`find_record`]); both
//! are handled by the reconciliation policy.

use crate::core::aggregation::Contribution;
use crate::core::units::{self, Unit, UnitKind};
use crate::errors::{Error, Result};
use crate::models::{Catalog, IngredientRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How count units (pieces, slices) scale when the catalog has no gram equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountUnitPolicy {
    /// A gram equivalent is required; without one the line contributes nothing and is
    /// flagged incomplete.
    #[default]
    RequireGramEquivalent,
    /// Without a gram equivalent, cost is `count * price / package_weight` and each
    /// nutrient is `density * count`.
    ScaleByCount,
}

/// Why part of a line's contribution is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gap {
    /// Catalog record has no price
    MissingPrice,
    /// Catalog record has no nutrient densities
    MissingNutrients,
    /// Record unit is not gram-based and no weight per unit is known
    MissingGramEquivalent,
    /// Package size works out to zero grams
    ZeroPackageWeight,
    /// Ingredient was not in the catalog; a placeholder stands in
    NotInCatalog,
    /// Recipe line unit could not be parsed
    UnrecognizedUnit,
    /// Nutrition lookup found nothing
    LookupNotFound,
    /// Nutrition lookup failed or timed out
    LookupUnavailable,
    /// No nutrition lookup is configured
    NoLookup,
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingPrice => "no price in catalog",
            Self::MissingNutrients => "no nutrient data in catalog",
            Self::MissingGramEquivalent => "no gram equivalent for the catalog unit",
            Self::ZeroPackageWeight => "package weight is zero",
            Self::NotInCatalog => "ingredient not in catalog",
            Self::UnrecognizedUnit => "unit not recognized",
            Self::LookupNotFound => "nutrition lookup found no match",
            Self::LookupUnavailable => "nutrition lookup unavailable",
            Self::NoLookup => "no nutrition lookup configured",
        };
        f.write_str(text)
    }
}

/// Recoverable annotation attached to an analyzed line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    /// Line unit text did not parse; the line contributes nothing
    #[error("unrecognized unit '{unit}'")]
    UnrecognizedUnit {
        /// The unit text as written in the recipe
        unit: String,
    },
    /// Cost of the line is zero or partial
    #[error("cost incomplete: {reason}")]
    IncompleteCostData {
        /// What is missing
        reason: Gap,
    },
    /// Nutrients of the line are zero or partial
    #[error("nutrition incomplete: {reason}")]
    IncompleteNutritionData {
        /// What is missing
        reason: Gap,
    },
    /// Units differ and no conversion exists; the quantity was used as-is
    #[error("recipe unit {recipe_unit} has no conversion to catalog unit {catalog_unit}; quantity taken as {catalog_unit}")]
    UnitMismatch {
        /// Unit of the recipe line
        recipe_unit: Unit,
        /// Unit of the catalog record
        catalog_unit: Unit,
    },
    /// Remote nutrition lookup failed or timed out
    #[error("external lookup unavailable: {message}")]
    ExternalLookupUnavailable {
        /// Failure detail
        message: String,
    },
}

impl Warning {
    /// Whether this warning means the line's cost is not fully known.
    #[must_use]
    pub const fn affects_cost(&self) -> bool {
        matches!(
            self,
            Self::IncompleteCostData { .. } | Self::UnrecognizedUnit { .. } | Self::UnitMismatch { .. }
        )
    }

    /// Whether this warning means the line's nutrients are not fully known.
    #[must_use]
    pub const fn affects_nutrition(&self) -> bool {
        matches!(
            self,
            Self::IncompleteNutritionData { .. }
                | Self::UnrecognizedUnit { .. }
                | Self::UnitMismatch { .. }
                | Self::ExternalLookupUnavailable { .. }
        )
    }
}

/// Result of normalizing one recipe line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedLine {
    /// Cost and nutrient contribution of the line
    pub contribution: Contribution,
    /// Gram equivalent of the line, when one could be established
    pub grams: Option<f64>,
    /// Incomplete or assumed inputs
    pub warnings: Vec<Warning>,
}

impl NormalizedLine {
    /// Whether the recipe unit had to be taken as the catalog unit without conversion.
    #[must_use]
    pub fn has_unit_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, Warning::UnitMismatch { .. }))
    }
}

/// Share of `price` that `amount` out of a `package_amount` package costs.
///
/// `None` when the package is empty or not finite. With gram records this is exactly
/// `quantity * price / package_weight`.
fn package_share(amount: f64, price: f64, package_amount: f64) -> Option<f64> {
    (package_amount > 0.0 && package_amount.is_finite()).then(|| amount * price / package_amount)
}

/// Expresses a line quantity in the record's unit.
///
/// Uses the deterministic conversion table first, then the record's gram equivalent for
/// mass lines. Returns `None` when neither applies.
fn to_catalog_quantity(record: &IngredientRecord, quantity: f64, line_unit: Unit) -> Option<f64> {
    if let Some(converted) = units::convert(quantity, line_unit, record.unit) {
        return Some(converted);
    }
    if line_unit.kind() == UnitKind::Mass {
        let line_grams = quantity * line_unit.base_factor()?;
        let grams_per_unit = record.grams_per_unit()?;
        return Some(line_grams / grams_per_unit);
    }
    None
}

/// Normalizes `quantity` of `unit` (as written in a recipe) against `record`.
///
/// # Errors
/// Returns [`Error::UnrecognizedUnit`] when `unit` does not parse.
pub fn normalize(
    record: &IngredientRecord,
    quantity: f64,
    unit: &str,
    policy: CountUnitPolicy,
) -> Result<NormalizedLine> {
    let line_unit: Unit = unit.parse()?;
    let mut warnings = Vec::new();

    let catalog_quantity = to_catalog_quantity(record, quantity, line_unit).unwrap_or_else(|| {
        warnings.push(Warning::UnitMismatch {
            recipe_unit: line_unit,
            catalog_unit: record.unit,
        });
        quantity
    });

    let mut contribution = Contribution::default();
    let grams = match record.grams_per_unit() {
        Some(grams_per_unit) => {
            let grams = catalog_quantity * grams_per_unit;
            let package_grams = record.package_weight * grams_per_unit;
            match record.price.map(|price| package_share(grams, price, package_grams)) {
                None => warnings.push(Warning::IncompleteCostData {
                    reason: Gap::MissingPrice,
                }),
                Some(None) => warnings.push(Warning::IncompleteCostData {
                    reason: Gap::ZeroPackageWeight,
                }),
                Some(Some(cost)) => contribution.cost = cost,
            }
            match record.nutrients_per_100g {
                Some(density) => contribution.set_nutrients(density.scaled(grams / 100.0)),
                None => warnings.push(Warning::IncompleteNutritionData {
                    reason: Gap::MissingNutrients,
                }),
            }
            Some(grams)
        }
        None if record.unit.is_count() && policy == CountUnitPolicy::ScaleByCount => {
            let share = record
                .price
                .map(|price| package_share(catalog_quantity, price, record.package_weight));
            match share {
                None => warnings.push(Warning::IncompleteCostData {
                    reason: Gap::MissingPrice,
                }),
                Some(None) => warnings.push(Warning::IncompleteCostData {
                    reason: Gap::ZeroPackageWeight,
                }),
                Some(Some(cost)) => contribution.cost = cost,
            }
            match record.nutrients_per_100g {
                Some(density) => contribution.set_nutrients(density.scaled(catalog_quantity)),
                None => warnings.push(Warning::IncompleteNutritionData {
                    reason: Gap::MissingNutrients,
                }),
            }
            None
        }
        None => {
            warnings.push(Warning::IncompleteCostData {
                reason: if record.price.is_none() {
                    Gap::MissingPrice
                } else {
                    Gap::MissingGramEquivalent
                },
            });
            warnings.push(Warning::IncompleteNutritionData {
                reason: if record.nutrients_per_100g.is_none() {
                    Gap::MissingNutrients
                } else {
                    Gap::MissingGramEquivalent
                },
            });
            None
        }
    };

    Ok(NormalizedLine {
        contribution,
        grams,
        warnings,
    })
}

/// Resolves the ingredient a recipe line refers to.
///
/// # Errors
/// Returns [`Error::UnknownIngredient`] when the catalog has no record under `name`.
pub fn find_record<'c>(catalog: &'c Catalog, name: &str) -> Result<&'c IngredientRecord> {
    catalog.get(name).ok_or_else(|| Error::UnknownIngredient {
        name: name.to_string(),
    })
}
