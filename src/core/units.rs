//! Measurement units and the deterministic conversion table.
//!
//! Units fall into three kinds. Mass and volume units convert freely within their kind
//! through a fixed factor to grams or milliliters. Count units (pieces, slices) have no
//! intrinsic size; they only become comparable to other units through an ingredient's
//! gram equivalent.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const GRAMS_PER_KG: f64 = 1000.0;
const GRAMS_PER_OZ: f64 = 28.349_523_125;
const GRAMS_PER_LB: f64 = 453.592_37;

const ML_PER_LITER: f64 = 1000.0;
const ML_PER_TSP: f64 = 5.0;
const ML_PER_TBSP: f64 = 15.0;
const ML_PER_CUP: f64 = 240.0;

/// Broad category of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Weighed quantities, base unit gram
    Mass,
    /// Measured volumes, base unit milliliter
    Volume,
    /// Discrete items
    Count,
}

/// A unit an ingredient or recipe line can be expressed in.
///
/// Serialized as its canonical name. Deserialization accepts every spelling [`FromStr`]
/// does, so hand-edited files may say `"g"` or `"Tbsp"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Unit {
    /// Gram (base mass unit)
    #[default]
    Gram,
    /// Kilogram
    Kilogram,
    /// Avoirdupois ounce
    Ounce,
    /// Avoirdupois pound
    Pound,
    /// Milliliter (base volume unit)
    Milliliter,
    /// Liter
    Liter,
    /// Teaspoon (5 ml)
    Teaspoon,
    /// Tablespoon (15 ml)
    Tablespoon,
    /// Cup (240 ml)
    Cup,
    /// Whole item (egg, banana)
    Piece,
    /// Slice (bread, cheese)
    Slice,
}

impl Unit {
    /// All supported units, in display order.
    pub const ALL: [Self; 11] = [
        Self::Gram,
        Self::Kilogram,
        Self::Ounce,
        Self::Pound,
        Self::Milliliter,
        Self::Liter,
        Self::Teaspoon,
        Self::Tablespoon,
        Self::Cup,
        Self::Piece,
        Self::Slice,
    ];

    /// Kind of this unit.
    #[must_use]
    pub const fn kind(self) -> UnitKind {
        match self {
            Self::Gram | Self::Kilogram | Self::Ounce | Self::Pound => UnitKind::Mass,
            Self::Milliliter | Self::Liter | Self::Teaspoon | Self::Tablespoon | Self::Cup => {
                UnitKind::Volume
            }
            Self::Piece | Self::Slice => UnitKind::Count,
        }
    }

    /// Whether the unit counts discrete items.
    #[must_use]
    pub const fn is_count(self) -> bool {
        matches!(self.kind(), UnitKind::Count)
    }

    /// Size of one unit in the base unit of its kind (grams or milliliters).
    /// Count units have no base size.
    #[must_use]
    pub const fn base_factor(self) -> Option<f64> {
        match self {
            Self::Gram | Self::Milliliter => Some(1.0),
            Self::Kilogram => Some(GRAMS_PER_KG),
            Self::Ounce => Some(GRAMS_PER_OZ),
            Self::Pound => Some(GRAMS_PER_LB),
            Self::Liter => Some(ML_PER_LITER),
            Self::Teaspoon => Some(ML_PER_TSP),
            Self::Tablespoon => Some(ML_PER_TBSP),
            Self::Cup => Some(ML_PER_CUP),
            Self::Piece | Self::Slice => None,
        }
    }

    /// Grams in one unit when that is fixed by the unit itself (mass units only).
    #[must_use]
    pub fn intrinsic_grams(self) -> Option<f64> {
        match self.kind() {
            UnitKind::Mass => self.base_factor(),
            UnitKind::Volume | UnitKind::Count => None,
        }
    }

    /// Canonical name, as stored in the database and config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gram => "gram",
            Self::Kilogram => "kilogram",
            Self::Ounce => "ounce",
            Self::Pound => "pound",
            Self::Milliliter => "milliliter",
            Self::Liter => "liter",
            Self::Teaspoon => "teaspoon",
            Self::Tablespoon => "tablespoon",
            Self::Cup => "cup",
            Self::Piece => "piece",
            Self::Slice => "slice",
        }
    }

    /// Short form for reports.
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ounce => "oz",
            Self::Pound => "lb",
            Self::Milliliter => "ml",
            Self::Liter => "l",
            Self::Teaspoon => "tsp",
            Self::Tablespoon => "tbsp",
            Self::Cup => "cup",
            Self::Piece => "pc",
            Self::Slice => "slice",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().trim_end_matches('.').to_lowercase();
        let unit = match normalized.as_str() {
            "g" | "gr" | "gram" | "grams" | "gramme" | "grammes" => Self::Gram,
            "kg" | "kgs" | "kilogram" | "kilograms" | "kilo" | "kilos" => Self::Kilogram,
            "oz" | "ounce" | "ounces" => Self::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Self::Pound,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Self::Milliliter,
            "l" | "liter" | "liters" | "litre" | "litres" => Self::Liter,
            "tsp" | "tsps" | "teaspoon" | "teaspoons" => Self::Teaspoon,
            "tbsp" | "tbsps" | "tbs" | "tablespoon" | "tablespoons" => Self::Tablespoon,
            "cup" | "cups" => Self::Cup,
            "pc" | "pcs" | "piece" | "pieces" | "unit" | "units" | "whole" => Self::Piece,
            "slice" | "slices" => Self::Slice,
            _ => {
                return Err(Error::UnrecognizedUnit {
                    unit: s.to_string(),
                });
            }
        };
        Ok(unit)
    }
}

impl TryFrom<String> for Unit {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Converts `quantity` between two units of the same mass or volume kind.
///
/// Returns `None` when no deterministic table entry exists: across kinds, or between two
/// different count units.
#[must_use]
pub fn convert(quantity: f64, from: Unit, to: Unit) -> Option<f64> {
    if from == to {
        return Some(quantity);
    }
    if from.kind() != to.kind() {
        return None;
    }
    let from_factor = from.base_factor()?;
    let to_factor = to.base_factor()?;
    Some(quantity * from_factor / to_factor)
}
