//! Aggregation engine: folds per-line contributions into recipe totals and per-serving values.
//!
//! Sums are compensated (Neumaier) so that reordering recipe lines changes the result by
//! no more than [`RELATIVE_EPSILON`].

use crate::models::Nutrients;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Relative tolerance within which aggregation results are order-independent.
pub const RELATIVE_EPSILON: f64 = 1e-9;

/// Cost and macro-nutrient amounts for a line, a recipe, or a serving.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Contribution {
    /// Cost in the system currency
    pub cost: f64,
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Fat in grams
    pub fat: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
}

impl Contribution {
    /// Nutrient part of the contribution.
    #[must_use]
    pub const fn nutrients(&self) -> Nutrients {
        Nutrients::new(self.calories, self.protein, self.fat, self.carbs)
    }

    /// Replaces the nutrient part, keeping the cost.
    pub const fn set_nutrients(&mut self, nutrients: Nutrients) {
        self.calories = nutrients.calories;
        self.protein = nutrients.protein;
        self.fat = nutrients.fat;
        self.carbs = nutrients.carbs;
    }

    /// Divides every component by `divisor`.
    #[must_use]
    pub fn divided_by(&self, divisor: f64) -> Self {
        Self {
            cost: self.cost / divisor,
            calories: self.calories / divisor,
            protein: self.protein / divisor,
            fat: self.fat / divisor,
            carbs: self.carbs / divisor,
        }
    }

    /// Component-wise comparison within [`RELATIVE_EPSILON`].
    #[must_use]
    pub fn approx_eq(&self, other: &Self) -> bool {
        approx_eq(self.cost, other.cost)
            && approx_eq(self.calories, other.calories)
            && approx_eq(self.protein, other.protein)
            && approx_eq(self.fat, other.fat)
            && approx_eq(self.carbs, other.carbs)
    }
}

/// Whether `a` and `b` agree within [`RELATIVE_EPSILON`] of the larger magnitude.
/// Values at or below 1.0 in magnitude are compared absolutely.
#[must_use]
pub fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= RELATIVE_EPSILON * scale
}

/// Running Neumaier sum.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
    }

    fn value(self) -> f64 {
        self.sum + self.compensation
    }
}

/// Sums contributions component by component.
pub fn aggregate<'a, I>(contributions: I) -> Contribution
where
    I: IntoIterator<Item = &'a Contribution>,
{
    let mut cost = CompensatedSum::default();
    let mut calories = CompensatedSum::default();
    let mut protein = CompensatedSum::default();
    let mut fat = CompensatedSum::default();
    let mut carbs = CompensatedSum::default();

    for contribution in contributions {
        cost.add(contribution.cost);
        calories.add(contribution.calories);
        protein.add(contribution.protein);
        fat.add(contribution.fat);
        carbs.add(contribution.carbs);
    }

    Contribution {
        cost: cost.value(),
        calories: calories.value(),
        protein: protein.value(),
        fat: fat.value(),
        carbs: carbs.value(),
    }
}

/// Divides recipe totals by the serving count.
#[must_use]
pub fn per_serving(totals: &Contribution, servings: NonZeroU32) -> Contribution {
    totals.divided_by(f64::from(servings.get()))
}
