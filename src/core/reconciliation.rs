//! Reconciliation policy: decides what to do with each ingredient reference of a pass.
//!
//! Every reference is classified once per pass and the result is cached by name, so the
//! nutrition lookup runs at most once per ingredient and an unknown ingredient yields one
//! placeholder however many lines mention it. Nothing here fails: every state maps to a
//! contribution (possibly zero) plus warnings, and the catalog changes the pass would like
//! to make are collected as [`CatalogUpdate`]s for the caller to persist.

use crate::core::normalizer::{self, CountUnitPolicy, Gap, NormalizedLine, Warning};
use crate::core::units::Unit;
use crate::external::{LookupOutcome, NutritionLookup, lookup_with_timeout};
use crate::models::{Catalog, IngredientRecord, Nutrients, RecipeLine};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Default bound on one nutrition lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Classification of one ingredient reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceState {
    /// Present, complete, and in a compatible unit
    Resolved,
    /// Record has no price
    MissingPrice,
    /// Record has no nutrient densities
    MissingNutrients,
    /// Not in the catalog; a placeholder stands in
    Absent,
    /// Line unit could not be converted to (or parsed as) a catalog unit
    UnitMismatch,
}

impl fmt::Display for ReferenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Resolved => "resolved",
            Self::MissingPrice => "missing price",
            Self::MissingNutrients => "missing nutrients",
            Self::Absent => "not in catalog",
            Self::UnitMismatch => "unit mismatch",
        };
        f.write_str(text)
    }
}

/// A catalog change produced by a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogUpdate {
    /// Insert this record if the name is still absent
    Placeholder(IngredientRecord),
    /// Store these nutrients if the record still has none
    FillNutrients {
        /// Ingredient to fill
        name: String,
        /// Fetched densities per 100 g
        nutrients: Nutrients,
    },
}

impl CatalogUpdate {
    /// Name of the ingredient the update targets.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Placeholder(record) => &record.name,
            Self::FillNutrients { name, .. } => name,
        }
    }
}

/// Settings for one pass.
#[derive(Clone, Copy)]
pub struct ReconciliationPolicy<'a> {
    /// Collaborator for missing nutrients; `None` disables lookups
    pub lookup: Option<&'a dyn NutritionLookup>,
    /// Bound on each lookup call
    pub lookup_timeout: Duration,
    /// How count units scale without a gram equivalent
    pub count_policy: CountUnitPolicy,
}

impl<'a> ReconciliationPolicy<'a> {
    /// Policy that never calls out.
    #[must_use]
    pub const fn offline(count_policy: CountUnitPolicy) -> Self {
        Self {
            lookup: None,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            count_policy,
        }
    }

    /// Policy that fills missing nutrients from `lookup`.
    #[must_use]
    pub const fn with_lookup(
        lookup: &'a dyn NutritionLookup,
        lookup_timeout: Duration,
        count_policy: CountUnitPolicy,
    ) -> Self {
        Self {
            lookup: Some(lookup),
            lookup_timeout,
            count_policy,
        }
    }
}

impl Default for ReconciliationPolicy<'_> {
    fn default() -> Self {
        Self::offline(CountUnitPolicy::default())
    }
}

impl fmt::Debug for ReconciliationPolicy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationPolicy")
            .field("lookup", &self.lookup.is_some())
            .field("lookup_timeout", &self.lookup_timeout)
            .field("count_policy", &self.count_policy)
            .finish()
    }
}

/// One line after reconciliation and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledLine {
    /// States of the reference; `[Resolved]` when nothing is wrong
    pub states: Vec<ReferenceState>,
    /// Contribution, gram equivalent and warnings
    pub normalized: NormalizedLine,
}

impl ReconciledLine {
    /// Whether the reference was present, complete and compatible.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.states == [ReferenceState::Resolved]
    }
}

/// Cached outcome of classifying one ingredient name.
#[derive(Debug, Clone)]
struct Resolution {
    record: IngredientRecord,
    states: Vec<ReferenceState>,
    absent: bool,
    nutrition_gap: Option<Gap>,
    lookup_warning: Option<Warning>,
}

/// Per-pass reconciliation state.
pub struct ReconciliationPass<'a> {
    policy: ReconciliationPolicy<'a>,
    resolved: HashMap<String, Resolution>,
    updates: Vec<CatalogUpdate>,
}

impl<'a> ReconciliationPass<'a> {
    /// Starts a pass with an empty cache.
    #[must_use]
    pub fn new(policy: ReconciliationPolicy<'a>) -> Self {
        Self {
            policy,
            resolved: HashMap::new(),
            updates: Vec::new(),
        }
    }

    /// Classifies and normalizes one recipe line against `catalog`.
    pub async fn reconcile_line(&mut self, catalog: &Catalog, line: &RecipeLine) -> ReconciledLine {
        let line_unit = line.unit.parse::<Unit>().ok();
        let resolution = self
            .resolve(catalog, &line.ingredient_name, line_unit)
            .await;
        let mut states = resolution.states.clone();

        let mut normalized = match normalizer::normalize(
            &resolution.record,
            line.quantity,
            &line.unit,
            self.policy.count_policy,
        ) {
            Ok(normalized) => normalized,
            Err(e) => {
                debug!("Line '{}' skipped: {}", line.ingredient_name, e);
                states.push(ReferenceState::UnitMismatch);
                NormalizedLine {
                    warnings: vec![Warning::UnrecognizedUnit {
                        unit: line.unit.clone(),
                    }],
                    ..NormalizedLine::default()
                }
            }
        };

        if normalized.has_unit_mismatch() {
            states.push(ReferenceState::UnitMismatch);
        }

        if resolution.absent {
            for warning in &mut normalized.warnings {
                match warning {
                    Warning::IncompleteCostData { reason }
                    | Warning::IncompleteNutritionData { reason } => *reason = Gap::NotInCatalog,
                    _ => {}
                }
            }
        } else if let Some(gap) = &resolution.nutrition_gap {
            for warning in &mut normalized.warnings {
                if let Warning::IncompleteNutritionData { reason } = warning {
                    if *reason == Gap::MissingNutrients {
                        *reason = gap.clone();
                    }
                }
            }
        }
        if let Some(warning) = resolution.lookup_warning {
            normalized.warnings.push(warning);
        }

        if states.is_empty() {
            states.push(ReferenceState::Resolved);
        }
        ReconciledLine { states, normalized }
    }

    /// Ends the pass, returning the catalog updates in the order they arose.
    #[must_use]
    pub fn finish(self) -> Vec<CatalogUpdate> {
        self.updates
    }

    async fn resolve(&mut self, catalog: &Catalog, name: &str, line_unit: Option<Unit>) -> Resolution {
        if let Some(cached) = self.resolved.get(name) {
            return cached.clone();
        }

        let resolution = match normalizer::find_record(catalog, name) {
            Err(e) => {
                debug!("{}", e);
                let placeholder = IngredientRecord::placeholder(name, line_unit.unwrap_or_default());
                info!(
                    "'{}' is not in the catalog; using a {} placeholder",
                    name, placeholder.unit
                );
                self.updates
                    .push(CatalogUpdate::Placeholder(placeholder.clone()));
                Resolution {
                    record: placeholder,
                    states: vec![
                        ReferenceState::Absent,
                        ReferenceState::MissingPrice,
                        ReferenceState::MissingNutrients,
                    ],
                    absent: true,
                    nutrition_gap: None,
                    lookup_warning: None,
                }
            }
            Ok(record) => {
                let mut record = record.clone();
                let mut states = Vec::new();
                let mut nutrition_gap = None;
                let mut lookup_warning = None;

                if record.price.is_none() {
                    states.push(ReferenceState::MissingPrice);
                }
                if record.nutrients_per_100g.is_none() {
                    states.push(ReferenceState::MissingNutrients);
                    match self.policy.lookup {
                        None => nutrition_gap = Some(Gap::NoLookup),
                        Some(lookup) => {
                            match lookup_with_timeout(lookup, name, self.policy.lookup_timeout).await {
                                LookupOutcome::Found(nutrients) => {
                                    info!("Filled nutrients for '{}' from lookup", name);
                                    record.nutrients_per_100g = Some(nutrients);
                                    self.updates.push(CatalogUpdate::FillNutrients {
                                        name: name.to_string(),
                                        nutrients,
                                    });
                                }
                                LookupOutcome::NotFound => nutrition_gap = Some(Gap::LookupNotFound),
                                LookupOutcome::Unavailable(message) => {
                                    nutrition_gap = Some(Gap::LookupUnavailable);
                                    lookup_warning = Some(Warning::ExternalLookupUnavailable { message });
                                }
                            }
                        }
                    }
                }

                Resolution {
                    record,
                    states,
                    absent: false,
                    nutrition_gap,
                    lookup_warning,
                }
            }
        };

        self.resolved.insert(name.to_string(), resolution.clone());
        resolution
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::aggregation::Contribution;
    use crate::external::StaticNutritionLookup;
    use crate::external::testing::{CountingLookup, FailingLookup, SlowLookup};

    fn catalog() -> Catalog {
        let mut no_price = IngredientRecord::per_gram("Salt", 0.0, 1000.0, Nutrients::default());
        no_price.price = None;
        let mut no_nutrients = IngredientRecord::per_gram("Oats", 3.0, 1000.0, Nutrients::default());
        no_nutrients.nutrients_per_100g = None;
        [
            IngredientRecord::per_gram("Flour", 4.5, 2500.0, Nutrients::new(364.0, 10.0, 1.0, 76.0)),
            no_price,
            no_nutrients,
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_resolved_line() {
        let mut pass = ReconciliationPass::new(ReconciliationPolicy::default());
        let line = pass
            .reconcile_line(&catalog(), &RecipeLine::new("Flour", 100.0, "g"))
            .await;
        assert!(line.is_resolved());
        assert!(line.normalized.warnings.is_empty());
        assert!(pass.finish().is_empty());
    }

    #[tokio::test]
    async fn test_absent_ingredient_creates_one_placeholder() {
        let lookup = CountingLookup::new(Some(Nutrients::new(1.0, 1.0, 1.0, 1.0)));
        let policy = ReconciliationPolicy::with_lookup(&lookup, DEFAULT_LOOKUP_TIMEOUT, CountUnitPolicy::default());
        let mut pass = ReconciliationPass::new(policy);
        let catalog = catalog();

        let first = pass
            .reconcile_line(&catalog, &RecipeLine::new("Saffron", 0.5, "g"))
            .await;
        let second = pass
            .reconcile_line(&catalog, &RecipeLine::new("Saffron", 0.2, "g"))
            .await;

        for line in [&first, &second] {
            assert_eq!(
                line.states,
                vec![
                    ReferenceState::Absent,
                    ReferenceState::MissingPrice,
                    ReferenceState::MissingNutrients
                ]
            );
            assert_eq!(line.normalized.contribution, Contribution::default());
            assert!(line.normalized.warnings.contains(&Warning::IncompleteCostData {
                reason: Gap::NotInCatalog
            }));
        }
        // No lookup for a placeholder in the pass that created it
        assert_eq!(lookup.call_count(), 0);

        let updates = pass.finish();
        assert_eq!(updates.len(), 1);
        match &updates[0] {
            CatalogUpdate::Placeholder(record) => {
                assert_eq!(record.name, "Saffron");
                assert_eq!(record.unit, Unit::Gram);
                assert!(record.price.is_none());
                assert!(record.nutrients_per_100g.is_none());
            }
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_placeholder_copies_line_unit() {
        let mut pass = ReconciliationPass::new(ReconciliationPolicy::default());
        pass.reconcile_line(&Catalog::new(), &RecipeLine::new("Lemon", 2.0, "pieces"))
            .await;
        pass.reconcile_line(&Catalog::new(), &RecipeLine::new("Zest", 1.0, "pinch"))
            .await;
        let updates = pass.finish();
        let units: Vec<Unit> = updates
            .iter()
            .filter_map(|u| match u {
                CatalogUpdate::Placeholder(record) => Some(record.unit),
                CatalogUpdate::FillNutrients { .. } => None,
            })
            .collect();
        assert_eq!(units, vec![Unit::Piece, Unit::Gram]);
    }

    #[tokio::test]
    async fn test_missing_price_keeps_nutrients() {
        let mut pass = ReconciliationPass::new(ReconciliationPolicy::default());
        let line = pass
            .reconcile_line(&catalog(), &RecipeLine::new("Salt", 5.0, "g"))
            .await;
        assert_eq!(line.states, vec![ReferenceState::MissingPrice]);
        assert_eq!(line.normalized.contribution.cost, 0.0);
        assert_eq!(
            line.normalized.warnings,
            vec![Warning::IncompleteCostData {
                reason: Gap::MissingPrice
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_nutrients_filled_by_lookup_once() {
        let lookup = CountingLookup::new(Some(Nutrients::new(379.0, 13.2, 6.5, 67.7)));
        let policy = ReconciliationPolicy::with_lookup(&lookup, DEFAULT_LOOKUP_TIMEOUT, CountUnitPolicy::default());
        let mut pass = ReconciliationPass::new(policy);
        let catalog = catalog();

        let first = pass
            .reconcile_line(&catalog, &RecipeLine::new("Oats", 100.0, "g"))
            .await;
        let second = pass
            .reconcile_line(&catalog, &RecipeLine::new("Oats", 50.0, "g"))
            .await;

        assert_eq!(lookup.call_count(), 1);
        assert_eq!(first.states, vec![ReferenceState::MissingNutrients]);
        assert!(first.normalized.warnings.is_empty());
        assert!((first.normalized.contribution.calories - 379.0).abs() < 1e-9);
        assert!((second.normalized.contribution.calories - 189.5).abs() < 1e-9);

        assert_eq!(
            pass.finish(),
            vec![CatalogUpdate::FillNutrients {
                name: "Oats".to_string(),
                nutrients: Nutrients::new(379.0, 13.2, 6.5, 67.7),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_nutrients_without_lookup() {
        let mut pass = ReconciliationPass::new(ReconciliationPolicy::default());
        let line = pass
            .reconcile_line(&catalog(), &RecipeLine::new("Oats", 100.0, "g"))
            .await;
        assert_eq!(line.normalized.contribution.calories, 0.0);
        assert!((line.normalized.contribution.cost - 0.3).abs() < 1e-9);
        assert_eq!(
            line.normalized.warnings,
            vec![Warning::IncompleteNutritionData {
                reason: Gap::NoLookup
            }]
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let lookup = StaticNutritionLookup::new();
        let policy = ReconciliationPolicy::with_lookup(&lookup, DEFAULT_LOOKUP_TIMEOUT, CountUnitPolicy::default());
        let mut pass = ReconciliationPass::new(policy);
        let line = pass
            .reconcile_line(&catalog(), &RecipeLine::new("Oats", 100.0, "g"))
            .await;
        assert_eq!(
            line.normalized.warnings,
            vec![Warning::IncompleteNutritionData {
                reason: Gap::LookupNotFound
            }]
        );
        assert!(pass.finish().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_and_timeout_are_flagged() {
        let slow = SlowLookup(Duration::from_secs(5));
        for lookup in [&FailingLookup as &dyn NutritionLookup, &slow] {
            let policy = ReconciliationPolicy::with_lookup(lookup, Duration::from_millis(20), CountUnitPolicy::default());
            let mut pass = ReconciliationPass::new(policy);
            let line = pass
                .reconcile_line(&catalog(), &RecipeLine::new("Oats", 100.0, "g"))
                .await;
            assert_eq!(line.normalized.contribution.calories, 0.0);
            assert!(line.normalized.warnings.contains(&Warning::IncompleteNutritionData {
                reason: Gap::LookupUnavailable
            }));
            assert!(line
                .normalized
                .warnings
                .iter()
                .any(|w| matches!(w, Warning::ExternalLookupUnavailable { .. })));
            assert!(pass.finish().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unit_mismatch_state() {
        let mut pass = ReconciliationPass::new(ReconciliationPolicy::default());
        let line = pass
            .reconcile_line(&catalog(), &RecipeLine::new("Flour", 1.0, "cup"))
            .await;
        assert_eq!(line.states, vec![ReferenceState::UnitMismatch]);
        assert!(line.normalized.has_unit_mismatch());
    }

    #[tokio::test]
    async fn test_unrecognized_unit_contributes_nothing() {
        let mut pass = ReconciliationPass::new(ReconciliationPolicy::default());
        let line = pass
            .reconcile_line(&catalog(), &RecipeLine::new("Flour", 1.0, "handful"))
            .await;
        assert_eq!(line.states, vec![ReferenceState::UnitMismatch]);
        assert_eq!(line.normalized.contribution, Contribution::default());
        assert_eq!(
            line.normalized.warnings,
            vec![Warning::UnrecognizedUnit {
                unit: "handful".to_string()
            }]
        );
    }
}
