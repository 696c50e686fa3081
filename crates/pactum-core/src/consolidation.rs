//! Reconciliation of per-strategy candidates into one result.

use std::cmp::Ordering;

use strum::IntoEnumIterator;

use crate::error::PactumError;
use crate::types::{ExtractedField, ExtractionResult, StrategyKind};

/// Picks one winner per field from every strategy's candidates.
///
/// Higher confidence wins. Equal confidences go to the strategy listed
/// first in the priority order; strategies missing from it rank after the
/// listed ones in [`StrategyKind`] order. A remaining tie goes to the
/// lexicographically smaller rendered value, so the outcome never depends on
/// the order candidates arrive in.
#[derive(Debug, Clone)]
pub struct Consolidator {
    priority: Vec<StrategyKind>,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self::new(vec![
            StrategyKind::Layout,
            StrategyKind::Pattern,
            StrategyKind::Semantic,
            StrategyKind::Entity,
        ])
    }
}

impl Consolidator {
    pub fn new(priority: Vec<StrategyKind>) -> Self {
        Self { priority }
    }

    pub fn priority(&self) -> &[StrategyKind] {
        &self.priority
    }

    /// Rank of a strategy, lower is preferred.
    fn rank(&self, kind: StrategyKind) -> usize {
        match self.priority.iter().position(|k| *k == kind) {
            Some(position) => position,
            None => {
                let fallback = StrategyKind::iter().position(|k| k == kind).unwrap_or(0);
                self.priority.len() + fallback
            }
        }
    }

    /// Whether `challenger` beats the current `holder` of a field.
    fn beats(&self, challenger: &ExtractedField, holder: &ExtractedField) -> bool {
        let by_confidence = challenger
            .confidence
            .partial_cmp(&holder.confidence)
            .unwrap_or(Ordering::Equal);
        let ordering = by_confidence
            .then_with(|| self.rank(holder.source).cmp(&self.rank(challenger.source)))
            .then_with(|| holder.value.render().cmp(&challenger.value.render()));
        ordering == Ordering::Greater
    }

    /// Merge candidates into a result with at most one entry per field.
    ///
    /// Malformed candidates (confidence outside `[0, 1]` or a blank value)
    /// are logged and skipped.
    pub fn consolidate<I>(&self, candidates: I) -> ExtractionResult
    where
        I: IntoIterator<Item = ExtractedField>,
    {
        let mut result = ExtractionResult::new();
        for candidate in candidates {
            if !candidate.is_well_formed() {
                let error = PactumError::consolidation(format!(
                    "discarding {} candidate from {} with confidence {}",
                    candidate.field, candidate.source, candidate.confidence
                ));
                tracing::warn!(code = error.code().as_str(), "{}", error);
                continue;
            }

            let replace = match result.get(candidate.field) {
                Some(holder) => self.beats(&candidate, holder),
                None => true,
            };
            if replace {
                result.insert(candidate);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContractField, FieldValue};

    fn candidate(field: ContractField, value: &str, confidence: f32, source: StrategyKind) -> ExtractedField {
        ExtractedField::new(field, FieldValue::text(value), confidence, source)
    }

    #[test]
    fn test_highest_confidence_wins() {
        let result = Consolidator::default().consolidate(vec![
            candidate(ContractField::PaymentTerms, "Net 45", 0.60, StrategyKind::Entity),
            candidate(ContractField::PaymentTerms, "Net 30", 0.95, StrategyKind::Pattern),
        ]);
        let winner = result.get(ContractField::PaymentTerms).unwrap();
        assert_eq!(winner.value, FieldValue::text("Net 30"));
        assert_eq!(winner.source, StrategyKind::Pattern);
    }

    #[test]
    fn test_tie_goes_to_priority_regardless_of_order() {
        let layout = candidate(ContractField::AuthorizedSignatory, "Jane Doe", 0.8, StrategyKind::Layout);
        let entity = candidate(ContractField::AuthorizedSignatory, "John Roe", 0.8, StrategyKind::Entity);

        let consolidator = Consolidator::default();
        let forward = consolidator.consolidate(vec![layout.clone(), entity.clone()]);
        let backward = consolidator.consolidate(vec![entity, layout]);

        assert_eq!(forward.summary(), backward.summary());
        assert_eq!(
            forward.get(ContractField::AuthorizedSignatory).unwrap().source,
            StrategyKind::Layout
        );
    }

    #[test]
    fn test_unlisted_strategy_ranks_last() {
        let consolidator = Consolidator::new(vec![StrategyKind::Entity]);
        let result = consolidator.consolidate(vec![
            candidate(ContractField::VendorName, "Initech LLC", 0.75, StrategyKind::Pattern),
            candidate(ContractField::VendorName, "Globex Corp", 0.75, StrategyKind::Entity),
        ]);
        assert_eq!(
            result.get(ContractField::VendorName).unwrap().source,
            StrategyKind::Entity
        );
        assert!(consolidator.rank(StrategyKind::Pattern) < consolidator.rank(StrategyKind::Layout));
    }

    #[test]
    fn test_same_source_tie_uses_smaller_value() {
        let consolidator = Consolidator::default();
        let a = candidate(ContractField::BillingCycle, "monthly", 0.9, StrategyKind::Pattern);
        let b = candidate(ContractField::BillingCycle, "annually", 0.9, StrategyKind::Pattern);

        for order in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
            let result = consolidator.consolidate(order);
            assert_eq!(
                result.get(ContractField::BillingCycle).unwrap().value,
                FieldValue::text("annually")
            );
        }
    }

    #[test]
    fn test_malformed_candidates_are_skipped() {
        let result = Consolidator::default().consolidate(vec![
            candidate(ContractField::CustomerName, "Globex", 1.5, StrategyKind::Entity),
            candidate(ContractField::VendorName, "  ", 0.9, StrategyKind::Entity),
            candidate(ContractField::PaymentTerms, "Net 30", f32::NAN, StrategyKind::Pattern),
        ]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_one_entry_per_field() {
        let result = Consolidator::default().consolidate(vec![
            candidate(ContractField::CustomerName, "Globex", 0.75, StrategyKind::Entity),
            candidate(ContractField::CustomerName, "Globex", 0.75, StrategyKind::Entity),
            candidate(ContractField::PaymentTerms, "Net 30", 0.95, StrategyKind::Pattern),
        ]);
        assert_eq!(result.len(), 2);
    }
}
