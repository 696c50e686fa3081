//! Critical-field gap analysis.

use crate::types::{ContractField, ExtractionResult, GapList};

/// Compares a consolidated result with the critical-field checklist.
#[derive(Debug, Clone)]
pub struct GapAnalyzer {
    threshold: f32,
    checklist: Vec<ContractField>,
}

impl GapAnalyzer {
    /// Analyzer over every known field.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            checklist: ContractField::all(),
        }
    }

    /// Analyzer over a custom checklist, reported in the order given.
    pub fn with_checklist(threshold: f32, checklist: Vec<ContractField>) -> Self {
        Self {
            threshold,
            checklist,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Fields that are absent or below the acceptance threshold, in checklist order.
    pub fn analyze(&self, result: &ExtractionResult) -> GapList {
        let gaps = self
            .checklist
            .iter()
            .copied()
            .filter(|field| match result.get(*field) {
                Some(extracted) => extracted.confidence < self.threshold,
                None => true,
            })
            .collect();
        GapList::new(gaps)
    }
}

impl Default for GapAnalyzer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractedField, FieldValue, StrategyKind};

    fn result(fields: &[(ContractField, f32)]) -> ExtractionResult {
        fields
            .iter()
            .map(|(field, confidence)| {
                ExtractedField::new(*field, FieldValue::text("x"), *confidence, StrategyKind::Pattern)
            })
            .collect()
    }

    #[test]
    fn test_empty_result_is_all_gaps() {
        let gaps = GapAnalyzer::default().analyze(&ExtractionResult::new());
        assert_eq!(gaps.fields(), ContractField::all().as_slice());
    }

    #[test]
    fn test_low_confidence_is_gap() {
        let gaps = GapAnalyzer::new(0.5).analyze(&result(&[
            (ContractField::CustomerName, 0.75),
            (ContractField::VendorName, 0.49),
            (ContractField::AuthorizedSignatory, 0.5),
        ]));

        assert!(!gaps.contains(ContractField::CustomerName));
        assert!(gaps.contains(ContractField::VendorName));
        assert!(!gaps.contains(ContractField::AuthorizedSignatory));
        assert_eq!(
            gaps.fields(),
            &[
                ContractField::VendorName,
                ContractField::PaymentTerms,
                ContractField::BillingCycle,
                ContractField::RenewalTerms
            ]
        );
    }

    #[test]
    fn test_custom_checklist() {
        let analyzer = GapAnalyzer::with_checklist(
            0.5,
            vec![ContractField::RenewalTerms, ContractField::PaymentTerms],
        );
        let gaps = analyzer.analyze(&result(&[(ContractField::PaymentTerms, 0.95)]));
        assert_eq!(gaps.fields(), &[ContractField::RenewalTerms]);
    }
}
