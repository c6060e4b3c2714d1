//! Scoring inputs, derived from a loaded scenario or built directly.

use scorecard_detect::linked_reference_ratio;
use scorecard_ingest::ScenarioData;
use scorecard_kernel::flatten_requirements;
use serde::{Deserialize, Serialize};

use crate::ui_metrics::UiMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionCount {
    pub total: usize,
    pub passing: usize,
}

impl CompletionCount {
    pub fn new(total: usize, passing: usize) -> Self {
        Self {
            total,
            passing: passing.min(total),
        }
    }

    /// Zero totals have a rate of zero.
    pub fn rate(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passing as f64 / self.total as f64
        }
    }

    pub fn remaining(self) -> usize {
        self.total - self.passing
    }
}

/// Everything the completeness score depends on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub category: String,
    pub requirements: CompletionCount,
    pub targets: CompletionCount,
    pub tests: CompletionCount,
    /// Linked automated validation references per requirement.
    pub reference_ratio: f64,
    /// Mean depth of root requirements.
    pub average_depth: f64,
    pub ui: Option<UiMetrics>,
}

pub fn derive_metrics(data: &ScenarioData, ui: Option<UiMetrics>) -> ScenarioMetrics {
    let flat = flatten_requirements(&data.requirements);
    let passing_requirements = flat
        .iter()
        .filter(|requirement| data.sync.is_passing(requirement))
        .count();
    let complete_targets = data
        .targets
        .iter()
        .filter(|target| target.is_complete())
        .count();
    let average_depth = if data.requirements.is_empty() {
        0.0
    } else {
        let total: usize = data.requirements.iter().map(|root| root.depth()).sum();
        total as f64 / data.requirements.len() as f64
    };

    ScenarioMetrics {
        category: data.service.category.clone(),
        requirements: CompletionCount::new(flat.len(), passing_requirements),
        targets: CompletionCount::new(data.targets.len(), complete_targets),
        tests: CompletionCount::new(data.test_results.total, data.test_results.passing),
        reference_ratio: linked_reference_ratio(&data.requirements),
        average_depth,
        ui,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_totals_have_zero_rate() {
        assert_eq!(CompletionCount::default().rate(), 0.0);
        assert_eq!(CompletionCount::new(4, 3).rate(), 0.75);
    }

    #[test]
    fn passing_never_exceeds_total() {
        let count = CompletionCount::new(2, 5);
        assert_eq!(count.passing, 2);
        assert_eq!(count.remaining(), 0);
    }
}
