//! Load → detect → score, composed.

use chrono::{DateTime, Utc};
use scorecard_detect::{RequirementLayerCoverage, ValidationQualityReport, detect_validation_issues};
use scorecard_ingest::{ScenarioData, load_scenario};
use scorecard_kernel::{LoadWarning, ScoringConfig, TestResultsSummary};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::metrics::{ScenarioMetrics, derive_metrics};
use crate::score::{ScoreBreakdown, score_completeness};
use crate::staleness::{StalenessCheck, check_staleness};
use crate::ui_metrics::{UiMetrics, collect_ui_metrics};

pub const REPORT_DIGEST_PREFIX: &str = "scr1_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub category: String,
    /// The category had no threshold table; the default category's applied.
    pub category_fallback: bool,
    pub breakdown: ScoreBreakdown,
    pub validation: ValidationQualityReport,
    pub layer_coverage: Vec<RequirementLayerCoverage>,
    pub metrics: ScenarioMetrics,
    pub test_results: TestResultsSummary,
    pub warnings: Vec<LoadWarning>,
}

impl ScenarioReport {
    /// Stable content hash. Equal on-disk inputs give equal digests.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{REPORT_DIGEST_PREFIX}{:x}", hasher.finalize()))
    }

    pub fn staleness(&self, now: DateTime<Utc>, max_age_hours: u32) -> StalenessCheck {
        check_staleness(&self.test_results, now, max_age_hours)
    }
}

/// Score an already-loaded scenario.
pub fn assess(data: ScenarioData, config: &ScoringConfig, ui: Option<UiMetrics>) -> ScenarioReport {
    let scenario = data.name();
    let (thresholds, category_fallback) = config.thresholds_for(&data.service.category);
    if category_fallback {
        tracing::debug!(
            scenario = %scenario,
            category = %data.service.category,
            fallback = %config.default_category,
            "no thresholds for category"
        );
    }

    let mut validation =
        detect_validation_issues(&data.root, &data.requirements, &data.sync, &config.penalties);
    let layer_coverage = std::mem::take(&mut validation.layers.coverage);
    let metrics = derive_metrics(&data, ui);
    let breakdown = score_completeness(&metrics, thresholds, validation.total_penalty);

    tracing::debug!(
        scenario = %scenario,
        base = breakdown.base_score,
        penalty = breakdown.validation_penalty,
        score = breakdown.score,
        classification = breakdown.classification.as_str(),
        "scored scenario"
    );

    ScenarioReport {
        scenario,
        category: data.service.category,
        category_fallback,
        breakdown,
        validation,
        layer_coverage,
        metrics,
        test_results: data.test_results,
        warnings: data.warnings,
    }
}

/// Score a scenario directory, measuring its `ui/` tree from disk.
pub fn score_scenario(scenario_root: &Path, config: &ScoringConfig) -> ScenarioReport {
    let ui = collect_ui_metrics(scenario_root);
    score_scenario_with_ui(scenario_root, config, ui)
}

/// Score a scenario directory with caller-supplied UI metrics.
pub fn score_scenario_with_ui(
    scenario_root: &Path,
    config: &ScoringConfig,
    ui: Option<UiMetrics>,
) -> ScenarioReport {
    let data = load_scenario(scenario_root, config);
    assess(data, config, ui)
}
