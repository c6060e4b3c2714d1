//! # scorecard-engine
//!
//! Turns a scenario directory into a [`ScenarioReport`]: a 0–100
//! completeness score, its classification, the validation-quality report
//! whose penalty was subtracted, and prioritized recommendations.
//!
//! ```text
//! load_scenario ──► derive_metrics ──► score_completeness ──► ScenarioReport
//!       │                                      ▲
//!       └──► detect_validation_issues ─────────┘ (penalty)
//! ```
//!
//! Scoring is deterministic. Staleness is the only time-dependent check and
//! lives outside [`ScoreBreakdown`].

pub mod metrics;
pub mod pipeline;
pub mod recommend;
pub mod score;
pub mod staleness;
pub mod ui_metrics;

pub use metrics::{CompletionCount, ScenarioMetrics, derive_metrics};
pub use pipeline::{ScenarioReport, assess, score_scenario, score_scenario_with_ui};
pub use recommend::{Priority, Recommendation, recommend};
pub use score::{
    Classification, CoverageScore, QualityScore, QuantityMetric, QuantityScore, QuantityTier,
    ScoreBreakdown, TemplateCheck, UiScore, classify, score_completeness,
};
pub use staleness::{StalenessCheck, check_staleness};
pub use ui_metrics::{UiMetrics, collect_ui_metrics};
