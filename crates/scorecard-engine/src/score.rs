//! Completeness scoring.
//!
//! Four weighted dimensions sum to 100:
//!
//! | Dimension | Max | Inputs |
//! |---|---|---|
//! | quality | 50 | requirement / target / test pass rates |
//! | coverage | 15 | reference ratio, requirement depth |
//! | quantity | 10 | counts against category thresholds |
//! | ui | 25 | template gate, files, endpoints, routes, LOC |
//!
//! The validation penalty is subtracted from the rounded sum, floored at 0.

use scorecard_kernel::{CategoryThresholds, QuantityTiers, UiThresholds, UiTiers};
use serde::{Deserialize, Serialize};

use crate::metrics::{CompletionCount, ScenarioMetrics};
use crate::recommend::{Recommendation, recommend};
use crate::ui_metrics::UiMetrics;

pub const MAX_SCORE: u32 = 100;

pub const QUALITY_MAX: u32 = 50;
pub const REQUIREMENT_PASS_POINTS: f64 = 20.0;
pub const TARGET_PASS_POINTS: f64 = 15.0;
pub const TEST_PASS_POINTS: f64 = 15.0;

pub const COVERAGE_MAX: u32 = 15;
pub const RATIO_POINTS: f64 = 8.0;
pub const RATIO_CEILING: f64 = 2.0;
pub const DEPTH_POINTS: f64 = 7.0;
pub const DEPTH_CEILING: f64 = 3.0;

pub const QUANTITY_MAX: u32 = 10;
pub const REQUIREMENT_COUNT_POINTS: f64 = 4.0;
pub const TARGET_COUNT_POINTS: f64 = 3.0;
pub const TEST_COUNT_POINTS: f64 = 3.0;

pub const UI_MAX: f64 = 25.0;
pub const TEMPLATE_GATE_POINTS: f64 = 10.0;
pub const FILE_COUNT_POINTS: f64 = 5.0;
pub const ENDPOINT_POINTS: f64 = 6.0;
pub const ROUTE_POINTS: f64 = 1.5;
pub const LOC_POINTS: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    EarlyStage,
    FoundationLaid,
    FunctionalIncomplete,
    MostlyComplete,
    NearlyReady,
    ProductionReady,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EarlyStage => "early_stage",
            Self::FoundationLaid => "foundation_laid",
            Self::FunctionalIncomplete => "functional_incomplete",
            Self::MostlyComplete => "mostly_complete",
            Self::NearlyReady => "nearly_ready",
            Self::ProductionReady => "production_ready",
        }
    }
}

pub fn classify(score: u32) -> Classification {
    match score {
        96.. => Classification::ProductionReady,
        81.. => Classification::NearlyReady,
        61.. => Classification::MostlyComplete,
        41.. => Classification::FunctionalIncomplete,
        21.. => Classification::FoundationLaid,
        _ => Classification::EarlyStage,
    }
}

fn points(fraction: f64, weight: f64) -> u32 {
    (fraction.clamp(0.0, 1.0) * weight).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub requirement_pass_rate: f64,
    pub target_pass_rate: f64,
    pub test_pass_rate: f64,
    pub requirement_points: u32,
    pub target_points: u32,
    pub test_points: u32,
    pub score: u32,
    pub max: u32,
}

pub fn score_quality(
    requirements: CompletionCount,
    targets: CompletionCount,
    tests: CompletionCount,
) -> QualityScore {
    let requirement_points = points(requirements.rate(), REQUIREMENT_PASS_POINTS);
    let target_points = points(targets.rate(), TARGET_PASS_POINTS);
    let test_points = points(tests.rate(), TEST_PASS_POINTS);
    QualityScore {
        requirement_pass_rate: requirements.rate(),
        target_pass_rate: targets.rate(),
        test_pass_rate: tests.rate(),
        requirement_points,
        target_points,
        test_points,
        score: requirement_points + target_points + test_points,
        max: QUALITY_MAX,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageScore {
    pub reference_ratio: f64,
    pub average_depth: f64,
    pub ratio_points: u32,
    pub depth_points: u32,
    pub score: u32,
    pub max: u32,
}

pub fn score_coverage(reference_ratio: f64, average_depth: f64) -> CoverageScore {
    let ratio_points = points(reference_ratio.min(RATIO_CEILING) / RATIO_CEILING, RATIO_POINTS);
    let depth_points = points(average_depth.min(DEPTH_CEILING) / DEPTH_CEILING, DEPTH_POINTS);
    CoverageScore {
        reference_ratio,
        average_depth,
        ratio_points,
        depth_points,
        score: ratio_points + depth_points,
        max: COVERAGE_MAX,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityTier {
    Below,
    Ok,
    Good,
    Excellent,
}

impl QuantityTier {
    pub fn of(count: usize, tiers: QuantityTiers) -> Self {
        if count >= tiers.excellent {
            Self::Excellent
        } else if count >= tiers.good {
            Self::Good
        } else if count >= tiers.ok {
            Self::Ok
        } else {
            Self::Below
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityMetric {
    pub count: usize,
    pub tier: QuantityTier,
    pub threshold: usize,
    pub points: u32,
    pub max: u32,
}

fn quantity_metric(count: usize, tiers: QuantityTiers, weight: f64) -> QuantityMetric {
    let fraction = if tiers.good == 0 {
        1.0
    } else {
        count as f64 / tiers.good as f64
    };
    QuantityMetric {
        count,
        tier: QuantityTier::of(count, tiers),
        threshold: tiers.good,
        points: points(fraction, weight),
        max: weight as u32,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityScore {
    pub requirements: QuantityMetric,
    pub targets: QuantityMetric,
    pub tests: QuantityMetric,
    pub score: u32,
    pub max: u32,
}

pub fn score_quantity(metrics: &ScenarioMetrics, thresholds: &CategoryThresholds) -> QuantityScore {
    let requirements = quantity_metric(
        metrics.requirements.total,
        thresholds.requirements,
        REQUIREMENT_COUNT_POINTS,
    );
    let targets = quantity_metric(metrics.targets.total, thresholds.targets, TARGET_COUNT_POINTS);
    let tests = quantity_metric(metrics.tests.total, thresholds.tests, TEST_COUNT_POINTS);
    QuantityScore {
        score: requirements.points + targets.points + tests.points,
        requirements,
        targets,
        tests,
        max: QUANTITY_MAX,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCheck {
    pub is_template: bool,
    pub has_ui: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiScore {
    pub template_check: TemplateCheck,
    pub template_points: f64,
    pub file_points: f64,
    pub endpoint_points: f64,
    pub route_points: f64,
    pub loc_points: f64,
    pub score: f64,
    pub max: f64,
}

/// Full points at `good`, half at `ok`, else nothing.
fn tier_points(value: usize, tiers: UiTiers, weight: f64) -> f64 {
    if value >= tiers.good {
        weight
    } else if value >= tiers.ok {
        weight / 2.0
    } else {
        0.0
    }
}

pub fn score_ui(ui: Option<&UiMetrics>, thresholds: &UiThresholds) -> UiScore {
    let Some(ui) = ui else {
        return UiScore {
            template_check: TemplateCheck {
                is_template: true,
                has_ui: false,
            },
            template_points: 0.0,
            file_points: 0.0,
            endpoint_points: 0.0,
            route_points: 0.0,
            loc_points: 0.0,
            score: 0.0,
            max: UI_MAX,
        };
    };
    let template_points = if ui.is_template {
        0.0
    } else {
        TEMPLATE_GATE_POINTS
    };
    let file_points = tier_points(ui.file_count, thresholds.file_count, FILE_COUNT_POINTS);
    let endpoint_points =
        tier_points(ui.api_beyond_health, thresholds.api_endpoints, ENDPOINT_POINTS);
    let route_points = tier_points(ui.route_count, thresholds.route_count, ROUTE_POINTS);
    let loc_points = tier_points(ui.total_loc, thresholds.total_loc, LOC_POINTS);
    UiScore {
        template_check: TemplateCheck {
            is_template: ui.is_template,
            has_ui: true,
        },
        template_points,
        file_points,
        endpoint_points,
        route_points,
        loc_points,
        score: template_points + file_points + endpoint_points + route_points + loc_points,
        max: UI_MAX,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: u32,
    pub validation_penalty: u32,
    pub score: u32,
    pub classification: Classification,
    pub quality: QualityScore,
    pub coverage: CoverageScore,
    pub quantity: QuantityScore,
    pub ui: UiScore,
    pub recommendations: Vec<Recommendation>,
}

pub fn base_score(
    quality: &QualityScore,
    coverage: &CoverageScore,
    quantity: &QuantityScore,
    ui: &UiScore,
) -> u32 {
    let sum = f64::from(quality.score)
        + f64::from(coverage.score)
        + f64::from(quantity.score)
        + ui.score;
    sum.clamp(0.0, f64::from(MAX_SCORE)).round() as u32
}

pub fn score_completeness(
    metrics: &ScenarioMetrics,
    thresholds: &CategoryThresholds,
    validation_penalty: u32,
) -> ScoreBreakdown {
    let quality = score_quality(metrics.requirements, metrics.targets, metrics.tests);
    let coverage = score_coverage(metrics.reference_ratio, metrics.average_depth);
    let quantity = score_quantity(metrics, thresholds);
    let ui = score_ui(metrics.ui.as_ref(), &thresholds.ui);

    let base_score = base_score(&quality, &coverage, &quantity, &ui);
    let score = base_score.saturating_sub(validation_penalty);
    let mut breakdown = ScoreBreakdown {
        base_score,
        validation_penalty,
        score,
        classification: classify(score),
        quality,
        coverage,
        quantity,
        ui,
        recommendations: Vec::new(),
    };
    breakdown.recommendations = recommend(metrics, &breakdown);
    breakdown
}
