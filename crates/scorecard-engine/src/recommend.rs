//! Prioritized improvement hints derived from a score breakdown.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::ScenarioMetrics;
use crate::score::{QuantityMetric, ScoreBreakdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub area: String,
    pub message: String,
}

impl Recommendation {
    fn new(priority: Priority, area: &str, message: String) -> Self {
        Self {
            priority,
            area: area.to_string(),
            message,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.priority.as_str(), self.area, self.message)
    }
}

fn quantity_hint(area: &str, noun: &str, metric: &QuantityMetric) -> Option<Recommendation> {
    if metric.points >= metric.max {
        return None;
    }
    let priority = if metric.count == 0 {
        Priority::High
    } else {
        Priority::Low
    };
    Some(Recommendation::new(
        priority,
        area,
        format!(
            "{} {noun} defined; the category expects at least {}",
            metric.count, metric.threshold
        ),
    ))
}

/// Compare each sub-score with its maximum and each count with its
/// threshold. Output is sorted by priority; ties keep generation order.
pub fn recommend(metrics: &ScenarioMetrics, breakdown: &ScoreBreakdown) -> Vec<Recommendation> {
    let mut out = Vec::new();

    let requirements = metrics.requirements;
    if requirements.total == 0 {
        out.push(Recommendation::new(
            Priority::High,
            "requirements",
            "no requirements found; define requirements with validation references".to_string(),
        ));
    } else if requirements.remaining() > 0 {
        out.push(Recommendation::new(
            Priority::High,
            "requirements",
            format!(
                "{} of {} requirements are not passing",
                requirements.remaining(),
                requirements.total
            ),
        ));
    }

    let targets = metrics.targets;
    if targets.remaining() > 0 {
        out.push(Recommendation::new(
            Priority::Medium,
            "targets",
            format!(
                "{} of {} operational targets are incomplete",
                targets.remaining(),
                targets.total
            ),
        ));
    }

    let tests = metrics.tests;
    if tests.total == 0 {
        out.push(Recommendation::new(
            Priority::High,
            "tests",
            "no test results recorded; run the test phases".to_string(),
        ));
    } else if tests.remaining() > 0 {
        out.push(Recommendation::new(
            Priority::High,
            "tests",
            format!("{} of {} tests are failing", tests.remaining(), tests.total),
        ));
    }

    let coverage = &breakdown.coverage;
    if coverage.score < coverage.max {
        if coverage.ratio_points < crate::score::RATIO_POINTS as u32 {
            out.push(Recommendation::new(
                Priority::Medium,
                "coverage",
                format!(
                    "link more automated tests per requirement (ratio {:.2}, target {:.1})",
                    coverage.reference_ratio,
                    crate::score::RATIO_CEILING
                ),
            ));
        }
        if coverage.depth_points < crate::score::DEPTH_POINTS as u32 {
            out.push(Recommendation::new(
                Priority::Low,
                "coverage",
                format!(
                    "break requirements into sub-requirements (depth {:.2}, target {:.1})",
                    coverage.average_depth,
                    crate::score::DEPTH_CEILING
                ),
            ));
        }
    }

    let quantity = &breakdown.quantity;
    out.extend(quantity_hint("quantity", "requirements", &quantity.requirements));
    out.extend(quantity_hint("quantity", "operational targets", &quantity.targets));
    out.extend(quantity_hint("quantity", "tests", &quantity.tests));

    let ui = &breakdown.ui;
    if !ui.template_check.has_ui {
        out.push(Recommendation::new(
            Priority::Medium,
            "ui",
            "no ui directory found".to_string(),
        ));
    } else {
        if ui.template_check.is_template {
            out.push(Recommendation::new(
                Priority::High,
                "ui",
                "ui still looks like an unmodified scaffold; build real screens".to_string(),
            ));
        }
        if ui.endpoint_points < crate::score::ENDPOINT_POINTS {
            let beyond = metrics.ui.as_ref().map_or(0, |ui| ui.api_beyond_health);
            out.push(Recommendation::new(
                Priority::Medium,
                "ui",
                format!("ui calls {beyond} api endpoints beyond health checks; wire up the api"),
            ));
        }
        if ui.file_points < crate::score::FILE_COUNT_POINTS
            || ui.loc_points < crate::score::LOC_POINTS
        {
            out.push(Recommendation::new(
                Priority::Low,
                "ui",
                "ui is thin; add components and pages".to_string(),
            ));
        }
    }

    if breakdown.validation_penalty > 0 {
        out.push(Recommendation::new(
            Priority::High,
            "validation",
            format!(
                "validation quality issues cost {} points; see the validation report",
                breakdown.validation_penalty
            ),
        ));
    }

    out.sort_by_key(|recommendation| recommendation.priority);
    out
}
