//! Component detection and per-requirement validation-layer coverage.

use scorecard_kernel::config::LayerDiversityPenalty;
use scorecard_kernel::patterns::{COMPONENT_MARKERS, is_unsupported_test_location, layer_patterns};
use scorecard_kernel::{
    Criticality, Issue, IssueKind, Requirement, ScenarioComponents, Severity, ValidationLayer,
    capped_penalty, flatten_requirements,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::test_quality::TestQualityCache;

/// Components whose marker paths exist under the scenario root.
pub fn detect_components(scenario_root: &Path) -> ScenarioComponents {
    let found = COMPONENT_MARKERS
        .iter()
        .filter(|(_, marker)| scenario_root.join(marker).exists())
        .map(|(component, _)| *component)
        .collect();
    ScenarioComponents(found)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementLayerCoverage {
    pub requirement_id: String,
    pub criticality: Criticality,
    /// Automated layers credited after quality analysis.
    pub layers: BTreeSet<ValidationLayer>,
    pub has_manual: bool,
    /// `test/` references outside the playbook tree.
    pub invalid_refs: Vec<String>,
    pub required: usize,
    pub satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerAnalysis {
    pub components: ScenarioComponents,
    pub applicable_layers: BTreeSet<ValidationLayer>,
    pub coverage: Vec<RequirementLayerCoverage>,
    pub unsatisfied: usize,
    pub issue: Option<Issue>,
}

impl LayerAnalysis {
    pub fn requirements_with_invalid_refs(&self) -> usize {
        self.coverage
            .iter()
            .filter(|entry| !entry.invalid_refs.is_empty())
            .count()
    }
}

/// Layers credited to one requirement.
///
/// Only applicable layers count, and only when the referenced file passes
/// quality analysis. The requirement tier is capped by how many automated
/// layers the scenario can offer at all.
pub fn requirement_coverage(
    requirement: &Requirement,
    applicable: &BTreeSet<ValidationLayer>,
    cache: &mut TestQualityCache,
) -> RequirementLayerCoverage {
    let mut layers = BTreeSet::new();
    let mut has_manual = false;
    let mut invalid_refs = Vec::new();

    for entry in &requirement.validation {
        let reference = entry.normalized_ref();
        if let Some(reference) = &reference {
            if is_unsupported_test_location(reference) && !invalid_refs.contains(reference) {
                invalid_refs.push(reference.clone());
            }
        }
        if entry.kind.is_manual() {
            has_manual = true;
            continue;
        }
        let Some(reference) = reference else {
            continue;
        };
        let Some(layer) = layer_patterns().first_match(&reference) else {
            continue;
        };
        if applicable.contains(&layer) && !layers.contains(&layer) && cache.is_meaningful(&reference)
        {
            layers.insert(layer);
        }
    }

    let criticality = requirement.criticality();
    let required = criticality.required_layers();
    RequirementLayerCoverage {
        requirement_id: requirement.id.clone(),
        criticality,
        satisfied: layers.len() >= required,
        layers,
        has_manual,
        invalid_refs,
        required,
    }
}

pub fn analyze_layers(
    scenario_root: &Path,
    requirements: &[Requirement],
    penalty: &LayerDiversityPenalty,
    cache: &mut TestQualityCache,
) -> LayerAnalysis {
    let components = detect_components(scenario_root);
    let applicable_layers = components.applicable_layers();
    let coverage: Vec<RequirementLayerCoverage> = flatten_requirements(requirements)
        .into_iter()
        .map(|requirement| requirement_coverage(requirement, &applicable_layers, cache))
        .collect();
    let unsatisfied = coverage.iter().filter(|entry| !entry.satisfied).count();
    let issue = diversity_issue(&coverage, unsatisfied, penalty);

    tracing::debug!(
        requirements = coverage.len(),
        unsatisfied,
        components = ?components.0,
        "analyzed validation layers"
    );

    LayerAnalysis {
        components,
        applicable_layers,
        coverage,
        unsatisfied,
        issue,
    }
}

fn diversity_issue(
    coverage: &[RequirementLayerCoverage],
    unsatisfied: usize,
    penalty: &LayerDiversityPenalty,
) -> Option<Issue> {
    if unsatisfied == 0 || coverage.is_empty() {
        return None;
    }
    let ratio = unsatisfied as f64 / coverage.len() as f64;
    let critical_gaps = coverage
        .iter()
        .filter(|entry| !entry.satisfied && entry.criticality != Criticality::P2)
        .count();
    Some(Issue {
        kind: IssueKind::InsufficientLayerDiversity,
        severity: if ratio > penalty.severity_threshold {
            Severity::High
        } else {
            Severity::Medium
        },
        penalty: capped_penalty(ratio * penalty.multiplier, penalty.cap),
        message: format!(
            "{unsatisfied} of {} requirements lack the required automated validation layers ({critical_gaps} of them P0/P1)",
            coverage.len()
        ),
        recommendation: "Add meaningful automated tests at a second layer for P0/P1 requirements \
                         (for example an API unit test plus an end-to-end playbook)."
            .to_string(),
        rationale: "Critical behavior verified at a single layer can regress unnoticed when that \
                    layer's assumptions change."
            .to_string(),
        background: "P0 and P1 requirements need two distinct automated layers; P2 requirements \
                     need one. Only E2E and the layers of components the scenario has (API, UI) \
                     count, and manual validation never does."
            .to_string(),
    })
}
