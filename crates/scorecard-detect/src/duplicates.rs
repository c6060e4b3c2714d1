//! Monolithic test files: one reference cited by many requirements.

use scorecard_kernel::config::MonolithicTestPenalty;
use scorecard_kernel::{
    Issue, IssueKind, Requirement, Severity, capped_penalty, flatten_requirements,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateViolation {
    pub reference: String,
    pub requirement_ids: Vec<String>,
    pub severity: Severity,
}

impl DuplicateViolation {
    pub fn citations(&self) -> usize {
        self.requirement_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub total_references: usize,
    pub violations: Vec<DuplicateViolation>,
    pub worst_offender: Option<DuplicateViolation>,
    pub average_requirements_per_reference: f64,
    pub violation_ratio: f64,
    pub issue: Option<Issue>,
}

/// Citation key → ids of requirements citing it. Manual entries are ignored.
pub fn reference_citations(requirements: &[Requirement]) -> BTreeMap<String, BTreeSet<String>> {
    let mut citations: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for requirement in flatten_requirements(requirements) {
        for entry in &requirement.validation {
            if entry.kind.is_manual() {
                continue;
            }
            if let Some(key) = entry.citation_key() {
                citations
                    .entry(key)
                    .or_default()
                    .insert(requirement.id.clone());
            }
        }
    }
    citations
}

pub fn detect_duplicates(
    requirements: &[Requirement],
    penalty: &MonolithicTestPenalty,
) -> DuplicateReport {
    let requirement_count = flatten_requirements(requirements).len();
    let citations = reference_citations(requirements);

    let violations: Vec<DuplicateViolation> = citations
        .iter()
        .filter(|(_, ids)| ids.len() >= penalty.min_requirements)
        .map(|(reference, ids)| DuplicateViolation {
            reference: reference.clone(),
            requirement_ids: ids.iter().cloned().collect(),
            severity: if ids.len() >= penalty.high_severity_at {
                Severity::High
            } else {
                Severity::Medium
            },
        })
        .collect();

    // Violations are already in reference order, so the first maximum wins ties.
    let worst_offender = violations
        .iter()
        .fold(None::<&DuplicateViolation>, |best, candidate| match best {
            Some(best) if best.citations() >= candidate.citations() => Some(best),
            _ => Some(candidate),
        })
        .cloned();

    let total_citations: usize = citations.values().map(BTreeSet::len).sum();
    let average_requirements_per_reference = if citations.is_empty() {
        0.0
    } else {
        total_citations as f64 / citations.len() as f64
    };
    let violation_ratio = if requirement_count == 0 {
        0.0
    } else {
        violations.len() as f64 / requirement_count as f64
    };

    let issue = worst_offender
        .as_ref()
        .map(|worst| monolithic_issue(&violations, worst, penalty));

    DuplicateReport {
        total_references: citations.len(),
        violations,
        worst_offender,
        average_requirements_per_reference,
        violation_ratio,
        issue,
    }
}

fn monolithic_issue(
    violations: &[DuplicateViolation],
    worst: &DuplicateViolation,
    penalty: &MonolithicTestPenalty,
) -> Issue {
    let severity = violations
        .iter()
        .map(|violation| violation.severity)
        .max()
        .unwrap_or(Severity::Medium);
    Issue {
        kind: IssueKind::MonolithicTestFiles,
        severity,
        penalty: capped_penalty(violations.len() as f64 * penalty.per_unit, penalty.cap),
        message: format!(
            "{} test reference(s) each validate {} or more requirements; worst is {} with {}",
            violations.len(),
            penalty.min_requirements,
            worst.reference,
            worst.citations()
        ),
        recommendation: format!(
            "Split {} into focused tests so each requirement is validated by its own checks.",
            worst.reference
        ),
        rationale: "A single file cited by many requirements usually proves only that the file \
                    exists, not that each requirement's behavior is exercised."
            .to_string(),
        background: format!(
            "References cited by {} requirements are flagged; {} or more is high severity.",
            penalty.min_requirements, penalty.high_severity_at
        ),
    }
}
