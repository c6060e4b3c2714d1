//! Validation-quality (gaming) detection.
//!
//! Runs every structural detector over one scenario and folds their issues
//! into a single prioritized report. Each detector caps its own penalty; the
//! report total is their plain sum.

use scorecard_kernel::config::{
    InvalidLocationPenalty, ManualValidationPenalty, PenaltyConfig, TestRatioPenalty,
};
use scorecard_kernel::{
    Issue, IssueKind, Requirement, Severity, SyncSnapshot, capped_penalty, flatten_requirements,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::Path;

use crate::duplicates::{DuplicateReport, detect_duplicates};
use crate::grouping::{GroupingReport, validate_target_grouping};
use crate::layers::{LayerAnalysis, analyze_layers};
use crate::test_quality::TestQualityCache;

pub const VALIDATION_QUALITY_CHECK_KIND: &str = "scorecard.validation_quality.v1";

/// Validation-entry counts over the flattened requirement forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub requirement_count: usize,
    pub total_entries: usize,
    pub manual_entries: usize,
    /// Automated entries that name a file or workflow.
    pub linked_automated_refs: usize,
    pub reference_ratio: f64,
    pub manual_ratio: f64,
    /// Done requirements whose only validation is manual.
    pub manual_only_done: usize,
    pub invalid_location_requirements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationQualityReport {
    pub check_kind: String,
    pub issues: Vec<Issue>,
    pub total_penalty: u32,
    pub overall_severity: Option<Severity>,
    pub summary: ValidationSummary,
    pub layers: LayerAnalysis,
    pub duplicates: DuplicateReport,
    pub grouping: GroupingReport,
}

impl ValidationQualityReport {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issue(&self, kind: IssueKind) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.kind == kind)
    }
}

/// Linked automated validation references per requirement.
///
/// Shared by the 1:1 check here and the coverage sub-score.
pub fn linked_reference_ratio(requirements: &[Requirement]) -> f64 {
    let flat = flatten_requirements(requirements);
    if flat.is_empty() {
        return 0.0;
    }
    let linked = flat
        .iter()
        .flat_map(|requirement| &requirement.validation)
        .filter(|entry| !entry.kind.is_manual() && entry.citation_key().is_some())
        .count();
    linked as f64 / flat.len() as f64
}

fn summarize(
    requirements: &[Requirement],
    sync: &SyncSnapshot,
    layers: &LayerAnalysis,
) -> ValidationSummary {
    let flat = flatten_requirements(requirements);
    let total_entries: usize = flat.iter().map(|r| r.validation.len()).sum();
    let manual_entries: usize = flat.iter().map(|r| r.manual_entries()).sum();
    let linked_automated_refs = flat
        .iter()
        .flat_map(|requirement| &requirement.validation)
        .filter(|entry| !entry.kind.is_manual() && entry.citation_key().is_some())
        .count();
    let manual_only_done = flat
        .iter()
        .filter(|requirement| {
            !requirement.validation.is_empty()
                && requirement.automated_entries() == 0
                && sync.effective_status(requirement).is_done()
        })
        .count();
    ValidationSummary {
        requirement_count: flat.len(),
        total_entries,
        manual_entries,
        linked_automated_refs,
        reference_ratio: linked_reference_ratio(requirements),
        manual_ratio: if total_entries == 0 {
            0.0
        } else {
            manual_entries as f64 / total_entries as f64
        },
        manual_only_done,
        invalid_location_requirements: layers.requirements_with_invalid_refs(),
    }
}

fn suspicious_ratio_issue(summary: &ValidationSummary, penalty: &TestRatioPenalty) -> Option<Issue> {
    if summary.requirement_count == 0
        || (summary.reference_ratio - 1.0).abs() > penalty.tolerance
    {
        return None;
    }
    Some(Issue {
        kind: IssueKind::SuspiciousTestRatio,
        severity: Severity::Medium,
        penalty: capped_penalty(penalty.base, penalty.cap),
        message: format!(
            "{} automated references for {} requirements ({:.2} per requirement) looks like one \
             test stamped onto each requirement",
            summary.linked_automated_refs, summary.requirement_count, summary.reference_ratio
        ),
        recommendation: "Validate important requirements at more than one layer and let shared \
                         behavior be covered by tests that exercise it directly."
            .to_string(),
        rationale: "An exact one-to-one mapping usually comes from generating references, not \
                    from designing tests around behavior."
            .to_string(),
        background: format!(
            "Ratios within ±{:.0}% of 1.0 are flagged.",
            penalty.tolerance * 100.0
        ),
    })
}

fn manual_validation_issue(
    summary: &ValidationSummary,
    penalty: &ManualValidationPenalty,
) -> Option<Issue> {
    let too_many_entries = summary.manual_ratio > penalty.max_ratio;
    let too_many_done = summary.manual_only_done >= penalty.min_complete_manual_only;
    if !too_many_entries && !too_many_done {
        return None;
    }
    let ratio_part = (summary.manual_ratio * penalty.ratio_multiplier).min(penalty.ratio_cap);
    let count_part = (summary.manual_only_done as f64 * penalty.per_unit).min(penalty.count_cap);
    Some(Issue {
        kind: IssueKind::ExcessiveManualValidation,
        severity: if summary.manual_only_done > penalty.high_severity_count {
            Severity::High
        } else {
            Severity::Medium
        },
        penalty: capped_penalty(ratio_part + count_part, penalty.ratio_cap + penalty.count_cap),
        message: format!(
            "{:.0}% of validation entries are manual; {} done requirement(s) rely on manual \
             validation only",
            summary.manual_ratio * 100.0,
            summary.manual_only_done
        ),
        recommendation: "Replace manual checks with automated tests or playbooks, starting with \
                         requirements already marked done."
            .to_string(),
        rationale: "Manual validation cannot be re-run on every change, so completion claims \
                    backed only by it decay silently."
            .to_string(),
        background: format!(
            "Flagged above {:.0}% manual entries or at {} manual-only done requirements; high \
             severity beyond {}.",
            penalty.max_ratio * 100.0,
            penalty.min_complete_manual_only,
            penalty.high_severity_count
        ),
    })
}

fn invalid_location_issue(
    summary: &ValidationSummary,
    penalty: &InvalidLocationPenalty,
) -> Option<Issue> {
    if summary.invalid_location_requirements == 0 || summary.requirement_count == 0 {
        return None;
    }
    let ratio = summary.invalid_location_requirements as f64 / summary.requirement_count as f64;
    Some(Issue {
        kind: IssueKind::InvalidTestLocation,
        severity: if ratio > penalty.severity_threshold {
            Severity::High
        } else {
            Severity::Medium
        },
        penalty: capped_penalty((ratio * penalty.multiplier).round(), penalty.cap),
        message: format!(
            "{} of {} requirements reference test/ paths outside test/playbooks/",
            summary.invalid_location_requirements, summary.requirement_count
        ),
        recommendation: "Move unit tests next to the code they test (api/ or ui/) and keep only \
                         JSON or YAML playbooks under test/playbooks/."
            .to_string(),
        rationale: "Files in unsupported locations are not discovered by the layer detector, so \
                    they cannot prove coverage."
            .to_string(),
        background: "Valid locations: api/ unit tests, ui/ .test/.spec files, and \
                     test/playbooks/**/*.json|yaml."
            .to_string(),
    })
}

/// Issues high first, then larger penalties, then kind.
pub fn prioritize(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| (Reverse(issue.severity), Reverse(issue.penalty), issue.kind));
}

pub fn overall_severity(issues: &[Issue]) -> Option<Severity> {
    issues.iter().map(|issue| issue.severity).max()
}

pub fn detect_validation_issues(
    scenario_root: &Path,
    requirements: &[Requirement],
    sync: &SyncSnapshot,
    penalties: &PenaltyConfig,
) -> ValidationQualityReport {
    let mut cache = TestQualityCache::new(scenario_root);
    let layers = analyze_layers(
        scenario_root,
        requirements,
        &penalties.layer_diversity,
        &mut cache,
    );
    let duplicates = detect_duplicates(requirements, &penalties.monolithic_tests);
    let grouping = validate_target_grouping(requirements, &penalties.target_grouping);
    let summary = summarize(requirements, sync, &layers);

    let mut issues: Vec<Issue> = if summary.requirement_count == 0 {
        Vec::new()
    } else {
        [
            suspicious_ratio_issue(&summary, &penalties.test_ratio),
            manual_validation_issue(&summary, &penalties.manual_validation),
            invalid_location_issue(&summary, &penalties.invalid_location),
            duplicates.issue.clone(),
            grouping.issue.clone(),
            layers.issue.clone(),
        ]
        .into_iter()
        .flatten()
        .collect()
    };
    prioritize(&mut issues);
    let total_penalty: u32 = issues.iter().map(|issue| issue.penalty).sum();
    let overall_severity = overall_severity(&issues);

    tracing::debug!(
        requirements = summary.requirement_count,
        issues = issues.len(),
        total_penalty,
        files_analyzed = cache.analyzed().len(),
        "validation quality checked"
    );

    ValidationQualityReport {
        check_kind: VALIDATION_QUALITY_CHECK_KIND.to_string(),
        issues,
        total_penalty,
        overall_severity,
        summary,
        layers,
        duplicates,
        grouping,
    }
}
