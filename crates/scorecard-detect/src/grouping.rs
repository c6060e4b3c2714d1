//! Operational-target grouping: targets should gather several requirements.

use scorecard_kernel::config::TargetGroupingPenalty;
use scorecard_kernel::{
    Issue, IssueKind, Requirement, Severity, capped_penalty, flatten_requirements,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SingleRequirementTarget {
    pub target: String,
    pub requirement_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingReport {
    pub linked_targets: usize,
    pub single_requirement_targets: Vec<SingleRequirementTarget>,
    pub ratio: f64,
    pub ceiling: f64,
    pub issue: Option<Issue>,
}

/// Target id → ids of requirements whose `prd_ref` names it.
pub fn target_links(requirements: &[Requirement]) -> BTreeMap<String, BTreeSet<String>> {
    let mut links: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for requirement in flatten_requirements(requirements) {
        if let Some(target) = requirement.target_ref() {
            links
                .entry(target)
                .or_default()
                .insert(requirement.id.clone());
        }
    }
    links
}

/// The allowed share of single-requirement targets shrinks as targets grow.
pub fn ratio_ceiling(linked_targets: usize, penalty: &TargetGroupingPenalty) -> f64 {
    if linked_targets == 0 {
        return penalty.max_ratio;
    }
    penalty
        .max_ratio
        .min(penalty.per_target_budget / linked_targets as f64)
}

pub fn validate_target_grouping(
    requirements: &[Requirement],
    penalty: &TargetGroupingPenalty,
) -> GroupingReport {
    let links = target_links(requirements);
    let single_requirement_targets: Vec<SingleRequirementTarget> = links
        .iter()
        .filter_map(|(target, ids)| match ids.first() {
            Some(only) if ids.len() == 1 => Some(SingleRequirementTarget {
                target: target.clone(),
                requirement_id: only.clone(),
            }),
            _ => None,
        })
        .collect();
    let linked_targets = links.len();
    let ratio = if linked_targets == 0 {
        0.0
    } else {
        single_requirement_targets.len() as f64 / linked_targets as f64
    };
    let ceiling = ratio_ceiling(linked_targets, penalty);
    let issue = (linked_targets > 0 && ratio > ceiling).then(|| {
        grouping_issue(&single_requirement_targets, linked_targets, ratio, ceiling, penalty)
    });

    GroupingReport {
        linked_targets,
        single_requirement_targets,
        ratio,
        ceiling,
        issue,
    }
}

fn grouping_issue(
    singles: &[SingleRequirementTarget],
    linked_targets: usize,
    ratio: f64,
    ceiling: f64,
    penalty: &TargetGroupingPenalty,
) -> Issue {
    let raw = penalty.base + ((ratio - ceiling) * penalty.multiplier).round();
    let listed: Vec<String> = singles
        .iter()
        .map(|single| format!("{} → {}", single.target, single.requirement_id))
        .collect();
    Issue {
        kind: IssueKind::SingleRequirementTargets,
        severity: if ratio > penalty.severity_threshold {
            Severity::High
        } else {
            Severity::Medium
        },
        penalty: capped_penalty(raw, penalty.cap),
        message: format!(
            "{} of {linked_targets} operational targets link exactly one requirement ({:.0}% > {:.0}% allowed): {}",
            singles.len(),
            ratio * 100.0,
            ceiling * 100.0,
            listed.join(", ")
        ),
        recommendation: "Group related requirements under shared operational targets, or split \
                         coarse requirements into the behaviors the target actually covers."
            .to_string(),
        rationale: "A target backed by a single requirement mirrors the requirement list instead \
                    of describing a business outcome, which inflates target completion."
            .to_string(),
        background: format!(
            "The allowed share is the smaller of {:.0}% and {} targets' worth of the total.",
            penalty.max_ratio * 100.0,
            penalty.per_target_budget
        ),
    }
}
