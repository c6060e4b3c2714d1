//! Canonical data model shared by loaders, detectors, and the scoring engine.
//!
//! Every type here is the normalized shape. Loaders own the on-disk schema
//! generations and adapt them into these types before anything else runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::patterns;

// ── Requirements ──

/// Normalized requirement (or sync) status.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequirementStatus {
    #[default]
    Pending,
    InProgress,
    Implemented,
    Complete,
    Validated,
    Failed,
    Other(String),
}

impl RequirementStatus {
    pub fn parse(raw: &str) -> Self {
        let folded = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match folded.as_str() {
            "" | "pending" | "planned" | "not_started" | "todo" => Self::Pending,
            "in_progress" => Self::InProgress,
            "implemented" => Self::Implemented,
            "complete" | "completed" | "done" => Self::Complete,
            "validated" => Self::Validated,
            "failed" | "failing" => Self::Failed,
            _ => Self::Other(folded),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Implemented => "implemented",
            Self::Complete => "complete",
            Self::Validated => "validated",
            Self::Failed => "failed",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Complete or validated.
    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Complete | Self::Validated)
    }

    /// Claimed as delivered: implemented, complete, or validated.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Implemented | Self::Complete | Self::Validated)
    }
}

impl From<String> for RequirementStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<RequirementStatus> for String {
    fn from(value: RequirementStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a validation entry claims to check a requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationType {
    Test,
    Automation,
    Manual,
    Other(String),
}

impl ValidationType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "test" | "tests" | "unit" | "integration" => Self::Test,
            "automation" | "playbook" | "e2e" => Self::Automation,
            "manual" => Self::Manual,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Test => "test",
            Self::Automation => "automation",
            Self::Manual => "manual",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl From<String> for ValidationType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ValidationType> for String {
    fn from(value: ValidationType) -> Self {
        value.as_str().to_string()
    }
}

/// One claim that some artifact validates a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEntry {
    #[serde(rename = "type")]
    pub kind: ValidationType,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

impl ValidationEntry {
    /// The normalized reference path, if any.
    pub fn normalized_ref(&self) -> Option<String> {
        self.reference
            .as_deref()
            .map(normalize_ref)
            .filter(|value| !value.is_empty())
    }

    /// Key used to group entries citing the same artifact.
    pub fn citation_key(&self) -> Option<String> {
        if let Some(reference) = self.normalized_ref() {
            return Some(reference);
        }
        self.workflow_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| format!("workflow:{id}"))
    }
}

/// Normalize a validation reference: forward slashes, no leading `./`.
pub fn normalize_ref(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(stripped) = value.strip_prefix("./") {
        value = stripped.to_string();
    }
    value
}

/// A trackable unit of functionality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    #[serde(default)]
    pub status: RequirementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Requirement>,
}

impl Requirement {
    pub fn new(id: impl Into<String>, status: RequirementStatus) -> Self {
        Self {
            id: id.into(),
            status,
            prd_ref: None,
            validation: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 1 for a leaf, else 1 + the deepest child.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Requirement::depth)
            .max()
            .unwrap_or(0)
    }

    pub fn criticality(&self) -> Criticality {
        Criticality::from_prd_ref(self.prd_ref.as_deref())
    }

    /// The uppercased operational-target id referenced by `prd_ref`.
    pub fn target_ref(&self) -> Option<String> {
        self.prd_ref.as_deref().and_then(patterns::extract_target_ref)
    }

    /// This requirement followed by all descendants, pre-order.
    pub fn flatten(&self) -> Vec<&Requirement> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }

    pub fn manual_entries(&self) -> usize {
        self.validation
            .iter()
            .filter(|entry| entry.kind.is_manual())
            .count()
    }

    pub fn automated_entries(&self) -> usize {
        self.validation.len() - self.manual_entries()
    }
}

/// Flatten a forest of requirements, pre-order.
pub fn flatten_requirements(roots: &[Requirement]) -> Vec<&Requirement> {
    roots.iter().flat_map(Requirement::flatten).collect()
}

/// Priority tier derived from an operational-target reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Criticality {
    P0,
    P1,
    #[default]
    P2,
}

impl Criticality {
    pub fn from_prd_ref(prd_ref: Option<&str>) -> Self {
        let Some(target) = prd_ref.and_then(patterns::extract_target_ref) else {
            return Self::P2;
        };
        match target.get(3..5) {
            Some("P0") => Self::P0,
            Some("P1") => Self::P1,
            _ => Self::P2,
        }
    }

    /// Minimum number of distinct automated layers this tier requires.
    pub fn required_layers(self) -> usize {
        match self {
            Self::P0 | Self::P1 => 2,
            Self::P2 => 1,
        }
    }
}

// ── Operational targets & sync ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Folder,
    PrdRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetCounts {
    pub complete: usize,
    pub total: usize,
}

/// A business-level grouping of related requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalTarget {
    pub id: String,
    pub kind: TargetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequirementStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<TargetCounts>,
    #[serde(default)]
    pub linked_requirement_ids: Vec<String>,
}

impl OperationalTarget {
    pub fn is_complete(&self) -> bool {
        if self.status.as_ref().is_some_and(RequirementStatus::is_passing) {
            return true;
        }
        self.counts
            .is_some_and(|counts| counts.total > 0 && counts.complete == counts.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncMetadata {
    #[serde(default)]
    pub all_tests_passing: bool,
}

/// Per-requirement synchronization state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequirementStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_metadata: Option<SyncMetadata>,
}

/// Merged synchronization snapshot, keyed by requirement id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub records: BTreeMap<String, SyncRecord>,
    pub operational_targets: Vec<OperationalTarget>,
}

impl SyncSnapshot {
    /// Status after applying the sync overlay to a requirement.
    pub fn effective_status(&self, requirement: &Requirement) -> RequirementStatus {
        self.records
            .get(&requirement.id)
            .and_then(|record| record.status.clone())
            .unwrap_or_else(|| requirement.status.clone())
    }

    /// Passing status, vetoed by an explicit `all_tests_passing: false`.
    pub fn is_passing(&self, requirement: &Requirement) -> bool {
        let vetoed = self
            .records
            .get(&requirement.id)
            .and_then(|record| record.sync_metadata)
            .is_some_and(|meta| !meta.all_tests_passing);
        !vetoed && self.effective_status(requirement).is_passing()
    }
}

// ── Test results ──

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestResultsSummary {
    pub total: usize,
    pub passing: usize,
    pub failing: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_timestamp: Option<DateTime<Utc>>,
}

// ── Components & layers ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Api,
    Ui,
}

/// Structural components present in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioComponents(pub BTreeSet<Component>);

impl ScenarioComponents {
    pub fn has(&self, component: Component) -> bool {
        self.0.contains(&component)
    }

    /// E2E always applies; API and UI only when the component exists.
    pub fn applicable_layers(&self) -> BTreeSet<ValidationLayer> {
        let mut layers = BTreeSet::from([ValidationLayer::E2e]);
        if self.has(Component::Api) {
            layers.insert(ValidationLayer::Api);
        }
        if self.has(Component::Ui) {
            layers.insert(ValidationLayer::Ui);
        }
        layers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLayer {
    Api,
    Ui,
    E2e,
    Manual,
}

impl ValidationLayer {
    pub fn is_automated(self) -> bool {
        !matches!(self, Self::Manual)
    }
}

// ── Issues ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    SuspiciousTestRatio,
    ExcessiveManualValidation,
    InvalidTestLocation,
    MonolithicTestFiles,
    SingleRequirementTargets,
    InsufficientLayerDiversity,
}

/// One flagged anti-pattern with ready-to-render explanation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub penalty: u32,
    pub message: String,
    pub recommendation: String,
    pub rationale: String,
    pub background: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(depth: usize) -> Requirement {
        let mut node = Requirement::new(format!("REQ-{depth}"), RequirementStatus::Complete);
        for level in (1..depth).rev() {
            let mut parent = Requirement::new(format!("REQ-{level}"), RequirementStatus::Complete);
            parent.children.push(node);
            node = parent;
        }
        node
    }

    #[test]
    fn leaf_depth_is_one() {
        assert_eq!(chain(1).depth(), 1);
    }

    #[test]
    fn chain_depth_matches_length() {
        for n in 2..6 {
            assert_eq!(chain(n).depth(), n);
        }
    }

    #[test]
    fn flatten_is_pre_order() {
        let root = chain(3);
        let ids: Vec<&str> = root.flatten().iter().map(|req| req.id.as_str()).collect();
        assert_eq!(ids, vec!["REQ-1", "REQ-2", "REQ-3"]);
    }

    #[test]
    fn criticality_is_derived_from_prd_ref() {
        assert_eq!(Criticality::from_prd_ref(Some("OT-P0-001")), Criticality::P0);
        assert_eq!(
            Criticality::from_prd_ref(Some("see ot-p1-042 in PRD")),
            Criticality::P1
        );
        assert_eq!(Criticality::from_prd_ref(Some("OT-P2-003")), Criticality::P2);
        assert_eq!(Criticality::from_prd_ref(Some("OT-P3-003")), Criticality::P2);
        assert_eq!(Criticality::from_prd_ref(None), Criticality::P2);
        assert_eq!(Criticality::P0.required_layers(), 2);
        assert_eq!(Criticality::P1.required_layers(), 2);
        assert_eq!(Criticality::P2.required_layers(), 1);
    }

    #[test]
    fn status_parsing_folds_variants() {
        assert_eq!(RequirementStatus::parse("In-Progress"), RequirementStatus::InProgress);
        assert_eq!(RequirementStatus::parse(" COMPLETE "), RequirementStatus::Complete);
        assert!(RequirementStatus::parse("validated").is_passing());
        assert!(RequirementStatus::parse("implemented").is_done());
        assert!(!RequirementStatus::parse("implemented").is_passing());
        assert_eq!(
            RequirementStatus::parse("blocked"),
            RequirementStatus::Other("blocked".to_string())
        );
    }

    #[test]
    fn citation_key_prefers_ref_then_workflow() {
        let entry = ValidationEntry {
            kind: ValidationType::Automation,
            reference: Some(".\\test\\playbooks\\login.json".to_string()),
            workflow_id: Some("wf-1".to_string()),
        };
        assert_eq!(entry.citation_key().as_deref(), Some("test/playbooks/login.json"));

        let workflow_only = ValidationEntry {
            kind: ValidationType::Automation,
            reference: None,
            workflow_id: Some("wf-1".to_string()),
        };
        assert_eq!(workflow_only.citation_key().as_deref(), Some("workflow:wf-1"));
    }

    #[test]
    fn sync_veto_overrides_complete_status() {
        let requirement = Requirement::new("REQ-1", RequirementStatus::Complete);
        let mut snapshot = SyncSnapshot::default();
        assert!(snapshot.is_passing(&requirement));

        snapshot.records.insert(
            "REQ-1".to_string(),
            SyncRecord {
                status: None,
                sync_metadata: Some(SyncMetadata {
                    all_tests_passing: false,
                }),
            },
        );
        assert!(!snapshot.is_passing(&requirement));
    }

    #[test]
    fn applicable_layers_follow_components() {
        let none = ScenarioComponents::default();
        assert_eq!(none.applicable_layers(), BTreeSet::from([ValidationLayer::E2e]));

        let both = ScenarioComponents(BTreeSet::from([Component::Api, Component::Ui]));
        assert_eq!(
            both.applicable_layers(),
            BTreeSet::from([ValidationLayer::Api, ValidationLayer::Ui, ValidationLayer::E2e])
        );
    }
}
