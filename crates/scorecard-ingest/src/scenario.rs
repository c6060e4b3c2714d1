//! Scenario assembly: every loader run once, plus operational-target
//! derivation when the sync snapshot carries no targets.

use scorecard_kernel::fsutil::display_path;
use scorecard_kernel::{
    Criticality, LoadWarning, OperationalTarget, Requirement, RequirementStatus, ScoringConfig,
    SyncSnapshot, TargetCounts, TargetKind, TestResultsSummary, flatten_requirements,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{
    ServiceInfo, TestResultsSource, load_requirements, load_service, load_sync, load_test_results,
};

/// Everything read from one scenario directory, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioData {
    pub root: PathBuf,
    pub service: ServiceInfo,
    pub requirements: Vec<Requirement>,
    pub sync: SyncSnapshot,
    /// Sync-provided targets, or targets derived from `prd_ref`s.
    pub targets: Vec<OperationalTarget>,
    pub targets_derived: bool,
    pub test_results: TestResultsSummary,
    pub test_results_source: TestResultsSource,
    pub warnings: Vec<LoadWarning>,
}

impl ScenarioData {
    /// Service name, else the directory name.
    pub fn name(&self) -> String {
        self.service.name.clone().unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| display_path(&self.root))
        })
    }
}

pub fn load_scenario(scenario_root: &Path, config: &ScoringConfig) -> ScenarioData {
    let mut warnings = Vec::new();
    let service = load_service(scenario_root, &config.default_category, &mut warnings);
    let requirements = load_requirements(scenario_root, &mut warnings);
    let sync = load_sync(scenario_root, &mut warnings);
    let (test_results, test_results_source) = load_test_results(scenario_root, &mut warnings);

    let (targets, targets_derived) = if sync.operational_targets.is_empty() {
        (derive_targets(&requirements, &sync), true)
    } else {
        (sync.operational_targets.clone(), false)
    };

    warnings.sort();
    warnings.dedup();
    tracing::debug!(
        scenario = %display_path(scenario_root),
        requirements = requirements.len(),
        targets = targets.len(),
        targets_derived,
        warnings = warnings.len(),
        "loaded scenario"
    );

    ScenarioData {
        root: scenario_root.to_path_buf(),
        service,
        requirements,
        sync,
        targets,
        targets_derived,
        test_results,
        test_results_source,
        warnings,
    }
}

/// One `prd_ref` target per distinct `OT-Px-NNN` id cited by requirements.
pub fn derive_targets(requirements: &[Requirement], sync: &SyncSnapshot) -> Vec<OperationalTarget> {
    let mut linked: BTreeMap<String, Vec<&Requirement>> = BTreeMap::new();
    for requirement in flatten_requirements(requirements) {
        if let Some(target) = requirement.target_ref() {
            linked.entry(target).or_default().push(requirement);
        }
    }

    linked
        .into_iter()
        .map(|(id, members)| {
            let passing = members
                .iter()
                .filter(|requirement| sync.is_passing(requirement))
                .count();
            let mut ids: Vec<String> = members.iter().map(|r| r.id.clone()).collect();
            ids.sort();
            ids.dedup();
            let status = if passing == members.len() {
                RequirementStatus::Complete
            } else if passing > 0 {
                RequirementStatus::InProgress
            } else {
                RequirementStatus::Pending
            };
            OperationalTarget {
                criticality: Some(Criticality::from_prd_ref(Some(id.as_str()))),
                id,
                kind: TargetKind::PrdRef,
                status: Some(status),
                counts: Some(TargetCounts {
                    complete: passing,
                    total: members.len(),
                }),
                linked_requirement_ids: ids,
            }
        })
        .collect()
}
