//! Integration tests: load checked-in fixture scenarios end to end.
//!
//! Each fixture under tests/fixtures/ is a scenario directory mixing both
//! schema generations the loaders accept.

use scorecard_ingest::{TestResultsSource, load_scenario};
use scorecard_kernel::{
    RequirementStatus, ScoringConfig, TargetCounts, ValidationType, flatten_requirements,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn config() -> ScoringConfig {
    ScoringConfig::bundled().expect("bundled config should load")
}

#[test]
fn mixed_generations_normalize_into_one_scenario() {
    let data = load_scenario(&fixture("mixed-generations"), &config());

    assert_eq!(data.name(), "invoice-hub");
    assert_eq!(data.service.version.as_deref(), Some("2.1.0"));
    assert_eq!(data.service.category, "business-application");
    assert!(!data.service.category_defaulted);

    let ids: Vec<&str> = flatten_requirements(&data.requirements)
        .into_iter()
        .map(|requirement| requirement.id.as_str())
        .collect();
    assert_eq!(ids, vec!["REQ-CORE-1", "REQ-BILL-1", "REQ-BILL-1a", "REQ-REP-1"]);

    let core = &data.requirements[0];
    assert_eq!(core.status, RequirementStatus::Complete);
    assert_eq!(
        core.validation[0].normalized_ref().as_deref(),
        Some("api/handlers/invoice_test.go")
    );
    let billing = &data.requirements[1];
    assert_eq!(billing.depth(), 2);
    assert_eq!(
        billing.validation[0].normalized_ref().as_deref(),
        Some("test/playbooks/billing.json")
    );
    assert_eq!(billing.children[0].validation[0].kind, ValidationType::Manual);

    assert_eq!(data.warnings.len(), 1, "warnings: {:?}", data.warnings);
    assert!(data.warnings[0].message.contains("REQ-CORE-1"));
}

#[test]
fn legacy_sync_overlay_and_derived_targets() {
    let data = load_scenario(&fixture("mixed-generations"), &config());

    assert_eq!(
        data.sync.records["REQ-BILL-1"].status,
        Some(RequirementStatus::Complete)
    );
    assert!(data.targets_derived);

    let summary: Vec<(&str, Option<TargetCounts>)> = data
        .targets
        .iter()
        .map(|target| (target.id.as_str(), target.counts))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("OT-P0-001", Some(TargetCounts { complete: 1, total: 1 })),
            ("OT-P1-002", Some(TargetCounts { complete: 1, total: 2 })),
            ("OT-P2-003", Some(TargetCounts { complete: 0, total: 1 })),
        ]
    );
    let complete: Vec<bool> = data.targets.iter().map(|t| t.is_complete()).collect();
    assert_eq!(complete, vec![true, false, false]);
}

#[test]
fn phase_results_drive_the_test_summary() {
    let data = load_scenario(&fixture("mixed-generations"), &config());

    assert_eq!(data.test_results.total, 3);
    assert_eq!(data.test_results.passing, 2);
    assert_eq!(data.test_results.failing, 1);
    assert_eq!(
        data.test_results
            .last_run_timestamp
            .map(|stamp| stamp.to_rfc3339()),
        Some("2026-02-03T12:00:00+00:00".to_string())
    );
    assert_eq!(
        data.test_results_source,
        TestResultsSource::Phases(vec!["coverage/phase-results/unit.json".to_string()])
    );
}

#[test]
fn loading_twice_is_identical() {
    let first = load_scenario(&fixture("mixed-generations"), &config());
    let second = load_scenario(&fixture("mixed-generations"), &config());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("scenario should serialize"),
        serde_json::to_string(&second).expect("scenario should serialize")
    );
}

#[test]
fn empty_directory_loads_defaults() {
    let root = std::env::temp_dir().join(format!(
        "scorecard-ingest-empty-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&root).expect("temp dir should be creatable");

    let data = load_scenario(&root, &config());
    assert!(data.requirements.is_empty());
    assert!(data.targets.is_empty());
    assert_eq!(data.service.category, "utility");
    assert!(data.service.category_defaulted);
    assert_eq!(data.test_results_source, TestResultsSource::None);
    assert_eq!(data.warnings.len(), 1);

    let _ = std::fs::remove_dir_all(&root);
}
