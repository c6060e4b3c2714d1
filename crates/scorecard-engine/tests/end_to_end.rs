//! Integration tests: score scenarios from metrics and from on-disk trees.

use chrono::{DateTime, Utc};
use scorecard_engine::{
    Classification, CompletionCount, ScenarioMetrics, UiMetrics, classify, score_completeness,
    score_scenario, score_scenario_with_ui,
};
use scorecard_kernel::{CategoryThresholds, ScoringConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "scorecard-engine-{prefix}-{}-{nonce}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp test directory should be creatable");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent directories should be creatable");
        }
        fs::write(path, content).expect("fixture should be writable");
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn config() -> ScoringConfig {
    ScoringConfig::bundled().expect("bundled config should load")
}

fn utility(config: &ScoringConfig) -> CategoryThresholds {
    *config.thresholds_for("utility").0
}

fn go_test(name: &str) -> String {
    let mut text = String::from("package api\n\nimport \"testing\"\n\n");
    for case in ["Create", "Update", "Delete"] {
        text.push_str(&format!(
            "func Test{name}{case}(t *testing.T) {{\n\tgot := run{case}()\n\tif got == nil {{\n\t\tt.Fatal(\"missing result\")\n\t}}\n\tassert.NotNil(t, got)\n\tassert.Equal(t, \"{case}\", got.Name)\n}}\n\n"
        ));
    }
    text
}

/// A small two-requirement scenario with a consolidated sync snapshot and
/// one phase result file.
fn write_scenario(tmp: &TempDirGuard) {
    tmp.write(
        ".vrooli/service.json",
        r#"{"service": {"name": "ledger", "version": "1.0.0"}, "category": "utility"}"#,
    );
    tmp.write("api/main.go", "package main\n");
    tmp.write("api/ledger/ledger_test.go", &go_test("Ledger"));
    tmp.write("api/ledger/export_test.go", &go_test("Export"));
    tmp.write(
        "requirements/index.json",
        r#"{
  "requirements": [
    {
      "id": "REQ-LEDGER-1",
      "status": "complete",
      "prd_ref": "OT-P1-001",
      "validation": [
        {"type": "test", "ref": "api/ledger/ledger_test.go"},
        {"type": "test", "ref": "api/ledger/export_test.go"}
      ]
    },
    {
      "id": "REQ-LEDGER-2",
      "status": "in_progress",
      "prd_ref": "OT-P1-002",
      "validation": [
        {"type": "test", "ref": "api/ledger/export_test.go"}
      ]
    }
  ]
}"#,
    );
    tmp.write(
        "coverage/phase-results/unit.json",
        r#"{
  "phase": "unit",
  "updated_at": "2026-03-01T08:00:00Z",
  "requirements": [
    {"id": "REQ-LEDGER-1", "status": "passed"},
    {"id": "REQ-LEDGER-2", "status": "failed"}
  ]
}"#,
    );
}

fn playbook(name: &str) -> String {
    format!(
        r#"{{"name": "{name}", "steps": [{{"action": "navigate", "url": "/{name}"}}, {{"action": "click", "selector": "[data-testid={name}-submit]"}}, {{"action": "assert", "text": "saved"}}]}}"#
    )
}

/// One requirement node validated by its own API test and E2E playbook.
fn validated_requirement(tmp: &TempDirGuard, id: &str, target: &str, children: &str) -> String {
    let slug = id.to_ascii_lowercase();
    let api = format!("api/{slug}/{slug}_test.go");
    let e2e = format!("test/playbooks/{slug}.json");
    tmp.write(&api, &go_test(&slug.replace('-', "")));
    tmp.write(&e2e, &playbook(&slug));
    format!(
        r#"{{"id": "{id}", "status": "complete", "prd_ref": "{target}", "validation": [{{"type": "test", "ref": "{api}"}}, {{"type": "automation", "ref": "{e2e}"}}], "children": [{children}]}}"#
    )
}

/// Root → two children → one grandchild each: five requirements, depth 3.
fn validated_tree(tmp: &TempDirGuard, root: &str, target: &str) -> String {
    let mut branches = Vec::new();
    for branch in ["A", "B"] {
        let leaf = validated_requirement(tmp, &format!("{root}-{branch}1"), target, "");
        branches.push(validated_requirement(
            tmp,
            &format!("{root}-{branch}"),
            target,
            &leaf,
        ));
    }
    validated_requirement(tmp, root, target, &branches.join(", "))
}

/// Ten complete requirements with two automated layers each, ten complete
/// targets, and ten passing tests.
fn write_complete_scenario(tmp: &TempDirGuard) {
    tmp.write(
        ".vrooli/service.json",
        r#"{"service": {"name": "atlas"}, "category": "utility"}"#,
    );
    tmp.write("api/main.go", "package main\n");
    let trees = [
        validated_tree(tmp, "REQ-ONE", "OT-P0-001"),
        validated_tree(tmp, "REQ-TWO", "OT-P0-002"),
    ];
    tmp.write(
        "requirements/index.json",
        &format!(r#"{{"requirements": [{}]}}"#, trees.join(", ")),
    );
    let targets: Vec<String> = (1..=10)
        .map(|index| format!(r#"{{"id": "OT-P0-{index:03}", "status": "complete"}}"#))
        .collect();
    tmp.write(
        "coverage/requirements-sync/latest.json",
        &format!(
            r#"{{"requirements": {{}}, "operational_targets": [{}]}}"#,
            targets.join(", ")
        ),
    );
    tmp.write(
        "coverage/test-results.json",
        r#"{"total": 10, "passed": 10, "failed": 0, "timestamp": "2026-03-01T08:00:00Z"}"#,
    );
}

fn at(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .expect("fixture timestamp should parse")
        .with_timezone(&Utc)
}

#[test]
fn fully_complete_metrics_score_one_hundred() {
    let config = config();
    let metrics = ScenarioMetrics {
        category: "utility".to_string(),
        requirements: CompletionCount::new(10, 10),
        targets: CompletionCount::new(10, 10),
        tests: CompletionCount::new(10, 10),
        reference_ratio: 2.0,
        average_depth: 3.0,
        ui: Some(UiMetrics {
            is_template: false,
            file_count: 30,
            component_count: 10,
            page_count: 3,
            total_loc: 1500,
            has_routing: true,
            route_count: 5,
            api_endpoints: 9,
            api_beyond_health: 8,
        }),
    };
    let breakdown = score_completeness(&metrics, &utility(&config), 0);
    assert_eq!(breakdown.score, 100);
    assert_eq!(breakdown.classification, Classification::ProductionReady);
    assert!(!breakdown.ui.template_check.is_template);
}

#[test]
fn empty_metrics_score_zero_as_template() {
    let config = config();
    let metrics = ScenarioMetrics::default();
    let breakdown = score_completeness(&metrics, &utility(&config), 0);
    assert_eq!(breakdown.base_score, 0);
    assert_eq!(breakdown.score, 0);
    assert_eq!(breakdown.classification, Classification::EarlyStage);
    assert!(breakdown.ui.template_check.is_template);
}

#[test]
fn score_never_exceeds_base_and_classification_follows_score() {
    let config = config();
    let thresholds = utility(&config);
    for penalty in [0, 5, 17, 40, 99, 250] {
        for passing in 0..=6 {
            let metrics = ScenarioMetrics {
                category: "utility".to_string(),
                requirements: CompletionCount::new(6, passing),
                targets: CompletionCount::new(3, passing.min(3)),
                tests: CompletionCount::new(6, passing),
                reference_ratio: passing as f64 / 3.0,
                average_depth: 1.5,
                ui: None,
            };
            let breakdown = score_completeness(&metrics, &thresholds, penalty);
            assert!(breakdown.base_score <= 100);
            assert!(breakdown.score <= breakdown.base_score);
            assert_eq!(breakdown.score, breakdown.base_score.saturating_sub(penalty));
            assert_eq!(breakdown.classification, classify(breakdown.score));
        }
    }
}

#[test]
fn on_disk_scenario_is_scored_end_to_end() {
    let tmp = TempDirGuard::new("ledger");
    write_scenario(&tmp);
    let config = config();

    let report = score_scenario(tmp.path(), &config);
    assert_eq!(report.scenario, "ledger");
    assert_eq!(report.category, "utility");
    assert!(!report.category_fallback);
    assert_eq!(report.metrics.requirements, CompletionCount::new(2, 1));
    assert_eq!(report.metrics.targets, CompletionCount::new(2, 1));
    assert_eq!(report.metrics.tests, CompletionCount::new(2, 1));
    assert_eq!(report.metrics.reference_ratio, 1.5);
    assert_eq!(report.metrics.ui, None);
    assert!(report.breakdown.ui.template_check.is_template);
    assert_eq!(report.layer_coverage.len(), 2);
    assert!(report.validation.layers.coverage.is_empty());
    assert_eq!(report.breakdown.validation_penalty, report.validation.total_penalty);
    assert_eq!(
        report.breakdown.score,
        report
            .breakdown
            .base_score
            .saturating_sub(report.validation.total_penalty)
    );
    assert!(!report.breakdown.recommendations.is_empty());

    let staleness = report.staleness(at("2026-03-02T08:00:00Z"), config.staleness_hours);
    assert!(!staleness.is_stale);
    let staleness = report.staleness(at("2026-03-05T08:00:00Z"), config.staleness_hours);
    assert!(staleness.is_stale);
}

#[test]
fn scoring_is_idempotent_over_unchanged_inputs() {
    let tmp = TempDirGuard::new("idempotent");
    write_scenario(&tmp);
    let config = config();

    let first = score_scenario(tmp.path(), &config);
    let second = score_scenario(tmp.path(), &config);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("report should serialize"),
        serde_json::to_string(&second).expect("report should serialize")
    );
    let digest = first.digest().expect("digest should compute");
    assert!(digest.starts_with("scr1_"));
    assert_eq!(digest, second.digest().expect("digest should compute"));

    tmp.write("api/ledger/new_test.go", &go_test("New"));
    tmp.write(
        "coverage/phase-results/integration.json",
        r#"{"phase": "integration", "requirements": [{"id": "REQ-LEDGER-2", "status": "passed"}]}"#,
    );
    let changed = score_scenario(tmp.path(), &config);
    assert_ne!(digest, changed.digest().expect("digest should compute"));
}

#[test]
fn supplied_ui_metrics_replace_the_walk() {
    let tmp = TempDirGuard::new("supplied-ui");
    write_scenario(&tmp);
    let config = config();

    let ui = UiMetrics {
        is_template: false,
        file_count: 30,
        total_loc: 1500,
        route_count: 5,
        api_endpoints: 9,
        api_beyond_health: 8,
        ..UiMetrics::default()
    };
    let with_ui = score_scenario_with_ui(tmp.path(), &config, Some(ui));
    let without = score_scenario(tmp.path(), &config);
    assert_eq!(with_ui.breakdown.ui.score, 25.0);
    assert_eq!(without.breakdown.ui.score, 0.0);
    assert!(with_ui.breakdown.base_score > without.breakdown.base_score);
}

#[test]
fn complete_on_disk_scenario_scores_one_hundred() {
    let tmp = TempDirGuard::new("complete");
    write_complete_scenario(&tmp);
    let config = config();

    let ui = UiMetrics {
        is_template: false,
        file_count: 30,
        total_loc: 1500,
        route_count: 5,
        api_endpoints: 9,
        api_beyond_health: 8,
        ..UiMetrics::default()
    };
    let report = score_scenario_with_ui(tmp.path(), &config, Some(ui));
    assert!(report.validation.issues.is_empty(), "issues: {:#?}", report.validation.issues);
    assert_eq!(report.metrics.requirements, CompletionCount::new(10, 10));
    assert_eq!(report.metrics.targets, CompletionCount::new(10, 10));
    assert_eq!(report.metrics.tests, CompletionCount::new(10, 10));
    assert_eq!(report.metrics.reference_ratio, 2.0);
    assert_eq!(report.metrics.average_depth, 3.0);
    assert!(report.layer_coverage.iter().all(|coverage| coverage.satisfied));
    assert_eq!(report.breakdown.base_score, 100);
    assert_eq!(report.breakdown.score, 100);
    assert_eq!(report.breakdown.classification, Classification::ProductionReady);
    assert!(report.breakdown.recommendations.is_empty());
}
