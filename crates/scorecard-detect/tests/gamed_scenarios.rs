//! Integration tests: run the full validation-quality check over scenario
//! trees written to disk, one genuine and one gamed.

use scorecard_detect::detect_validation_issues;
use scorecard_kernel::{
    IssueKind, Requirement, RequirementStatus, ScoringConfig, Severity, SyncSnapshot,
    ValidationEntry, ValidationLayer, ValidationType,
};
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
            "scorecard-gaming-{prefix}-{}-{nonce}",
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

fn go_test(name: &str) -> String {
    let mut text = String::from("package api\n\nimport \"testing\"\n\n");
    for case in ["Create", "Update", "Delete"] {
        text.push_str(&format!(
            "func Test{name}{case}(t *testing.T) {{\n\tgot := run{case}()\n\tif got == nil {{\n\t\tt.Fatal(\"missing result\")\n\t}}\n\tassert.NotNil(t, got)\n\tassert.Equal(t, \"{case}\", got.Name)\n}}\n\n"
        ));
    }
    text
}

fn playbook(name: &str) -> String {
    format!(
        r#"{{"name": "{name}", "steps": [{{"action": "navigate", "url": "/{name}"}}, {{"action": "click", "selector": "[data-testid={name}-submit]"}}, {{"action": "assert", "text": "saved"}}]}}"#
    )
}

fn entry(kind: ValidationType, reference: &str) -> ValidationEntry {
    ValidationEntry {
        kind,
        reference: Some(reference.to_string()),
        workflow_id: None,
    }
}

fn requirement(id: &str, prd_ref: &str, validation: Vec<ValidationEntry>) -> Requirement {
    let mut requirement = Requirement::new(id, RequirementStatus::Complete);
    requirement.prd_ref = Some(prd_ref.to_string());
    requirement.validation = validation;
    requirement
}

fn config() -> ScoringConfig {
    ScoringConfig::bundled().expect("bundled config should load")
}

#[test]
fn genuine_multi_layer_scenario_is_clean() {
    let tmp = TempDirGuard::new("genuine");
    tmp.write("api/main.go", "package main\n");

    let mut requirements = Vec::new();
    for (index, feature) in ["invoices", "payments", "refunds"].into_iter().enumerate() {
        let target = format!("OT-P0-00{}", index + 1);
        let api = format!("api/{feature}/{feature}_test.go");
        let e2e = format!("test/playbooks/{feature}.json");
        tmp.write(&api, &go_test(feature));
        tmp.write(&e2e, &playbook(feature));
        let extra = format!("api/{feature}/{feature}_extra_test.go");
        tmp.write(&extra, &go_test(&format!("{feature}Extra")));
        for suffix in ["a", "b"] {
            requirements.push(requirement(
                &format!("REQ-{feature}-{suffix}"),
                &target,
                vec![
                    entry(ValidationType::Test, &api),
                    entry(ValidationType::Test, &extra),
                    entry(ValidationType::Automation, &e2e),
                ],
            ));
        }
    }

    let report = detect_validation_issues(
        tmp.path(),
        &requirements,
        &SyncSnapshot::default(),
        &config().penalties,
    );
    assert!(report.issues.is_empty(), "issues: {:#?}", report.issues);
    assert_eq!(report.total_penalty, 0);
    assert_eq!(report.summary.reference_ratio, 3.0);
    for coverage in &report.layers.coverage {
        assert!(coverage.satisfied, "{} unsatisfied", coverage.requirement_id);
        assert!(coverage.layers.contains(&ValidationLayer::Api));
        assert!(coverage.layers.contains(&ValidationLayer::E2e));
    }
}

#[test]
fn gamed_scenario_is_flagged_on_every_axis() {
    let tmp = TempDirGuard::new("gamed");
    tmp.write("api/main.go", "package main\n");
    tmp.write("api/all_test.go", "package api\n\n// placeholder\n");
    tmp.write("test/unit/everything.test.js", "test('x', () => {})\n");

    let mut requirements: Vec<Requirement> = (1..=8)
        .map(|index| {
            requirement(
                &format!("REQ-{index}"),
                &format!("OT-P0-00{index}"),
                vec![entry(ValidationType::Test, "api/all_test.go")],
            )
        })
        .collect();
    requirements.push(requirement(
        "REQ-9",
        "OT-P1-009",
        vec![entry(ValidationType::Test, "test/unit/everything.test.js")],
    ));
    requirements.push(requirement(
        "REQ-10",
        "OT-P1-010",
        vec![
            entry(ValidationType::Manual, "docs/manual.md"),
            entry(ValidationType::Manual, "docs/manual-followup.md"),
        ],
    ));

    let report = detect_validation_issues(
        tmp.path(),
        &requirements,
        &SyncSnapshot::default(),
        &config().penalties,
    );
    let kinds: Vec<IssueKind> = report.issues.iter().map(|issue| issue.kind).collect();
    for expected in [
        IssueKind::MonolithicTestFiles,
        IssueKind::SingleRequirementTargets,
        IssueKind::InsufficientLayerDiversity,
        IssueKind::InvalidTestLocation,
        IssueKind::ExcessiveManualValidation,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
    assert_eq!(report.overall_severity, Some(Severity::High));
    assert_eq!(report.issues[0].severity, Severity::High);
    assert_eq!(
        report.duplicates.worst_offender.as_ref().map(|w| w.reference.as_str()),
        Some("api/all_test.go")
    );
    assert!(report.layers.coverage.iter().all(|coverage| !coverage.satisfied));
}
