//! Test-quality analysis: is a referenced test file a real test?
//!
//! Code files are scored on non-comment size, test markers, and assertion
//! density. Playbooks are parsed and must carry at least one actionable step.

use scorecard_kernel::fsutil;
use scorecard_kernel::patterns::{assertion_patterns, test_marker_patterns};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MIN_TEST_LOC: usize = 20;
pub const MIN_ASSERTION_DENSITY: f64 = 0.1;
pub const MANY_TEST_MARKERS: usize = 3;
pub const MEANINGFUL_CODE_SCORE: u8 = 4;
pub const MIN_PLAYBOOK_BYTES: usize = 100;

const PLAYBOOK_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeTestQuality {
    pub loc: usize,
    pub test_markers: usize,
    pub assertions: usize,
    pub assertion_density: f64,
    pub score: u8,
}

impl CodeTestQuality {
    pub fn is_meaningful(&self) -> bool {
        self.score >= MEANINGFUL_CODE_SCORE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookQuality {
    pub steps: usize,
    pub actionable_steps: usize,
    pub bytes: usize,
}

impl PlaybookQuality {
    pub fn is_meaningful(&self) -> bool {
        self.steps > 0 && self.actionable_steps > 0 && self.bytes >= MIN_PLAYBOOK_BYTES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestFileQuality {
    Code(CodeTestQuality),
    Playbook(PlaybookQuality),
    /// Missing, unreadable, or an unparsable playbook.
    Unusable,
}

impl TestFileQuality {
    pub fn is_meaningful(&self) -> bool {
        match self {
            Self::Code(code) => code.is_meaningful(),
            Self::Playbook(playbook) => playbook.is_meaningful(),
            Self::Unusable => false,
        }
    }
}

/// Lines that carry only a comment in one of the common test languages.
/// `#[` stays: it opens a Rust attribute such as `#[test]`.
fn is_comment_only(trimmed: &str) -> bool {
    if let Some(rest) = trimmed.strip_prefix('#') {
        return !rest.starts_with('[');
    }
    ["//", "/*", "*/", "*", "--", "<!--"]
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}

fn significant_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment_only(line))
        .collect()
}

pub fn analyze_code(text: &str) -> CodeTestQuality {
    let lines = significant_lines(text);
    let body = lines.join("\n");
    let loc = lines.len();
    let test_markers = test_marker_patterns().count_matches(&body);
    let assertions = assertion_patterns().count_matches(&body);
    let assertion_density = if loc == 0 {
        0.0
    } else {
        assertions as f64 / loc as f64
    };

    let score = [
        loc >= MIN_TEST_LOC,
        assertions >= 1,
        test_markers >= 1,
        test_markers >= MANY_TEST_MARKERS,
        assertion_density >= MIN_ASSERTION_DENSITY,
    ]
    .into_iter()
    .filter(|met| *met)
    .count() as u8;

    CodeTestQuality {
        loc,
        test_markers,
        assertions,
        assertion_density,
        score,
    }
}

/// Step list of a playbook: a top-level array, `steps`, or graph `nodes`
/// (optionally under `flow_definition`).
fn playbook_steps(document: &Value) -> Option<&Vec<Value>> {
    if let Some(steps) = document.as_array() {
        return Some(steps);
    }
    let object = document.as_object()?;
    object
        .get("steps")
        .and_then(Value::as_array)
        .or_else(|| object.get("nodes").and_then(Value::as_array))
        .or_else(|| {
            object
                .get("flow_definition")
                .and_then(|flow| flow.get("nodes"))
                .and_then(Value::as_array)
        })
}

fn is_actionable(step: &Value) -> bool {
    step.as_object()
        .is_some_and(|fields| fields.contains_key("action") || fields.contains_key("type"))
}

/// `None` when the document does not parse.
pub fn analyze_playbook(bytes: &[u8], yaml: bool) -> Option<PlaybookQuality> {
    let document: Value = if yaml {
        serde_yaml::from_slice(bytes).ok()?
    } else {
        serde_json::from_slice(bytes).ok()?
    };
    let steps = playbook_steps(&document).map(Vec::as_slice).unwrap_or(&[]);
    Some(PlaybookQuality {
        steps: steps.len(),
        actionable_steps: steps.iter().filter(|step| is_actionable(step)).count(),
        bytes: bytes.len(),
    })
}

pub fn analyze_file(path: &Path) -> TestFileQuality {
    if fsutil::has_extension(path, PLAYBOOK_EXTENSIONS) {
        let yaml = !fsutil::has_extension(path, &["json"]);
        return fsutil::read_bytes(path)
            .ok()
            .and_then(|bytes| analyze_playbook(&bytes, yaml))
            .map_or(TestFileQuality::Unusable, TestFileQuality::Playbook);
    }
    match fsutil::read_text(path) {
        Ok(text) => TestFileQuality::Code(analyze_code(&text)),
        Err(_) => TestFileQuality::Unusable,
    }
}

/// Per-run memo of file analyses, keyed by scenario-relative reference.
#[derive(Debug)]
pub struct TestQualityCache {
    root: PathBuf,
    results: BTreeMap<String, TestFileQuality>,
}

impl TestQualityCache {
    pub fn new(scenario_root: &Path) -> Self {
        Self {
            root: scenario_root.to_path_buf(),
            results: BTreeMap::new(),
        }
    }

    pub fn analyze(&mut self, reference: &str) -> &TestFileQuality {
        let root = &self.root;
        self.results
            .entry(reference.to_string())
            .or_insert_with(|| analyze_file(&fsutil::resolve_path(root, reference)))
    }

    pub fn is_meaningful(&mut self, reference: &str) -> bool {
        self.analyze(reference).is_meaningful()
    }

    pub fn analyzed(&self) -> &BTreeMap<String, TestFileQuality> {
        &self.results
    }
}
