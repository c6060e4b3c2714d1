//! Test-result snapshots.
//!
//! Per-phase files are preferred: they carry requirement-level outcomes and
//! the summary is recomputed from them. The aggregate file is the older
//! shape and is only consulted when no phase file is usable.

use chrono::{DateTime, Utc};
use scorecard_kernel::fsutil::{self, to_relative_or_absolute};
use scorecard_kernel::{LoadWarning, TestResultsSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::{AGGREGATE_TEST_RESULTS_PATH, PHASE_RESULTS_DIR, scalar_to_string};

/// Which files produced the summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "paths", rename_all = "snake_case")]
pub enum TestResultsSource {
    Phases(Vec<String>),
    Aggregate(String),
    #[default]
    None,
}

#[derive(Debug, Deserialize)]
struct PhaseFile {
    #[serde(default)]
    phase: Option<Value>,
    #[serde(default, alias = "timestamp")]
    updated_at: Option<String>,
    #[serde(default)]
    requirements: Vec<PhaseRequirement>,
}

#[derive(Debug, Deserialize)]
struct PhaseRequirement {
    #[serde(default)]
    status: Option<Value>,
}

/// Aggregate summary, flat or nested under `summary`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AggregateFile {
    Nested { summary: AggregateCounts },
    Flat(AggregateCounts),
}

#[derive(Debug, Deserialize)]
struct AggregateCounts {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default, alias = "passed")]
    passing: Option<usize>,
    #[serde(default, alias = "failed")]
    failing: Option<usize>,
    #[serde(default, alias = "timestamp")]
    last_run: Option<String>,
}

impl AggregateFile {
    fn normalize(self) -> AggregateCounts {
        match self {
            Self::Nested { summary } => summary,
            Self::Flat(counts) => counts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Passed,
    Failed,
}

fn classify_outcome(status: &Value) -> Option<Outcome> {
    let raw = scalar_to_string(status)?;
    match raw.to_ascii_lowercase().as_str() {
        "passed" => Some(Outcome::Passed),
        "failed" => Some(Outcome::Failed),
        _ => None,
    }
}

fn parse_timestamp(
    raw: Option<&str>,
    source: &str,
    warnings: &mut Vec<LoadWarning>,
) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warnings.push(LoadWarning::emit(
                source,
                format!("ignoring unparsable timestamp {raw:?}: {err}"),
            ));
            None
        }
    }
}

/// Load the test-result summary and report where it came from.
pub fn load_test_results(
    scenario_root: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> (TestResultsSummary, TestResultsSource) {
    if let Some(found) = load_phase_results(scenario_root, warnings) {
        return found;
    }
    if let Some(found) = load_aggregate(scenario_root, warnings) {
        return found;
    }
    (TestResultsSummary::default(), TestResultsSource::None)
}

fn load_phase_results(
    scenario_root: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Option<(TestResultsSummary, TestResultsSource)> {
    let dir = scenario_root.join(PHASE_RESULTS_DIR);
    let files: Vec<PathBuf> = fsutil::walk_files(&dir, |path| {
        path.parent() == Some(dir.as_path()) && fsutil::has_extension(path, &["json"])
    });

    let mut summary = TestResultsSummary::default();
    let mut used = Vec::new();
    for path in &files {
        let source = to_relative_or_absolute(scenario_root, path);
        let phase: PhaseFile = match fsutil::read_json(path) {
            Ok(phase) => phase,
            Err(err) => {
                warnings.push(LoadWarning::from_read_error(source, &err));
                continue;
            }
        };
        for requirement in &phase.requirements {
            match requirement.status.as_ref().and_then(classify_outcome) {
                Some(Outcome::Passed) => summary.passing += 1,
                Some(Outcome::Failed) => summary.failing += 1,
                None => {}
            }
        }
        if let Some(stamp) = parse_timestamp(phase.updated_at.as_deref(), &source, warnings) {
            summary.last_run_timestamp = summary.last_run_timestamp.max(Some(stamp));
        }
        tracing::debug!(
            source = %source,
            phase = ?phase.phase.as_ref().and_then(scalar_to_string),
            "read phase results"
        );
        used.push(source);
    }

    if used.is_empty() {
        return None;
    }
    summary.total = summary.passing + summary.failing;
    Some((summary, TestResultsSource::Phases(used)))
}

fn load_aggregate(
    scenario_root: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Option<(TestResultsSummary, TestResultsSource)> {
    let path = scenario_root.join(AGGREGATE_TEST_RESULTS_PATH);
    let source = to_relative_or_absolute(scenario_root, &path);
    let file: AggregateFile = match fsutil::read_optional_json(&path) {
        Ok(Some(file)) => file,
        Ok(None) => return None,
        Err(err) => {
            warnings.push(LoadWarning::from_read_error(source, &err));
            return None;
        }
    };
    let counts = file.normalize();
    let passing = counts.passing.unwrap_or(0);
    let failing = counts.failing.unwrap_or(0);
    let summary = TestResultsSummary {
        total: counts.total.unwrap_or(passing + failing).max(passing + failing),
        passing,
        failing,
        last_run_timestamp: parse_timestamp(counts.last_run.as_deref(), &source, warnings),
    };
    Some((summary, TestResultsSource::Aggregate(source)))
}
