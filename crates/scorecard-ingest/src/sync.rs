//! Synchronization snapshot loader.
//!
//! The consolidated snapshot is authoritative when readable. Otherwise the
//! legacy directory of dated files is merged in lexicographic filename
//! order, later files overwriting earlier ones per requirement id and per
//! target id.

use scorecard_kernel::fsutil::{self, display_path, to_relative_or_absolute};
use scorecard_kernel::patterns::extract_target_ref;
use scorecard_kernel::{
    Criticality, LoadWarning, OperationalTarget, RequirementStatus, SyncMetadata, SyncRecord,
    SyncSnapshot, TargetCounts, TargetKind,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{LEGACY_SYNC_DIR, SYNC_SNAPSHOT_PATH, scalar_to_string};

/// Where the snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncSource {
    Consolidated(PathBuf),
    Legacy(Vec<PathBuf>),
}

#[derive(Debug, Deserialize)]
struct SyncFile {
    #[serde(default)]
    requirements: Option<RecordSet>,
    #[serde(default)]
    operational_targets: Vec<Value>,
}

/// Records are keyed by id (consolidated) or listed with inline ids (legacy).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordSet {
    Keyed(BTreeMap<String, Value>),
    Listed(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    sync_metadata: Option<RawSyncMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawSyncMetadata {
    #[serde(default)]
    all_tests_passing: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    criticality: Option<String>,
    #[serde(default)]
    counts: Option<RawCounts>,
    #[serde(default, alias = "requirements", alias = "linked_requirements")]
    linked_requirement_ids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawCounts {
    #[serde(default)]
    complete: usize,
    #[serde(default)]
    total: usize,
}

impl RawRecord {
    fn normalize(self) -> SyncRecord {
        SyncRecord {
            status: self
                .status
                .as_deref()
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
                .map(RequirementStatus::parse),
            sync_metadata: self.sync_metadata.map(|meta| SyncMetadata {
                all_tests_passing: meta.all_tests_passing.unwrap_or(false),
            }),
        }
    }
}

impl RawTarget {
    fn normalize(self) -> Option<OperationalTarget> {
        let id = self.id.as_ref().and_then(scalar_to_string)?;
        let kind = match self.kind.as_deref().map(str::trim) {
            Some("folder") => TargetKind::Folder,
            Some("prd_ref") | Some("prd-ref") => TargetKind::PrdRef,
            _ if extract_target_ref(&id).is_some() => TargetKind::PrdRef,
            _ => TargetKind::Folder,
        };
        let criticality = self
            .criticality
            .as_deref()
            .and_then(parse_criticality)
            .or_else(|| {
                extract_target_ref(&id).map(|ot| Criticality::from_prd_ref(Some(ot.as_str())))
            });
        let mut linked: Vec<String> = self
            .linked_requirement_ids
            .iter()
            .filter_map(scalar_to_string)
            .collect();
        linked.sort();
        linked.dedup();
        Some(OperationalTarget {
            id,
            kind,
            status: self
                .status
                .as_deref()
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
                .map(RequirementStatus::parse),
            criticality,
            counts: self.counts.map(|counts| TargetCounts {
                complete: counts.complete.min(counts.total),
                total: counts.total,
            }),
            linked_requirement_ids: linked,
        })
    }
}

fn parse_criticality(raw: &str) -> Option<Criticality> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "P0" => Some(Criticality::P0),
        "P1" => Some(Criticality::P1),
        "P2" => Some(Criticality::P2),
        _ => None,
    }
}

/// Load the sync snapshot. Absence of every source is an empty snapshot.
pub fn load_sync(scenario_root: &Path, warnings: &mut Vec<LoadWarning>) -> SyncSnapshot {
    for source in discover_sources(scenario_root) {
        if let Some(snapshot) = load_source(scenario_root, &source, warnings) {
            return snapshot;
        }
    }
    SyncSnapshot::default()
}

/// Candidate sources in preference order.
fn discover_sources(scenario_root: &Path) -> Vec<SyncSource> {
    let mut sources = Vec::new();
    let consolidated = scenario_root.join(SYNC_SNAPSHOT_PATH);
    if consolidated.is_file() {
        sources.push(SyncSource::Consolidated(consolidated));
    }
    let dir = scenario_root.join(LEGACY_SYNC_DIR);
    let mut files: Vec<PathBuf> = fsutil::walk_files(&dir, |path| {
        path.parent() == Some(dir.as_path()) && fsutil::has_extension(path, &["json"])
    });
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if !files.is_empty() {
        sources.push(SyncSource::Legacy(files));
    }
    sources
}

/// `None` means the source was unusable and the next one should be tried.
fn load_source(
    scenario_root: &Path,
    source: &SyncSource,
    warnings: &mut Vec<LoadWarning>,
) -> Option<SyncSnapshot> {
    let mut merger = SnapshotMerger::default();
    match source {
        SyncSource::Consolidated(path) => {
            let origin = to_relative_or_absolute(scenario_root, path);
            match fsutil::read_json::<SyncFile>(path) {
                Ok(file) => merger.absorb(file, &origin, warnings),
                Err(err) => {
                    warnings.push(LoadWarning::from_read_error(origin, &err));
                    return None;
                }
            }
        }
        SyncSource::Legacy(files) => {
            for path in files {
                let origin = to_relative_or_absolute(scenario_root, path);
                match fsutil::read_json::<SyncFile>(path) {
                    Ok(file) => merger.absorb(file, &origin, warnings),
                    Err(err) => warnings.push(LoadWarning::from_read_error(origin, &err)),
                }
            }
        }
    }
    tracing::debug!(
        source = %describe(source),
        records = merger.records.len(),
        targets = merger.targets.len(),
        "loaded sync snapshot"
    );
    Some(merger.finish())
}

fn describe(source: &SyncSource) -> String {
    match source {
        SyncSource::Consolidated(path) => display_path(path),
        SyncSource::Legacy(files) => format!("{} legacy files", files.len()),
    }
}

#[derive(Default)]
struct SnapshotMerger {
    records: BTreeMap<String, SyncRecord>,
    targets: BTreeMap<String, OperationalTarget>,
}

impl SnapshotMerger {
    fn absorb(&mut self, file: SyncFile, source: &str, warnings: &mut Vec<LoadWarning>) {
        let entries: Vec<(Option<String>, Value)> = match file.requirements {
            Some(RecordSet::Keyed(map)) => map
                .into_iter()
                .map(|(id, value)| (Some(id.trim().to_string()), value))
                .collect(),
            Some(RecordSet::Listed(list)) => list.into_iter().map(|value| (None, value)).collect(),
            None => Vec::new(),
        };
        for (key, value) in entries {
            let raw: RawRecord = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(err) => {
                    warnings.push(LoadWarning::emit(
                        source,
                        format!("skipping malformed sync record: {err}"),
                    ));
                    continue;
                }
            };
            let id = key
                .filter(|id| !id.is_empty())
                .or_else(|| raw.id.as_ref().and_then(scalar_to_string));
            let Some(id) = id else {
                warnings.push(LoadWarning::emit(source, "skipping sync record without id"));
                continue;
            };
            self.records.insert(id, raw.normalize());
        }

        for value in file.operational_targets {
            let target = serde_json::from_value::<RawTarget>(value)
                .ok()
                .and_then(RawTarget::normalize);
            match target {
                Some(target) => {
                    self.targets.insert(target.id.clone(), target);
                }
                None => warnings.push(LoadWarning::emit(
                    source,
                    "skipping malformed operational target",
                )),
            }
        }
    }

    fn finish(self) -> SyncSnapshot {
        SyncSnapshot {
            records: self.records,
            operational_targets: self.targets.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TempDirGuard, write_json, write_text};
    use serde_json::json;

    #[test]
    fn consolidated_snapshot_is_preferred() {
        let tmp = TempDirGuard::new("sync-consolidated");
        write_json(
            &tmp.path().join(SYNC_SNAPSHOT_PATH),
            &json!({
                "requirements": {
                    "REQ-1": {"status": "complete", "sync_metadata": {"all_tests_passing": true}},
                    "REQ-2": {"status": "in_progress"}
                },
                "operational_targets": [
                    {"id": "OT-P0-001", "status": "complete", "linked_requirement_ids": ["REQ-2", "REQ-1"]}
                ]
            }),
        );
        write_json(
            &tmp.path().join(LEGACY_SYNC_DIR).join("2024-01-01.json"),
            &json!({"requirements": [{"id": "REQ-9", "status": "complete"}]}),
        );

        let mut warnings = Vec::new();
        let snapshot = load_sync(tmp.path(), &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(
            snapshot.records["REQ-1"].sync_metadata,
            Some(SyncMetadata { all_tests_passing: true })
        );
        let target = &snapshot.operational_targets[0];
        assert_eq!(target.kind, TargetKind::PrdRef);
        assert_eq!(target.criticality, Some(Criticality::P0));
        assert_eq!(target.linked_requirement_ids, vec!["REQ-1", "REQ-2"]);
        assert!(target.is_complete());
    }

    #[test]
    fn legacy_files_merge_in_filename_order() {
        let tmp = TempDirGuard::new("sync-legacy");
        let dir = tmp.path().join(LEGACY_SYNC_DIR);
        write_json(
            &dir.join("2024-03-02.json"),
            &json!({"requirements": [{"id": "REQ-1", "status": "complete"}]}),
        );
        write_json(
            &dir.join("2024-03-01.json"),
            &json!({"requirements": {"REQ-1": {"status": "pending"}, "REQ-2": {"status": "failed"}}}),
        );

        let mut warnings = Vec::new();
        let snapshot = load_sync(tmp.path(), &mut warnings);
        assert_eq!(
            snapshot.records["REQ-1"].status,
            Some(RequirementStatus::Complete)
        );
        assert_eq!(snapshot.records["REQ-2"].status, Some(RequirementStatus::Failed));
    }

    #[test]
    fn malformed_consolidated_falls_back_to_legacy() {
        let tmp = TempDirGuard::new("sync-fallback");
        write_text(&tmp.path().join(SYNC_SNAPSHOT_PATH), "[[[");
        write_json(
            &tmp.path().join(LEGACY_SYNC_DIR).join("2024-01-01.json"),
            &json!({"requirements": [{"id": "REQ-1", "status": "validated"}]}),
        );

        let mut warnings = Vec::new();
        let snapshot = load_sync(tmp.path(), &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            snapshot.records["REQ-1"].status,
            Some(RequirementStatus::Validated)
        );
    }

    #[test]
    fn missing_everything_is_empty() {
        let tmp = TempDirGuard::new("sync-empty");
        let mut warnings = Vec::new();
        assert_eq!(load_sync(tmp.path(), &mut warnings), SyncSnapshot::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn bad_records_are_skipped_individually() {
        let tmp = TempDirGuard::new("sync-bad-record");
        write_json(
            &tmp.path().join(SYNC_SNAPSHOT_PATH),
            &json!({"requirements": [
                {"status": "complete"},
                {"id": "REQ-2", "status": 7},
                {"id": "REQ-3", "status": "complete"}
            ]}),
        );
        let mut warnings = Vec::new();
        let snapshot = load_sync(tmp.path(), &mut warnings);
        assert_eq!(snapshot.records.keys().collect::<Vec<_>>(), vec!["REQ-3"]);
        assert_eq!(warnings.len(), 2);
    }
}
