//! Requirements loader.
//!
//! Two layouts coexist. The older one keeps a flat list in
//! `requirements/index.json`, optionally pulling in `imports`. The newer one
//! scatters per-module files across the `requirements/` tree. Both are read
//! on every run and files are deduplicated by canonical path, so a module
//! that is both imported and discovered by the walk loads exactly once.

use scorecard_kernel::fsutil::{self, display_path, to_relative_or_absolute};
use scorecard_kernel::{
    LoadWarning, ReadError, Requirement, RequirementStatus, ValidationEntry, ValidationType,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::{REQUIREMENTS_DIR, REQUIREMENTS_INDEX_FILE, scalar_to_string};

/// File-level schema generations.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequirementsFile {
    Envelope {
        #[serde(default)]
        requirements: Option<Vec<Value>>,
        #[serde(default)]
        imports: Option<Vec<String>>,
    },
    Bare(Vec<Value>),
}

impl RequirementsFile {
    fn into_parts(self) -> Option<(Vec<Value>, Vec<String>)> {
        match self {
            Self::Envelope {
                requirements: None,
                imports: None,
            } => None,
            Self::Envelope {
                requirements,
                imports,
            } => Some((
                requirements.unwrap_or_default(),
                imports.unwrap_or_default(),
            )),
            Self::Bare(requirements) => Some((requirements, Vec::new())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRequirement {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "operational_target_ref")]
    prd_ref: Option<String>,
    #[serde(default, alias = "validations")]
    validation: Vec<RawValidation>,
    #[serde(default)]
    children: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawValidation {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "ref", alias = "path", default)]
    reference: Option<String>,
    #[serde(default)]
    workflow_id: Option<String>,
}

impl RawValidation {
    fn normalize(self) -> ValidationEntry {
        let workflow_id = self
            .workflow_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let kind = match self.kind.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => ValidationType::parse(raw),
            _ if workflow_id.is_some() => ValidationType::Automation,
            _ => ValidationType::Test,
        };
        ValidationEntry {
            kind,
            reference: self
                .reference
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            workflow_id,
        }
    }
}

/// Adapt one raw requirement value, recursively; bad nodes are dropped.
fn normalize_requirement(
    value: Value,
    source: &str,
    warnings: &mut Vec<LoadWarning>,
) -> Option<Requirement> {
    let raw: RawRequirement = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(err) => {
            warnings.push(LoadWarning::emit(
                source,
                format!("skipping malformed requirement: {err}"),
            ));
            return None;
        }
    };
    let Some(id) = raw.id.as_ref().and_then(scalar_to_string) else {
        warnings.push(LoadWarning::emit(source, "skipping requirement without id"));
        return None;
    };
    let children = raw
        .children
        .into_iter()
        .filter_map(|child| normalize_requirement(child, source, warnings))
        .collect();
    Some(Requirement {
        id,
        status: raw
            .status
            .as_deref()
            .map(RequirementStatus::parse)
            .unwrap_or_default(),
        prd_ref: raw
            .prd_ref
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        validation: raw
            .validation
            .into_iter()
            .map(RawValidation::normalize)
            .collect(),
        children,
    })
}

/// Load every requirement for the scenario.
///
/// The index and its imports are read first, in declaration order, then the
/// remaining files of the tree in path order. A missing `requirements/`
/// directory is an empty scenario, not an error.
pub fn load_requirements(scenario_root: &Path, warnings: &mut Vec<LoadWarning>) -> Vec<Requirement> {
    let dir = scenario_root.join(REQUIREMENTS_DIR);
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    let mut requirements = Vec::new();

    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    let index = dir.join(REQUIREMENTS_INDEX_FILE);
    if index.is_file() {
        queue.push_back(index);
    }
    while let Some(path) = queue.pop_front() {
        if !seen.insert(fsutil::canonical_key(&path)) {
            continue;
        }
        let source = to_relative_or_absolute(scenario_root, &path);
        if let Some(imports) = load_file(&path, &source, &mut requirements, warnings) {
            let base = path.parent().unwrap_or(&dir).to_path_buf();
            for import in imports {
                let resolved = fsutil::resolve_path(&base, import.trim());
                if resolved.is_file() {
                    queue.push_back(resolved);
                } else {
                    warnings.push(LoadWarning::emit(
                        source.clone(),
                        format!("import not found: {}", display_path(&resolved)),
                    ));
                }
            }
        }
    }

    for path in fsutil::walk_files(&dir, |path| fsutil::has_extension(path, &["json"])) {
        if !seen.insert(fsutil::canonical_key(&path)) {
            continue;
        }
        let source = to_relative_or_absolute(scenario_root, &path);
        // Imports are honored only from files reached through the index chain.
        let _ = load_file(&path, &source, &mut requirements, warnings);
    }

    dedupe_requirement_ids(&mut requirements, warnings);
    requirements
}

/// Parse one file and append its requirements; returns its imports.
fn load_file(
    path: &Path,
    source: &str,
    out: &mut Vec<Requirement>,
    warnings: &mut Vec<LoadWarning>,
) -> Option<Vec<String>> {
    let file: RequirementsFile = match fsutil::read_json(path) {
        Ok(file) => file,
        Err(ReadError::ParseJson { source: err, .. }) => {
            warnings.push(LoadWarning::emit(
                source,
                format!("skipping unparsable requirements file: {err}"),
            ));
            return None;
        }
        Err(err) => {
            warnings.push(LoadWarning::from_read_error(source, &err));
            return None;
        }
    };
    let Some((values, imports)) = file.into_parts() else {
        warnings.push(LoadWarning::emit(
            source,
            "file has neither `requirements` nor `imports`; skipped",
        ));
        return None;
    };
    out.extend(
        values
            .into_iter()
            .filter_map(|value| normalize_requirement(value, source, warnings)),
    );
    Some(imports)
}

/// Keep the first occurrence of every id across the whole forest.
fn dedupe_requirement_ids(requirements: &mut Vec<Requirement>, warnings: &mut Vec<LoadWarning>) {
    fn retain_unique(
        nodes: &mut Vec<Requirement>,
        seen: &mut BTreeSet<String>,
        warnings: &mut Vec<LoadWarning>,
    ) {
        let mut kept = Vec::with_capacity(nodes.len());
        for mut node in nodes.drain(..) {
            if !seen.insert(node.id.clone()) {
                warnings.push(LoadWarning::emit(
                    REQUIREMENTS_DIR,
                    format!("duplicate requirement id {}; later copy dropped", node.id),
                ));
                continue;
            }
            retain_unique(&mut node.children, seen, warnings);
            kept.push(node);
        }
        *nodes = kept;
    }

    let mut seen = BTreeSet::new();
    retain_unique(requirements, &mut seen, warnings);
}
