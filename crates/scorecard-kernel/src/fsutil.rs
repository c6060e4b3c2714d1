//! Safe file and JSON reads, recursive scans, and line counts.
//!
//! Reads return [`ReadError`] so callers decide whether a failure is a
//! warning or simply "absent". Walks never fail: unreadable entries are
//! skipped and reported at debug level.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ReadError;

/// Directory names never descended into during scans.
pub const SKIPPED_DIR_NAMES: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "coverage",
    "target",
    "vendor",
];

pub fn read_text(path: &Path) -> Result<String, ReadError> {
    fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: display_path(path),
        source,
    })
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
    fs::read(path).map_err(|source| ReadError::Io {
        path: display_path(path),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReadError> {
    serde_json::from_slice(&read_bytes(path)?).map_err(|source| ReadError::ParseJson {
        path: display_path(path),
        source,
    })
}

/// Like [`read_json`], but a missing file is `Ok(None)`.
pub fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ReadError> {
    match read_json(path) {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Files under `root` accepted by `keep`, sorted by path.
///
/// Hidden directories and [`SKIPPED_DIR_NAMES`] are pruned. A missing root
/// yields an empty list.
pub fn walk_files(root: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_pruned_dir(entry));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(root = %display_path(root), "skipping unreadable entry: {err}");
                continue;
            }
        };
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

fn is_pruned_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIR_NAMES.contains(&name.as_ref())
}

/// True when `path` has one of `extensions` (case-insensitive, no dot).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

pub fn count_lines(text: &str) -> usize {
    text.lines().count()
}

pub fn count_non_blank_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Canonical absolute path used as a dedup key; falls back to the input.
pub fn canonical_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn resolve_path(root: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// `path` relative to `root` with forward slashes, else the full path.
pub fn to_relative_or_absolute(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => display_path(path),
    }
}

pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
