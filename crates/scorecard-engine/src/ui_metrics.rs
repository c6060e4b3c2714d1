//! UI metrics collected from a scenario's `ui/` tree.

use scorecard_kernel::fsutil;
use scorecard_kernel::patterns::{
    endpoint_patterns, is_health_endpoint, route_patterns, routing_style_patterns,
    template_signature_patterns,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path};

pub const UI_DIR: &str = "ui";
/// Entry points plus `App.*` files below this many non-blank lines are
/// treated as an untouched scaffold.
pub const MIN_ENTRY_LOC: usize = 50;

const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "vue", "svelte", "html", "css", "scss",
];
const COMPONENT_EXTENSIONS: &[&str] = &["jsx", "tsx", "vue", "svelte"];
const PAGE_DIRS: &[&str] = &["pages", "views", "routes"];

/// Files any bundler-based or static UI starts from, relative to `ui/`.
const ENTRY_POINTS: &[&str] = &[
    "index.html",
    "src/main.tsx",
    "src/main.ts",
    "src/main.jsx",
    "src/main.js",
    "src/index.tsx",
    "src/index.ts",
    "src/index.jsx",
    "src/index.js",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiMetrics {
    pub is_template: bool,
    pub file_count: usize,
    pub component_count: usize,
    pub page_count: usize,
    pub total_loc: usize,
    pub has_routing: bool,
    pub route_count: usize,
    pub api_endpoints: usize,
    pub api_beyond_health: usize,
}

fn is_test_file(name: &str) -> bool {
    name.contains(".test.") || name.contains(".spec.")
}

fn dir_names(relative: &Path) -> Vec<String> {
    let parent = relative.parent().unwrap_or(Path::new(""));
    parent
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

fn is_component_file(relative: &Path) -> bool {
    if dir_names(relative).iter().any(|dir| dir == "components") {
        return true;
    }
    fsutil::has_extension(relative, COMPONENT_EXTENSIONS)
        && relative
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.chars().next())
            .is_some_and(char::is_uppercase)
}

fn is_page_file(relative: &Path) -> bool {
    dir_names(relative)
        .iter()
        .any(|dir| PAGE_DIRS.contains(&dir.as_str()))
}

fn is_scaffold_candidate(relative: &Path) -> bool {
    let name = relative
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    name.starts_with("App.") || ENTRY_POINTS.iter().any(|entry| relative == Path::new(entry))
}

/// Reduce an endpoint literal to its path: no scheme/host, no query, no
/// leading template expression.
pub fn normalize_endpoint(raw: &str) -> String {
    let mut endpoint = raw.trim();
    if let Some(rest) = endpoint.strip_prefix("${") {
        endpoint = rest.split_once('}').map_or("", |(_, tail)| tail);
    }
    if let Some((_, after_scheme)) = endpoint.split_once("://") {
        endpoint = after_scheme
            .find('/')
            .map_or("", |slash| &after_scheme[slash..]);
    }
    let endpoint = endpoint
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}

/// Endpoint paths referenced from one source file.
pub fn extract_endpoints(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for (_, re) in endpoint_patterns().rows() {
        for captures in re.captures_iter(text) {
            if let Some(raw) = captures.get(1) {
                let endpoint = normalize_endpoint(raw.as_str());
                if endpoint != "/" {
                    found.insert(endpoint);
                }
            }
        }
    }
    found
}

/// `None` when the scenario has no `ui/` directory.
pub fn collect_ui_metrics(scenario_root: &Path) -> Option<UiMetrics> {
    let ui_dir = scenario_root.join(UI_DIR);
    if !ui_dir.is_dir() {
        return None;
    }

    let files = fsutil::walk_files(&ui_dir, |path| {
        fsutil::has_extension(path, SOURCE_EXTENSIONS)
            && path
                .file_name()
                .is_some_and(|name| !is_test_file(&name.to_string_lossy()))
    });

    let mut metrics = UiMetrics::default();
    let mut endpoints = BTreeSet::new();
    let mut scaffold_signature = false;
    let mut entry_loc = 0;
    for path in &files {
        let relative = path.strip_prefix(&ui_dir).unwrap_or(path);
        let text = match fsutil::read_text(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %fsutil::display_path(path), "skipping ui file: {err}");
                continue;
            }
        };
        metrics.file_count += 1;
        let loc = fsutil::count_non_blank_lines(&text);
        metrics.total_loc += loc;
        if is_component_file(relative) {
            metrics.component_count += 1;
        }
        if is_page_file(relative) {
            metrics.page_count += 1;
        }
        metrics.route_count += route_patterns().count_matches(&text);
        metrics.has_routing |= routing_style_patterns().any_match(&text);
        endpoints.extend(extract_endpoints(&text));
        if is_scaffold_candidate(relative) {
            entry_loc += loc;
            scaffold_signature |= template_signature_patterns().any_match(&text);
        }
    }

    metrics.has_routing |= metrics.route_count > 0;
    metrics.api_endpoints = endpoints.len();
    metrics.api_beyond_health = endpoints
        .iter()
        .filter(|endpoint| !is_health_endpoint(endpoint))
        .count();
    let has_entry_point = ENTRY_POINTS.iter().any(|entry| ui_dir.join(entry).is_file());
    metrics.is_template = !has_entry_point || scaffold_signature || entry_loc < MIN_ENTRY_LOC;

    tracing::debug!(
        files = metrics.file_count,
        loc = metrics.total_loc,
        entry_loc,
        endpoints = ?endpoints,
        is_template = metrics.is_template,
        "collected ui metrics"
    );
    Some(metrics)
}
