//! Declarative matcher tables.
//!
//! Each table is plain data (`label → pattern`) compiled once on first use.
//! Detectors iterate the compiled tables in declaration order; nothing here
//! branches on scenario content.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::{Component, ValidationLayer};

/// A compiled, ordered matcher table.
#[derive(Debug)]
pub struct PatternTable<K: 'static> {
    rows: Vec<(K, Regex)>,
}

impl<K: Copy + 'static> PatternTable<K> {
    fn compile(table: &'static [(K, &'static str)], name: &str) -> Self {
        let rows = table
            .iter()
            .map(|(key, pattern)| {
                let re = Regex::new(pattern)
                    .unwrap_or_else(|err| panic!("{name} pattern {pattern:?} must compile: {err}"));
                (*key, re)
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> impl Iterator<Item = (K, &Regex)> {
        self.rows.iter().map(|(key, re)| (*key, re))
    }

    /// First key whose pattern matches.
    pub fn first_match(&self, text: &str) -> Option<K> {
        self.rows
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(key, _)| *key)
    }

    pub fn any_match(&self, text: &str) -> bool {
        self.rows.iter().any(|(_, re)| re.is_match(text))
    }

    /// Total non-overlapping matches across every row.
    pub fn count_matches(&self, text: &str) -> usize {
        self.rows
            .iter()
            .map(|(_, re)| re.find_iter(text).count())
            .sum()
    }
}

// ── Operational-target references ──

pub const TARGET_REF_PATTERN: &str = r"(?i)\bOT-P[0-2]-\d{3}\b";

fn target_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TARGET_REF_PATTERN).expect("target-ref regex must compile"))
}

/// Extract the first `OT-Px-NNN` id from free text, uppercased.
pub fn extract_target_ref(text: &str) -> Option<String> {
    target_ref_re()
        .find(text)
        .map(|found| found.as_str().to_ascii_uppercase())
}

// ── Component markers ──

/// Relative paths whose presence proves a component exists.
pub const COMPONENT_MARKERS: &[(Component, &str)] = &[
    (Component::Api, "api/main.go"),
    (Component::Api, "api/go.mod"),
    (Component::Api, "api/Cargo.toml"),
    (Component::Api, "api/package.json"),
    (Component::Api, "api/pyproject.toml"),
    (Component::Api, "api/server.js"),
    (Component::Ui, "ui/package.json"),
    (Component::Ui, "ui/index.html"),
    (Component::Ui, "ui/src"),
];

// ── Validation layers ──

const LAYER_TABLE: &[(ValidationLayer, &str)] = &[
    (
        ValidationLayer::Api,
        r"^api/(?:.*/)?(?:[^/]+_test\.go|[^/]+\.(?:test|spec)\.[jt]sx?|[^/]+_test\.rs|test_[^/]+\.py|[^/]+_test\.py)$",
    ),
    (ValidationLayer::Api, r"^api/(?:.*/)?tests/.+"),
    (
        ValidationLayer::Ui,
        r"^ui/(?:.*/)?[^/]+\.(?:test|spec)\.[jt]sx?$",
    ),
    (
        ValidationLayer::E2e,
        r"^test/playbooks/(?:.*/)?[^/]+\.(?:json|yaml)$",
    ),
];

pub fn layer_patterns() -> &'static PatternTable<ValidationLayer> {
    static TABLE: OnceLock<PatternTable<ValidationLayer>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(LAYER_TABLE, "layer"))
}

/// References rooted at `test/` that are not playbooks earn no layer credit.
pub fn is_unsupported_test_location(reference: &str) -> bool {
    reference.starts_with("test/")
        && layer_patterns().first_match(reference) != Some(ValidationLayer::E2e)
}

// ── Test-quality markers ──

const TEST_MARKER_TABLE: &[(&str, &str)] = &[
    ("go", r"(?m)^\s*func\s+Test\w*\s*\("),
    ("js", r#"\b(?:it|test)\s*\(\s*['"`]"#),
    ("rust", r"#\[(?:tokio::)?test\]"),
    ("python", r"(?m)^\s*(?:async\s+)?def\s+test_\w+"),
    ("bats", r#"(?m)^@test\s+""#),
];

pub fn test_marker_patterns() -> &'static PatternTable<&'static str> {
    static TABLE: OnceLock<PatternTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(TEST_MARKER_TABLE, "test-marker"))
}

const ASSERTION_TABLE: &[(&str, &str)] = &[
    ("assert-call", r"\bassert\w*!?\s*\("),
    ("assert-stmt", r"(?m)^\s*assert\s+[^\s(]"),
    ("expect", r"\bexpect\s*\("),
    ("testify", r"\b(?:require|assert)\.\w+\s*\("),
    ("go-testing", r"\bt\.(?:Error|Errorf|Fatal|Fatalf|Fail|FailNow)\s*\("),
];

pub fn assertion_patterns() -> &'static PatternTable<&'static str> {
    static TABLE: OnceLock<PatternTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(ASSERTION_TABLE, "assertion"))
}

// ── UI source analysis ──

/// Endpoint call styles. Capture group 1 holds the endpoint string.
const ENDPOINT_TABLE: &[(&str, &str)] = &[
    ("fetch", r#"\bfetch\s*\(\s*['"`]([^'"`]+)['"`]"#),
    (
        "axios",
        r#"\baxios\s*\.\s*(?:get|post|put|patch|delete)\s*\(\s*['"`]([^'"`]+)['"`]"#,
    ),
    (
        "client",
        r#"\b(?:api|client|http)\s*\.\s*(?:get|post|put|patch|delete)\s*\(\s*['"`]([^'"`]+)['"`]"#,
    ),
    ("literal", r#"['"`](/api/[^'"`\s]*)['"`]"#),
];

pub fn endpoint_patterns() -> &'static PatternTable<&'static str> {
    static TABLE: OnceLock<PatternTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(ENDPOINT_TABLE, "endpoint"))
}

fn health_endpoint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^/(?:api/)?(?:v\d+/)?(?:health|healthz|ready|readyz|livez|status|ping)(?:/|$)")
            .expect("health-endpoint regex must compile")
    })
}

pub fn is_health_endpoint(endpoint: &str) -> bool {
    health_endpoint_re().is_match(endpoint)
}

const ROUTING_STYLE_TABLE: &[(&str, &str)] = &[
    (
        "react-router",
        r"\b(?:BrowserRouter|HashRouter|MemoryRouter|createBrowserRouter|createHashRouter|useNavigate)\b|<Routes\b",
    ),
    ("vue-router", r"\bcreateRouter\s*\("),
    ("svelte-routing", r#"from\s+['"]svelte-routing['"]"#),
    ("hash-routing", r"window\.location\.hash|\bhashchange\b"),
];

pub fn routing_style_patterns() -> &'static PatternTable<&'static str> {
    static TABLE: OnceLock<PatternTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(ROUTING_STYLE_TABLE, "routing-style"))
}

const ROUTE_TABLE: &[(&str, &str)] = &[
    ("jsx-route", r"<Route\b[^>]*\bpath\s*="),
    ("object-route", r#"\bpath\s*:\s*['"`]/"#),
];

pub fn route_patterns() -> &'static PatternTable<&'static str> {
    static TABLE: OnceLock<PatternTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(ROUTE_TABLE, "route"))
}

/// Text that only appears in untouched framework scaffolds.
const TEMPLATE_SIGNATURE_TABLE: &[(&str, &str)] = &[
    ("vite-react", r"(?i)Vite\s*\+\s*React"),
    ("vite-edit-hint", r"(?i)Edit\s*<code>src/App"),
    ("vite-counter", r"(?i)count is \{?\s*count\s*\}?"),
    ("vite-logos", r"(?i)Click on the Vite and \w+ logos"),
    ("cra", r"(?i)Learn React"),
    ("vue-welcome", r"(?i)You did it!|Welcome to Your Vue\.js App"),
    ("starter", r"(?i)this is a (?:starter|placeholder) (?:ui|page|app)"),
];

pub fn template_signature_patterns() -> &'static PatternTable<&'static str> {
    static TABLE: OnceLock<PatternTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| PatternTable::compile(TEMPLATE_SIGNATURE_TABLE, "template-signature"))
}
