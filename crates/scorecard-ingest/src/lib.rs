//! # scorecard-ingest
//!
//! Loaders for the on-disk state of one scenario.
//!
//! Each loader accepts two schema generations, adapts them into the kernel's
//! canonical types, and never aborts on a single bad file: problems become
//! [`LoadWarning`](scorecard_kernel::LoadWarning)s and the loader carries on.
//!
//! ## Scenario layout
//!
//! ```text
//! <scenario>/
//!   .vrooli/service.json                    service descriptor
//!   requirements/index.json                 index (+ imports)
//!   requirements/**/*.json                  per-module files
//!   coverage/requirements-sync/latest.json  consolidated sync snapshot
//!   coverage/sync/*.json                    legacy dated sync files
//!   coverage/phase-results/*.json           per-phase test results
//!   coverage/test-results.json              aggregate test summary
//! ```

pub mod requirements;
pub mod scenario;
pub mod service;
pub mod sync;
pub mod test_results;

pub use requirements::load_requirements;
pub use scenario::{ScenarioData, derive_targets, load_scenario};
pub use service::{ServiceInfo, load_service};
pub use sync::load_sync;
pub use test_results::{TestResultsSource, load_test_results};

pub const SERVICE_DESCRIPTOR_PATH: &str = ".vrooli/service.json";
pub const REQUIREMENTS_DIR: &str = "requirements";
pub const REQUIREMENTS_INDEX_FILE: &str = "index.json";
pub const SYNC_SNAPSHOT_PATH: &str = "coverage/requirements-sync/latest.json";
pub const LEGACY_SYNC_DIR: &str = "coverage/sync";
pub const PHASE_RESULTS_DIR: &str = "coverage/phase-results";
pub const AGGREGATE_TEST_RESULTS_PATH: &str = "coverage/test-results.json";

/// Render a JSON scalar as a trimmed string; other shapes yield `None`.
pub(crate) fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(text) => text.trim().to_string(),
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub struct TempDirGuard {
        path: PathBuf,
    }

    impl TempDirGuard {
        pub fn new(prefix: &str) -> Self {
            let nonce = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock should be after unix epoch")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "scorecard-ingest-{prefix}-{}-{nonce}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("temp test directory should be creatable");
            Self { path }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    pub fn write_text(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent directories should be creatable");
        }
        fs::write(path, content).expect("fixture should be writable");
    }

    pub fn write_json(path: &Path, payload: &serde_json::Value) {
        let text = serde_json::to_string_pretty(payload).expect("json should serialize");
        write_text(path, &text);
    }
}
