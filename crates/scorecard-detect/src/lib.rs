//! # scorecard-detect
//!
//! Structural checks over a loaded scenario.
//!
//! ## Detectors
//!
//! - **layers**: which components exist and which automated validation
//!   layers (API, UI, E2E) genuinely cover each requirement
//! - **test_quality**: whether a referenced test file or playbook is real
//! - **duplicates**: one test file cited by many requirements
//! - **grouping**: operational targets that mirror single requirements
//! - **gaming**: the orchestrator; runs all of the above plus the ratio,
//!   manual-validation, and test-location checks and returns one
//!   [`ValidationQualityReport`]
//!
//! Every detector caps its own penalty. Nothing here reads configuration
//! from disk; callers pass the relevant [`PenaltyConfig`] sections.
//!
//! [`PenaltyConfig`]: scorecard_kernel::PenaltyConfig

pub mod duplicates;
pub mod gaming;
pub mod grouping;
pub mod layers;
pub mod test_quality;

pub use duplicates::{DuplicateReport, DuplicateViolation, detect_duplicates};
pub use gaming::{
    VALIDATION_QUALITY_CHECK_KIND, ValidationQualityReport, ValidationSummary,
    detect_validation_issues, linked_reference_ratio,
};
pub use grouping::{GroupingReport, SingleRequirementTarget, validate_target_grouping};
pub use layers::{LayerAnalysis, RequirementLayerCoverage, analyze_layers, detect_components};
pub use test_quality::{TestFileQuality, TestQualityCache, analyze_code, analyze_playbook};
