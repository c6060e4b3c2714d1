//! # Scorecard Kernel
//!
//! Shared ground for scoring how complete a scenario is and whether its
//! claimed validation is genuine.
//!
//! This crate is **layout-light**: it defines the canonical shapes every
//! other crate speaks, the threshold/penalty configuration, safe file
//! helpers, and the declarative matcher tables. It does not load scenarios
//! or score them.
//!
//! ## Architecture
//!
//! ```text
//! ScoringConfig         ← thresholds + penalty curves (fatal if broken)
//!     │
//! patterns              ← label → regex tables, compiled once
//!     │
//! model                 ← Requirement, OperationalTarget, SyncSnapshot, Issue
//!     │
//! fsutil                ← reads that report, walks that never fail
//! ```

pub mod config;
pub mod error;
pub mod fsutil;
pub mod model;
pub mod patterns;

pub use config::{
    CategoryThresholds, ConfigStore, PenaltyConfig, QuantityTiers, ScoringConfig, UiThresholds,
    UiTiers, capped_penalty,
};
pub use error::{ConfigError, LoadWarning, ReadError};
pub use model::{
    Component, Criticality, Issue, IssueKind, OperationalTarget, Requirement, RequirementStatus,
    ScenarioComponents, Severity, SyncMetadata, SyncRecord, SyncSnapshot, TargetCounts,
    TargetKind, TestResultsSummary, ValidationEntry, ValidationLayer, ValidationType,
    flatten_requirements, normalize_ref,
};
pub use patterns::PatternTable;
