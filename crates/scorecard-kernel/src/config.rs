//! Threshold and penalty configuration.
//!
//! Parsed from TOML. Unlike every other input, a broken configuration is
//! fatal: there is no meaningful default for penalty curves. A bundled copy
//! ships with the crate for callers that have no file of their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::fsutil::display_path;

pub const CONFIG_VERSION: u32 = 1;
pub const BUNDLED_CONFIG_ORIGIN: &str = "<bundled thresholds.toml>";
const BUNDLED_CONFIG: &str = include_str!("../config/thresholds.toml");

/// Versioned, category-keyed thresholds plus per-detector penalty curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub version: u32,
    pub default_category: String,
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: u32,
    pub categories: BTreeMap<String, CategoryThresholds>,
    pub penalties: PenaltyConfig,
}

fn default_staleness_hours() -> u32 {
    48
}

/// Count breakpoints for one quantity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityTiers {
    pub ok: usize,
    pub good: usize,
    pub excellent: usize,
}

/// Breakpoints for one UI metric: half points at `ok`, full at `good`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiTiers {
    pub ok: usize,
    pub good: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiThresholds {
    pub file_count: UiTiers,
    pub api_endpoints: UiTiers,
    pub route_count: UiTiers,
    pub total_loc: UiTiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub requirements: QuantityTiers,
    pub targets: QuantityTiers,
    pub tests: QuantityTiers,
    pub ui: UiThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    pub test_ratio: TestRatioPenalty,
    pub manual_validation: ManualValidationPenalty,
    pub invalid_location: InvalidLocationPenalty,
    pub monolithic_tests: MonolithicTestPenalty,
    pub target_grouping: TargetGroupingPenalty,
    pub layer_diversity: LayerDiversityPenalty,
}

/// Fixed penalty when tests per requirement sit within `tolerance` of 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestRatioPenalty {
    pub tolerance: f64,
    pub base: f64,
    pub cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualValidationPenalty {
    pub max_ratio: f64,
    pub min_complete_manual_only: usize,
    pub high_severity_count: usize,
    pub ratio_multiplier: f64,
    pub ratio_cap: f64,
    pub per_unit: f64,
    pub count_cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvalidLocationPenalty {
    pub multiplier: f64,
    pub cap: f64,
    pub severity_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonolithicTestPenalty {
    pub min_requirements: usize,
    pub high_severity_at: usize,
    pub per_unit: f64,
    pub cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupingPenalty {
    pub max_ratio: f64,
    pub per_target_budget: f64,
    pub severity_threshold: f64,
    pub base: f64,
    pub multiplier: f64,
    pub cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerDiversityPenalty {
    pub multiplier: f64,
    pub cap: f64,
    pub severity_threshold: f64,
}

/// Clamp a raw penalty into `[0, cap]` and round to whole points.
pub fn capped_penalty(raw: f64, cap: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.min(cap.max(0.0)).round() as u32
}

impl ScoringConfig {
    /// The configuration shipped with this crate.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUNDLED_CONFIG, BUNDLED_CONFIG_ORIGIN)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display_path(path),
            source,
        })?;
        Self::from_toml_str(&text, &display_path(path))
    }

    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: origin.to_string(),
            reason,
        };
        if self.version != CONFIG_VERSION {
            return Err(invalid(format!(
                "version must be {CONFIG_VERSION}, got {}",
                self.version
            )));
        }
        if !self.categories.contains_key(&self.default_category) {
            return Err(invalid(format!(
                "default_category {:?} has no thresholds",
                self.default_category
            )));
        }
        for (name, thresholds) in &self.categories {
            for (metric, tiers) in [
                ("requirements", thresholds.requirements),
                ("targets", thresholds.targets),
                ("tests", thresholds.tests),
            ] {
                if tiers.ok > tiers.good || tiers.good > tiers.excellent {
                    return Err(invalid(format!(
                        "categories.{name}.{metric} must satisfy ok <= good <= excellent"
                    )));
                }
            }
            let ui = thresholds.ui;
            for (metric, tiers) in [
                ("file_count", ui.file_count),
                ("api_endpoints", ui.api_endpoints),
                ("route_count", ui.route_count),
                ("total_loc", ui.total_loc),
            ] {
                if tiers.ok > tiers.good {
                    return Err(invalid(format!(
                        "categories.{name}.ui.{metric} must satisfy ok <= good"
                    )));
                }
            }
        }
        let p = &self.penalties;
        let knobs = [
            ("test_ratio.tolerance", p.test_ratio.tolerance),
            ("test_ratio.base", p.test_ratio.base),
            ("test_ratio.cap", p.test_ratio.cap),
            ("manual_validation.max_ratio", p.manual_validation.max_ratio),
            (
                "manual_validation.ratio_multiplier",
                p.manual_validation.ratio_multiplier,
            ),
            ("manual_validation.ratio_cap", p.manual_validation.ratio_cap),
            ("manual_validation.per_unit", p.manual_validation.per_unit),
            ("manual_validation.count_cap", p.manual_validation.count_cap),
            ("invalid_location.multiplier", p.invalid_location.multiplier),
            ("invalid_location.cap", p.invalid_location.cap),
            (
                "invalid_location.severity_threshold",
                p.invalid_location.severity_threshold,
            ),
            ("monolithic_tests.per_unit", p.monolithic_tests.per_unit),
            ("monolithic_tests.cap", p.monolithic_tests.cap),
            ("target_grouping.max_ratio", p.target_grouping.max_ratio),
            (
                "target_grouping.per_target_budget",
                p.target_grouping.per_target_budget,
            ),
            (
                "target_grouping.severity_threshold",
                p.target_grouping.severity_threshold,
            ),
            ("target_grouping.base", p.target_grouping.base),
            ("target_grouping.multiplier", p.target_grouping.multiplier),
            ("target_grouping.cap", p.target_grouping.cap),
            ("layer_diversity.multiplier", p.layer_diversity.multiplier),
            ("layer_diversity.cap", p.layer_diversity.cap),
            (
                "layer_diversity.severity_threshold",
                p.layer_diversity.severity_threshold,
            ),
        ];
        for (name, value) in knobs {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "penalties.{name} must be a non-negative number"
                )));
            }
        }
        if p.monolithic_tests.min_requirements == 0
            || p.monolithic_tests.high_severity_at < p.monolithic_tests.min_requirements
        {
            return Err(invalid(
                "penalties.monolithic_tests needs 0 < min_requirements <= high_severity_at"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Thresholds for `category`, falling back to the default category.
    ///
    /// The flag is true when the fallback was taken.
    pub fn thresholds_for(&self, category: &str) -> (&CategoryThresholds, bool) {
        let key = category.trim().to_ascii_lowercase();
        match self.categories.get(&key) {
            Some(thresholds) => (thresholds, false),
            None => (&self.categories[&self.default_category], true),
        }
    }
}

#[derive(Debug, Clone)]
enum ConfigSource {
    Bundled,
    File(PathBuf),
}

/// Process-lifetime memo of a [`ScoringConfig`], with explicit reload.
///
/// Owned by the caller and passed around; there is no global instance.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    source: ConfigSource,
    cached: Option<Arc<ScoringConfig>>,
}

impl ConfigStore {
    pub fn bundled() -> Self {
        Self {
            source: ConfigSource::Bundled,
            cached: None,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ConfigSource::File(path.into()),
            cached: None,
        }
    }

    /// A store pre-seeded with an already-built configuration.
    pub fn with_config(config: ScoringConfig) -> Self {
        Self {
            source: ConfigSource::Bundled,
            cached: Some(Arc::new(config)),
        }
    }

    /// Cached configuration, loading it on first use.
    pub fn get(&mut self) -> Result<Arc<ScoringConfig>, ConfigError> {
        if let Some(config) = &self.cached {
            return Ok(Arc::clone(config));
        }
        self.reload()
    }

    /// Discard the cache and read the source again.
    pub fn reload(&mut self) -> Result<Arc<ScoringConfig>, ConfigError> {
        let config = match &self.source {
            ConfigSource::Bundled => ScoringConfig::bundled()?,
            ConfigSource::File(path) => ScoringConfig::load(path)?,
        };
        let config = Arc::new(config);
        self.cached = Some(Arc::clone(&config));
        Ok(config)
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }
}
