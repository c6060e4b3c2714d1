//! Test-result freshness. Takes `now` explicitly so scores stay pure.

use chrono::{DateTime, Duration, Utc};
use scorecard_kernel::TestResultsSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessCheck {
    pub is_stale: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// Whole hours since the last run; negative if it is in the future.
    pub age_hours: Option<i64>,
    pub max_age_hours: u32,
}

pub fn check_staleness(
    summary: &TestResultsSummary,
    now: DateTime<Utc>,
    max_age_hours: u32,
) -> StalenessCheck {
    let Some(last_run) = summary.last_run_timestamp else {
        return StalenessCheck {
            is_stale: true,
            last_run: None,
            age_hours: None,
            max_age_hours,
        };
    };
    let age = now.signed_duration_since(last_run);
    StalenessCheck {
        is_stale: age > Duration::hours(i64::from(max_age_hours)),
        last_run: Some(last_run),
        age_hours: Some(age.num_hours()),
        max_age_hours,
    }
}
