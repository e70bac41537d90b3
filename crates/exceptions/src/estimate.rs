//! Resolution-time estimates.
//!
//! Estimates are placeholders, not SLAs: nothing reconciles them against
//! actual resolution times. The engine only depends on
//! [`ResolutionEstimator`], so a real model can be swapped in.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rule::Priority;

pub trait ResolutionEstimator: Send + Sync {
    fn estimate(&self, priority: Priority, from: DateTime<Utc>) -> DateTime<Utc>;
}

/// Inclusive range of hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRange {
    pub min_hours: u32,
    pub max_hours: u32,
}

impl HourRange {
    pub const fn new(min_hours: u32, max_hours: u32) -> Self {
        Self {
            min_hours,
            max_hours,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_hours <= self.max_hours
    }
}

/// Estimate window per priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateWindows {
    pub high: HourRange,
    pub medium: HourRange,
    pub low: HourRange,
}

impl Default for EstimateWindows {
    fn default() -> Self {
        Self {
            high: HourRange::new(2, 4),
            medium: HourRange::new(8, 24),
            low: HourRange::new(24, 48),
        }
    }
}

impl EstimateWindows {
    pub fn for_priority(&self, priority: Priority) -> HourRange {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Uniformly random offset (minute resolution) inside the priority's window.
#[derive(Debug, Clone, Default)]
pub struct RandomizedEstimator {
    windows: EstimateWindows,
}

impl RandomizedEstimator {
    pub fn new(windows: EstimateWindows) -> Self {
        Self { windows }
    }
}

impl ResolutionEstimator for RandomizedEstimator {
    fn estimate(&self, priority: Priority, from: DateTime<Utc>) -> DateTime<Utc> {
        let range = self.windows.for_priority(priority);
        let lo = i64::from(range.min_hours.min(range.max_hours)) * 60;
        let hi = i64::from(range.min_hours.max(range.max_hours)) * 60;
        let minutes = rand::thread_rng().gen_range(lo..=hi);
        from + Duration::minutes(minutes)
    }
}

/// Always `from + offset`; deterministic, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetEstimator {
    offset: Duration,
}

impl FixedOffsetEstimator {
    pub fn new(offset: Duration) -> Self {
        Self { offset }
    }
}

impl ResolutionEstimator for FixedOffsetEstimator {
    fn estimate(&self, _priority: Priority, from: DateTime<Utc>) -> DateTime<Utc> {
        from + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randomized_estimate_stays_inside_window() {
        let estimator = RandomizedEstimator::default();
        let from = Utc::now();

        for _ in 0..200 {
            let high = estimator.estimate(Priority::High, from) - from;
            assert!(high >= Duration::hours(2) && high <= Duration::hours(4));

            let medium = estimator.estimate(Priority::Medium, from) - from;
            assert!(medium >= Duration::hours(8) && medium <= Duration::hours(24));

            let low = estimator.estimate(Priority::Low, from) - from;
            assert!(low >= Duration::hours(24) && low <= Duration::hours(48));
        }
    }

    #[test]
    fn inverted_window_is_tolerated() {
        let windows = EstimateWindows {
            high: HourRange::new(5, 1),
            ..EstimateWindows::default()
        };
        assert!(!windows.high.is_valid());

        let from = Utc::now();
        let d = RandomizedEstimator::new(windows).estimate(Priority::High, from) - from;
        assert!(d >= Duration::hours(1) && d <= Duration::hours(5));
    }

    #[test]
    fn fixed_offset_ignores_priority() {
        let from = Utc::now();
        let e = FixedOffsetEstimator::new(Duration::hours(3));
        assert_eq!(e.estimate(Priority::Low, from), from + Duration::hours(3));
        assert_eq!(e.estimate(Priority::High, from), from + Duration::hours(3));
    }
}
