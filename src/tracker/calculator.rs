//! Lateness and fee computation.

use chrono::NaiveDateTime;

use crate::config::PunctualityConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatenessPolicy {
    pub grace_period_minutes: u32,
    pub fee_per_minute: f64,
}

impl LatenessPolicy {
    pub fn new(grace_period_minutes: u32, fee_per_minute: f64) -> Self {
        Self {
            grace_period_minutes,
            fee_per_minute,
        }
    }
}

impl From<&PunctualityConfig> for LatenessPolicy {
    fn from(config: &PunctualityConfig) -> Self {
        Self::new(config.grace_period_minutes, config.fee_per_minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lateness {
    pub late_minutes: u32,
    pub fee_amount: f64,
}

impl Lateness {
    pub fn is_late(&self) -> bool {
        self.late_minutes > 0
    }
}

/// Whole minutes past the start, minus the grace period, floored at zero.
/// Arrivals before the start are on time.
pub fn assess(starts_at: NaiveDateTime, arrived_at: NaiveDateTime, policy: &LatenessPolicy) -> Lateness {
    let elapsed_minutes = (arrived_at - starts_at).num_seconds().div_euclid(60);
    let late_minutes = (elapsed_minutes - i64::from(policy.grace_period_minutes)).max(0);
    let late_minutes = u32::try_from(late_minutes).unwrap_or(u32::MAX);

    Lateness {
        late_minutes,
        fee_amount: f64::from(late_minutes) * policy.fee_per_minute,
    }
}
