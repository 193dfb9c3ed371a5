//! ============================================================================
//! Cooldown Policy - Minimum interval between draws
//! ============================================================================
//! Checks a user's last draw against the configured interval. The policy only
//! reads; the caller stamps `last_draw_at` in the same step that stores the
//! drawn item.
//! ============================================================================

use chrono::{DateTime, Duration, Utc};

use crate::types::UserRecord;

/// Default interval between successful draws
pub const DEFAULT_DRAW_COOLDOWN_HOURS: i64 = 4;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time left until the next draw is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    total_seconds: i64,
}

impl Remaining {
    pub fn from_seconds(total_seconds: i64) -> Self {
        Self { total_seconds }
    }

    pub fn total_seconds(&self) -> i64 {
        self.total_seconds
    }

    /// Whole hours
    pub fn hours(&self) -> i64 {
        self.total_seconds / 3600
    }

    /// Whole minutes past the whole hours
    pub fn minutes(&self) -> i64 {
        (self.total_seconds % 3600) / 60
    }
}

/// Result of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownCheck {
    Allowed,
    Denied(Remaining),
}

impl CooldownCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownCheck::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CooldownPolicy {
    interval: Duration,
}

impl CooldownPolicy {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Denied while less than the interval has passed since the last draw
    pub fn check(&self, record: &UserRecord, now: DateTime<Utc>) -> CooldownCheck {
        let Some(last) = record.last_draw_at else {
            return CooldownCheck::Allowed;
        };

        let elapsed = now - last;
        if elapsed < self.interval {
            let left = self.interval - elapsed;
            CooldownCheck::Denied(Remaining::from_seconds(left.num_seconds()))
        } else {
            CooldownCheck::Allowed
        }
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::from_hours(DEFAULT_DRAW_COOLDOWN_HOURS)
    }
}
