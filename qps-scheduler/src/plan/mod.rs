//! Tier decomposition of a target rate.
//!
//! A requested QPS is spread over three fixed periodic buckets so that load
//! arrives smoothly instead of as one burst per second:
//!
//! | Tier | Period | Carries |
//! |---|---|---|
//! | fine | 10 ms | hundreds digit (`qps / 100` per firing) |
//! | medium | 100 ms | tens digit |
//! | coarse | 1000 ms | units digit |
//!
//! Each tier becomes one periodic timer in [`RateScheduler`].  A tier whose
//! digit is zero still gets a timer; its firings simply do nothing.
//!
//! [`RateScheduler`]: crate::scheduler::RateScheduler

pub mod math;

use std::time::Duration;

use math::{normalize_qps, split_qps};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Rate used when the caller asks for less than one request per second.
pub const DEFAULT_QPS: u32 = 100;

/// Tier periods in milliseconds, finest first.
pub const TIER_PERIODS_MS: [u64; 3] = [10, 100, 1_000];

// ── Tier ──────────────────────────────────────────────────────────────────────

/// One periodic bucket: fire every `period`, invoking the task up to
/// `per_period` times per firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub period: Duration,
    pub per_period: u32,
}

impl Tier {
    pub fn new(period_ms: u64, per_period: u32) -> Self {
        Self {
            period: Duration::from_millis(period_ms),
            per_period,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period.as_millis() as u64
    }

    /// `true` for a zero-rate tier.
    pub fn is_idle(&self) -> bool {
        self.per_period == 0
    }
}

// ── TierPlan ──────────────────────────────────────────────────────────────────

/// The three-tier split of one normalised QPS value.
///
/// # Example
/// ```rust
/// use qps_scheduler::plan::TierPlan;
///
/// let plan = TierPlan::from_qps(95);
/// assert_eq!(plan.per_10ms, 0);
/// assert_eq!(plan.per_100ms, 9);
/// assert_eq!(plan.per_second, 5);
/// assert_eq!(plan.planned_qps(), 95);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPlan {
    /// Rate after normalisation (never below 1).
    pub qps: u32,
    pub per_10ms: u32,
    pub per_100ms: u32,
    pub per_second: u32,
}

impl TierPlan {
    /// Normalise `qps` (anything below 1 becomes [`DEFAULT_QPS`]) and split it.
    pub fn from_qps(qps: i32) -> Self {
        let qps = normalize_qps(qps);
        let (per_10ms, per_100ms, per_second) = split_qps(qps);
        Self {
            qps,
            per_10ms,
            per_100ms,
            per_second,
        }
    }

    /// The three tiers, finest first.  Zero-rate tiers are included.
    pub fn tiers(&self) -> [Tier; 3] {
        [
            Tier::new(TIER_PERIODS_MS[0], self.per_10ms),
            Tier::new(TIER_PERIODS_MS[1], self.per_100ms),
            Tier::new(TIER_PERIODS_MS[2], self.per_second),
        ]
    }

    /// Requests per second the tiers add up to.
    pub fn planned_qps(&self) -> u64 {
        self.tiers()
            .iter()
            .map(|t| t.per_period as u64 * (1_000 / t.period_ms()))
            .sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_finest_first() {
        let periods: Vec<u64> = TierPlan::from_qps(999)
            .tiers()
            .iter()
            .map(Tier::period_ms)
            .collect();
        assert_eq!(periods, vec![10, 100, 1_000]);
    }

    #[test]
    fn tiers_carry_split_counts() {
        let tiers = TierPlan::from_qps(999).tiers();
        assert!(tiers.iter().all(|t| t.per_period == 9));
    }

    #[test]
    fn zero_rate_tiers_are_kept() {
        let tiers = TierPlan::from_qps(1).tiers();
        assert_eq!(tiers.len(), 3);
        assert!(tiers[0].is_idle());
        assert!(tiers[1].is_idle());
        assert_eq!(tiers[2], Tier::new(1_000, 1));
    }

    #[test]
    fn non_positive_qps_plans_like_default() {
        let default = TierPlan::from_qps(DEFAULT_QPS as i32);
        assert_eq!(TierPlan::from_qps(0), default);
        assert_eq!(TierPlan::from_qps(-42), default);
        assert_eq!(default.tiers()[0], Tier::new(10, 1));
    }

    #[test]
    fn planned_qps_matches_request() {
        for qps in [1, 9, 10, 95, 100, 101, 999, 1_000, 54_321] {
            assert_eq!(TierPlan::from_qps(qps).planned_qps(), qps as u64);
        }
    }
}
