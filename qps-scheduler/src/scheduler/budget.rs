/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-call invocation budget and the tier firing batch.
//!
//! Every `schedule_qps` call owns one [`InvocationBudget`], shared by its three
//! tier timers through an `Arc`.  The counter is advanced with a single
//! `fetch_add`, so no two repetitions anywhere observe the same value.
//!
//! # Cap semantics
//! A repetition runs the task only when the *post-increment* counter is
//! strictly less than `total`.  With `total = T` at most `T - 1` executions
//! ever happen, and the counter keeps climbing past `T` for as long as the
//! timers fire.  A `total` of zero or below disables execution entirely.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use tracing::trace;

use crate::plan::Tier;

// ── InvocationBudget ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct InvocationBudget {
    counter: AtomicI64,
    total: i64,
}

impl InvocationBudget {
    pub fn new(total: i64) -> Self {
        Self {
            counter: AtomicI64::new(0),
            total,
        }
    }

    /// Advance the counter and report whether this repetition may run the task.
    pub fn claim(&self) -> bool {
        let n = self.counter.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        n < self.total
    }

    /// Number of claims made so far (successful or not).
    pub fn attempts(&self) -> i64 {
        self.counter.load(Ordering::Acquire)
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    /// `true` once no further claim can succeed.
    pub fn is_exhausted(&self) -> bool {
        self.attempts().saturating_add(1) >= self.total
    }
}

// ── Firing ────────────────────────────────────────────────────────────────────

/// Run one firing of `tier`: `per_period` claims against `budget`, invoking
/// `task` synchronously for each successful claim.
///
/// `stop` is checked before every repetition so a firing that is in flight
/// when the scheduler closes stops invoking the task immediately.  Returns the
/// number of task executions.
pub fn fire<F>(tier: &Tier, budget: &InvocationBudget, task: &F, stop: &AtomicBool) -> u32
where
    F: Fn() + ?Sized,
{
    let mut executed = 0;
    for _ in 0..tier.per_period {
        if stop.load(Ordering::Acquire) {
            break;
        }
        if budget.claim() {
            task();
            executed += 1;
        }
    }
    trace!(
        period_ms = tier.period_ms(),
        per_period = tier.per_period,
        executed,
        attempts = budget.attempts(),
        "tier fired"
    );
    executed
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::thread;

    fn running() -> AtomicBool {
        AtomicBool::new(false)
    }

    // ── InvocationBudget ──────────────────────────────────────────────────────

    #[test]
    fn claim_succeeds_strictly_below_total() {
        let budget = InvocationBudget::new(3);
        assert!(budget.claim()); // 1 < 3
        assert!(budget.claim()); // 2 < 3
        assert!(!budget.claim()); // 3 == 3
        assert!(!budget.claim());
        assert_eq!(budget.attempts(), 4);
    }

    #[test]
    fn non_positive_total_never_claims() {
        for total in [0, -1, i64::MIN] {
            let budget = InvocationBudget::new(total);
            assert!(budget.is_exhausted());
            assert!(!budget.claim(), "total={total}");
        }
    }

    #[test]
    fn exhaustion_tracks_attempts() {
        let budget = InvocationBudget::new(2);
        assert!(!budget.is_exhausted());
        budget.claim();
        assert!(budget.is_exhausted());
    }

    // ── fire ──────────────────────────────────────────────────────────────────

    #[test]
    fn fire_runs_task_once_per_repetition() {
        let budget = InvocationBudget::new(100);
        let calls = AtomicU64::new(0);
        let task = || {
            calls.fetch_add(1, Ordering::Relaxed);
        };

        let executed = fire(&Tier::new(10, 7), &budget, &task, &running());

        assert_eq!(executed, 7);
        assert_eq!(calls.load(Ordering::Relaxed), 7);
        assert_eq!(budget.attempts(), 7);
    }

    #[test]
    fn fire_stops_executing_at_cap_but_keeps_counting() {
        let budget = InvocationBudget::new(5);
        let calls = AtomicU64::new(0);
        let task = || {
            calls.fetch_add(1, Ordering::Relaxed);
        };

        let executed = fire(&Tier::new(10, 9), &budget, &task, &running());

        assert_eq!(executed, 4, "total=5 allows 4 executions");
        assert_eq!(calls.load(Ordering::Relaxed), 4);
        assert_eq!(budget.attempts(), 9, "counter overshoots the total");
    }

    #[test]
    fn idle_tier_does_nothing() {
        let budget = InvocationBudget::new(10);
        let executed = fire(&Tier::new(100, 0), &budget, &|| panic!("must not run"), &running());
        assert_eq!(executed, 0);
        assert_eq!(budget.attempts(), 0);
    }

    #[test]
    fn raised_stop_flag_skips_the_batch() {
        let budget = InvocationBudget::new(10);
        let stop = AtomicBool::new(true);
        let executed = fire(&Tier::new(10, 5), &budget, &|| panic!("must not run"), &stop);
        assert_eq!(executed, 0);
        assert_eq!(budget.attempts(), 0);
    }

    #[test]
    fn concurrent_tiers_lose_no_increments() {
        const FIRINGS: u64 = 2_000;
        let budget = Arc::new(InvocationBudget::new(i64::MAX));
        let stop = Arc::new(running());
        let tiers = [Tier::new(10, 9), Tier::new(100, 7), Tier::new(1_000, 3)];

        let handles: Vec<_> = tiers
            .iter()
            .map(|&tier| {
                let budget = Arc::clone(&budget);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    for _ in 0..FIRINGS {
                        fire(&tier, &budget, &|| {}, &stop);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let expected: u64 = tiers.iter().map(|t| t.per_period as u64 * FIRINGS).sum();
        assert_eq!(budget.attempts() as u64, expected);
    }

    #[test]
    fn concurrent_tiers_never_exceed_cap() {
        let budget = Arc::new(InvocationBudget::new(500));
        let stop = Arc::new(running());
        let calls = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = [Tier::new(10, 9), Tier::new(100, 9), Tier::new(1_000, 9)]
            .into_iter()
            .map(|tier| {
                let budget = Arc::clone(&budget);
                let stop = Arc::clone(&stop);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    let task = || {
                        calls.fetch_add(1, Ordering::Relaxed);
                    };
                    for _ in 0..200 {
                        fire(&tier, &budget, &task, &stop);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::Relaxed), 499);
        assert_eq!(budget.attempts(), 3 * 9 * 200);
    }
}
