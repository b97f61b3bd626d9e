/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: QPS normalisation and the mixed-radix tier split.
//!
//! These are free functions rather than methods so they can be used and tested
//! independently of [`TierPlan`](super::TierPlan).

use super::DEFAULT_QPS;

/// Coerce a requested rate into a usable one.
///
/// Anything below `1` silently becomes [`DEFAULT_QPS`]; callers never get an
/// error for a nonsensical rate.
pub fn normalize_qps(qps: i32) -> u32 {
    if qps < 1 {
        DEFAULT_QPS
    } else {
        qps as u32
    }
}

/// Split `qps` into `(per_10ms, per_100ms, per_second)`.
///
/// The finest tier takes the hundreds, the middle tier the tens and the
/// one-second tier the units, so `per_10ms * 100 + per_100ms * 10 + per_second`
/// always reconstructs `qps`.
pub fn split_qps(qps: u32) -> (u32, u32, u32) {
    let per_10ms = qps / 100;
    let per_100ms = (qps - per_10ms * 100) / 10;
    let per_second = qps % 10;
    (per_10ms, per_100ms, per_second)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── normalize_qps ─────────────────────────────────────────────────────────

    #[test]
    fn normalize_keeps_positive_values() {
        assert_eq!(normalize_qps(1), 1);
        assert_eq!(normalize_qps(250), 250);
        assert_eq!(normalize_qps(i32::MAX), i32::MAX as u32);
    }

    #[test]
    fn normalize_replaces_non_positive_with_default() {
        assert_eq!(normalize_qps(0), DEFAULT_QPS);
        assert_eq!(normalize_qps(-1), DEFAULT_QPS);
        assert_eq!(normalize_qps(i32::MIN), DEFAULT_QPS);
    }

    // ── split_qps ─────────────────────────────────────────────────────────────

    #[test]
    fn split_all_three_digits() {
        assert_eq!(split_qps(999), (9, 9, 9));
    }

    #[test]
    fn split_below_one_hundred() {
        assert_eq!(split_qps(95), (0, 9, 5));
    }

    #[test]
    fn split_single_request_per_second() {
        assert_eq!(split_qps(1), (0, 0, 1));
    }

    #[test]
    fn split_large_rate_lands_in_finest_tier() {
        // 12_345 qps → 123 every 10 ms, 4 every 100 ms, 5 every second
        assert_eq!(split_qps(12_345), (123, 4, 5));
    }

    #[test]
    fn split_round_hundreds_leaves_coarse_tiers_empty() {
        assert_eq!(split_qps(100), (1, 0, 0));
        assert_eq!(split_qps(3_000), (30, 0, 0));
    }

    #[test]
    fn split_reconstructs_every_rate() {
        for qps in 1..=20_000u32 {
            let (a, b, c) = split_qps(qps);
            assert_eq!(a * 100 + b * 10 + c, qps, "qps={qps}");
            assert!(b < 10 && c < 10, "qps={qps}");
        }
    }
}
