/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for [`RateScheduler`](super::RateScheduler).
//!
//! Rate and pool-size inputs are coerced rather than rejected, and `close()`
//! never fails, so only two conditions reach the caller:
//!
//! | Variant | Raised by |
//! |---|---|
//! | `Runtime` | `RateScheduler::new` / `with_config` |
//! | `Closed` | `RateScheduler::schedule_qps` |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker pool could not be started (the OS refused to spawn threads).
    #[error("failed to start worker pool with {threads} thread(s): {source}")]
    Runtime {
        threads: usize,
        #[source]
        source: std::io::Error,
    },

    /// `schedule_qps()` was called after `close()`.
    #[error("scheduler is closed, no new schedules are accepted")]
    Closed,
}
