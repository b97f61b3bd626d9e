/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! qps-scheduler – approximate fixed-rate task scheduling
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── plan/           – QPS normalisation and 10ms / 100ms / 1s tier split
//! ├── scheduler/      – RateScheduler: worker pool, timers, shutdown
//! │   └── budget      – per-call invocation counter and firing batch
//! └── config/         – scheduler settings and YAML run file
//! ```

pub mod config;
pub mod plan;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use plan::{Tier, TierPlan};
pub use scheduler::{RateScheduler, ScheduleHandle, SchedulerError};
