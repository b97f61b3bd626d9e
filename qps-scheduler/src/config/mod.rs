//! Scheduler settings and the YAML run file.
//!
//! [`SchedulerConfig`] is what a [`RateScheduler`] is built from.  The binary
//! additionally reads a [`RunConfig`] describing which schedules to run and
//! for how long.
//!
//! The expected YAML structure is:
//! ```yaml
//! scheduler:
//!   thread_num: 4
//!   shutdown_timeout_ms: 60000
//! duration_secs: 5
//! schedules:
//!   - name: search
//!     qps: 250
//!     total_invocations: 1000
//! ```
//!
//! [`RateScheduler`]: crate::scheduler::RateScheduler

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Upper bound on how long `close()` waits for running work.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 60_000;

pub const DEFAULT_TOTAL_INVOCATIONS: i64 = 1_000;

pub const DEFAULT_DURATION_SECS: u64 = 10;

fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

fn default_qps() -> i32 {
    crate::plan::DEFAULT_QPS as i32
}

fn default_total_invocations() -> i64 {
    DEFAULT_TOTAL_INVOCATIONS
}

fn default_duration_secs() -> u64 {
    DEFAULT_DURATION_SECS
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// Construction parameters for a `RateScheduler`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Worker pool size.  Zero or negative selects the host processing-unit
    /// count.
    #[serde(default)]
    pub thread_num: i32,

    /// Bound on the wait performed by `close()`, in milliseconds.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_num: 0,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn with_threads(thread_num: i32) -> Self {
        Self {
            thread_num,
            ..Default::default()
        }
    }

    /// Pool size after applying the automatic default (always ≥ 1).
    pub fn resolved_thread_num(&self) -> usize {
        if self.thread_num > 0 {
            self.thread_num as usize
        } else {
            available_processing_units()
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Host processing-unit count, falling back to `1` when it cannot be queried.
pub fn available_processing_units() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// One schedule to start on the shared scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_qps")]
    pub qps: i32,
    #[serde(default = "default_total_invocations")]
    pub total_invocations: i64,
}

impl Default for ScheduleEntry {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            qps: default_qps(),
            total_invocations: DEFAULT_TOTAL_INVOCATIONS,
        }
    }
}

/// Everything the binary needs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// How long to let the schedules run before closing the scheduler.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            duration_secs: DEFAULT_DURATION_SECS,
            schedules: vec![ScheduleEntry::default()],
        }
    }
}

impl RunConfig {
    /// Parse `path` into a `RunConfig`.
    ///
    /// * An empty or missing `schedules` list is replaced by one default
    ///   schedule (100 qps, 1000 invocations).
    /// * Unnamed schedules are named after their position.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading run configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let mut config: RunConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        if config.schedules.is_empty() {
            warn!("No schedules found in configuration file, using default schedule");
            config.schedules.push(ScheduleEntry::default());
        }

        for (idx, entry) in config.schedules.iter_mut().enumerate() {
            if entry.name.is_empty() {
                entry.name = format!("schedule-{idx}");
            }
            debug!(
                "  Schedule: {} | qps: {} | total: {}",
                entry.name, entry.qps, entry.total_invocations
            );
        }

        info!(
            schedules = config.schedules.len(),
            thread_num = config.scheduler.thread_num,
            duration_secs = config.duration_secs,
            "Run configuration loaded"
        );

        Ok(config)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
