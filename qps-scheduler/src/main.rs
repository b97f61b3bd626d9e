/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info, trace};

use qps_scheduler::config::{
    RunConfig, ScheduleEntry, SchedulerConfig, DEFAULT_DURATION_SECS, DEFAULT_TOTAL_INVOCATIONS,
};
use qps_scheduler::plan::DEFAULT_QPS;
use qps_scheduler::{RateScheduler, ScheduleHandle};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Approximate fixed-QPS scheduler driver.
///
/// Runs one or more schedules with a counting task, then reports how many
/// invocations actually happened.
///
/// Example:
///   qps-scheduler --qps 250 --total 1000 --duration 5
///   qps-scheduler --config run.yaml
#[derive(Debug, Parser)]
#[command(
    name = "qps-scheduler",
    about = "Approximate fixed-QPS task scheduler",
    long_about = None,
)]
struct Cli {
    /// Target invocations per second (values below 1 become 100).
    #[arg(short = 'q', long = "qps", default_value_t = DEFAULT_QPS as i32, allow_negative_numbers = true)]
    qps: i32,

    /// Invocation budget; at most `total - 1` tasks run.
    #[arg(short = 'n', long = "total", default_value_t = DEFAULT_TOTAL_INVOCATIONS, allow_negative_numbers = true)]
    total: i64,

    /// Worker threads (0 or below = one per processing unit).
    #[arg(short = 't', long = "threads", default_value_t = 0, allow_negative_numbers = true)]
    threads: i32,

    /// Seconds to run before closing the scheduler.
    #[arg(short = 'd', long = "duration", default_value_t = DEFAULT_DURATION_SECS)]
    duration_secs: u64,

    /// Path to a YAML run file.  Overrides the single-schedule flags above.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_run_config(self) -> anyhow::Result<RunConfig> {
        match &self.config {
            Some(path) => RunConfig::load_from_file(path),
            None => Ok(RunConfig {
                scheduler: SchedulerConfig::with_threads(self.threads),
                duration_secs: self.duration_secs,
                schedules: vec![ScheduleEntry {
                    name: String::from("cli"),
                    qps: self.qps,
                    total_invocations: self.total,
                }],
            }),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        qps      = cli.qps,
        total    = cli.total,
        threads  = cli.threads,
        duration = cli.duration_secs,
        config   = ?cli.config,
        "Configuration"
    );

    let run = match cli.into_run_config() {
        Ok(run) => run,
        Err(e) => {
            error!("Failed to load run configuration: {:#}", e);
            process::exit(1);
        }
    };

    let scheduler = match RateScheduler::with_config(run.scheduler.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to start scheduler: {}", e);
            process::exit(1);
        }
    };

    // ── Start every schedule on the shared pool ───────────────────────────────
    let mut runs: Vec<(ScheduleEntry, ScheduleHandle, Arc<AtomicU64>)> = Vec::new();
    for entry in &run.schedules {
        let executed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&executed);
        let name = entry.name.clone();
        let task = move || {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(schedule = %name, n, "invocation");
        };

        match scheduler.schedule_qps(entry.qps, task, entry.total_invocations) {
            Ok(handle) => runs.push((entry.clone(), handle, executed)),
            Err(e) => {
                error!(schedule = %entry.name, "Failed to schedule: {}", e);
                scheduler.close();
                process::exit(1);
            }
        }
    }

    let started = Instant::now();
    std::thread::sleep(run.duration());
    scheduler.close();
    let elapsed = started.elapsed().as_secs_f64();

    // ── Report ────────────────────────────────────────────────────────────────
    for (entry, handle, executed) in &runs {
        let executed = executed.load(Ordering::Relaxed);
        info!(
            "  [{name}]  target={qps}qps  executed={executed}  attempts={attempts}  budget={total}  rate={rate:.1}/s",
            name = entry.name,
            qps = handle.plan().qps,
            attempts = handle.attempts(),
            total = handle.total_invocations(),
            rate = executed as f64 / elapsed,
        );
    }
}
