//! Approximate fixed-rate task scheduler.
//!
//! [`RateScheduler`] owns a multi-threaded tokio runtime that serves as its
//! worker pool.  Each [`schedule_qps`](RateScheduler::schedule_qps) call splits
//! the requested rate into three tiers (see [`crate::plan`]) and arms one
//! periodic timer per tier on that pool.  Every firing runs a fixed-size batch
//! of claims against a counter shared by the call's three tiers; a claim below
//! the call's total invokes the task synchronously on the worker.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──► Active ──(schedule_qps × N)──► close() ──► Closed
//! ```
//!
//! Timers never stop on their own once the budget is spent; they keep firing
//! (and claiming) until [`close`](RateScheduler::close) tears the pool down.
//!
//! # Failure policy
//! A task that panics ends the timer of the tier it was invoked from.  The
//! call's other tiers, and every other call on the scheduler, keep running.
//!
//! # Example
//! ```rust,no_run
//! use qps_scheduler::RateScheduler;
//!
//! let scheduler = RateScheduler::new(0)?;
//! let handle = scheduler.schedule_qps(250, || { /* send one request */ }, 1_000)?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! scheduler.close();
//! println!("attempts: {}", handle.attempts());
//! # Ok::<(), qps_scheduler::SchedulerError>(())
//! ```

pub mod budget;
pub mod error;

pub use error::SchedulerError;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::plan::{Tier, TierPlan};

use budget::{fire, InvocationBudget};

type SharedTask = Arc<dyn Fn() + Send + Sync + 'static>;

// ── ScheduleHandle ────────────────────────────────────────────────────────────

/// Read-only view of one `schedule_qps` call.
///
/// Cloning is cheap; the counter is shared with the running tiers.  There is no
/// per-call cancellation: only [`RateScheduler::close`] stops timers.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    id: u64,
    plan: TierPlan,
    budget: Arc<InvocationBudget>,
}

impl ScheduleHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn plan(&self) -> &TierPlan {
        &self.plan
    }

    pub fn total_invocations(&self) -> i64 {
        self.budget.total()
    }

    /// Current counter value: claims made across all three tiers, including
    /// those past the total that did not run the task.
    pub fn attempts(&self) -> i64 {
        self.budget.attempts()
    }

    pub fn is_exhausted(&self) -> bool {
        self.budget.is_exhausted()
    }
}

// ── RateScheduler ─────────────────────────────────────────────────────────────

pub struct RateScheduler {
    config: SchedulerConfig,
    thread_num: usize,
    /// `None` once closed.
    runtime: Mutex<Option<Runtime>>,
    /// Raised by `close()`; checked by every tier before each repetition.
    stop: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl RateScheduler {
    /// Create a scheduler with `thread_num` workers.  Zero or negative selects
    /// the host processing-unit count.
    pub fn new(thread_num: i32) -> Result<Self, SchedulerError> {
        Self::with_config(SchedulerConfig::with_threads(thread_num))
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let threads = config.resolved_thread_num();
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("qps-worker")
            .enable_time()
            .build()
            .map_err(|source| SchedulerError::Runtime { threads, source })?;

        info!(
            threads,
            shutdown_timeout_ms = config.shutdown_timeout_ms,
            "RateScheduler started"
        );

        Ok(Self {
            config,
            thread_num: threads,
            runtime: Mutex::new(Some(runtime)),
            stop: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        })
    }

    /// Resolved worker pool size.
    pub fn thread_num(&self) -> usize {
        self.thread_num
    }

    pub fn is_closed(&self) -> bool {
        self.lock_runtime().is_none()
    }

    /// Run `task` at approximately `qps` invocations per second until
    /// `total_invocations - 1` executions have happened.
    ///
    /// `qps < 1` is treated as 100.  Returns as soon as the three tier timers
    /// are armed; the first firing of each tier happens one period later.
    ///
    /// # Errors
    /// [`SchedulerError::Closed`] if [`close`](Self::close) has already run.
    pub fn schedule_qps<F>(
        &self,
        qps: i32,
        task: F,
        total_invocations: i64,
    ) -> Result<ScheduleHandle, SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let guard = self.lock_runtime();
        let runtime = guard.as_ref().ok_or(SchedulerError::Closed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let plan = TierPlan::from_qps(qps);
        let budget = Arc::new(InvocationBudget::new(total_invocations));
        let task: SharedTask = Arc::new(task);
        let armed_at = Instant::now();

        for tier in plan.tiers() {
            debug!(
                schedule = id,
                period_ms = tier.period_ms(),
                per_period = tier.per_period,
                idle = tier.is_idle(),
                "Arming tier timer"
            );
            runtime.spawn(drive_tier(
                id,
                tier,
                armed_at,
                Arc::clone(&budget),
                Arc::clone(&task),
                Arc::clone(&self.stop),
            ));
        }

        info!(
            schedule = id,
            requested_qps = qps,
            qps = plan.qps,
            per_10ms = plan.per_10ms,
            per_100ms = plan.per_100ms,
            per_second = plan.per_second,
            total_invocations,
            "Schedule armed"
        );

        Ok(ScheduleHandle { id, plan, budget })
    }

    /// Stop every timer of every schedule and release the worker pool.
    ///
    /// Waits at most the configured shutdown timeout (60 s by default) for
    /// task invocations that are already running.  Never fails: a wait that
    /// runs out is abandoned, and calling `close()` again is a no-op.
    ///
    /// From inside an async context the runtime may not block the current
    /// thread on its own teardown, so the bounded wait runs on a helper thread
    /// that `close()` joins.
    pub fn close(&self) {
        self.stop.store(true, Ordering::Release);

        let Some(runtime) = self.lock_runtime().take() else {
            debug!("RateScheduler::close: already closed");
            return;
        };

        let timeout = self.config.shutdown_timeout();
        let started = std::time::Instant::now();

        if Handle::try_current().is_ok() {
            warn!("RateScheduler::close called from an async context, waiting for the worker pool on a helper thread");
            let waiter = std::thread::spawn(move || runtime.shutdown_timeout(timeout));
            if waiter.join().is_err() {
                warn!("Worker pool shutdown thread panicked");
            }
        } else {
            runtime.shutdown_timeout(timeout);
        }
        let elapsed = started.elapsed();

        if elapsed >= timeout {
            warn!(
                ?elapsed,
                ?timeout,
                "Worker pool did not drain within the shutdown timeout, abandoning running tasks"
            );
        } else {
            info!(?elapsed, "RateScheduler closed");
        }
    }

    fn lock_runtime(&self) -> MutexGuard<'_, Option<Runtime>> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RateScheduler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        let runtime = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            debug!("RateScheduler dropped without close(), detaching worker pool");
            runtime.shutdown_background();
        }
    }
}

// ── Tier driver ───────────────────────────────────────────────────────────────

/// Fixed-rate timer loop for one tier: first firing one period after
/// `armed_at`, then every period.  Missed ticks are fired back to back.
async fn drive_tier(
    schedule: u64,
    tier: Tier,
    armed_at: Instant,
    budget: Arc<InvocationBudget>,
    task: SharedTask,
    stop: Arc<AtomicBool>,
) {
    let mut ticker = interval_at(armed_at + tier.period, tier.period);
    let mut total_executed: u64 = 0;
    loop {
        ticker.tick().await;
        if stop.load(Ordering::Acquire) {
            break;
        }
        match catch_unwind(AssertUnwindSafe(|| fire(&tier, &budget, &*task, &stop))) {
            Ok(executed) => total_executed += u64::from(executed),
            Err(_) => {
                warn!(
                    schedule,
                    period_ms = tier.period_ms(),
                    attempts = budget.attempts(),
                    "Task panicked, tier stops firing"
                );
                break;
            }
        }
    }
    debug!(
        schedule,
        period_ms = tier.period_ms(),
        executed = total_executed,
        "Tier timer finished"
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
