//! Frame Scheduler
//!
//! Drains a [`RenderPool`] one frame at a time.
//!
//! # Algorithm
//!
//! On each tick:
//!
//! 1. Record the frame start from the clock.
//! 2. Pop the oldest task and run it.
//! 3. If the time since frame start is still under the budget and tasks
//!    remain, go back to 2. Otherwise yield until the next tick.
//!
//! At least one task runs per tick, so a single slow render cannot stall the
//! queue. Work that does not fit is left for later frames in the same order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::clock::{Clock, SystemClock};
use super::pool::RenderPool;
use crate::config::SchedulerConfig;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Tasks run during this frame.
    pub executed: usize,
    /// Tasks still queued after the frame.
    pub remaining: usize,
    /// Time spent in the frame.
    pub elapsed: Duration,
}

/// Runs queued render tasks under a per-frame time budget.
#[derive(Clone)]
pub struct FrameScheduler {
    pool: RenderPool,
    budget: Duration,
    clock: Arc<dyn Clock>,
}

impl FrameScheduler {
    /// Create a scheduler on the system clock.
    pub fn new(pool: RenderPool, config: &SchedulerConfig) -> Self {
        Self::with_clock(pool, config.frame_budget(), Arc::new(SystemClock))
    }

    pub fn with_clock(pool: RenderPool, budget: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            budget,
            clock,
        }
    }

    pub fn pool(&self) -> &RenderPool {
        &self.pool
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Run one frame.
    pub fn tick(&self) -> FrameReport {
        let start = self.clock.now();
        let mut executed = 0;

        // The pool lock is released before each task runs; tasks may queue
        // more work, which this same frame picks up if the budget allows.
        while let Some((id, task)) = self.pool.pop() {
            tracing::trace!(task = %id, "running render task");
            task();
            executed += 1;
            if self.clock.now().duration_since(start) >= self.budget {
                break;
            }
        }

        let report = FrameReport {
            executed,
            remaining: self.pool.len(),
            elapsed: self.clock.now().duration_since(start),
        };
        if report.remaining > 0 {
            tracing::debug!(
                executed = report.executed,
                remaining = report.remaining,
                "frame budget exhausted"
            );
        }
        report
    }

    /// Tick until the pool is empty and return the number of frames used.
    ///
    /// Does not return if tasks keep re-queueing themselves.
    pub fn drain(&self) -> usize {
        let mut frames = 0;
        while !self.pool.is_empty() {
            self.tick();
            frames += 1;
        }
        frames
    }

    /// Tick once per frame budget until `shutdown` becomes `true` or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.budget.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(budget = ?self.budget, "frame loop started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(remaining = self.pool.len(), "frame loop stopped");
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pool", &self.pool)
            .field("budget", &self.budget)
            .finish()
    }
}
