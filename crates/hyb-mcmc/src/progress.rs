use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle of a run as seen by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// No unit of work has been done yet.
    NotStarted,
    /// Sweeps below the thermalization threshold.
    Thermalizing,
    /// Thermalized and measuring.
    Sampling,
    /// Reported completion reached one.
    Done,
}

/// Sweep counter and dual stopping criterion.
///
/// Completion is zero while thermalizing and afterwards the larger of the
/// post-thermalization sweep fraction and the wall-clock fraction divided by
/// the pool size. The controller only reports; it never stops the chain.
#[derive(Debug, Clone)]
pub struct ProgressController {
    thermalization_sweeps: u64,
    total_sweeps: u64,
    sweep_count: u64,
    start_time: Duration,
    end_time: Duration,
    pool_size: usize,
}

impl ProgressController {
    /// Starts tracking at `start_time` with a budget of `max_time`.
    pub fn new(
        thermalization_sweeps: u64,
        total_sweeps: u64,
        start_time: Duration,
        max_time: Duration,
        pool_size: usize,
    ) -> Self {
        Self {
            thermalization_sweeps,
            total_sweeps,
            sweep_count: 0,
            start_time,
            end_time: start_time + max_time,
            pool_size: pool_size.max(1),
        }
    }

    /// Completed units of work.
    pub fn sweep_count(&self) -> u64 {
        self.sweep_count
    }

    /// Counts one completed unit of work.
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Returns true once the thermalization sweeps are done.
    pub fn is_thermalized(&self) -> bool {
        self.sweep_count >= self.thermalization_sweeps
    }

    /// Fraction of the run completed at clock reading `now`. May exceed one.
    pub fn fraction_completed(&self, now: Duration) -> f64 {
        if !self.is_thermalized() {
            return 0.0;
        }
        let work_fraction = (self.sweep_count as f64 - self.thermalization_sweeps as f64)
            / self.total_sweeps as f64;
        let elapsed = now.saturating_sub(self.start_time).as_secs_f64();
        let budget = (self.end_time - self.start_time).as_secs_f64();
        let time_fraction = elapsed / budget;
        // f64::max ignores a NaN operand, so an empty sweep budget falls back to time.
        work_fraction.max(time_fraction / self.pool_size as f64)
    }

    /// Current phase at clock reading `now`.
    pub fn phase(&self, now: Duration) -> Phase {
        if self.sweep_count == 0 {
            Phase::NotStarted
        } else if !self.is_thermalized() {
            Phase::Thermalizing
        } else if self.fraction_completed(now) >= 1.0 {
            Phase::Done
        } else {
            Phase::Sampling
        }
    }
}
