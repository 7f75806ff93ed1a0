//! Run-level backoff for the outer polling loop.
//!
//! Paces whole fetch cycles: a fixed period while things work, exponential
//! growth while a failure persists, and a short un-penalized pause after a
//! transient failure. All transitions happen in [`Backoff::end_run`].

use std::thread;
use std::time::{Duration, Instant};

/// Result of one fetch cycle, as understood by [`Backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The cycle worked; resume the regular period.
    Success,
    /// Persistent failure; grow the delay exponentially.
    Failure,
    /// Transient failure; try again after one growth base.
    Retry,
}

#[derive(Debug, Clone)]
pub struct Backoff {
    period: Duration,
    exponential_base: Option<Duration>,
    /// 0 = uncapped.
    max_exponent: u32,
    failures: u32,
    run_started: Option<Instant>,
    next_run: Option<Instant>,
}

impl Backoff {
    /// Backoff with the growth base equal to `period` and no exponent cap.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            exponential_base: None,
            max_exponent: 0,
            failures: 0,
            run_started: None,
            next_run: None,
        }
    }

    /// Growth base for `Failure` and `Retry`; defaults to the period.
    /// A zero base also falls back to the period.
    pub fn with_exponential_base(mut self, base: Duration) -> Self {
        self.exponential_base = (!base.is_zero()).then_some(base);
        self
    }

    /// Cap on the growth exponent; 0 leaves it uncapped.
    pub fn with_max_exponent(mut self, max_exponent: u32) -> Self {
        self.max_exponent = max_exponent;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Consecutive failures recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn run_started(&self) -> Option<Instant> {
        self.run_started
    }

    pub fn next_run(&self) -> Option<Instant> {
        self.next_run
    }

    /// Scheduled delay between the last run start and the next run.
    pub fn delay(&self) -> Option<Duration> {
        Some(self.next_run?.duration_since(self.run_started?))
    }

    fn exponential_base(&self) -> Duration {
        self.exponential_base.unwrap_or(self.period)
    }

    pub fn start_run(&mut self) {
        self.run_started = Some(Instant::now());
    }

    /// Record the outcome of the current run and schedule the next one,
    /// relative to the run start (not its end). Returns the next run instant.
    pub fn end_run(&mut self, outcome: Outcome) -> Instant {
        let started = *self.run_started.get_or_insert_with(Instant::now);
        let delay = match outcome {
            Outcome::Success => {
                self.failures = 0;
                self.period
            }
            Outcome::Failure => {
                let mut exponent = self.failures;
                self.failures = self.failures.saturating_add(1);
                if self.max_exponent > 0 {
                    exponent = exponent.min(self.max_exponent);
                }
                let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
                self.exponential_base().saturating_mul(factor)
            }
            Outcome::Retry => {
                self.failures = 1;
                self.exponential_base()
            }
        };

        let next = started
            .checked_add(delay)
            .unwrap_or_else(|| started + Duration::from_secs(u64::from(u32::MAX)));
        self.next_run = Some(next);
        next
    }

    /// Time left until the next scheduled run; zero if it is due or none is scheduled.
    pub fn remaining(&self) -> Duration {
        self.next_run
            .map(|next| next.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    /// Block until the next scheduled run; returns immediately if it is due.
    pub fn wait(&self) {
        let sleep = self.remaining();
        if !sleep.is_zero() {
            tracing::debug!(sleep_secs = sleep.as_secs_f64(), "waiting for next run");
            thread::sleep(sleep);
        }
    }
}
