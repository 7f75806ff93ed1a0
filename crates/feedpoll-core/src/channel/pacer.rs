//! Minimum spacing between dispatch starts.

use std::thread;
use std::time::{Duration, Instant};

/// Tracks the earliest instant the next dispatch may start.
///
/// The stamp is taken right after the wait, before the wrapped call runs,
/// so the spacing is measured between dispatch starts: a slow response does
/// not push the next dispatch further out.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    period: Duration,
    next: Option<Instant>,
}

impl Pacer {
    /// A zero period never waits.
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Earliest start of the next dispatch; `None` before the first one.
    pub fn next_permitted(&self) -> Option<Instant> {
        self.next
    }

    /// Block until the next dispatch is permitted, then stamp the one after.
    pub fn pace(&mut self) {
        if self.period.is_zero() {
            return;
        }
        if let Some(next) = self.next {
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }
        }
        self.next = Some(Instant::now() + self.period);
    }
}
