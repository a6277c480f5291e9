//! Monotonic tick schedule.
//!
//! Tick `n` is due at `anchor + n * tick`, where the anchor is the instant
//! of the first tick. Deadlines are never derived from the previous sleep,
//! so scheduling jitter does not accumulate.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct TickPacer {
    tick: Duration,
    anchor: Option<Instant>,
    ticks: u64,
}

impl TickPacer {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            anchor: None,
            ticks: 0,
        }
    }

    /// Tick length for `frames` samples per channel at `sample_rate`.
    pub fn tick_for(frames: usize, sample_rate: u32) -> Duration {
        Duration::from_nanos(frames as u64 * 1_000_000_000 / sample_rate.max(1) as u64)
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Ticks scheduled so far, the first included.
    pub fn ticks(&self) -> u64 {
        if self.anchor.is_some() {
            self.ticks + 1
        } else {
            0
        }
    }

    /// Deadline of the next tick. The first call anchors the schedule at
    /// `now` and is due immediately.
    pub fn next_deadline(&mut self) -> Instant {
        match self.anchor {
            None => {
                let now = Instant::now();
                self.anchor = Some(now);
                now
            }
            Some(anchor) => {
                self.ticks += 1;
                let offset = self.tick.as_nanos() as u64 * self.ticks;
                anchor + Duration::from_nanos(offset)
            }
        }
    }

    /// Drop the anchor; the next tick starts a new schedule.
    pub fn reset(&mut self) {
        self.anchor = None;
        self.ticks = 0;
    }
}
