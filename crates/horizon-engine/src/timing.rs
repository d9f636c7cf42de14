//! Tick pacing and tick cost tracking.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept for the rolling average.
const MAX_SAMPLES: usize = 120;

/// Paces the streaming loop to a fixed tick rate.
#[derive(Debug)]
pub struct TickTiming {
    ticks_per_second: u32,
    tick_budget: Duration,
    tick_start: Instant,
    max_delta: f32,
    work_times: VecDeque<f32>,
}

impl Default for TickTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl TickTiming {
    /// Creates pacing for `ticks_per_second` (at least one).
    #[must_use]
    pub fn new(ticks_per_second: u32) -> Self {
        let ticks_per_second = ticks_per_second.max(1);
        Self {
            ticks_per_second,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(ticks_per_second)),
            tick_start: Instant::now(),
            max_delta: 0.25,
            work_times: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    /// Marks the start of a tick. Returns seconds since the previous start,
    /// clamped so a stall does not teleport the observer.
    pub fn begin_tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = (now - self.tick_start).as_secs_f32().min(self.max_delta);
        self.tick_start = now;
        delta
    }

    /// Records how long the tick's work took.
    pub fn end_tick(&mut self) {
        let work = self.tick_start.elapsed().as_secs_f32();
        self.work_times.push_back(work);
        if self.work_times.len() > MAX_SAMPLES {
            self.work_times.pop_front();
        }
    }

    /// Sleeps for whatever is left of the tick budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.tick_start.elapsed();
        if elapsed < self.tick_budget {
            std::thread::sleep(self.tick_budget - elapsed);
        }
    }

    /// Average tick work in milliseconds.
    #[must_use]
    pub fn average_tick_ms(&self) -> f32 {
        if self.work_times.is_empty() {
            return 0.0;
        }
        self.work_times.iter().sum::<f32>() / self.work_times.len() as f32 * 1000.0
    }

    /// Configured tick rate.
    #[must_use]
    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Time budget per tick.
    #[must_use]
    pub fn tick_budget(&self) -> Duration {
        self.tick_budget
    }
}
