use std::time::{Duration, Instant};

pub const MIN_SLOW_EVERY: u32 = 3;
pub const MAX_SLOW_EVERY: u32 = 5;

/// What one poll of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Fast,
    FastAndSlow,
}

impl Tick {
    pub fn sampled(self) -> bool {
        self != Tick::Idle
    }
}

/// Modulo counter gating the expensive probes.
#[derive(Debug, Clone)]
pub struct SlowProbeCounter {
    count: u32,
    threshold: u32,
}

impl SlowProbeCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            count: 0,
            threshold: threshold.clamp(MIN_SLOW_EVERY, MAX_SLOW_EVERY),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Count one fast tick. Returns true (and resets) when the slow batch is due.
    pub fn advance(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.threshold {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

/// Decides when the fast tier runs.
#[derive(Debug, Clone)]
pub struct TickClock {
    interval: Duration,
    last: Instant,
}

impl TickClock {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self { interval, last: start }
    }

    /// Time since the previous tick if one is due at `now`. Marks the tick.
    pub fn due(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last);
        if elapsed >= self.interval {
            self.last = now;
            Some(elapsed)
        } else {
            None
        }
    }
}
