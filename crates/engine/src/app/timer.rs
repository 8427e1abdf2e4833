use std::time::{Duration, Instant};

/// Polled interval counter: fires once the elapsed time since the last
/// firing exceeds the interval, then restarts from `now`.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval: Duration,
    started: Option<Instant>,
}

impl IntervalTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn restart(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// A timer that was never started starts now and does not fire.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(started) = self.started else {
            self.started = Some(now);
            return false;
        };
        if now.saturating_duration_since(started) > self.interval {
            self.started = Some(now);
            true
        } else {
            false
        }
    }
}
