//! Fixed-rate pacing for sources that are not naturally paced by I/O

use std::thread;
use std::time::{Duration, Instant};

/// Sleeps so that consecutive `wait` calls are at least one period apart
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Option<Duration>,
    last: Option<Instant>,
}

impl Pacer {
    /// Pacer for `frequency_hz`; a non-positive frequency disables pacing
    pub fn new(frequency_hz: f64) -> Self {
        let interval = (frequency_hz > 0.0).then(|| Duration::from_secs_f64(1.0 / frequency_hz));
        Self {
            interval,
            last: None,
        }
    }

    /// Configured period
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Block until the next slot. The first call returns immediately.
    pub fn wait(&mut self) {
        if let (Some(interval), Some(last)) = (self.interval, self.last) {
            let remaining = interval.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        self.last = Some(Instant::now());
    }
}
