//! Blocking consumer loop, run on tokio's blocking pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camera::{CameraError, SharedCamera};
use contracts::ConsumerId;
use tracing::{debug, warn};

use super::ConsumerReport;

/// Pause after a failed start or an ended stream before asking again
const STARTUP_BACKOFF: Duration = Duration::from_secs(1);

/// Per-consumer loop settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerOptions {
    /// Minimum time between two requests, `None` = back to back
    pub period: Option<Duration>,
}

impl ConsumerOptions {
    /// Options for a request rate in Hz (non-positive = unpaced)
    pub fn from_fps(fps: f64) -> Self {
        Self {
            period: (fps > 0.0).then(|| Duration::from_secs_f64(1.0 / fps)),
        }
    }
}

/// Call `get_frame` until `stop` is set, then release the slot.
pub fn run_consumer(
    camera: Arc<SharedCamera>,
    options: ConsumerOptions,
    stop: Arc<AtomicBool>,
) -> ConsumerReport {
    let consumer = ConsumerId::next();
    let mut report = ConsumerReport::new(consumer);
    debug!(consumer_id = %consumer, source_id = %camera.source_id(), "consumer started");

    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();

        match camera.get_frame(consumer) {
            Ok(frame) => report.record_frame(&frame, started.elapsed()),
            Err(e) => {
                report.record_error();
                warn!(consumer_id = %consumer, error = %e, "get_frame failed");
                if matches!(
                    e,
                    CameraError::Startup { .. }
                        | CameraError::Spawn { .. }
                        | CameraError::SourceExhausted { .. }
                ) {
                    thread::sleep(STARTUP_BACKOFF);
                }
            }
        }

        if let Some(period) = options.period {
            let remaining = period.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
    }

    camera.release(consumer);
    debug!(consumer_id = %consumer, frames = report.frames, "consumer finished");
    report
}
