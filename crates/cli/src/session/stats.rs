//! Session statistics.

use std::time::Duration;

use camera::CameraStats;
use contracts::{ConsumerId, Frame};
use observability::{RunningStats, StatsSummary};

/// What one consumer observed
#[derive(Debug, Clone)]
pub struct ConsumerReport {
    pub consumer: ConsumerId,
    /// Frames received
    pub frames: u64,
    /// Publishes that happened between two received frames
    pub skipped: u64,
    /// Received generations lower than the previous one (must stay 0)
    pub regressions: u64,
    /// Failed `get_frame` calls
    pub errors: u64,
    pub bytes: u64,
    /// Time spent inside `get_frame` (ms)
    pub wait_ms: RunningStats,
    last_generation: u64,
}

impl ConsumerReport {
    pub fn new(consumer: ConsumerId) -> Self {
        Self {
            consumer,
            frames: 0,
            skipped: 0,
            regressions: 0,
            errors: 0,
            bytes: 0,
            wait_ms: RunningStats::default(),
            last_generation: 0,
        }
    }

    pub fn record_frame(&mut self, frame: &Frame, waited: Duration) {
        if self.last_generation > 0 {
            if frame.generation < self.last_generation {
                self.regressions += 1;
            } else {
                self.skipped += frame.generation.saturating_sub(self.last_generation + 1);
            }
        }
        self.last_generation = frame.generation;
        self.frames += 1;
        self.bytes += frame.len() as u64;
        self.wait_ms.push(waited.as_secs_f64() * 1000.0);
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }
}

/// Statistics of a whole `run` session
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub source_id: String,
    pub duration: Duration,
    pub consumers: Vec<ConsumerReport>,
    pub camera: CameraStats,
}

impl SessionStats {
    /// Frames received by all consumers
    pub fn frames_delivered(&self) -> u64 {
        self.consumers.iter().map(|c| c.frames).sum()
    }

    /// Publishes per second
    pub fn publish_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.camera.frames_published as f64 / secs
        } else {
            0.0
        }
    }

    /// `get_frame` wait time over all consumers
    pub fn wait_summary(&self) -> StatsSummary {
        let mut all = RunningStats::default();
        for consumer in &self.consumers {
            all.merge(&consumer.wait_ms);
        }
        StatsSummary::from(&all)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Camera: {}", self.source_id);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames published: {}", self.camera.frames_published);
        println!("   ├─ Publish rate: {:.2} fps", self.publish_rate());
        println!("   ├─ Frames delivered: {}", self.frames_delivered());
        println!("   └─ get_frame wait (ms): {}", self.wait_summary());

        println!("\n📈 Producer");
        println!("   ├─ Runs started: {}", self.camera.producer_starts);
        println!("   ├─ Runs stopped: {}", self.camera.producer_stops);
        println!("   ├─ Startup failures: {}", self.camera.startup_failures);
        println!(
            "   ├─ Transient errors: {} ({} re-served)",
            self.camera.transient_errors, self.camera.frames_reserved
        );
        println!(
            "   ├─ Side task runs: {} ({} failed)",
            self.camera.side_task_runs, self.camera.side_task_failures
        );
        println!("   └─ Consumers reaped: {}", self.camera.consumers_reaped);

        println!("\n👥 Consumers ({})", self.consumers.len());
        for (i, c) in self.consumers.iter().enumerate() {
            let prefix = if i == self.consumers.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {}: {} frames, {} skipped, {} errors",
                prefix, c.consumer, c.frames, c.skipped, c.errors
            );
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(generation: u64) -> Frame {
        Frame::new(generation, vec![0u8; 8].into())
    }

    #[test]
    fn test_report_counts_skips_and_regressions() {
        let mut report = ConsumerReport::new(ConsumerId::from(1));
        report.record_frame(&payload(1), Duration::from_millis(2));
        report.record_frame(&payload(4), Duration::from_millis(2));
        report.record_frame(&payload(3), Duration::from_millis(2));

        assert_eq!(report.frames, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.regressions, 1);
        assert_eq!(report.bytes, 24);
    }

    #[test]
    fn test_publish_rate() {
        let stats = SessionStats {
            source_id: "cam".to_string(),
            duration: Duration::from_secs(2),
            consumers: vec![],
            camera: CameraStats {
                frames_published: 50,
                ..Default::default()
            },
        };
        assert!((stats.publish_rate() - 25.0).abs() < 1e-9);
        assert_eq!(stats.frames_delivered(), 0);
    }
}
