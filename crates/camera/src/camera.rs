//! SharedCamera - the consumer-facing facade of one camera

use std::sync::Arc;
use std::time::{Duration, Instant};

use broadcast::{BroadcastSignal, WaitOutcome};
use contracts::{
    CameraConfig, ConsumerId, Frame, FrameSourceFactory, ReapPolicy, ScheduledTask, SourceId,
};
use tracing::{debug, instrument, trace};

use crate::error::CameraError;
use crate::lifecycle::{LifecycleSettings, ProducerLifecycle, ProducerState, RunExit};
use crate::stats::CameraStats;

/// Upper bound of one signal wait inside `get_frame`.
///
/// Between two waits the caller re-checks the producer, so a run that
/// stopped under it is restarted (or reported) within this delay.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// One physical camera shared by any number of consumers.
///
/// The first [`get_frame`](Self::get_frame) starts the production thread;
/// it stops by itself once nobody asked for a frame for the idle timeout.
/// Every consumer sees every publish at most once and never waits for the
/// slowest consumer.
pub struct SharedCamera {
    source_id: SourceId,
    signal: Arc<BroadcastSignal>,
    lifecycle: ProducerLifecycle,
    frame_timeout: Duration,
}

impl SharedCamera {
    /// Build a stopped camera from its configuration
    pub fn new(
        config: &CameraConfig,
        factory: Arc<dyn FrameSourceFactory>,
        side_task: Option<ScheduledTask>,
    ) -> Self {
        let signal = Arc::new(BroadcastSignal::with_policy(
            config.stale_timeout_duration(),
            config.reap_policy,
        ));
        let lifecycle = ProducerLifecycle::new(
            factory,
            Arc::clone(&signal),
            LifecycleSettings::from(config),
            side_task,
        );

        Self {
            source_id: SourceId::new(&config.id),
            signal,
            lifecycle,
            frame_timeout: config.frame_timeout_duration(),
        }
    }

    /// Camera identity
    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    /// Block until a frame newer than `consumer`'s previous one is
    /// published, then return it.
    ///
    /// Starts the producer when it is stopped. Fails when the source cannot
    /// be opened, when the run this call waits on ends with an
    /// unrecoverable fault, or when no frame arrives within the frame
    /// timeout. A run that reaches end of stream is not restarted within
    /// the same call; the next call opens a fresh source.
    #[instrument(level = "trace", skip(self), fields(source_id = %self.source_id))]
    pub fn get_frame(&self, consumer: ConsumerId) -> Result<Frame, CameraError> {
        let deadline = Instant::now() + self.frame_timeout;
        self.lifecycle.touch();
        self.signal.register(consumer);

        loop {
            let run_id = match self.lifecycle.ensure_running() {
                Ok(run_id) => run_id,
                Err(e) => {
                    self.signal.remove(consumer);
                    return Err(e);
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(CameraError::frame_timeout(
                    self.source_id.as_str(),
                    self.frame_timeout,
                ));
            }

            match self.signal.await_next_timeout(consumer, (deadline - now).min(WAIT_SLICE)) {
                WaitOutcome::Signaled => {
                    if let Some(frame) = self.lifecycle.take_frame(consumer) {
                        self.lifecycle.metrics().inc_frames_delivered();
                        observability::record_frame_latency_ms(
                            &self.source_id,
                            frame.produced_at.elapsed().as_secs_f64() * 1000.0,
                        );
                        trace!(consumer_id = %consumer, generation = frame.generation, "frame delivered");
                        return Ok(frame);
                    }
                }
                WaitOutcome::Interrupted | WaitOutcome::TimedOut => {
                    match self.lifecycle.exit_of(run_id) {
                        Some(RunExit::Failed(reason)) => {
                            debug!(consumer_id = %consumer, run_id, "run failed under waiting consumer");
                            return Err(CameraError::source_failed(self.source_id.as_str(), reason));
                        }
                        // Only an idle stop is restarted within the same call
                        Some(RunExit::Exhausted) => {
                            debug!(consumer_id = %consumer, run_id, "source exhausted under waiting consumer");
                            return Err(CameraError::source_exhausted(self.source_id.as_str()));
                        }
                        Some(RunExit::Idle) | None => {}
                    }
                }
            }
        }
    }

    /// Drop `consumer`'s slot now instead of waiting for the stale reap.
    ///
    /// Returns `true` if the consumer was registered.
    pub fn release(&self, consumer: ConsumerId) -> bool {
        let removed = self.signal.remove(consumer);
        if removed {
            debug!(source_id = %self.source_id, consumer_id = %consumer, "consumer released");
        }
        removed
    }

    /// Latest published frame without waiting
    pub fn latest_frame(&self) -> Option<Frame> {
        self.lifecycle.current_frame()
    }

    /// Registered consumer slots
    pub fn consumer_count(&self) -> usize {
        self.signal.slot_count()
    }

    /// Producer state
    pub fn state(&self) -> ProducerState {
        self.lifecycle.state()
    }

    /// Whether the production thread is alive
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Number of producer runs started so far
    pub fn run_count(&self) -> u64 {
        self.lifecycle.run_count()
    }

    /// Exit of the most recent finished run
    pub fn last_exit(&self) -> Option<(u64, RunExit)> {
        self.lifecycle.last_exit()
    }

    /// Block until the producer is stopped or `timeout` elapses
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        self.lifecycle.wait_until_stopped(timeout)
    }

    /// Counter snapshot
    pub fn stats(&self) -> CameraStats {
        self.lifecycle.metrics().snapshot()
    }

    /// Reap policy of the broadcast signal
    pub fn reap_policy(&self) -> ReapPolicy {
        self.signal.reap_policy()
    }

    /// Frame timeout of `get_frame`
    pub fn frame_timeout(&self) -> Duration {
        self.frame_timeout
    }
}

impl std::fmt::Debug for SharedCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCamera")
            .field("source_id", &self.source_id)
            .field("lifecycle", &self.lifecycle)
            .field("consumers", &self.consumer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MockSourceSettings, SourceConfig};
    use sources::{MockFrameSource, MockSourceConfig, MockSourceFactory};
    use std::thread;

    fn config(id: &str) -> CameraConfig {
        CameraConfig::new(id, SourceConfig::Mock(MockSourceSettings::default()))
            .idle_timeout(Duration::from_millis(200))
            .frame_timeout(Duration::from_secs(2))
    }

    fn mock(id: &str, hz: f64) -> MockSourceFactory {
        MockSourceFactory::new(MockSourceConfig::new(id, hz).with_payload_size(64))
    }

    #[test]
    fn test_first_get_frame_starts_producer() {
        let factory = Arc::new(mock("cam", 200.0));
        let camera = SharedCamera::new(&config("cam"), factory.clone(), None);
        assert_eq!(camera.state(), ProducerState::Stopped);

        let frame = camera.get_frame(ConsumerId::next()).unwrap();
        assert!(frame.generation >= 1);
        assert!(MockFrameSource::is_intact(&frame.data));
        assert!(camera.is_running());
        assert_eq!(factory.counters().opens(), 1);
    }

    #[test]
    fn test_consecutive_calls_return_newer_frames() {
        let camera = SharedCamera::new(&config("cam"), Arc::new(mock("cam", 200.0)), None);
        let consumer = ConsumerId::next();

        let mut last = 0;
        for _ in 0..10 {
            let frame = camera.get_frame(consumer).unwrap();
            assert!(frame.generation > last);
            last = frame.generation;
        }
        assert_eq!(camera.stats().frames_delivered, 10);
    }

    #[test]
    fn test_startup_failure_is_surfaced() {
        let factory = MockSourceFactory::new(MockSourceConfig::new("cam", 100.0).with_open_failure());
        let camera = SharedCamera::new(&config("cam"), Arc::new(factory), None);
        let consumer = ConsumerId::next();

        let err = camera.get_frame(consumer).unwrap_err();
        assert!(matches!(err, CameraError::Startup { .. }));
        assert_eq!(camera.state(), ProducerState::Stopped);
        assert_eq!(camera.consumer_count(), 0);
    }

    #[test]
    fn test_fatal_fault_fails_waiting_consumer() {
        // 20 Hz keeps run 1 alive while the second call starts waiting
        let factory = MockSourceFactory::new(MockSourceConfig::new("cam", 20.0).with_fatal_failure_at(2));
        let camera = SharedCamera::new(&config("cam"), Arc::new(factory), None);
        let consumer = ConsumerId::next();

        camera.get_frame(consumer).unwrap();
        let err = camera.get_frame(consumer).unwrap_err();
        assert!(matches!(err, CameraError::SourceFailed { .. }));
    }

    #[test]
    fn test_frame_timeout_when_source_stalls() {
        // 0.5 Hz: the second frame arrives long after the timeout
        let factory = MockSourceFactory::new(MockSourceConfig::new("cam", 0.5).with_payload_size(64));
        let camera = SharedCamera::new(
            &config("cam").frame_timeout(Duration::from_millis(300)),
            Arc::new(factory),
            None,
        );
        let consumer = ConsumerId::next();

        camera.get_frame(consumer).unwrap();
        let err = camera.get_frame(consumer).unwrap_err();
        assert!(matches!(err, CameraError::FrameTimeout { .. }));
    }

    #[test]
    fn test_idle_stop_then_restart() {
        let factory = Arc::new(mock("cam", 200.0));
        let camera = SharedCamera::new(&config("cam"), factory.clone(), None);
        let consumer = ConsumerId::next();

        let before = camera.get_frame(consumer).unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(2)));
        assert_eq!(camera.last_exit(), Some((1, RunExit::Idle)));

        let after = camera.get_frame(consumer).unwrap();
        assert!(after.generation > before.generation);
        assert_eq!(camera.run_count(), 2);
        assert_eq!(factory.counters().opens(), 2);
    }

    #[test]
    fn test_release_removes_slot() {
        let camera = SharedCamera::new(&config("cam"), Arc::new(mock("cam", 200.0)), None);
        let consumer = ConsumerId::next();

        camera.get_frame(consumer).unwrap();
        assert_eq!(camera.consumer_count(), 1);
        assert!(camera.release(consumer));
        assert!(!camera.release(consumer));
        assert_eq!(camera.consumer_count(), 0);
    }

    #[test]
    fn test_consumers_share_one_producer() {
        let factory = Arc::new(mock("cam", 200.0));
        let camera = Arc::new(SharedCamera::new(&config("cam"), factory.clone(), None));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let camera = Arc::clone(&camera);
                thread::spawn(move || {
                    let consumer = ConsumerId::next();
                    (0..5).map(|_| camera.get_frame(consumer).unwrap().generation).collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let generations = handle.join().unwrap();
            assert!(generations.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(factory.counters().opens(), 1);
    }
}
