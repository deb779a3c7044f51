//! ProducerLifecycle - lazy start, production loop and idle stop of one camera
//!
//! State machine:
//! ```text
//! Stopped --ensure_running (open ok)--> Running
//! Running --idle / end of stream / fatal error--> Stopped
//! ```
//! The transition to `Running` happens under the control lock, so concurrent
//! starters never open the source twice.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use broadcast::BroadcastSignal;
use bytes::Bytes;
use contracts::{
    CameraConfig, ConsumerId, FaultKind, Frame, FrameSource, FrameSourceFactory, ScheduledTask,
    SourceId,
};
use tracing::{debug, error, info, warn};

use crate::error::CameraError;
use crate::stats::CameraMetrics;

/// Whether a production thread is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Stopped,
    Running,
}

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunExit {
    /// No consumer asked for a frame within the idle timeout
    Idle,
    /// The source reported end of stream
    Exhausted,
    /// Unrecoverable source fault
    Failed(String),
}

impl RunExit {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Exhausted => "exhausted",
            Self::Failed(_) => "failed",
        }
    }
}

/// Loop tuning taken from the camera configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Stop after this long without a consumer request
    pub idle_timeout: Duration,
    /// Fail the run after more consecutive transient errors than this
    pub max_consecutive_transient_errors: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            max_consecutive_transient_errors: 25,
        }
    }
}

impl From<&CameraConfig> for LifecycleSettings {
    fn from(config: &CameraConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout_duration(),
            max_consecutive_transient_errors: config.max_consecutive_transient_errors,
        }
    }
}

#[derive(Debug)]
struct Control {
    state: ProducerState,
    /// Id of the current (or last) run, 0 before the first start
    run_id: u64,
    last_exit: Option<(u64, RunExit)>,
    thread: Option<JoinHandle<()>>,
}

/// State shared between the lifecycle owner and its production thread
struct ProducerShared {
    source_id: SourceId,
    settings: LifecycleSettings,
    side_task: Option<ScheduledTask>,
    signal: Arc<BroadcastSignal>,
    frame: RwLock<Option<Frame>>,
    generation: AtomicU64,
    control: Mutex<Control>,
    stopped: Condvar,
    epoch: Instant,
    /// Milliseconds since `epoch` of the last consumer request
    last_access_ms: AtomicU64,
    metrics: CameraMetrics,
}

impl ProducerShared {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.last_access_ms.store(now_ms, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_access_ms.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }

    /// Store `payload` under a fresh generation, then wake consumers.
    ///
    /// The frame lock is held across the publish so a reader taking the
    /// frame (see [`ProducerLifecycle::take_frame`]) sees store and publish
    /// as one step.
    fn store_and_publish(&self, payload: Bytes) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let report = {
            let mut slot = self.frame.write().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(Frame::new(generation, payload));
            self.signal.publish()
        };

        self.metrics.inc_frames_published();
        observability::record_frame_published(&self.source_id, generation);
        if !report.reaped.is_empty() {
            self.metrics.add_consumers_reaped(report.reaped.len());
            observability::record_consumers_reaped(&self.source_id, report.reaped.len());
            for _ in &report.reaped {
                observability::record_fault(&self.source_id, FaultKind::ConsumerStaleness);
            }
        }
        observability::record_active_consumers(&self.source_id, self.signal.slot_count());
    }

    fn run_side_task(&self, scheduled: &ScheduledTask) {
        self.metrics.inc_side_task_runs();
        if let Err(e) = scheduled.task.run() {
            self.metrics.inc_side_task_failures();
            observability::record_fault(&self.source_id, FaultKind::SideTaskFailure);
            warn!(
                source_id = %self.source_id,
                task = scheduled.task.name(),
                fault = %FaultKind::SideTaskFailure,
                error = %e,
                "side task failed"
            );
        }
    }

    fn finish(&self, run_id: u64, exit: RunExit) {
        {
            let mut control = self.lock_control();
            control.state = ProducerState::Stopped;
            control.last_exit = Some((run_id, exit.clone()));
        }
        self.metrics.inc_producer_stops();
        observability::record_producer_stopped(&self.source_id, exit.label());

        match &exit {
            RunExit::Failed(reason) => error!(
                source_id = %self.source_id,
                run_id,
                fault = %FaultKind::UnrecoverableSource,
                reason = %reason,
                "producer stopped"
            ),
            _ => info!(
                source_id = %self.source_id,
                run_id,
                reason = exit.label(),
                "producer stopped"
            ),
        }

        self.stopped.notify_all();
        // Waiters of this run re-check the exit: restart after idle, fail otherwise
        self.signal.interrupt();
    }
}

/// Owns the start/stop state machine of one camera's production thread
pub struct ProducerLifecycle {
    shared: Arc<ProducerShared>,
    factory: Arc<dyn FrameSourceFactory>,
}

impl ProducerLifecycle {
    /// Create a stopped lifecycle; nothing is opened until the first
    /// [`ensure_running`](Self::ensure_running)
    pub fn new(
        factory: Arc<dyn FrameSourceFactory>,
        signal: Arc<BroadcastSignal>,
        settings: LifecycleSettings,
        side_task: Option<ScheduledTask>,
    ) -> Self {
        let shared = ProducerShared {
            source_id: SourceId::new(factory.source_id()),
            settings,
            side_task,
            signal,
            frame: RwLock::new(None),
            generation: AtomicU64::new(0),
            control: Mutex::new(Control {
                state: ProducerState::Stopped,
                run_id: 0,
                last_exit: None,
                thread: None,
            }),
            stopped: Condvar::new(),
            epoch: Instant::now(),
            last_access_ms: AtomicU64::new(0),
            metrics: CameraMetrics::new(),
        };

        Self {
            shared: Arc::new(shared),
            factory,
        }
    }

    /// Camera identity
    pub fn source_id(&self) -> &SourceId {
        &self.shared.source_id
    }

    /// Start the production thread if it is not running.
    ///
    /// Returns the id of the run now in progress. An open failure leaves
    /// the lifecycle `Stopped` so the next call retries.
    pub fn ensure_running(&self) -> Result<u64, CameraError> {
        let mut control = self.shared.lock_control();
        if control.state == ProducerState::Running {
            return Ok(control.run_id);
        }

        if let Some(handle) = control.thread.take() {
            // The previous run already marked itself stopped; this only reaps it
            if handle.join().is_err() {
                warn!(source_id = %self.shared.source_id, "previous producer thread panicked");
            }
        }

        let source = match self.factory.open() {
            Ok(source) => source,
            Err(e) => {
                self.shared.metrics.inc_startup_failures();
                observability::record_fault(&self.shared.source_id, FaultKind::StartupFailure);
                error!(
                    source_id = %self.shared.source_id,
                    fault = %FaultKind::StartupFailure,
                    error = %e,
                    "failed to open frame source"
                );
                return Err(CameraError::startup(self.shared.source_id.as_str(), e));
            }
        };

        let run_id = control.run_id + 1;
        self.shared.touch();

        // The source only moves into the thread once it exists, so a failed
        // spawn can still close it.
        let (handoff, inbox) = mpsc::sync_channel::<Box<dyn FrameSource>>(1);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("producer-{}", self.shared.source_id))
            .spawn(move || {
                if let Ok(source) = inbox.recv() {
                    run_producer(shared, source, run_id);
                }
            });

        let handle = hand_off(spawned, &handoff, source).map_err(|e| {
            self.shared.metrics.inc_startup_failures();
            error!(
                source_id = %self.shared.source_id,
                fault = %FaultKind::StartupFailure,
                error = %e,
                "failed to spawn producer thread"
            );
            CameraError::Spawn {
                source_id: self.shared.source_id.to_string(),
                source: e,
            }
        })?;

        control.run_id = run_id;
        control.state = ProducerState::Running;
        control.thread = Some(handle);

        self.shared.metrics.inc_producer_starts();
        observability::record_producer_started(&self.shared.source_id);
        info!(source_id = %self.shared.source_id, run_id, "producer started");
        Ok(run_id)
    }

    /// Record a consumer request (resets the idle clock)
    pub fn touch(&self) {
        self.shared.touch();
    }

    /// Time since the last consumer request
    pub fn idle_for(&self) -> Duration {
        self.shared.idle_for()
    }

    /// Latest published frame, if any
    pub fn current_frame(&self) -> Option<Frame> {
        self.shared
            .frame
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read the latest frame and re-arm `consumer` in one step.
    ///
    /// Holds the frame lock across the acknowledgment, so a publish can
    /// never slip between the read and the re-arm and signal the frame
    /// just taken a second time.
    pub fn take_frame(&self, consumer: ConsumerId) -> Option<Frame> {
        let slot = self.shared.frame.read().unwrap_or_else(PoisonError::into_inner);
        let frame = slot.clone();
        self.shared.signal.acknowledge(consumer);
        frame
    }

    /// Current state
    pub fn state(&self) -> ProducerState {
        self.shared.lock_control().state
    }

    /// Whether a production thread is alive
    pub fn is_running(&self) -> bool {
        self.state() == ProducerState::Running
    }

    /// Number of runs started so far
    pub fn run_count(&self) -> u64 {
        self.shared.lock_control().run_id
    }

    /// Exit of the most recent finished run
    pub fn last_exit(&self) -> Option<(u64, RunExit)> {
        self.shared.lock_control().last_exit.clone()
    }

    /// Exit of `run_id`, if that run is the most recent finished one
    pub fn exit_of(&self, run_id: u64) -> Option<RunExit> {
        match &self.shared.lock_control().last_exit {
            Some((id, exit)) if *id == run_id => Some(exit.clone()),
            _ => None,
        }
    }

    /// Block until the lifecycle is `Stopped` or `timeout` elapses.
    ///
    /// Returns `true` if it is stopped.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut control = self.shared.lock_control();
        while control.state == ProducerState::Running {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .stopped
                .wait_timeout(control, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            control = guard;
        }
        true
    }

    /// Counters of this camera
    pub fn metrics(&self) -> &CameraMetrics {
        &self.shared.metrics
    }

    /// Loop settings
    pub fn settings(&self) -> LifecycleSettings {
        self.shared.settings
    }
}

impl std::fmt::Debug for ProducerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerLifecycle")
            .field("source_id", &self.shared.source_id)
            .field("state", &self.state())
            .field("settings", &self.shared.settings)
            .finish()
    }
}

/// Pass the opened source to a freshly spawned producer thread.
///
/// On failure the source is closed here, never leaked.
fn hand_off(
    spawned: io::Result<JoinHandle<()>>,
    handoff: &SyncSender<Box<dyn FrameSource>>,
    mut source: Box<dyn FrameSource>,
) -> io::Result<JoinHandle<()>> {
    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            source.close();
            return Err(e);
        }
    };

    if let Err(TrySendError::Full(mut source) | TrySendError::Disconnected(mut source)) =
        handoff.try_send(source)
    {
        source.close();
        let _ = handle.join();
        return Err(io::Error::other("producer thread exited before receiving its source"));
    }
    Ok(handle)
}

/// Thread entry: run the loop, turn a panic into a failed exit, then stop
fn run_producer(shared: Arc<ProducerShared>, mut source: Box<dyn FrameSource>, run_id: u64) {
    debug!(source_id = %shared.source_id, run_id, "production loop entered");

    let outcome =
        panic::catch_unwind(AssertUnwindSafe(|| production_loop(&shared, source.as_mut())));
    let exit = match outcome {
        Ok(exit) => exit,
        Err(_) => RunExit::Failed("production loop panicked".to_string()),
    };

    source.close();
    shared.finish(run_id, exit);
}

fn production_loop(shared: &ProducerShared, source: &mut dyn FrameSource) -> RunExit {
    let max_transient = shared.settings.max_consecutive_transient_errors;
    let mut last_payload: Option<Bytes> = None;
    let mut consecutive_transient: u32 = 0;
    // `None` makes the side task due right after the first frame of a run
    let mut side_task_last_run: Option<Instant> = None;

    loop {
        let payload = match source.next_frame() {
            Ok(Some(payload)) => {
                consecutive_transient = 0;
                last_payload = Some(payload.clone());
                payload
            }
            Ok(None) => return RunExit::Exhausted,
            Err(e) if e.is_transient() => {
                consecutive_transient += 1;
                shared.metrics.inc_transient_errors();
                observability::record_fault(&shared.source_id, FaultKind::TransientFrameError);

                match &last_payload {
                    Some(previous) if consecutive_transient <= max_transient => {
                        warn!(
                            source_id = %shared.source_id,
                            fault = %FaultKind::TransientFrameError,
                            consecutive = consecutive_transient,
                            error = %e,
                            "frame pull failed, re-serving last frame"
                        );
                        shared.metrics.inc_frames_reserved();
                        previous.clone()
                    }
                    Some(_) => {
                        return RunExit::Failed(format!(
                            "{consecutive_transient} consecutive transient errors, last: {e}"
                        ));
                    }
                    None => return RunExit::Failed(e.to_string()),
                }
            }
            Err(e) => return RunExit::Failed(e.to_string()),
        };

        shared.store_and_publish(payload);
        thread::yield_now();

        if shared.idle_for() > shared.settings.idle_timeout {
            return RunExit::Idle;
        }

        if let Some(scheduled) = &shared.side_task {
            if side_task_due(side_task_last_run, scheduled.interval, Instant::now()) {
                side_task_last_run = Some(Instant::now());
                shared.run_side_task(scheduled);
            }
        }
    }
}

/// Due on the first frame of a run, then once more than `interval` passed
fn side_task_due(last_run: Option<Instant>, interval: Duration, now: Instant) -> bool {
    last_run.map_or(true, |at| now.saturating_duration_since(at) > interval)
}
