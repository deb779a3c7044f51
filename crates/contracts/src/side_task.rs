//! SideTask trait - periodic work run inline by the production loop

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Side task errors. Never propagated to consumers.
#[derive(Debug, Error)]
pub enum SideTaskError {
    /// IO failure (e.g. the overlay text file is missing)
    #[error("side task '{task}' io error: {source}")]
    Io {
        task: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure
    #[error("side task '{task}' failed: {message}")]
    Failed { task: String, message: String },
}

impl SideTaskError {
    /// Create io error
    pub fn io(task: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            task: task.into(),
            source,
        }
    }

    /// Create generic failure
    pub fn failed(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            task: task.into(),
            message: message.into(),
        }
    }
}

/// Zero-argument operation invoked every refresh interval.
///
/// Runs on the production thread between two pulls, so it should be short.
pub trait SideTask: Send + Sync {
    /// Task name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Run once
    fn run(&self) -> Result<(), SideTaskError>;
}

/// A side task with its refresh interval
#[derive(Clone)]
pub struct ScheduledTask {
    /// The task
    pub task: Arc<dyn SideTask>,
    /// Minimum time between two runs
    pub interval: Duration,
}

impl ScheduledTask {
    /// Schedule `task` every `interval`
    pub fn new(task: Arc<dyn SideTask>, interval: Duration) -> Self {
        Self { task, interval }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("task", &self.task.name())
            .field("interval", &self.interval)
            .finish()
    }
}
