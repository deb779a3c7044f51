//! Fault classification shared by logs and metrics

use std::fmt;

/// Kind of fault observed around a camera.
///
/// Only `StartupFailure` and `UnrecoverableSource` ever reach a consumer;
/// everything else is absorbed to keep the broadcast alive and is only
/// visible through logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The frame source could not be opened
    StartupFailure,
    /// A single pull failed; the last good payload was re-served
    TransientFrameError,
    /// The source failed fatally or kept failing with nothing to fall back on
    UnrecoverableSource,
    /// The periodic side task returned an error
    SideTaskFailure,
    /// A consumer stopped acknowledging and its slot was reaped
    ConsumerStaleness,
}

impl FaultKind {
    /// Stable snake_case name, used as a metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartupFailure => "startup_failure",
            Self::TransientFrameError => "transient_frame_error",
            Self::UnrecoverableSource => "unrecoverable_source",
            Self::SideTaskFailure => "side_task_failure",
            Self::ConsumerStaleness => "consumer_staleness",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
