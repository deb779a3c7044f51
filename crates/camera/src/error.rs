//! Camera error types

use std::time::Duration;

use contracts::{FaultKind, SourceError};
use thiserror::Error;

/// Errors surfaced to a consumer by [`SharedCamera::get_frame`](crate::SharedCamera::get_frame)
#[derive(Debug, Error)]
pub enum CameraError {
    /// The frame source could not be opened
    #[error("camera '{source_id}' failed to start: {source}")]
    Startup {
        source_id: String,
        #[source]
        source: SourceError,
    },

    /// The production thread could not be spawned
    #[error("camera '{source_id}' failed to spawn its producer: {source}")]
    Spawn {
        source_id: String,
        #[source]
        source: std::io::Error,
    },

    /// The run the caller was waiting on ended with an unrecoverable fault
    #[error("camera '{source_id}' stopped: {reason}")]
    SourceFailed { source_id: String, reason: String },

    /// The run the caller was waiting on reached end of stream
    #[error("camera '{source_id}' reached end of stream")]
    SourceExhausted { source_id: String },

    /// No frame arrived within the frame timeout
    #[error("camera '{source_id}' produced no frame within {}ms", timeout.as_millis())]
    FrameTimeout { source_id: String, timeout: Duration },
}

impl CameraError {
    /// Create startup error
    pub fn startup(source_id: impl Into<String>, source: SourceError) -> Self {
        Self::Startup {
            source_id: source_id.into(),
            source,
        }
    }

    /// Create source failure error
    pub fn source_failed(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceFailed {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Create end-of-stream error
    pub fn source_exhausted(source_id: impl Into<String>) -> Self {
        Self::SourceExhausted {
            source_id: source_id.into(),
        }
    }

    /// Create frame timeout error
    pub fn frame_timeout(source_id: impl Into<String>, timeout: Duration) -> Self {
        Self::FrameTimeout {
            source_id: source_id.into(),
            timeout,
        }
    }

    /// Fault classification, `None` for end of stream and plain timeouts
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Startup { .. } | Self::Spawn { .. } => Some(FaultKind::StartupFailure),
            Self::SourceFailed { .. } => Some(FaultKind::UnrecoverableSource),
            Self::SourceExhausted { .. } | Self::FrameTimeout { .. } => None,
        }
    }
}
