//! FrameSource trait - frame acquisition abstraction
//!
//! The production loop only sees opaque payloads. Acquisition, decoding,
//! overlay composition and encoding all live behind this boundary.

use bytes::Bytes;
use thiserror::Error;

use crate::FaultKind;

/// Errors raised by a frame source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be opened (fatal for the run that tried)
    #[error("failed to open source '{source_id}': {message}")]
    Open {
        source_id: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single pull failed; the next pull may succeed
    #[error("transient read error on '{source_id}': {message}")]
    Transient { source_id: String, message: String },

    /// The source is broken and must be reopened
    #[error("fatal read error on '{source_id}': {message}")]
    Fatal { source_id: String, message: String },
}

impl SourceError {
    /// Create open error
    pub fn open(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            source_id: source_id.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create open error wrapping an underlying cause
    pub fn open_with(
        source_id: impl Into<String>,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Open {
            source_id: source_id.into(),
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Create transient pull error
    pub fn transient(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create fatal pull error
    pub fn fatal(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fatal {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Whether the production loop may recover from this error locally
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Fault classification of this error
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::Open { .. } => FaultKind::StartupFailure,
            Self::Transient { .. } => FaultKind::TransientFrameError,
            Self::Fatal { .. } => FaultKind::UnrecoverableSource,
        }
    }
}

/// An opened frame source (the "handle").
///
/// `next_frame` blocks the production loop, never a consumer, so the
/// source decides the pacing (network latency, a fixed frame rate, ...).
pub trait FrameSource: Send {
    /// Pull the next payload.
    ///
    /// - `Ok(Some(payload))`: a new frame
    /// - `Ok(None)`: end of stream, the run stops
    /// - `Err(SourceError::Transient)`: this pull failed, keep going
    /// - `Err(SourceError::Fatal)`: the run stops
    fn next_frame(&mut self) -> Result<Option<Bytes>, SourceError>;

    /// Release the underlying resources. Called once per opened source.
    fn close(&mut self);
}

/// Opens fresh [`FrameSource`] instances.
///
/// Every producer run opens its own source, so a run that ended on
/// exhaustion or a fatal error restarts from a clean handle.
pub trait FrameSourceFactory: Send + Sync {
    /// Identity of the underlying camera
    fn source_id(&self) -> &str;

    /// Open a new source handle
    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError>;
}
