//! Mock frame source
//!
//! Generates synthetic payloads at a fixed rate, with scripted faults, for
//! tests and for demo runs without a camera.
//!
//! Payload layout (big endian):
//! `[sequence: u64][overlay version: u64][fill: (sequence as u8) repeated]`
//! so a torn payload (bytes from two different frames) is detectable with
//! [`MockFrameSource::is_intact`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{FrameSource, FrameSourceFactory, SourceError};
use tracing::{debug, trace};

use crate::overlay::OverlayHandle;
use crate::pacing::Pacer;

/// Bytes before the fill pattern
pub const PAYLOAD_HEADER_LEN: usize = 16;

/// Mock source configuration
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// Source ID
    pub source_id: String,

    /// Frame rate (Hz), non-positive means unpaced
    pub frequency_hz: f64,

    /// Payload size in bytes (at least the header)
    pub payload_size: usize,

    /// Every `open` fails
    pub fail_open: bool,

    /// Pull numbers (1-based, per opened source) that fail transiently
    pub transient_failures: Vec<u64>,

    /// Pull number that fails fatally
    pub fatal_at: Option<u64>,

    /// Number of pulls after which the stream ends
    pub end_after: Option<u64>,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            source_id: "mock_camera".to_string(),
            frequency_hz: 25.0,
            payload_size: 4096,
            fail_open: false,
            transient_failures: Vec::new(),
            fatal_at: None,
            end_after: None,
        }
    }
}

impl MockSourceConfig {
    /// Healthy source at `frequency_hz`
    pub fn new(source_id: impl Into<String>, frequency_hz: f64) -> Self {
        Self {
            source_id: source_id.into(),
            frequency_hz,
            ..Default::default()
        }
    }

    /// Set payload size
    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size.max(PAYLOAD_HEADER_LEN);
        self
    }

    /// Make every `open` fail
    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Fail pull `pull` (1-based) with a transient error
    pub fn with_transient_failure_at(mut self, pull: u64) -> Self {
        self.transient_failures.push(pull);
        self
    }

    /// Fail pull `pull` (1-based) with a fatal error
    pub fn with_fatal_failure_at(mut self, pull: u64) -> Self {
        self.fatal_at = Some(pull);
        self
    }

    /// End the stream after `pulls` pulls
    pub fn with_end_after(mut self, pulls: u64) -> Self {
        self.end_after = Some(pulls);
        self
    }
}

/// Counters shared by a factory and every source it opened
#[derive(Debug, Default)]
pub struct MockCounters {
    opens: AtomicU64,
    closes: AtomicU64,
    pulls: AtomicU64,
    frames: AtomicU64,
    next_sequence: AtomicU64,
}

impl MockCounters {
    /// Successful `open` calls
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// `close` calls
    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    /// `next_frame` calls, including failed ones
    pub fn pulls(&self) -> u64 {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Payloads produced
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Opens [`MockFrameSource`]s; all of them share one set of counters
pub struct MockSourceFactory {
    config: MockSourceConfig,
    counters: Arc<MockCounters>,
    overlay: Option<OverlayHandle>,
}

impl MockSourceFactory {
    /// Create new factory
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            counters: Arc::new(MockCounters::default()),
            overlay: None,
        }
    }

    /// Stamp payloads with the version of this overlay text
    pub fn with_overlay(mut self, overlay: OverlayHandle) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Shared counters
    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }
}

impl FrameSourceFactory for MockSourceFactory {
    fn source_id(&self) -> &str {
        &self.config.source_id
    }

    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError> {
        if self.config.fail_open {
            return Err(SourceError::open(
                &self.config.source_id,
                "mock configured to refuse open",
            ));
        }

        let opens = self.counters.opens.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(source_id = %self.config.source_id, opens, "mock source opened");

        Ok(Box::new(MockFrameSource {
            pacer: Pacer::new(self.config.frequency_hz),
            config: self.config.clone(),
            counters: Arc::clone(&self.counters),
            overlay: self.overlay.clone(),
            pulls: 0,
            closed: false,
        }))
    }
}

/// One opened mock source
pub struct MockFrameSource {
    config: MockSourceConfig,
    counters: Arc<MockCounters>,
    overlay: Option<OverlayHandle>,
    pacer: Pacer,
    pulls: u64,
    closed: bool,
}

impl MockFrameSource {
    /// Build a payload
    pub fn encode_payload(sequence: u64, overlay_version: u64, size: usize) -> Bytes {
        let size = size.max(PAYLOAD_HEADER_LEN);
        let mut buf = BytesMut::with_capacity(size);
        buf.put_u64(sequence);
        buf.put_u64(overlay_version);
        buf.put_bytes(sequence as u8, size - PAYLOAD_HEADER_LEN);
        buf.freeze()
    }

    /// Sequence number of a payload
    pub fn sequence_of(payload: &[u8]) -> Option<u64> {
        let header: [u8; 8] = payload.get(..8)?.try_into().ok()?;
        Some(u64::from_be_bytes(header))
    }

    /// Overlay version stamped into a payload
    pub fn overlay_version_of(payload: &[u8]) -> Option<u64> {
        let header: [u8; 8] = payload.get(8..PAYLOAD_HEADER_LEN)?.try_into().ok()?;
        Some(u64::from_be_bytes(header))
    }

    /// Whether every fill byte matches the header's sequence
    pub fn is_intact(payload: &[u8]) -> bool {
        match Self::sequence_of(payload) {
            Some(sequence) => payload[PAYLOAD_HEADER_LEN..]
                .iter()
                .all(|&b| b == sequence as u8),
            None => false,
        }
    }
}

impl FrameSource for MockFrameSource {
    fn next_frame(&mut self) -> Result<Option<Bytes>, SourceError> {
        self.pacer.wait();
        self.pulls += 1;
        self.counters.pulls.fetch_add(1, Ordering::SeqCst);

        if self.config.end_after.is_some_and(|n| self.pulls > n) {
            debug!(source_id = %self.config.source_id, pulls = self.pulls, "mock stream ended");
            return Ok(None);
        }
        if self.config.fatal_at == Some(self.pulls) {
            return Err(SourceError::fatal(
                &self.config.source_id,
                format!("scripted fatal failure at pull {}", self.pulls),
            ));
        }
        if self.config.transient_failures.contains(&self.pulls) {
            return Err(SourceError::transient(
                &self.config.source_id,
                format!("scripted transient failure at pull {}", self.pulls),
            ));
        }

        let sequence = self.counters.next_sequence();
        let overlay_version = self.overlay.as_ref().map_or(0, |o| o.version());
        self.counters.frames.fetch_add(1, Ordering::SeqCst);

        trace!(
            source_id = %self.config.source_id,
            sequence,
            pull = self.pulls,
            "mock frame produced"
        );

        Ok(Some(Self::encode_payload(
            sequence,
            overlay_version,
            self.config.payload_size,
        )))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            debug!(source_id = %self.config.source_id, pulls = self.pulls, "mock source closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpaced(id: &str) -> MockSourceConfig {
        MockSourceConfig::new(id, 0.0).with_payload_size(64)
    }

    #[test]
    fn test_payload_roundtrip_and_integrity() {
        let payload = MockFrameSource::encode_payload(300, 7, 64);
        assert_eq!(payload.len(), 64);
        assert_eq!(MockFrameSource::sequence_of(&payload), Some(300));
        assert_eq!(MockFrameSource::overlay_version_of(&payload), Some(7));
        assert!(MockFrameSource::is_intact(&payload));

        let mut torn = payload.to_vec();
        torn[40] = torn[40].wrapping_add(1);
        assert!(!MockFrameSource::is_intact(&torn));
        assert!(!MockFrameSource::is_intact(&[1, 2, 3]));
    }

    #[test]
    fn test_sequences_continue_across_opens() {
        let factory = MockSourceFactory::new(unpaced("cam"));

        let mut first = factory.open().unwrap();
        let a = first.next_frame().unwrap().unwrap();
        first.close();

        let mut second = factory.open().unwrap();
        let b = second.next_frame().unwrap().unwrap();
        second.close();

        assert_eq!(MockFrameSource::sequence_of(&a), Some(1));
        assert_eq!(MockFrameSource::sequence_of(&b), Some(2));

        let counters = factory.counters();
        assert_eq!(counters.opens(), 2);
        assert_eq!(counters.closes(), 2);
    }

    #[test]
    fn test_scripted_faults() {
        let factory = MockSourceFactory::new(
            unpaced("cam")
                .with_transient_failure_at(2)
                .with_fatal_failure_at(4),
        );
        let mut source = factory.open().unwrap();

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap_err().is_transient());
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(
            source.next_frame(),
            Err(SourceError::Fatal { .. })
        ));
        assert_eq!(factory.counters().frames(), 2);
        assert_eq!(factory.counters().pulls(), 4);
    }

    #[test]
    fn test_end_of_stream() {
        let factory = MockSourceFactory::new(unpaced("cam").with_end_after(2));
        let mut source = factory.open().unwrap();

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_open_failure_not_counted() {
        let factory = MockSourceFactory::new(unpaced("cam").with_open_failure());
        let err = factory.open().err().unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
        assert_eq!(factory.counters().opens(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let factory = MockSourceFactory::new(unpaced("cam"));
        let mut source = factory.open().unwrap();
        source.close();
        source.close();
        assert_eq!(factory.counters().closes(), 1);
    }
}
