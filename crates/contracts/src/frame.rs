//! Frame - the value held in a camera's shared frame slot

use std::time::Instant;

use bytes::Bytes;

/// One published frame.
///
/// The payload is opaque (typically an encoded JPEG). `Bytes` makes the
/// hand-out to many consumers a reference-count bump, and because the
/// whole `Frame` is swapped as one value a reader can never observe a mix
/// of two payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Publish counter of the owning camera, starts at 1
    pub generation: u64,

    /// Encoded payload (zero-copy)
    pub data: Bytes,

    /// When the production loop stored this frame
    pub produced_at: Instant,
}

impl Frame {
    /// Create a frame stamped with the current time
    pub fn new(generation: u64, data: Bytes) -> Self {
        Self {
            generation,
            data,
            produced_at: Instant::now(),
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
