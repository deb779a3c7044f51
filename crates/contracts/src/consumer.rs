//! ConsumerId - identity of one logical frame reader

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one frame consumer (one per request/session).
///
/// Only used as a map key: it has no ordering semantics. The transport
/// layer creates one per logical reader and passes it into every call.
///
/// # Examples
/// ```
/// use contracts::ConsumerId;
///
/// let a = ConsumerId::next();
/// let b = ConsumerId::next();
/// assert_ne!(a, b);
/// assert_eq!(ConsumerId::from(7), ConsumerId::from(7));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Allocate a fresh process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for logging.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ConsumerId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

impl fmt::Debug for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsumerId({})", self.0)
    }
}
