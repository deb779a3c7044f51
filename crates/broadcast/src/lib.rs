//! # Broadcast
//!
//! One-to-many "new data available" signal.
//!
//! The producer calls [`BroadcastSignal::publish`] after storing a value;
//! every consumer waits on its own slot with
//! [`BroadcastSignal::await_next`] and re-arms it with
//! [`BroadcastSignal::acknowledge`] once the value is consumed. The signal
//! carries no data and never queues: a consumer that is slower than the
//! producer simply skips the values published while it was busy.
//!
//! Consumers are never told to leave. A slot that stays signalled without
//! an acknowledgment for longer than the stale timeout is assumed abandoned
//! and reaped during a later publish.
//!
//! ```
//! use broadcast::BroadcastSignal;
//! use contracts::ConsumerId;
//!
//! let signal = BroadcastSignal::new();
//! let id = ConsumerId::next();
//! signal.register(id);
//!
//! signal.publish();
//! signal.await_next(id); // returns immediately, a publish is pending
//! signal.acknowledge(id);
//! ```

mod signal;

pub use signal::{BroadcastSignal, PublishReport, WaitOutcome, DEFAULT_STALE_TIMEOUT};
