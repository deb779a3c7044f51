//! Simulated consumer sessions against one shared camera.

mod consumer;
mod stats;

pub use consumer::{run_consumer, ConsumerOptions};
pub use stats::{ConsumerReport, SessionStats};
