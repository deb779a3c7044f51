//! # Camera
//!
//! Shares one frame source among many consumers.
//!
//! Responsibilities:
//! - Lazy start of the production thread on first demand
//! - Stop after the idle timeout, restart on the next request
//! - Re-serve the last frame on transient source errors
//! - Per-consumer wake-up through the broadcast signal
//!
//! ## Usage Example
//!
//! ```ignore
//! use camera::{CameraRegistry, SharedCamera};
//! use contracts::ConsumerId;
//!
//! let camera = CameraRegistry::global().get_or_init("plaza", || {
//!     SharedCamera::new(&config, factory, None)
//! });
//! let consumer = ConsumerId::next();
//! loop {
//!     let frame = camera.get_frame(consumer)?;
//!     send(&frame.data)?;
//! }
//! ```

mod camera;
mod error;
mod lifecycle;
mod registry;
mod stats;

pub use camera::SharedCamera;
pub use error::CameraError;
pub use lifecycle::{LifecycleSettings, ProducerLifecycle, ProducerState, RunExit};
pub use registry::CameraRegistry;
pub use stats::{CameraMetrics, CameraStats};
