//! # Sources
//!
//! Concrete frame sources and side tasks.
//!
//! Responsibilities:
//! - Synthetic frame source with scripted faults (tests, demo runs)
//! - Directory replay source for pre-encoded frames
//! - Overlay text reload task
//! - Build the above from a `CameraConfig`
//!
//! ## Usage Example
//!
//! ```ignore
//! use sources::{MockSourceConfig, MockSourceFactory};
//!
//! let factory = MockSourceFactory::new(MockSourceConfig::new("cam", 30.0));
//! let mut source = factory.open()?;
//! let payload = source.next_frame()?;
//! ```

mod builder;
mod files;
mod mock;
mod overlay;
mod pacing;

pub use builder::{from_config, SourceBundle};
pub use files::{FileSequenceFactory, FileSequenceSource};
pub use mock::{MockCounters, MockFrameSource, MockSourceConfig, MockSourceFactory, PAYLOAD_HEADER_LEN};
pub use overlay::{OverlayHandle, OverlayText, OverlayTextTask};
pub use pacing::Pacer;
