//! # Contracts
//!
//! Shared interface contracts between the broadcast core, the frame sources
//! and the outer layers (config, CLI). Business crates depend on this crate,
//! never the other way around.
//!
//! ## Time Model
//! - All lifecycle timing uses the monotonic clock (`std::time::Instant`)
//! - `Frame::generation` is the publish counter of a camera, strictly
//!   increasing for the lifetime of that camera

mod blueprint;
mod consumer;
mod error;
mod fault;
mod frame;
mod side_task;
mod source;
mod source_id;

pub use blueprint::*;
pub use consumer::ConsumerId;
pub use error::*;
pub use fault::FaultKind;
pub use frame::Frame;
pub use side_task::{ScheduledTask, SideTask, SideTaskError};
pub use source::{FrameSource, FrameSourceFactory, SourceError};
pub use source_id::SourceId;
