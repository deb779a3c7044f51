//! StreamerBlueprint - Config Loader output
//!
//! Describes every camera the process can serve: where frames come from,
//! the optional overlay refresh task, and the lifecycle timings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::{Validate, ValidationErrors};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete streamer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamerBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Camera definitions
    #[validate(length(min = 1, message = "at least one camera is required"))]
    pub cameras: Vec<CameraConfig>,
}

impl StreamerBlueprint {
    /// Find a camera by id
    pub fn camera(&self, id: &str) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.id == id)
    }
}

/// How stale consumer slots are reaped on each publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReapPolicy {
    /// Remove at most one stale consumer per publish (amortized cleanup)
    #[default]
    OnePerPublish,
    /// Remove every stale consumer found during the publish
    AllStale,
}

/// Per-camera configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CameraConfig {
    /// Unique camera id, also the registry key
    #[validate(length(min = 1, message = "camera id cannot be empty"))]
    pub id: String,

    /// Where frames come from
    pub source: SourceConfig,

    /// Optional overlay text refresh task
    #[serde(default)]
    pub overlay: Option<OverlayConfig>,

    /// Producer stops after this long without a `get_frame` call
    #[serde(default = "default_idle_timeout_ms")]
    #[validate(range(min = 1))]
    pub idle_timeout_ms: u64,

    /// Consumer slot is reaped after staying unacknowledged this long
    #[serde(default = "default_stale_timeout_ms")]
    #[validate(range(min = 1))]
    pub stale_timeout_ms: u64,

    /// Upper bound for a single `get_frame` call
    #[serde(default = "default_frame_timeout_ms")]
    #[validate(range(min = 1))]
    pub frame_timeout_ms: u64,

    /// Stale slot cleanup policy
    #[serde(default)]
    pub reap_policy: ReapPolicy,

    /// Consecutive transient pull errors tolerated before the run fails
    #[serde(default = "default_max_transient_errors")]
    #[validate(range(min = 1))]
    pub max_consecutive_transient_errors: u32,
}

fn default_idle_timeout_ms() -> u64 {
    10_000
}

fn default_stale_timeout_ms() -> u64 {
    5_000
}

fn default_frame_timeout_ms() -> u64 {
    15_000
}

fn default_max_transient_errors() -> u32 {
    25
}

impl CameraConfig {
    /// Camera with default timings
    pub fn new(id: impl Into<String>, source: SourceConfig) -> Self {
        Self {
            id: id.into(),
            source,
            overlay: None,
            idle_timeout_ms: default_idle_timeout_ms(),
            stale_timeout_ms: default_stale_timeout_ms(),
            frame_timeout_ms: default_frame_timeout_ms(),
            reap_policy: ReapPolicy::default(),
            max_consecutive_transient_errors: default_max_transient_errors(),
        }
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set stale timeout
    pub fn stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set frame timeout
    pub fn frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set reap policy
    pub fn reap_policy(mut self, policy: ReapPolicy) -> Self {
        self.reap_policy = policy;
        self
    }

    /// Set the overlay task
    pub fn overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Idle timeout as a `Duration`
    pub fn idle_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Stale timeout as a `Duration`
    pub fn stale_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    /// Frame timeout as a `Duration`
    pub fn frame_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

/// Frame source selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic payloads
    Mock(MockSourceSettings),
    /// Image files replayed from a directory
    Files(FileSourceSettings),
}

impl SourceConfig {
    /// Short name of the source kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::Files(_) => "files",
        }
    }

    /// Frame rate of the source
    pub fn frequency_hz(&self) -> f64 {
        match self {
            Self::Mock(s) => s.frequency_hz,
            Self::Files(s) => s.frequency_hz,
        }
    }
}

// Derive does not support enums; dispatch to the variant payload.
impl Validate for SourceConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::Mock(settings) => settings.validate(),
            Self::Files(settings) => settings.validate(),
        }
    }
}

/// Mock source settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MockSourceSettings {
    /// Frame rate (Hz), must be > 0
    #[serde(default = "default_frequency_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub frequency_hz: f64,

    /// Size of each synthetic payload in bytes
    #[serde(default = "default_payload_size")]
    #[validate(range(min = 16))]
    pub payload_size: usize,
}

impl Default for MockSourceSettings {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            payload_size: default_payload_size(),
        }
    }
}

/// Directory replay source settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FileSourceSettings {
    /// Directory holding pre-encoded frames, replayed in file name order
    pub directory: PathBuf,

    /// Frame rate (Hz), must be > 0
    #[serde(default = "default_frequency_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub frequency_hz: f64,

    /// Restart from the first file after the last one
    #[serde(default = "default_loop_playback")]
    pub loop_playback: bool,
}

fn default_frequency_hz() -> f64 {
    25.0
}

fn default_payload_size() -> usize {
    4096
}

fn default_loop_playback() -> bool {
    true
}

/// Overlay text refresh settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OverlayConfig {
    /// Text file re-read on every refresh
    pub text_file: PathBuf,

    /// Refresh interval
    #[serde(default = "default_refresh_interval_ms")]
    #[validate(range(min = 1))]
    pub refresh_interval_ms: u64,
}

fn default_refresh_interval_ms() -> u64 {
    3_000
}

impl OverlayConfig {
    /// Overlay refresh with the default interval
    pub fn new(text_file: impl Into<PathBuf>) -> Self {
        Self {
            text_file: text_file.into(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }

    /// Refresh interval as a `Duration`
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}
