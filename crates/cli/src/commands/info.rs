//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{CameraConfig, SourceConfig, StreamerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

use super::load_blueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    cameras: Vec<CameraInfo>,
}

#[derive(Serialize)]
struct CameraInfo {
    id: String,
    source: SourceInfo,
    idle_timeout_ms: u64,
    stale_timeout_ms: u64,
    frame_timeout_ms: u64,
    reap_policy: String,
    max_consecutive_transient_errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<OverlayInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    kind: String,
    frequency_hz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loop_playback: Option<bool>,
}

#[derive(Serialize)]
struct OverlayInfo {
    text_file: String,
    refresh_interval_ms: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");
    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &StreamerBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        cameras: blueprint.cameras.iter().map(camera_info).collect(),
    }
}

fn camera_info(camera: &CameraConfig) -> CameraInfo {
    let source = match &camera.source {
        SourceConfig::Mock(s) => SourceInfo {
            kind: "mock".to_string(),
            frequency_hz: s.frequency_hz,
            payload_size: Some(s.payload_size),
            directory: None,
            loop_playback: None,
        },
        SourceConfig::Files(s) => SourceInfo {
            kind: "files".to_string(),
            frequency_hz: s.frequency_hz,
            payload_size: None,
            directory: Some(s.directory.display().to_string()),
            loop_playback: Some(s.loop_playback),
        },
    };

    CameraInfo {
        id: camera.id.clone(),
        source,
        idle_timeout_ms: camera.idle_timeout_ms,
        stale_timeout_ms: camera.stale_timeout_ms,
        frame_timeout_ms: camera.frame_timeout_ms,
        reap_policy: format!("{:?}", camera.reap_policy),
        max_consecutive_transient_errors: camera.max_consecutive_transient_errors,
        overlay: camera.overlay.as_ref().map(|o| OverlayInfo {
            text_file: o.text_file.display().to_string(),
            refresh_interval_ms: o.refresh_interval_ms,
        }),
    }
}

fn print_config_info(blueprint: &StreamerBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Overlay Streamer Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("   Version: {:?}", blueprint.version);
    println!("\n📷 Cameras ({})", blueprint.cameras.len());
    for (i, camera) in blueprint.cameras.iter().enumerate() {
        let is_last = i == blueprint.cameras.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child = if is_last { "   " } else { "│  " };

        println!("   {} {}", prefix, camera.id);
        match &camera.source {
            SourceConfig::Mock(s) => println!(
                "   {}  ├─ Source: mock, {} Hz, {} bytes",
                child, s.frequency_hz, s.payload_size
            ),
            SourceConfig::Files(s) => println!(
                "   {}  ├─ Source: files {} ({} Hz{})",
                child,
                s.directory.display(),
                s.frequency_hz,
                if s.loop_playback { ", looping" } else { "" }
            ),
        }
        println!(
            "   {}  ├─ Timeouts: idle {}ms, stale {}ms, frame {}ms",
            child, camera.idle_timeout_ms, camera.stale_timeout_ms, camera.frame_timeout_ms
        );
        println!("   {}  ├─ Reap policy: {:?}", child, camera.reap_policy);
        match &camera.overlay {
            Some(overlay) => println!(
                "   {}  └─ Overlay: {} every {}ms",
                child,
                overlay.text_file.display(),
                overlay.refresh_interval_ms
            ),
            None => println!("   {}  └─ Overlay: none", child),
        }
    }

    println!();
}
