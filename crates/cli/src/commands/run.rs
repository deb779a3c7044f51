//! `run` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use camera::{CameraRegistry, SharedCamera};
use contracts::{CameraConfig, StreamerBlueprint};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{run_consumer, ConsumerOptions, SessionStats};

use super::load_blueprint;

/// Execute the `run` command
pub async fn run_streamer(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let blueprint = load_blueprint(&args.config)?;

    let camera_config = select_camera(&blueprint, args.camera.as_deref())?.clone();
    if args.consumers == 0 {
        return Err(CliError::invalid_argument("--consumers must be at least 1").into());
    }

    info!(
        cameras = blueprint.cameras.len(),
        camera = %camera_config.id,
        source = camera_config.source.kind(),
        frequency_hz = camera_config.source.frequency_hz(),
        consumers = args.consumers,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let camera = CameraRegistry::global().get_or_init(&camera_config.id, || {
        let bundle = sources::from_config(&camera_config);
        SharedCamera::new(&camera_config, bundle.factory, bundle.side_task)
    });

    let stop = Arc::new(AtomicBool::new(false));
    let options = ConsumerOptions::from_fps(args.consumer_fps);
    let started = Instant::now();

    let handles: Vec<_> = (0..args.consumers)
        .map(|_| {
            let camera = Arc::clone(&camera);
            let stop = Arc::clone(&stop);
            tokio::task::spawn_blocking(move || run_consumer(camera, options, stop))
        })
        .collect();

    info!("Serving frames...");
    let deadline = async {
        if args.duration == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        }
    };

    tokio::select! {
        _ = deadline => info!("Run duration elapsed, stopping consumers..."),
        _ = shutdown_signal() => warn!("Received shutdown signal, stopping consumers..."),
    }
    stop.store(true, Ordering::Relaxed);

    let mut consumers = Vec::with_capacity(handles.len());
    for handle in handles {
        consumers.push(handle.await.context("Consumer task panicked")?);
    }

    let stats = SessionStats {
        source_id: camera_config.id.clone(),
        duration: started.elapsed(),
        consumers,
        camera: camera.stats(),
    };

    info!(
        frames_published = stats.camera.frames_published,
        frames_delivered = stats.frames_delivered(),
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.publish_rate()),
        "Session finished"
    );
    stats.print_summary();

    Ok(())
}

/// Pick the requested camera, or the first one
fn select_camera<'a>(
    blueprint: &'a StreamerBlueprint,
    requested: Option<&str>,
) -> Result<&'a CameraConfig, CliError> {
    match requested {
        Some(id) => blueprint.camera(id).ok_or_else(|| {
            let available: Vec<&str> = blueprint.cameras.iter().map(|c| c.id.as_str()).collect();
            CliError::camera_not_found(id, &available)
        }),
        None => blueprint
            .cameras
            .first()
            .ok_or_else(|| CliError::invalid_argument("configuration has no camera")),
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &StreamerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Cameras ({}):", blueprint.cameras.len());
    for camera in &blueprint.cameras {
        println!(
            "  - {} ({}, {} Hz){}",
            camera.id,
            camera.source.kind(),
            camera.source.frequency_hz(),
            if camera.overlay.is_some() { " + overlay" } else { "" }
        );
        println!(
            "      idle {}ms, stale {}ms, frame timeout {}ms, reap {:?}",
            camera.idle_timeout_ms,
            camera.stale_timeout_ms,
            camera.frame_timeout_ms,
            camera.reap_policy
        );
    }
    println!();
}
