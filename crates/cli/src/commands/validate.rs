//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SourceConfig, StreamerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    camera_count: usize,
    overlay_count: usize,
    mock_sources: usize,
    file_sources: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let file_sources = blueprint
                .cameras
                .iter()
                .filter(|c| matches!(c.source, SourceConfig::Files(_)))
                .count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    camera_count: blueprint.cameras.len(),
                    overlay_count: blueprint.cameras.iter().filter(|c| c.overlay.is_some()).count(),
                    mock_sources: blueprint.cameras.len() - file_sources,
                    file_sources,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &StreamerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    for camera in &blueprint.cameras {
        // Missing paths only fail at first access, so flag them early
        if let SourceConfig::Files(settings) = &camera.source {
            if !settings.directory.is_dir() {
                warnings.push(format!(
                    "Camera '{}': frame directory {} does not exist yet",
                    camera.id,
                    settings.directory.display()
                ));
            }
        }
        if let Some(overlay) = &camera.overlay {
            if !overlay.text_file.is_file() {
                warnings.push(format!(
                    "Camera '{}': overlay text file {} does not exist yet",
                    camera.id,
                    overlay.text_file.display()
                ));
            }
        }

        let frame_interval_ms = 1000.0 / camera.source.frequency_hz();
        if camera.frame_timeout_ms as f64 <= frame_interval_ms {
            warnings.push(format!(
                "Camera '{}': frame_timeout_ms ({}) is not longer than the frame interval ({:.0}ms)",
                camera.id, camera.frame_timeout_ms, frame_interval_ms
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Cameras: {}", summary.camera_count);
            println!("  Mock sources: {}", summary.mock_sources);
            println!("  File sources: {}", summary.file_sources);
            println!("  Overlays: {}", summary.overlay_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
