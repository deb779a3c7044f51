//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_streamer;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::StreamerBlueprint;

use crate::error::CliError;

/// Load and validate the configuration file
pub(crate) fn load_blueprint(path: &Path) -> Result<StreamerBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
