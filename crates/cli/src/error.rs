//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Requested camera is not configured
    #[error("Camera '{id}' not found in configuration (available: {available})")]
    CameraNotFound { id: String, available: String },

    /// Invalid command-line value
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn camera_not_found(id: impl Into<String>, available: &[&str]) -> Self {
        Self::CameraNotFound {
            id: id.into(),
            available: available.join(", "),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
