//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Flags controlling what the error handler does with a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlerConfig {
    /// Emit the error log through `tracing`.
    pub log_error: bool,
    /// Show a fatal message through the session's error sink.
    pub display_error: bool,
    /// Forward the error log through the session's error sink.
    pub send_error: bool,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            log_error: true,
            display_error: true,
            send_error: false,
        }
    }
}

/// Construction parameters for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial state of the focus manager's active switch.
    pub focus_manager_active: bool,
    /// Error handler flags.
    pub error_handler: ErrorHandlerConfig,
    /// Filter directive for [`logging::init`](crate::logging::init).
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            focus_manager_active: true,
            error_handler: ErrorHandlerConfig::default(),
            log_filter: "arbor=info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
