//! # Doc-Watch Telemetry
//!
//! Structured logging bootstrap shared by every Doc-Watch crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dw_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> Result<(), dw_telemetry::TelemetryError> {
//!     // Service name becomes `doc-watch-listener`; the rest comes from `DW_*`.
//!     let config = TelemetryConfig::for_component("listener");
//!     init_telemetry(&config)?;
//!     Ok(())
//! }
//! ```
//!
//! `TelemetryConfig::from_env()` reads the variables below without renaming
//! the service.
//!
//! ```rust,ignore
//! init_telemetry(&dw_telemetry::TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DW_SERVICE_NAME` | `doc-watch` | Service name in logs |
//! | `DW_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `DW_CONSOLE_OUTPUT` | `true` | Console output |
//! | `DW_JSON_LOGS` | `false` | JSON formatted logs |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use std::sync::Once;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize structured logging for the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    logging::init_logging(config)?;
    tracing::info!(service = %config.service_name, "Telemetry initialized");
    Ok(())
}

static TEST_LOGGING: Once = Once::new();

/// Install a debug-level subscriber once per process for tests.
///
/// Later calls, or calls after another subscriber was installed, are no-ops.
pub fn init_test_logging() {
    TEST_LOGGING.call_once(|| {
        let _ = logging::init_logging(&TelemetryConfig::for_testing());
    });
}
