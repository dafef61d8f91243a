//! # Watch Stream Configuration
//!
//! Database identity, backend address and dispatch tuning.

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::{DatabaseId, DatabaseInfo, DEFAULT_DATABASE};

/// Default backend host.
pub const DEFAULT_HOST: &str = "firestore.googleapis.com";

/// Watch stream configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchStreamConfig {
    /// Cloud project identifier.
    pub project_id: String,

    /// Database within the project.
    pub database_id: String,

    /// Backend host.
    pub host: String,

    /// Use TLS.
    pub ssl: bool,

    /// Inbound queue depth that triggers a backlog warning.
    pub inbound_buffer_warn: u64,
}

impl Default for WatchStreamConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database_id: DEFAULT_DATABASE.to_string(),
            host: DEFAULT_HOST.to_string(),
            ssl: true,
            inbound_buffer_warn: 1024,
        }
    }
}

impl WatchStreamConfig {
    /// Config for `project_id`'s default database.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Create a config for testing (local emulator, small buffers).
    pub fn for_testing() -> Self {
        Self {
            project_id: "demo-project".to_string(),
            database_id: DEFAULT_DATABASE.to_string(),
            host: "localhost:8080".to_string(),
            ssl: false,
            inbound_buffer_warn: 16,
        }
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// Reads `DW_PROJECT_ID`, `DW_DATABASE_ID`, `DW_HOST` and `DW_SSL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            project_id: env::var("DW_PROJECT_ID").unwrap_or(defaults.project_id),
            database_id: env::var("DW_DATABASE_ID").unwrap_or(defaults.database_id),
            host: env::var("DW_HOST").unwrap_or(defaults.host),
            ssl: env::var("DW_SSL")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.ssl),
            inbound_buffer_warn: defaults.inbound_buffer_warn,
        }
    }

    /// Database the stream addresses.
    pub fn database(&self) -> DatabaseId {
        DatabaseId::new(self.project_id.clone(), self.database_id.clone())
    }

    /// Connection parameters for the transport factory.
    pub fn database_info(&self) -> DatabaseInfo {
        DatabaseInfo {
            database_id: self.database(),
            host: self.host.clone(),
            ssl: self.ssl,
        }
    }
}
