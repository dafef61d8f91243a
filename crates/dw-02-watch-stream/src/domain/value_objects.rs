//! # Value Objects
//!
//! Identifiers, tokens and small enums shared across the watch stream.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::errors::ProtocolError;

/// Watch target identifier, assigned by the caller.
pub type TargetId = i32;

/// Name of the duplex operation the watch stream opens.
pub const LISTEN_OPERATION: &str = "Listen";

/// Database identifier used when none is configured.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Opaque stream position confirmed by the server.
///
/// Travels as base64 text in JSON frames.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ResumeToken(Vec<u8>);

impl ResumeToken {
    /// Wrap raw token bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if the token carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base64 rendering used on the wire.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl fmt::Debug for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResumeToken({})", self.to_base64())
    }
}

impl Serialize for ResumeToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for ResumeToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(ResumeToken)
            .map_err(serde::de::Error::custom)
    }
}

/// Project and database a stream talks to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseId {
    /// Cloud project identifier
    pub project_id: String,
    /// Database within the project
    pub database_id: String,
}

impl DatabaseId {
    /// Create a database identifier.
    pub fn new(project_id: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: database_id.into(),
        }
    }

    /// The project's default database.
    pub fn default_for(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE)
    }

    /// `projects/{project}/databases/{database}`
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.project_id, self.database_id
        )
    }

    /// Parent path of every document: `{database_path}/documents`
    pub fn documents_path(&self) -> String {
        format!("{}/documents", self.database_path())
    }

    /// Fully qualified resource name of the document at `path`.
    pub fn document_name(&self, path: &str) -> String {
        format!("{}/{}", self.documents_path(), path.trim_start_matches('/'))
    }
}

/// Connection parameters handed to the transport factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// Database the stream addresses
    pub database_id: DatabaseId,
    /// Backend host
    pub host: String,
    /// Whether to use TLS
    pub ssl: bool,
}

/// Lifecycle phase of a watch stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPhase {
    /// Constructed, `open()` not yet called.
    Unopened,
    /// Channel open, dispatch running.
    Open,
    /// Terminal.
    Closed,
}

/// Kind of a server target change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetChangeType {
    /// No state change, possibly a new resume token.
    NoChange,
    /// The server started tracking the target.
    Add,
    /// The server stopped tracking the target.
    Remove,
    /// The target reached a consistent snapshot.
    Current,
    /// The target's results must be rebuilt.
    Reset,
}

impl TargetChangeType {
    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetChangeType::NoChange => "NO_CHANGE",
            TargetChangeType::Add => "ADD",
            TargetChangeType::Remove => "REMOVE",
            TargetChangeType::Current => "CURRENT",
            TargetChangeType::Reset => "RESET",
        }
    }
}

impl fmt::Display for TargetChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetChangeType {
    type Err = ProtocolError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "NO_CHANGE" => Ok(TargetChangeType::NoChange),
            "ADD" => Ok(TargetChangeType::Add),
            "REMOVE" => Ok(TargetChangeType::Remove),
            "CURRENT" => Ok(TargetChangeType::Current),
            "RESET" => Ok(TargetChangeType::Reset),
            other => Err(ProtocolError::UnknownChangeType(other.to_string())),
        }
    }
}

/// Kind of document event routed to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentEventKind {
    /// `documentChange`
    Change,
    /// `documentDelete`
    Delete,
    /// `documentRemove`
    Remove,
}

/// Saved position a rebuilt stream can resume a target from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumePoint {
    /// Target the token belongs to
    pub target_id: TargetId,
    /// Last confirmed token, if any
    pub resume_token: Option<ResumeToken>,
}
