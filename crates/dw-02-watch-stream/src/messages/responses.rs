//! # Listen Responses
//!
//! Inbound frames received on the listen channel. Exactly one of the
//! variants is present per frame.

use dw_01_bloom_filter::BloomFilterDescriptor;
use serde::{Deserialize, Serialize};

use crate::domain::{ProtocolError, ResumeToken, TargetChangeType, TargetId};

/// Server-to-client listen frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListenResponse {
    /// Targets changed state.
    TargetChange(TargetChange),
    /// A document was added or updated.
    DocumentChange(DocumentChange),
    /// A document was deleted.
    DocumentDelete(DocumentDelete),
    /// A document no longer matches some targets.
    DocumentRemove(DocumentRemove),
    /// Digest of the documents matching a target.
    ExistenceFilter(ExistenceFilter),
}

/// Error status attached to a target removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Status code
    #[serde(default)]
    pub code: i32,
    /// Human readable message
    #[serde(default)]
    pub message: String,
}

/// `targetChange` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetChange {
    /// Targets affected; empty means every registered target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_ids: Vec<TargetId>,
    /// Change tag; absent means `NO_CHANGE`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_change_type: Option<String>,
    /// New stream position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<ResumeToken>,
    /// Why a target was removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Status>,
    /// Snapshot time the change is consistent with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

impl TargetChange {
    /// Change of `change` kind for `target_ids`.
    pub fn new(change: TargetChangeType, target_ids: impl Into<Vec<TargetId>>) -> Self {
        Self {
            target_ids: target_ids.into(),
            target_change_type: Some(change.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Attach a resume token.
    pub fn with_resume_token(mut self, token: ResumeToken) -> Self {
        self.resume_token = Some(token);
        self
    }

    /// Attach a removal cause.
    pub fn with_cause(mut self, code: i32, message: impl Into<String>) -> Self {
        self.cause = Some(Status {
            code,
            message: message.into(),
        });
        self
    }

    /// Parsed change tag.
    pub fn change_type(&self) -> Result<TargetChangeType, ProtocolError> {
        match &self.target_change_type {
            None => Ok(TargetChangeType::NoChange),
            Some(tag) => tag.parse(),
        }
    }

    /// Whether the change applies to every registered target.
    pub fn is_broadcast(&self) -> bool {
        self.target_ids.is_empty()
    }
}

/// A document resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Fully qualified document name
    pub name: String,
    /// Field values, passed through untouched
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Last update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// `documentChange` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    /// New document state
    pub document: Document,
    /// Targets the document now matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_ids: Vec<TargetId>,
    /// Targets the document no longer matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_target_ids: Vec<TargetId>,
}

/// `documentDelete` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDelete {
    /// Name of the deleted document
    pub document: String,
    /// Targets that matched the document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_target_ids: Vec<TargetId>,
    /// Deletion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

/// `documentRemove` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRemove {
    /// Name of the document leaving the targets
    pub document: String,
    /// Targets the document left
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_target_ids: Vec<TargetId>,
    /// Time of the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

/// `existenceFilter` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistenceFilter {
    /// Target the digest describes
    pub target_id: TargetId,
    /// Number of documents matching the target on the server; omitted when zero
    #[serde(default, skip_serializing_if = "is_zero")]
    pub count: i32,
    /// Bloom filter over the matching document names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unchanged_names: Option<BloomFilterDescriptor>,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}
