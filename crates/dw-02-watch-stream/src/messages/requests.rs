//! # Listen Requests
//!
//! Outbound frames sent on the listen channel.
//!
//! ```json
//! { "addTarget": { "targetId": 1, "query": { "parent": "...", "structuredQuery": {
//!     "from": [{ "collectionId": "cities" }],
//!     "where": { "fieldFilter": { "field": { "fieldPath": "state" },
//!                                 "op": "EQUAL", "value": { "stringValue": "CA" } } } } } } }
//! { "removeTarget": 1 }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{DatabaseId, ResumeToken, TargetId};

/// Client-to-server listen frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListenRequest {
    /// Start watching a target.
    AddTarget(Target),
    /// Stop watching a target.
    RemoveTarget(TargetId),
}

/// A watch target as sent on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Caller-assigned identifier
    pub target_id: TargetId,
    /// What the target watches
    #[serde(flatten)]
    pub target_type: TargetType,
    /// Position to resume from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<ResumeToken>,
}

/// Query or document set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    /// Results of a structured query
    Query(QueryTarget),
    /// A fixed set of documents
    Documents(DocumentsTarget),
}

/// Query target body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTarget {
    /// Resource the query runs under
    pub parent: String,
    /// The query
    pub structured_query: StructuredQuery,
}

/// Documents target body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsTarget {
    /// Fully qualified document names
    pub documents: Vec<String>,
}

/// Collection scan with an optional single-field filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    /// Collections to scan
    pub from: Vec<CollectionSelector>,
    /// Row filter
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
}

/// A collection in the `from` clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    /// Collection identifier (last path segment)
    pub collection_id: String,
    /// Include every collection with this id below the parent
    #[serde(default, skip_serializing_if = "is_false")]
    pub all_descendants: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// `where` clause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    /// Single field comparison
    pub field_filter: FieldFilter,
}

/// `field op value` comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Field compared
    pub field: FieldReference,
    /// Comparison operator
    pub op: FieldOperator,
    /// Right-hand operand
    pub value: Value,
}

/// Reference to a document field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    /// Dotted field path
    pub field_path: String,
}

/// Field comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldOperator {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// Array field contains the value
    ArrayContains,
}

/// Typed filter operand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    /// UTF-8 string
    StringValue(String),
    /// 64-bit integer, a decimal string on the wire
    IntegerValue(#[serde(with = "int64_string")] i64),
    /// Boolean
    BooleanValue(bool),
    /// Double
    DoubleValue(f64),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::StringValue(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::StringValue(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::IntegerValue(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::BooleanValue(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::DoubleValue(value)
    }
}

mod int64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Caller-facing description of what a target watches.
///
/// Resolved against a database into the wire [`TargetType`].
#[derive(Clone, Debug, PartialEq)]
pub enum TargetSelector {
    /// Documents of a collection, optionally filtered on one field.
    Query {
        /// Collection identifier
        collection_id: String,
        /// Optional `field op value` filter
        filter: Option<FieldFilter>,
    },
    /// Explicit document paths relative to the database root.
    Documents(Vec<String>),
}

impl TargetSelector {
    /// Every document of a collection.
    pub fn collection(collection_id: impl Into<String>) -> Self {
        TargetSelector::Query {
            collection_id: collection_id.into(),
            filter: None,
        }
    }

    /// Documents of a collection where `field op value`.
    pub fn field_filter(
        collection_id: impl Into<String>,
        field_path: impl Into<String>,
        op: FieldOperator,
        value: impl Into<Value>,
    ) -> Self {
        TargetSelector::Query {
            collection_id: collection_id.into(),
            filter: Some(FieldFilter {
                field: FieldReference {
                    field_path: field_path.into(),
                },
                op,
                value: value.into(),
            }),
        }
    }

    /// Documents of a collection where `field == value`.
    pub fn field_equals(
        collection_id: impl Into<String>,
        field_path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::field_filter(collection_id, field_path, FieldOperator::Equal, value)
    }

    /// A fixed set of documents, e.g. `["cities/SF", "cities/LA"]`.
    pub fn documents<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TargetSelector::Documents(paths.into_iter().map(Into::into).collect())
    }

    /// Resolve into the wire form for `database`.
    pub fn to_target_type(&self, database: &DatabaseId) -> TargetType {
        match self {
            TargetSelector::Query {
                collection_id,
                filter,
            } => TargetType::Query(QueryTarget {
                parent: database.documents_path(),
                structured_query: StructuredQuery {
                    from: vec![CollectionSelector {
                        collection_id: collection_id.clone(),
                        all_descendants: false,
                    }],
                    filter: filter.clone().map(|field_filter| QueryFilter { field_filter }),
                },
            }),
            TargetSelector::Documents(paths) => TargetType::Documents(DocumentsTarget {
                documents: paths
                    .iter()
                    .map(|path| database.document_name(path))
                    .collect(),
            }),
        }
    }
}

impl ListenRequest {
    /// `addTarget` frame for `selector` under `database`.
    pub fn add_target(
        database: &DatabaseId,
        target_id: TargetId,
        selector: &TargetSelector,
        resume_token: Option<ResumeToken>,
    ) -> Self {
        ListenRequest::AddTarget(Target {
            target_id,
            target_type: selector.to_target_type(database),
            resume_token,
        })
    }

    /// `removeTarget` frame.
    pub fn remove_target(target_id: TargetId) -> Self {
        ListenRequest::RemoveTarget(target_id)
    }

    /// Target the frame concerns.
    pub fn target_id(&self) -> TargetId {
        match self {
            ListenRequest::AddTarget(target) => target.target_id,
            ListenRequest::RemoveTarget(target_id) => *target_id,
        }
    }
}
