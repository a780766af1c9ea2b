//! Query-history attribution.
//!
//! Every statement the provider sends is prefixed with a comment carrying the
//! provider version, the resource kind and the lifecycle operation, so the
//! statements can be found again in Snowflake's query history.

use serde::{Deserialize, Serialize};

pub const PROVIDER_VERSION: &str = env!("CARGO_PKG_VERSION");

const TAG_OPEN: &str = "/* ";
const TAG_CLOSE: &str = " */ ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    CustomDiff,
}

/// Field order is part of the tag format: version, resource, operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetadata {
    pub version: String,
    pub resource: String,
    pub operation: Operation,
}

impl OperationMetadata {
    pub fn new(resource: impl Into<String>, operation: Operation) -> Self {
        OperationMetadata {
            version: PROVIDER_VERSION.to_string(),
            resource: resource.into(),
            operation,
        }
    }
}

pub fn tag_query(sql: &str, metadata: &OperationMetadata) -> String {
    match serde_json::to_string(metadata) {
        Ok(json) => format!("{TAG_OPEN}{json}{TAG_CLOSE}{sql}"),
        Err(e) => {
            tracing::warn!("failed to serialize operation metadata: {e}");
            sql.to_string()
        }
    }
}

/// Splits a tagged statement into its metadata and the statement text.
pub fn parse_tag(sql: &str) -> Option<(OperationMetadata, &str)> {
    let rest = sql.strip_prefix(TAG_OPEN)?;
    let end = rest.find(TAG_CLOSE)?;
    let metadata = serde_json::from_str(&rest[..end]).ok()?;
    Some((metadata, &rest[end + TAG_CLOSE.len()..]))
}

pub fn strip_tag(sql: &str) -> &str {
    parse_tag(sql).map(|(_, statement)| statement).unwrap_or(sql)
}
