use thiserror::Error;

use crate::sdk::record::RecordError;

/// A malformed identifier, data type or composite resource id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid identifier `{input}`: {reason}")]
    InvalidIdentifier { input: String, reason: String },
    #[error("invalid data type `{input}`: {reason}")]
    InvalidDataType { input: String, reason: String },
    #[error("invalid resource id `{input}`: {reason}")]
    InvalidResourceId { input: String, reason: String },
}

impl ParseError {
    pub fn identifier(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn data_type(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidDataType {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn resource_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidResourceId {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The remote object is absent. Read and DropSafely recover from this one.
    #[error("object does not exist or not authorized: {0}")]
    ObjectNotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("SQL execution error: {message} (statement: {statement})")]
    Remote { statement: String, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    #[error("operation cancelled before issuing `{0}`")]
    Cancelled(String),

    #[error(transparent)]
    Decode(#[from] RecordError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::ObjectNotFound(_))
    }

    /// Snowflake reports missing objects (and missing parents) as a plain SQL
    /// error; this maps those to `ObjectNotFound` and leaves the rest alone.
    pub fn classify_not_found(self, object: &str) -> Self {
        match self {
            ProviderError::Remote { ref message, .. } if is_not_found_message(message) => {
                ProviderError::ObjectNotFound(object.to_string())
            }
            other => other,
        }
    }
}

pub(crate) fn is_not_found_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("does not exist") || message.contains("not authorized")
}

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;
