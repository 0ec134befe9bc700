//! Error types and result types for connector operations.
//!
//! Every operation returns a [`ConnectorResult<T>`]. Errors raised by a store client are
//! passed through unchanged apart from the operation context the connector prefixes to them.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with a store through the connector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectorError {
    /// A required argument is missing or malformed (missing id, invalid key, bad filter, empty patch).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The requested record was not found.
    /// The first argument is the record id (or a description of the filter), the second is the collection.
    #[error("Record {0} not found in collection {1}")]
    NotFound(String, String),
    /// A transport or auth failure reported by the store client.
    #[error("Store error during {operation}: {message}")]
    Store {
        /// The primitive that failed, prefixed by the connector operation that issued it.
        operation: String,
        /// The message reported by the backend.
        message: String,
    },
    /// An atomic multi-path patch was rejected. Nothing was applied.
    /// The first argument is the collection, the second the underlying cause.
    #[error("Atomic write to collection {0} failed: {1}")]
    AtomicWriteFailed(String, String),
    /// The call was cancelled through its [`CallContext`](crate::context::CallContext).
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
    /// The per-request timeout elapsed before the backend answered.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),
    /// Serialization/deserialization error when converting JSON values.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A stored value does not have the shape of a record.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Error during client construction or configuration.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// A specialized `Result` type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl ConnectorError {
    /// Builds a [`ConnectorError::Store`] for a failed backend primitive.
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Prefixes the operation context of a store error with the connector operation
    /// that issued the call. Other variants are returned unchanged.
    pub fn during(self, operation: &str) -> Self {
        match self {
            ConnectorError::Store { operation: inner, message } => ConnectorError::Store {
                operation: format!("{operation}: {inner}"),
                message,
            },
            other => other,
        }
    }
}

impl From<SerdeJsonError> for ConnectorError {
    fn from(err: SerdeJsonError) -> Self {
        ConnectorError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn during_prefixes_store_errors_only() {
        let err = ConnectorError::store("patch_multi", "permission denied").during("update");
        assert_eq!(
            err,
            ConnectorError::Store {
                operation: "update: patch_multi".into(),
                message: "permission denied".into(),
            }
        );

        let err = ConnectorError::NotFound("a".into(), "users".into()).during("update");
        assert_eq!(err, ConnectorError::NotFound("a".into(), "users".into()));
    }
}
