//! Error types and result types for repository operations.
//!
//! Every adapter maps its native failures onto [`RepoError`]. Callers branch on the
//! variant (or on [`RepoError::is_not_found`] / [`RepoError::is_constraint`]); the
//! adapters themselves never retry or swallow an error.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document store
/// through an adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepoError {
    /// Connectivity, timeout or any other failure reported by the backing store.
    #[error("Store error: {0}")]
    Store(String),
    /// A write violated a uniqueness constraint or an identity field the store mandates.
    #[error("Constraint violation: {0}")]
    Constraint(String),
    /// A single-document read, update or delete matched nothing.
    /// The argument is the collection name.
    #[error("No document matched the filter in collection {0}")]
    NotFound(String),
    /// An index could not be created during setup.
    #[error("Index error: {0}")]
    Index(String),
    /// The filter or patch could not be understood by the store.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Serialization/deserialization error when converting between documents and BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The document does not have the shape the store requires.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Error during adapter initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl RepoError {
    /// Returns `true` for [`RepoError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound(_))
    }

    /// Returns `true` for [`RepoError::Constraint`].
    pub fn is_constraint(&self) -> bool {
        matches!(self, RepoError::Constraint(_))
    }
}

/// A specialized `Result` type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

impl From<BsonError> for RepoError {
    fn from(err: BsonError) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepoError {
    fn from(err: SerdeJsonError) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(RepoError::NotFound("users".into()).is_not_found());
        assert!(!RepoError::NotFound("users".into()).is_constraint());
        assert!(RepoError::Constraint("dup".into()).is_constraint());
        assert!(!RepoError::Store("down".into()).is_not_found());
    }

    #[test]
    fn test_display_names_collection() {
        let err = RepoError::NotFound("users".into());
        assert_eq!(err.to_string(), "No document matched the filter in collection users");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(RepoError::from(err), RepoError::Serialization(_)));
    }
}
