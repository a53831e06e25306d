//! Mapping of driver errors onto [`RepoError`].

use mongodb::error::{Error, ErrorKind, WriteFailure};

use docrepo_core::error::RepoError;

/// Server error codes reported for unique-index violations.
const DUPLICATE_KEY_CODES: [i32; 3] = [11000, 11001, 12582];
/// `ImmutableField`, returned when a write would change `_id`.
const IMMUTABLE_FIELD: i32 = 66;
/// `BadValue` and `FailedToParse`.
const INVALID_QUERY_CODES: [i32; 2] = [2, 9];

/// Extracts the server error code of a write or command failure.
fn server_code(err: &Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        ErrorKind::Command(e) => Some(e.code),
        _ => None,
    }
}

pub(crate) fn classify_code(code: Option<i32>, message: String) -> RepoError {
    match code {
        Some(code) if DUPLICATE_KEY_CODES.contains(&code) || code == IMMUTABLE_FIELD => {
            RepoError::Constraint(message)
        }
        Some(code) if INVALID_QUERY_CODES.contains(&code) => RepoError::InvalidQuery(message),
        _ => RepoError::Store(message),
    }
}

/// Classifies an error returned by a data operation.
pub(crate) fn classify(err: Error) -> RepoError {
    classify_code(server_code(&err), err.to_string())
}

/// Every failure while creating indexes is an index error.
pub(crate) fn index_error(err: Error) -> RepoError {
    RepoError::Index(err.to_string())
}
