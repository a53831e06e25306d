//! Conversion between application values and store documents.
//!
//! Adapters only ever see BSON documents. Anything serde can serialize to a map can be
//! stored; anything serde can deserialize from one can be read back.

use bson::{
    Document,
    de::deserialize_from_document,
    ser::serialize_to_document,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{RepoError, RepoResult};

/// Extension trait providing document conversions for serde types.
///
/// This trait is implemented for every `Serialize + DeserializeOwned` type.
///
/// # Example
///
/// ```ignore
/// use docrepo::document::DocumentExt;
///
/// let user = User { name: "Alice".into(), email: "alice@example.com".into() };
/// let document = user.to_document()?;
/// let back = User::from_document(document)?;
/// ```
pub trait DocumentExt: Sized {
    /// Serializes this value into a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::InvalidDocument`] if the value does not serialize to a map,
    /// or [`RepoError::Serialization`] if serialization fails.
    fn to_document(&self) -> RepoResult<Document>;

    /// Deserializes a value from a BSON document.
    fn from_document(document: Document) -> RepoResult<Self>;
}

impl<T: Serialize + DeserializeOwned> DocumentExt for T {
    fn to_document(&self) -> RepoResult<Document> {
        to_document(self)
    }

    fn from_document(document: Document) -> RepoResult<Self> {
        from_document(document)
    }
}

/// Serializes any map-shaped value (a struct, a map, a patch) into a document.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> RepoResult<Document> {
    serialize_to_document(value).map_err(|e| match bson::ser::serialize_to_bson(value) {
        Ok(other) if other.as_document().is_none() => {
            RepoError::InvalidDocument(format!("expected a document, got {:?}", other.element_type()))
        }
        _ => RepoError::from(e),
    })
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> RepoResult<T> {
    Ok(deserialize_from_document(document)?)
}
