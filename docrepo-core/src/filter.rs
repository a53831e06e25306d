//! Opaque filters handed to the backing store.
//!
//! A [`Filter`] wraps the store's native query document. Adapters forward it untouched;
//! the only meaning this crate gives it is that an absent or empty filter selects every
//! document in the collection.

use bson::Document;
use serde::{Deserialize, Serialize};

/// A predicate document selecting zero or more documents.
///
/// # Example
///
/// ```ignore
/// use bson::doc;
/// use docrepo::filter::Filter;
///
/// let everyone = Filter::all();
/// let langbeins = Filter::from(doc! { "email": { "$regex": "langbein" } });
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Filter(Option<Document>);

impl Filter {
    /// A filter matching every document.
    pub fn all() -> Self {
        Filter(None)
    }

    pub fn new(document: Document) -> Self {
        Filter(Some(document))
    }

    /// Returns `true` if the filter is absent or empty.
    pub fn is_all(&self) -> bool {
        self.0.as_ref().is_none_or(Document::is_empty)
    }

    pub fn as_document(&self) -> Option<&Document> {
        self.0.as_ref()
    }

    /// Consumes the filter, producing the native query document (empty for "match all").
    pub fn into_document(self) -> Document {
        self.0.unwrap_or_default()
    }
}

impl From<Document> for Filter {
    fn from(document: Document) -> Self {
        Filter::new(document)
    }
}

impl From<Option<Document>> for Filter {
    fn from(document: Option<Document>) -> Self {
        Filter(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_empty_filters_match_all() {
        assert!(Filter::all().is_all());
        assert!(Filter::new(Document::new()).is_all());
        assert!(Filter::from(None).is_all());
        assert!(!Filter::from(doc! { "name": "Alice" }).is_all());
    }

    #[test]
    fn test_into_document_passes_through() {
        let query = doc! { "age": { "$gt": 18 } };

        assert_eq!(Filter::from(query.clone()).into_document(), query);
        assert_eq!(Filter::all().into_document(), Document::new());
    }
}
