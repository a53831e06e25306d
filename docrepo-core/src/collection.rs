//! Typed access to an adapter's collection.
//!
//! [`TypedCollection`] offers the adapter's capability set with serde types in place of raw
//! BSON documents. Filters stay opaque: they are passed to the adapter as given.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::collection::TypedCollection;
//! use serde::{Serialize, Deserialize};
//! use bson::doc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub name: String,
//!     pub email: String,
//! }
//!
//! let users = TypedCollection::<User, _>::new(adapter);
//! users.create(&User { name: "Alice".into(), email: "alice@example.com".into() }).await?;
//!
//! let alice = users.get_one(doc! { "name": "Alice" }).await?;
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, marker::PhantomData};

use crate::{
    adapter::StoreAdapter,
    document::{from_document, to_document},
    error::RepoResult,
    filter::Filter,
    index::IndexSpec,
    options::{ChangeInfo, Options, Page},
};

/// A type-safe view of an adapter's collection for documents of type `D`.
///
/// # Type Parameters
///
/// * `D` - The document type, stored through its serde representation
/// * `A` - The adapter, which may be owned, borrowed or shared through an `Arc`
pub struct TypedCollection<D, A> {
    adapter: A,
    _marker: PhantomData<fn() -> D>,
}

impl<D, A> TypedCollection<D, A>
where
    D: Serialize + DeserializeOwned + Send + Sync,
    A: StoreAdapter,
{
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn into_inner(self) -> A {
        self.adapter
    }

    /// See [`StoreAdapter::setup`].
    pub async fn setup(&self, indexes: &[IndexSpec]) -> RepoResult<()> {
        self.adapter.setup(indexes).await
    }

    /// Inserts a document.
    pub async fn create(&self, document: &D) -> RepoResult<()> {
        self.adapter.create(to_document(document)?).await
    }

    /// Lists matching documents, decoding each one into `D`.
    pub async fn get_all(&self, filter: impl Into<Filter>, options: Options) -> RepoResult<Page<D>> {
        self.adapter
            .get_all(filter.into(), options)
            .await?
            .try_map(from_document)
    }

    pub async fn get_count(&self, filter: impl Into<Filter>) -> RepoResult<u64> {
        self.adapter.get_count(filter.into()).await
    }

    pub async fn get_one(&self, filter: impl Into<Filter>) -> RepoResult<D> {
        from_document(self.adapter.get_one(filter.into()).await?)
    }

    /// Merges the fields of `patch` into the first matching document.
    ///
    /// `patch` is usually a small struct or map holding only the fields to change.
    pub async fn update<P>(&self, filter: impl Into<Filter>, patch: &P) -> RepoResult<()>
    where
        P: Serialize + Sync + ?Sized,
    {
        self.adapter.update(filter.into(), to_document(patch)?).await
    }

    pub async fn update_all<P>(&self, filter: impl Into<Filter>, patch: &P) -> RepoResult<ChangeInfo>
    where
        P: Serialize + Sync + ?Sized,
    {
        self.adapter.update_all(filter.into(), to_document(patch)?).await
    }

    pub async fn delete(&self, filter: impl Into<Filter>) -> RepoResult<()> {
        self.adapter.delete(filter.into()).await
    }

    pub async fn delete_all(&self, filter: impl Into<Filter>) -> RepoResult<ChangeInfo> {
        self.adapter.delete_all(filter.into()).await
    }
}

impl<D, A: Clone> Clone for TypedCollection<D, A> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D, A: fmt::Debug> fmt::Debug for TypedCollection<D, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("document", &std::any::type_name::<D>())
            .field("adapter", &self.adapter)
            .finish()
    }
}
