//! Store adapter abstraction.
//!
//! This module defines the capability set every concrete document store must offer. An
//! adapter is bound to one database and one collection; it is constructed once and shared
//! by any number of concurrent callers.
//!
//! # Overview
//!
//! The [`StoreAdapter`] trait works at the store's native boundary: documents, patches and
//! filters are BSON documents passed through untouched. Typed access lives one level up in
//! [`TypedCollection`](crate::collection::TypedCollection), and the read-only listing view
//! in [`BaseRepository`](crate::repository::BaseRepository).
//!
//! # Example
//!
//! ```ignore
//! use docrepo::adapter::StoreAdapter;
//! use docrepo::options::Options;
//! use bson::doc;
//!
//! adapter.setup(&[IndexSpec::new(["email"]).unique()]).await?;
//! adapter.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//!
//! let page = adapter.get_all(Filter::all(), Options::new().limit(10).with_count()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::RepoResult,
    filter::Filter,
    index::IndexSpec,
    options::{ChangeInfo, Options, Page},
};

/// The capability set of a collection-bound document store.
///
/// # Thread Safety
///
/// Implementations are shared across tasks (`Send + Sync`) and hold no per-call state.
/// Every operation checks out its own scoped connection and releases it before returning,
/// whatever the outcome.
///
/// # Error Handling
///
/// Failures are reported through [`RepoResult`](crate::error::RepoResult) and are never
/// retried by the adapter:
///
/// - [`RepoError::Store`](crate::error::RepoError::Store) for connectivity and timeouts
/// - [`RepoError::Constraint`](crate::error::RepoError::Constraint) for uniqueness or identity violations
/// - [`RepoError::NotFound`](crate::error::RepoError::NotFound) when a single-document operation matches nothing
/// - [`RepoError::Index`](crate::error::RepoError::Index) when setup cannot create an index
#[async_trait]
pub trait StoreAdapter: Send + Sync + Debug {
    /// Name of the database the adapter is bound to.
    fn database(&self) -> &str;

    /// Name of the collection the adapter is bound to.
    fn collection(&self) -> &str;

    /// Number of scoped connections currently checked out by this adapter.
    fn open_connections(&self) -> usize;

    /// Ensures every index in `indexes` exists on the bound collection.
    ///
    /// Re-applying an identical specification is a no-op. If an index cannot be created,
    /// for example because an index with the same name but a different definition already
    /// exists, setup stops with [`RepoError::Index`](crate::error::RepoError::Index).
    /// Indexes created before the failure are kept.
    async fn setup(&self, indexes: &[IndexSpec]) -> RepoResult<()>;

    /// Inserts one document.
    async fn create(&self, document: Document) -> RepoResult<()>;

    /// Lists the documents matching `filter`, in store order, paged by `options`.
    ///
    /// The returned page's `count` is `Some(total)` when `options.count` is set, where
    /// `total` ignores `skip` and `limit`; otherwise it is `None`.
    async fn get_all(&self, filter: Filter, options: Options) -> RepoResult<Page<Document>>;

    /// Counts the documents matching `filter`.
    async fn get_count(&self, filter: Filter) -> RepoResult<u64>;

    /// Returns the first document matching `filter`.
    async fn get_one(&self, filter: Filter) -> RepoResult<Document>;

    /// Merges `patch` into the first document matching `filter`.
    ///
    /// Fields absent from `patch` are left untouched.
    async fn update(&self, filter: Filter, patch: Document) -> RepoResult<()>;

    /// Merges `patch` into every document matching `filter`.
    async fn update_all(&self, filter: Filter, patch: Document) -> RepoResult<ChangeInfo>;

    /// Removes the first document matching `filter`.
    async fn delete(&self, filter: Filter) -> RepoResult<()>;

    /// Removes every document matching `filter`. A filter matching nothing is not an error.
    async fn delete_all(&self, filter: Filter) -> RepoResult<ChangeInfo>;
}

#[async_trait]
impl<A> StoreAdapter for &A
where
    A: StoreAdapter + ?Sized,
{
    fn database(&self) -> &str {
        (**self).database()
    }

    fn collection(&self) -> &str {
        (**self).collection()
    }

    fn open_connections(&self) -> usize {
        (**self).open_connections()
    }

    async fn setup(&self, indexes: &[IndexSpec]) -> RepoResult<()> {
        (**self).setup(indexes).await
    }

    async fn create(&self, document: Document) -> RepoResult<()> {
        (**self).create(document).await
    }

    async fn get_all(&self, filter: Filter, options: Options) -> RepoResult<Page<Document>> {
        (**self).get_all(filter, options).await
    }

    async fn get_count(&self, filter: Filter) -> RepoResult<u64> {
        (**self).get_count(filter).await
    }

    async fn get_one(&self, filter: Filter) -> RepoResult<Document> {
        (**self).get_one(filter).await
    }

    async fn update(&self, filter: Filter, patch: Document) -> RepoResult<()> {
        (**self).update(filter, patch).await
    }

    async fn update_all(&self, filter: Filter, patch: Document) -> RepoResult<ChangeInfo> {
        (**self).update_all(filter, patch).await
    }

    async fn delete(&self, filter: Filter) -> RepoResult<()> {
        (**self).delete(filter).await
    }

    async fn delete_all(&self, filter: Filter) -> RepoResult<ChangeInfo> {
        (**self).delete_all(filter).await
    }
}

#[async_trait]
impl<A> StoreAdapter for Arc<A>
where
    A: StoreAdapter + ?Sized,
{
    fn database(&self) -> &str {
        (**self).database()
    }

    fn collection(&self) -> &str {
        (**self).collection()
    }

    fn open_connections(&self) -> usize {
        (**self).open_connections()
    }

    async fn setup(&self, indexes: &[IndexSpec]) -> RepoResult<()> {
        (**self).setup(indexes).await
    }

    async fn create(&self, document: Document) -> RepoResult<()> {
        (**self).create(document).await
    }

    async fn get_all(&self, filter: Filter, options: Options) -> RepoResult<Page<Document>> {
        (**self).get_all(filter, options).await
    }

    async fn get_count(&self, filter: Filter) -> RepoResult<u64> {
        (**self).get_count(filter).await
    }

    async fn get_one(&self, filter: Filter) -> RepoResult<Document> {
        (**self).get_one(filter).await
    }

    async fn update(&self, filter: Filter, patch: Document) -> RepoResult<()> {
        (**self).update(filter, patch).await
    }

    async fn update_all(&self, filter: Filter, patch: Document) -> RepoResult<ChangeInfo> {
        (**self).update_all(filter, patch).await
    }

    async fn delete(&self, filter: Filter) -> RepoResult<()> {
        (**self).delete(filter).await
    }

    async fn delete_all(&self, filter: Filter) -> RepoResult<ChangeInfo> {
        (**self).delete_all(filter).await
    }
}

/// Factory for adapters that need asynchronous initialization, such as parsing a
/// connection string and building a client pool.
#[async_trait]
pub trait AdapterBuilder {
    type Adapter: StoreAdapter;

    async fn build(self) -> RepoResult<Self::Adapter>;
}
