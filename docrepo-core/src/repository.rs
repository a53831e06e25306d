//! Read-only repository façade.
//!
//! A [`BaseRepository`] hides the adapter's mutation and filtering capabilities and exposes a
//! single paged listing over the whole collection. It delegates to
//! [`StoreAdapter::get_all`] with an empty filter, so paging and counting behave exactly as
//! they do on the adapter.

use async_trait::async_trait;
use bson::Document;
use serde::de::DeserializeOwned;

use crate::{
    adapter::StoreAdapter,
    document::from_document,
    error::RepoResult,
    filter::Filter,
    options::{Options, Page},
};

/// A listing-only view over a collection.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Lists the collection's documents, paged by `options`.
    ///
    /// The page's `count` is `Some` only if `options.count` was set.
    async fn list<D>(&self, options: Options) -> RepoResult<Page<D>>
    where
        D: DeserializeOwned + Send;
}

/// Repository over an injected store adapter.
///
/// # Example
///
/// ```ignore
/// use docrepo::repository::{BaseRepository, Repository};
///
/// let repo = BaseRepository::new(adapter);
/// let page = repo.list::<User>(Options::new().skip(5).limit(5).with_count()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BaseRepository<A> {
    adapter: A,
}

impl<A: StoreAdapter> BaseRepository<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// Lists raw documents without decoding them.
    pub async fn list_documents(&self, options: Options) -> RepoResult<Page<Document>> {
        self.adapter.get_all(Filter::all(), options).await
    }
}

#[async_trait]
impl<A: StoreAdapter> Repository for BaseRepository<A> {
    async fn list<D>(&self, options: Options) -> RepoResult<Page<D>>
    where
        D: DeserializeOwned + Send,
    {
        self.list_documents(options).await?.try_map(from_document)
    }
}
