use std::sync::Arc;
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    options::{ClientOptions, FindOptions, IndexOptions},
};
use docrepo_core::{
    adapter::{AdapterBuilder, StoreAdapter},
    connection::{ConnectionTracker, ScopedConnection},
    error::{RepoError, RepoResult},
    filter::Filter,
    index::IndexSpec,
    options::{ChangeInfo, Options, Page},
};

use crate::error::{classify, index_error};


/// Store adapter bound to one collection of a MongoDB database.
///
/// The adapter wraps a driver [`Client`], which owns a connection pool. Every operation
/// checks a collection handle out of that pool for its own duration only; handles are
/// returned on every exit path, including errors.
#[derive(Debug, Clone)]
pub struct MongoDbAdapter {
    client: Client,
    database: String,
    collection: String,
    connections: Arc<ConnectionTracker>,
}

impl MongoDbAdapter {
    pub fn new(client: Client, database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            collection: collection.into(),
            connections: ConnectionTracker::new(),
        }
    }

    pub fn builder(dsn: &str, database: &str, collection: &str) -> MongoDbAdapterBuilder {
        MongoDbAdapterBuilder::new(dsn, database, collection)
    }

    /// Binds a new adapter to another collection, sharing this adapter's client pool.
    pub fn with_collection(&self, collection: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            database: self.database.clone(),
            collection: collection.into(),
            connections: Arc::clone(&self.connections),
        }
    }

    /// Returns the underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Closes the client's connection pool.
    ///
    /// Adapters obtained through [`with_collection`](Self::with_collection) share the pool
    /// and can no longer be used afterwards.
    pub async fn shutdown(self) -> RepoResult<()> {
        self.client.shutdown().await;

        Ok(())
    }

    fn connect(&self) -> ScopedConnection<MongoCollection<Document>> {
        self.connections.checkout(
            self.client
                .database(&self.database)
                .collection(&self.collection),
        )
    }
}

/// Translates paging options into driver find options.
///
/// A zero `skip` or `limit` is left unset, so the server applies no bound.
pub(crate) fn find_options(options: &Options) -> FindOptions {
    let mut find_options = FindOptions::default();

    if options.skip > 0 {
        find_options.skip = Some(options.skip);
    }
    if let Some(limit) = options.page_limit() {
        find_options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    find_options
}

/// Builds the driver index model for an index specification.
pub(crate) fn index_model(spec: &IndexSpec) -> IndexModel {
    IndexModel::builder()
        .keys(spec.key_document())
        .options(
            IndexOptions::builder()
                .unique(spec.is_unique())
                .name(spec.name())
                .build(),
        )
        .build()
}

#[async_trait]
impl StoreAdapter for MongoDbAdapter {
    fn database(&self) -> &str {
        &self.database
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn open_connections(&self) -> usize {
        self.connections.open()
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn setup(&self, indexes: &[IndexSpec]) -> RepoResult<()> {
        let conn = self.connect();

        for index in indexes {
            index.validate()?;
            conn.create_index(index_model(index))
                .await
                .map_err(index_error)?;
            tracing::debug!(index = %index.name(), "ensured index");
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn create(&self, document: Document) -> RepoResult<()> {
        self.connect()
            .insert_one(document)
            .await
            .map_err(classify)?;

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection, ?options))]
    async fn get_all(&self, filter: Filter, options: Options) -> RepoResult<Page<Document>> {
        let conn = self.connect();
        let filter = filter.into_document();

        let count = if options.count {
            Some(
                conn.count_documents(filter.clone())
                    .await
                    .map_err(classify)?,
            )
        } else {
            None
        };

        let items = conn
            .find(filter)
            .with_options(find_options(&options))
            .await
            .map_err(classify)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(classify)?;

        tracing::debug!(returned = items.len(), ?count, "listed documents");

        Ok(Page::new(items, count))
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn get_count(&self, filter: Filter) -> RepoResult<u64> {
        self.connect()
            .count_documents(filter.into_document())
            .await
            .map_err(classify)
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn get_one(&self, filter: Filter) -> RepoResult<Document> {
        self.connect()
            .find_one(filter.into_document())
            .await
            .map_err(classify)?
            .ok_or_else(|| RepoError::NotFound(self.collection.clone()))
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn update(&self, filter: Filter, patch: Document) -> RepoResult<()> {
        let result = self
            .connect()
            .update_one(filter.into_document(), doc! { "$set": patch })
            .await
            .map_err(classify)?;

        if result.matched_count == 0 {
            return Err(RepoError::NotFound(self.collection.clone()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn update_all(&self, filter: Filter, patch: Document) -> RepoResult<ChangeInfo> {
        let result = self
            .connect()
            .update_many(filter.into_document(), doc! { "$set": patch })
            .await
            .map_err(classify)?;

        let info = ChangeInfo::updated(result.matched_count, result.modified_count);
        tracing::debug!(matched = info.matched, updated = info.updated, "updated documents");

        Ok(info)
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn delete(&self, filter: Filter) -> RepoResult<()> {
        let result = self
            .connect()
            .delete_one(filter.into_document())
            .await
            .map_err(classify)?;

        if result.deleted_count == 0 {
            return Err(RepoError::NotFound(self.collection.clone()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(database = %self.database, collection = %self.collection))]
    async fn delete_all(&self, filter: Filter) -> RepoResult<ChangeInfo> {
        let result = self
            .connect()
            .delete_many(filter.into_document())
            .await
            .map_err(classify)?;

        let info = ChangeInfo::removed(result.deleted_count);
        tracing::debug!(removed = info.removed, "removed documents");

        Ok(info)
    }
}

pub struct MongoDbAdapterBuilder {
    dsn: String,
    database: String,
    collection: String,
    max_pool_size: Option<u32>,
    app_name: Option<String>,
}

impl MongoDbAdapterBuilder {
    pub fn new(dsn: &str, database: &str, collection: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
            max_pool_size: None,
            app_name: None,
        }
    }

    /// Caps the number of pooled connections.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Sets the application name reported to the server.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }
}

#[async_trait]
impl AdapterBuilder for MongoDbAdapterBuilder {
    type Adapter = MongoDbAdapter;

    async fn build(self) -> RepoResult<Self::Adapter> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| RepoError::Initialization(e.to_string()))?;

        if self.max_pool_size.is_some() {
            options.max_pool_size = self.max_pool_size;
        }
        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }

        Ok(MongoDbAdapter::new(
            Client::with_options(options)
                .map_err(|e| RepoError::Initialization(e.to_string()))?,
            self.database,
            self.collection,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_options_unbounded() {
        let options = find_options(&Options::new());

        assert_eq!(options.skip, None);
        assert_eq!(options.limit, None);
    }

    #[test]
    fn test_find_options_paged() {
        let options = find_options(&Options::new().skip(5).limit(5).with_count());

        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, Some(5));
    }

    #[test]
    fn test_find_options_huge_limit() {
        let options = find_options(&Options::new().limit(u64::MAX));
        assert_eq!(options.limit, Some(i64::MAX));
    }

    #[test]
    fn test_index_model() {
        let model = index_model(&IndexSpec::new(["email", "-created"]).unique());
        let options = model.options.unwrap();

        assert_eq!(model.keys, doc! { "email": 1, "created": -1 });
        assert_eq!(options.unique, Some(true));
        assert_eq!(options.name.as_deref(), Some("email_1_created_-1"));
    }
}
