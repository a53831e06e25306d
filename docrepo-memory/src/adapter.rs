//! In-memory adapter implementation.
//!
//! Documents live in insertion order inside a shared map of collections guarded by an
//! async-aware read-write lock. Unique indexes registered through `setup` are enforced on
//! every write, and `_id` is always unique.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;

use docrepo_core::{
    adapter::{AdapterBuilder, StoreAdapter},
    connection::{ConnectionTracker, ScopedConnection},
    error::{RepoError, RepoResult},
    filter::Filter,
    index::IndexSpec,
    options::{ChangeInfo, Options, Page},
};

use crate::{evaluator::DocumentEvaluator, update::apply_set};

type StoreMap = HashMap<String, CollectionState>;
type SharedStore = Arc<RwLock<StoreMap>>;

/// Documents and indexes of one collection.
#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl CollectionState {
    fn positions(&self, filter: &Document) -> RepoResult<Vec<usize>> {
        let mut positions = Vec::new();

        for (position, document) in self.documents.iter().enumerate() {
            if DocumentEvaluator::new(document).matches(filter)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }

    fn first_position(&self, filter: &Document) -> RepoResult<Option<usize>> {
        for (position, document) in self.documents.iter().enumerate() {
            if DocumentEvaluator::new(document).matches(filter)? {
                return Ok(Some(position));
            }
        }

        Ok(None)
    }

    /// Checks `candidate` against `_id` and every unique index, ignoring the document at
    /// `replacing` (the one being updated).
    fn check_unique(&self, candidate: &Document, replacing: Option<usize>, collection: &str) -> RepoResult<()> {
        let id_index = IndexSpec::new(["_id"]).unique().named("_id_");
        let unique_indexes = std::iter::once(&id_index)
            .chain(self.indexes.iter().filter(|index| index.is_unique()));

        for index in unique_indexes {
            let keys = index_keys(index, candidate);

            let duplicate = self
                .documents
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != replacing)
                .flat_map(|(_, existing)| index_keys(index, existing))
                .find(|key| keys.contains(key));

            if let Some(key) = duplicate {
                return Err(RepoError::Constraint(format!(
                    "E11000 duplicate key error collection: {collection} index: {} dup key: {:?}",
                    index.name(),
                    key
                )));
            }
        }

        Ok(())
    }

    fn ensure_index(&mut self, spec: &IndexSpec, collection: &str) -> RepoResult<()> {
        spec.validate()?;

        let name = spec.name();
        if let Some(existing) = self.indexes.iter().find(|index| index.name() == name) {
            if existing.same_definition(spec) {
                return Ok(());
            }

            return Err(RepoError::Index(format!(
                "an index named {name} already exists on {collection} with a different definition"
            )));
        }

        if let Some(existing) = self
            .indexes
            .iter()
            .find(|index| index.fields().eq(spec.fields()))
        {
            return Err(RepoError::Index(format!(
                "index {name} has the same keys as existing index {} on {collection}",
                existing.name()
            )));
        }

        if spec.is_unique() {
            let mut seen: Vec<Vec<Bson>> = Vec::with_capacity(self.documents.len());
            for document in &self.documents {
                let keys = index_keys(spec, document);
                if let Some(key) = keys.iter().find(|key| seen.contains(key)) {
                    return Err(RepoError::Index(format!(
                        "cannot build unique index {name} on {collection}: duplicate key {key:?}"
                    )));
                }
                seen.extend(keys);
            }
        }

        self.indexes.push(spec.clone());
        Ok(())
    }
}

/// The index keys a document contributes, one per combination of field values.
///
/// Array fields are multikey: every element contributes its own key. A missing field
/// indexes as `null`, an empty array as `undefined`. Keys are deduplicated, so a document
/// never conflicts with itself.
fn index_keys(index: &IndexSpec, document: &Document) -> Vec<Vec<Bson>> {
    let per_field: Vec<Vec<Bson>> = index
        .fields()
        .map(|(field, _)| {
            let resolved = crate::evaluator::resolve_path(document, field);
            if resolved.is_empty() {
                return vec![Bson::Null];
            }

            resolved
                .into_iter()
                .flat_map(|value| match value {
                    Bson::Array(items) if items.is_empty() => vec![Bson::Undefined],
                    Bson::Array(items) => items.clone(),
                    other => vec![other.clone()],
                })
                .collect()
        })
        .collect();

    let mut keys: Vec<Vec<Bson>> = vec![Vec::new()];
    for values in per_field {
        keys = keys
            .into_iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut key = prefix.clone();
                    key.push(value.clone());
                    key
                })
            })
            .collect();
    }

    let mut unique_keys = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique_keys.contains(&key) {
            unique_keys.push(key);
        }
    }

    unique_keys
}


/// Thread-safe in-memory store adapter.
///
/// `InMemoryAdapter` is cloneable; clones and adapters obtained through
/// [`InMemoryAdapter::with_collection`] share the same underlying data, so several
/// collections of one "database" can be exercised together.
///
/// Queries scan the whole collection. Use it for tests and development.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryAdapter;
/// use docrepo::adapter::StoreAdapter;
/// use bson::doc;
///
/// let adapter = InMemoryAdapter::new("app", "users");
/// adapter.create(doc! { "name": "Alice" }).await?;
/// assert_eq!(adapter.get_count(Filter::all()).await?, 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryAdapter {
    database: String,
    collection: String,
    store: SharedStore,
    connections: Arc<ConnectionTracker>,
}

impl InMemoryAdapter {
    /// Creates an empty store and binds an adapter to `collection` in it.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            store: Arc::new(RwLock::new(StoreMap::new())),
            connections: ConnectionTracker::new(),
        }
    }

    pub fn builder(database: &str, collection: &str) -> InMemoryAdapterBuilder {
        InMemoryAdapterBuilder::new(database, collection)
    }

    /// Binds a new adapter to another collection of the same store.
    pub fn with_collection(&self, collection: impl Into<String>) -> Self {
        Self {
            database: self.database.clone(),
            collection: collection.into(),
            store: Arc::clone(&self.store),
            connections: Arc::clone(&self.connections),
        }
    }

    /// Lists the indexes registered on the bound collection, `_id_` first.
    pub async fn indexes(&self) -> Vec<IndexSpec> {
        let conn = self.connect();
        let store = conn.read().await;

        std::iter::once(IndexSpec::new(["_id"]).named("_id_"))
            .chain(
                store
                    .get(&self.collection)
                    .map(|state| state.indexes.clone())
                    .unwrap_or_default(),
            )
            .collect()
    }

    fn connect(&self) -> ScopedConnection<SharedStore> {
        self.connections.checkout(Arc::clone(&self.store))
    }
}

#[async_trait]
impl StoreAdapter for InMemoryAdapter {
    fn database(&self) -> &str {
        &self.database
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn open_connections(&self) -> usize {
        self.connections.open()
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection, indexes = indexes.len()))]
    async fn setup(&self, indexes: &[IndexSpec]) -> RepoResult<()> {
        let conn = self.connect();
        let mut store = conn.write().await;
        let state = store.entry(self.collection.clone()).or_default();

        for index in indexes {
            state.ensure_index(index, &self.collection)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn create(&self, document: Document) -> RepoResult<()> {
        let document = match document.get("_id") {
            Some(_) => document,
            None => std::iter::once(("_id".to_string(), Bson::ObjectId(ObjectId::new())))
                .chain(document)
                .collect(),
        };

        let conn = self.connect();
        let mut store = conn.write().await;
        let state = store.entry(self.collection.clone()).or_default();

        state.check_unique(&document, None, &self.collection)?;
        state.documents.push(document);

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection, ?options))]
    async fn get_all(&self, filter: Filter, options: Options) -> RepoResult<Page<Document>> {
        let filter = filter.into_document();
        let conn = self.connect();
        let store = conn.read().await;

        let Some(state) = store.get(&self.collection) else {
            return Ok(options.paginate(Vec::new()));
        };

        let matched = DocumentEvaluator::filter_documents(&state.documents, &filter)?;
        let page = options.paginate(matched.into_iter().cloned());
        tracing::debug!(returned = page.len(), count = ?page.count, "listed documents");

        Ok(page)
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn get_count(&self, filter: Filter) -> RepoResult<u64> {
        let filter = filter.into_document();
        let conn = self.connect();
        let store = conn.read().await;

        match store.get(&self.collection) {
            Some(state) => Ok(state.positions(&filter)?.len() as u64),
            None => Ok(0),
        }
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn get_one(&self, filter: Filter) -> RepoResult<Document> {
        let filter = filter.into_document();
        let conn = self.connect();
        let store = conn.read().await;

        store
            .get(&self.collection)
            .map(|state| {
                state
                    .first_position(&filter)
                    .map(|position| position.map(|p| state.documents[p].clone()))
            })
            .transpose()?
            .flatten()
            .ok_or_else(|| RepoError::NotFound(self.collection.clone()))
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn update(&self, filter: Filter, patch: Document) -> RepoResult<()> {
        let filter = filter.into_document();
        let conn = self.connect();
        let mut store = conn.write().await;

        let state = store
            .get_mut(&self.collection)
            .ok_or_else(|| RepoError::NotFound(self.collection.clone()))?;
        let position = state
            .first_position(&filter)?
            .ok_or_else(|| RepoError::NotFound(self.collection.clone()))?;

        let updated = apply_set(&state.documents[position], &patch)?;
        state.check_unique(&updated, Some(position), &self.collection)?;
        state.documents[position] = updated;

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn update_all(&self, filter: Filter, patch: Document) -> RepoResult<ChangeInfo> {
        let filter = filter.into_document();
        let conn = self.connect();
        let mut store = conn.write().await;

        let Some(state) = store.get_mut(&self.collection) else {
            return Ok(ChangeInfo::default());
        };

        let positions = state.positions(&filter)?;
        let mut updated_count = 0;

        // Documents are written one at a time; a failure leaves earlier ones updated.
        for &position in &positions {
            let updated = apply_set(&state.documents[position], &patch)?;
            if updated == state.documents[position] {
                continue;
            }

            state.check_unique(&updated, Some(position), &self.collection)?;
            state.documents[position] = updated;
            updated_count += 1;
        }

        let info = ChangeInfo::updated(positions.len() as u64, updated_count);
        tracing::debug!(matched = info.matched, updated = info.updated, "updated documents");

        Ok(info)
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn delete(&self, filter: Filter) -> RepoResult<()> {
        let filter = filter.into_document();
        let conn = self.connect();
        let mut store = conn.write().await;

        let state = store
            .get_mut(&self.collection)
            .ok_or_else(|| RepoError::NotFound(self.collection.clone()))?;
        let position = state
            .first_position(&filter)?
            .ok_or_else(|| RepoError::NotFound(self.collection.clone()))?;

        state.documents.remove(position);

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection))]
    async fn delete_all(&self, filter: Filter) -> RepoResult<ChangeInfo> {
        let filter = filter.into_document();
        let conn = self.connect();
        let mut store = conn.write().await;

        let Some(state) = store.get_mut(&self.collection) else {
            return Ok(ChangeInfo::default());
        };

        let positions = state.positions(&filter)?;
        for &position in positions.iter().rev() {
            state.documents.remove(position);
        }

        let info = ChangeInfo::removed(positions.len() as u64);
        tracing::debug!(removed = info.removed, "removed documents");

        Ok(info)
    }
}


/// Builder for constructing [`InMemoryAdapter`] instances.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryAdapter;
/// use docrepo::adapter::AdapterBuilder;
///
/// let adapter = InMemoryAdapter::builder("app", "users").build().await.unwrap();
/// ```
pub struct InMemoryAdapterBuilder {
    database: String,
    collection: String,
}

impl InMemoryAdapterBuilder {
    pub fn new(database: &str, collection: &str) -> Self {
        Self {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl AdapterBuilder for InMemoryAdapterBuilder {
    type Adapter = InMemoryAdapter;

    /// Builds a fresh, empty store. This always succeeds.
    async fn build(self) -> RepoResult<Self::Adapter> {
        Ok(InMemoryAdapter::new(self.database, self.collection))
    }
}
