//! Audit logging on top of a store adapter.
//!
//! An [`Auditor`] records who did what, and when, as documents in a dedicated collection.
//! [`StoreAuditor`] writes those entries through any [`StoreAdapter`], so the audit trail
//! can live next to the application's data or in a separate database.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{audit::{Auditor, StoreAuditor}, memory::InMemoryAdapter};
//! use bson::{Bson, bson};
//!
//! let auditor = StoreAuditor::new(users.with_collection("audit"), "accounts", "host-1");
//! auditor.setup().await?;
//! auditor.log(bson!("alice"), bson!("password changed"), Bson::Null).await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, DateTime};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docrepo_core::{
    adapter::StoreAdapter,
    document::to_document,
    error::RepoError,
    index::IndexSpec,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("Audit setup failed: {0}")]
    Setup(#[source] RepoError),
    #[error("Audit entry could not be written: {0}")]
    Write(#[source] RepoError),
}

pub type AuditResult<T> = Result<T, AuditError>;

/// A single audit log entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime,
    pub service_name: String,
    pub service_host: String,
    pub user: Bson,
    #[serde(rename = "msg")]
    pub message: Bson,
    pub data: Bson,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(service_name: &str, service_host: &str, user: Bson, message: Bson, data: Bson) -> Self {
        Self {
            timestamp: DateTime::now(),
            service_name: service_name.to_string(),
            service_host: service_host.to_string(),
            user,
            message,
            data,
        }
    }

    pub fn timestamp_utc(&self) -> chrono::DateTime<Utc> {
        self.timestamp.to_chrono()
    }
}

/// Writes audit entries.
#[async_trait]
pub trait Auditor: Send + Sync {
    /// Prepares the audit collection. Safe to call on every start.
    async fn setup(&self) -> AuditResult<()>;

    /// Records that `user` did `message`, with optional context in `data`.
    async fn log(&self, user: Bson, message: Bson, data: Bson) -> AuditResult<()>;
}

/// [`Auditor`] that stores entries through a store adapter.
#[derive(Debug, Clone)]
pub struct StoreAuditor<A> {
    adapter: A,
    service_name: String,
    service_host: String,
}

impl<A: StoreAdapter> StoreAuditor<A> {
    pub fn new(adapter: A, service_name: &str, service_host: &str) -> Self {
        Self {
            adapter,
            service_name: service_name.to_string(),
            service_host: service_host.to_string(),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The indexes the audit collection needs.
    pub fn indexes() -> Vec<IndexSpec> {
        vec![IndexSpec::new(["timestamp"])]
    }
}

#[async_trait]
impl<A: StoreAdapter> Auditor for StoreAuditor<A> {
    async fn setup(&self) -> AuditResult<()> {
        self.adapter
            .setup(&Self::indexes())
            .await
            .map_err(AuditError::Setup)
    }

    #[tracing::instrument(skip_all, fields(service = %self.service_name, collection = %self.adapter.collection()))]
    async fn log(&self, user: Bson, message: Bson, data: Bson) -> AuditResult<()> {
        let entry = AuditEntry::new(&self.service_name, &self.service_host, user, message, data);

        let written = match to_document(&entry) {
            Ok(document) => self.adapter.create(document).await,
            Err(e) => Err(e),
        };

        written.map_err(|e| {
            tracing::warn!(error = %e, "failed to write audit entry");
            AuditError::Write(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{bson, doc};
    use docrepo_core::{filter::Filter, options::Options};
    use docrepo_memory::InMemoryAdapter;

    #[tokio::test]
    async fn test_log_writes_entry() {
        let adapter = InMemoryAdapter::new("app", "audit");
        let auditor = StoreAuditor::new(adapter.clone(), "accounts", "host-1");

        auditor.setup().await.unwrap();
        auditor
            .log(bson!("alice"), bson!("password changed"), bson!({ "id": 7 }))
            .await
            .unwrap();

        let stored = adapter.get_one(Filter::all()).await.unwrap();
        assert_eq!(stored.get_str("service_name").unwrap(), "accounts");
        assert_eq!(stored.get_str("service_host").unwrap(), "host-1");
        assert_eq!(stored.get_str("user").unwrap(), "alice");
        assert_eq!(stored.get_str("msg").unwrap(), "password changed");
        assert_eq!(stored.get_document("data").unwrap(), &doc! { "id": 7 });
        assert!(stored.get_datetime("timestamp").is_ok());
    }

    #[tokio::test]
    async fn test_setup_is_repeatable() {
        let adapter = InMemoryAdapter::new("app", "audit");
        let auditor = StoreAuditor::new(adapter.clone(), "accounts", "host-1");

        auditor.setup().await.unwrap();
        auditor.setup().await.unwrap();

        let names: Vec<_> = adapter.indexes().await.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["_id_", "timestamp_1"]);
    }

    #[tokio::test]
    async fn test_setup_conflict_is_reported() {
        let adapter = InMemoryAdapter::new("app", "audit");
        adapter
            .setup(&[IndexSpec::new(["timestamp"]).unique()])
            .await
            .unwrap();

        let err = StoreAuditor::new(adapter, "accounts", "host-1")
            .setup()
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Setup(RepoError::Index(_))));
    }

    #[tokio::test]
    async fn test_entries_round_trip() {
        let adapter = InMemoryAdapter::new("app", "audit");
        let auditor = StoreAuditor::new(&adapter, "accounts", "host-1");

        for i in 0..3 {
            auditor.log(bson!("bob"), bson!(format!("event {i}")), Bson::Null).await.unwrap();
        }

        let entries = docrepo_core::collection::TypedCollection::<AuditEntry, _>::new(&adapter)
            .get_all(Filter::all(), Options::new().with_count())
            .await
            .unwrap();
        assert_eq!(entries.count, Some(3));
        assert_eq!(entries.items[2].message, bson!("event 2"));
        assert!(entries.items[0].timestamp_utc() <= Utc::now());
    }
}
