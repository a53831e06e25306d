//! Main docrepo crate providing a generic repository layer over document databases.
//!
//! This crate is the primary entry point for users of docrepo. It re-exports the core
//! types from the sub-crates, gives access to the store adapters and adds the audit log
//! and password hashing collaborators used by account-style repositories, and JSON-schema
//! validation for incoming list requests.
//!
//! # Features
//!
//! - **One capability set** - Setup, create, list, count, fetch, update and delete on any adapter
//! - **Paging with optional counts** - Skip/limit paging and a total count only when asked for
//! - **Merge updates** - Patches only touch the fields they name
//! - **Scoped connections** - Every operation releases its connection, on error paths too
//! - **Multiple adapters** - In-memory and MongoDB (behind the `mongodb` feature)
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryAdapter};
//! use bson::doc;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub name: String,
//!     pub email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = InMemoryAdapter::builder("app", "users").build().await?;
//!     adapter.setup(&[IndexSpec::new(["email"]).unique()]).await?;
//!
//!     let users = TypedCollection::<User, _>::new(&adapter);
//!     users.create(&User { name: "Alice".into(), email: "alice@example.com".into() }).await?;
//!
//!     let info = adapter
//!         .update_all(doc! { "name": "Alice" }.into(), doc! { "active": true })
//!         .await?;
//!     assert_eq!(info.matched, 1);
//!
//!     // Second page of ten, with the total number of users.
//!     let page = BaseRepository::new(&adapter)
//!         .list::<User>(Options::new().skip(10).limit(10).with_count())
//!         .await?;
//!     println!("{} of {:?}", page.items.len(), page.count);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Adapters
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB adapter (requires `mongodb` feature)

pub mod audit;
pub mod crypt;
pub mod prelude;
pub mod schema;

pub use docrepo_core::{adapter, collection, connection, document, error, filter, index, options, repository};

// Re-export BSON types for convenience
pub use bson;

/// In-memory adapter implementations.
pub mod memory {
    pub use docrepo_memory::{InMemoryAdapter, InMemoryAdapterBuilder};
}

/// MongoDB adapter implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{MongoDbAdapter, MongoDbAdapterBuilder, MongoDbConfig};
}
