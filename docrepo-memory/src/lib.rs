//! In-memory store adapter for docrepo.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreAdapter` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests, where it stands in for a real document database.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Filter documents** - Evaluates the common comparison, logical and array operators
//! - **Merge updates** - Patches are applied with `$set` semantics, including dotted paths
//! - **Unique indexes** - Unique keys registered through `setup` are enforced on writes
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryAdapter};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = InMemoryAdapter::builder("app", "users").build().await?;
//!     adapter.setup(&[IndexSpec::new(["email"]).unique()]).await?;
//!
//!     adapter.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//!     let alice = adapter.get_one(doc! { "name": "Alice" }.into()).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

pub mod adapter;
mod evaluator;
mod update;

pub use adapter::{InMemoryAdapter, InMemoryAdapterBuilder};
