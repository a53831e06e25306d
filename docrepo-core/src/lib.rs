//! A generic repository and data-access layer over document databases.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Store adapters** ([`adapter`]) - The collection-bound capability set every backend implements
//! - **Options and pages** ([`options`]) - Paging, optional counting and bulk-change reports
//! - **Filters** ([`filter`]) - Opaque query documents passed through to the store
//! - **Index setup** ([`index`]) - Idempotent index specifications
//! - **Scoped connections** ([`connection`]) - Per-operation connection guards
//! - **Typed collections** ([`collection`]) - Serde-typed access to an adapter
//! - **Repositories** ([`repository`]) - A listing-only façade over an adapter
//! - **Error handling** ([`error`]) - Error and result types shared by all adapters
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryAdapter};
//! use bson::doc;
//!
//! let adapter = InMemoryAdapter::builder("app", "users").build().await?;
//! adapter.setup(&[IndexSpec::new(["email"]).unique()]).await?;
//! adapter.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//!
//! let page = BaseRepository::new(&adapter)
//!     .list::<bson::Document>(Options::new().with_count())
//!     .await?;
//! assert_eq!(page.count, Some(1));
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod adapter;
pub mod collection;
pub mod connection;
pub mod document;
pub mod error;
pub mod filter;
pub mod index;
pub mod options;
pub mod repository;
