//! MongoDB adapter implementation for docrepo.
//!
//! This crate provides a MongoDB-based implementation of the `StoreAdapter` trait on top of
//! the official async driver. Filters and patches are forwarded to the server unchanged,
//! updates are issued as `$set` merges and paging is pushed down to the query.
//!
//! To use this adapter, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A connection string and a database and collection name are needed. They can be passed to
//! the builder directly, or loaded with [`MongoDbConfig`].
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{adapter::AdapterBuilder, mongodb::{MongoDbAdapter, MongoDbConfig}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let users = MongoDbAdapter::builder("mongodb://localhost:27017", "app", "users")
//!         .max_pool_size(16)
//!         .build()
//!         .await?;
//!     let audit = users.with_collection("audit");
//!
//!     let orders = MongoDbConfig::from_env("orders")?.builder().build().await?;
//!
//!     users.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_mongodb;

pub mod adapter;
pub mod config;
mod error;

pub use adapter::{MongoDbAdapter, MongoDbAdapterBuilder};
pub use config::MongoDbConfig;
