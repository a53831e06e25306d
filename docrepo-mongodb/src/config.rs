//! Connection settings for the MongoDB adapter.

use serde::{Deserialize, Serialize};

use docrepo_core::error::{RepoError, RepoResult};

use crate::adapter::MongoDbAdapterBuilder;

pub const DEFAULT_DSN: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "docrepo";

/// Settings needed to build a [`MongoDbAdapter`](crate::MongoDbAdapter).
///
/// The struct deserializes from any serde format, so it can be embedded in an
/// application's own configuration file, or it can be read from the environment with
/// [`MongoDbConfig::from_env`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MongoDbConfig {
    #[serde(default = "default_dsn")]
    pub dsn: String,
    #[serde(default = "default_database")]
    pub database: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

fn default_dsn() -> String {
    DEFAULT_DSN.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl MongoDbConfig {
    /// Reads the settings for `collection` from the process environment.
    ///
    /// | variable                | default                      |
    /// |-------------------------|------------------------------|
    /// | `DOCREPO_DSN`, `DBHOST` | `mongodb://localhost:27017`  |
    /// | `DOCREPO_DATABASE`      | `docrepo`                    |
    /// | `DOCREPO_MAX_POOL_SIZE` | driver default               |
    /// | `DOCREPO_APP_NAME`      | none                         |
    pub fn from_env(collection: &str) -> RepoResult<Self> {
        Self::from_lookup(collection, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        collection: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> RepoResult<Self> {
        let max_pool_size = lookup("DOCREPO_MAX_POOL_SIZE")
            .map(|value| {
                value.parse::<u32>().map_err(|e| {
                    RepoError::Initialization(format!("invalid DOCREPO_MAX_POOL_SIZE {value:?}: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            dsn: lookup("DOCREPO_DSN")
                .or_else(|| lookup("DBHOST"))
                .unwrap_or_else(default_dsn),
            database: lookup("DOCREPO_DATABASE").unwrap_or_else(default_database),
            collection: collection.to_string(),
            max_pool_size,
            app_name: lookup("DOCREPO_APP_NAME"),
        })
    }

    /// Turns the settings into an adapter builder.
    pub fn builder(&self) -> MongoDbAdapterBuilder {
        let mut builder = MongoDbAdapterBuilder::new(&self.dsn, &self.database, &self.collection);

        if let Some(size) = self.max_pool_size {
            builder = builder.max_pool_size(size);
        }
        if let Some(name) = &self.app_name {
            builder = builder.app_name(name);
        }

        builder
    }
}
