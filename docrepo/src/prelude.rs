//! Convenient re-exports of commonly used types from docrepo.
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```

pub use docrepo_core::{
    adapter::{StoreAdapter, AdapterBuilder},
    collection::TypedCollection,
    document::DocumentExt,
    error::{RepoError, RepoResult},
    filter::Filter,
    index::IndexSpec,
    options::{ChangeInfo, Options, Page, QueryRequest},
    repository::{BaseRepository, Repository},
};

pub use crate::{
    audit::{Auditor, StoreAuditor},
    crypt::{Argon2Crypt, BcryptCrypt, PasswordCrypt},
    schema::SchemaValidator,
};
