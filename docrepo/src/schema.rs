//! JSON-schema validation of request bodies.
//!
//! A [`SchemaValidator`] holds compiled schemas by name. Schemas are either added directly
//! or loaded from files below a root directory. Request bodies are validated against a
//! schema and, only when they are valid, deserialized into the caller's type.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{options::QueryRequest, schema::SchemaValidator};
//!
//! let mut schemas = SchemaValidator::with_root("./schemas");
//! schemas.load_schema("query.json")?;
//!
//! let request: QueryRequest = schemas.validate_bind("query.json", body)?;
//! let page = adapter.get_all(request.filter(), request.options).await?;
//! ```

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};
use jsonschema::Validator;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema {0} is not loaded")]
    NotLoaded(String),
    #[error("Failed to load schema {name}: {message}")]
    Load { name: String, message: String },
    #[error("Invalid schema {name}: {message}")]
    InvalidSchema { name: String, message: String },
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Request does not match schema {schema}: {}", errors.join("; "))]
    Validation { schema: String, errors: Vec<String> },
    #[error("Failed to bind request: {0}")]
    Bind(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Compiled JSON schemas, looked up by name.
///
/// The validator is an ordinary value: construct one per application (or per test), load
/// its schemas at startup and share it by reference afterwards.
#[derive(Default)]
pub struct SchemaValidator {
    root: Option<PathBuf>,
    schemas: HashMap<String, Validator>,
}

impl SchemaValidator {
    /// Creates a validator without a schema directory. Schemas must be added with
    /// [`add_schema`](Self::add_schema).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator that loads schema files relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            schemas: HashMap::new(),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Compiles `schema` and registers it as `name`, replacing any schema of that name.
    pub fn add_schema(&mut self, name: &str, schema: &Value) -> SchemaResult<()> {
        let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::InvalidSchema {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        self.schemas.insert(name.to_string(), validator);
        Ok(())
    }

    /// Loads and compiles the schema file `name` below the root directory.
    ///
    /// A schema that is already loaded is kept as is.
    pub fn load_schema(&mut self, name: &str) -> SchemaResult<()> {
        if self.has_schema(name) {
            return Ok(());
        }

        let path = match &self.root {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        };
        let load_error = |message: String| SchemaError::Load {
            name: name.to_string(),
            message,
        };

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| load_error(format!("{}: {e}", path.display())))?;
        let schema: Value = serde_json::from_str(&contents).map_err(|e| load_error(e.to_string()))?;

        tracing::debug!(schema = name, path = %path.display(), "loaded json schema");
        self.add_schema(name, &schema)
    }

    /// Validates `instance` against the schema `name`, collecting every violation.
    pub fn validate(&self, name: &str, instance: &Value) -> SchemaResult<()> {
        let validator = self
            .schemas
            .get(name)
            .ok_or_else(|| SchemaError::NotLoaded(name.to_string()))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|error| error.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Validation {
                schema: name.to_string(),
                errors,
            })
        }
    }

    /// Parses `body` as JSON, validates it against the schema `name` and deserializes it.
    pub fn validate_bind<T: DeserializeOwned>(&self, name: &str, body: &[u8]) -> SchemaResult<T> {
        let instance: Value =
            serde_json::from_slice(body).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

        self.validate(name, &instance)?;

        serde_json::from_value(instance).map_err(|e| SchemaError::Bind(e.to_string()))
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.schemas.keys().collect();
        names.sort();

        f.debug_struct("SchemaValidator")
            .field("root", &self.root)
            .field("schemas", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    use docrepo_core::options::{Options, QueryRequest};

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
        email: String,
    }

    fn user_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "email": { "type": "string" }
            },
            "required": ["name", "email"]
        })
    }

    fn validator() -> SchemaValidator {
        let mut validator = SchemaValidator::new();
        validator.add_schema("user", &user_schema()).unwrap();
        validator
    }

    #[test]
    fn test_validate_bind_valid_body() {
        let user: NewUser = validator()
            .validate_bind("user", br#"{ "name": "Alice", "email": "alice@example.com" }"#)
            .unwrap();

        assert_eq!(user, NewUser { name: "Alice".into(), email: "alice@example.com".into() });
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let err = validator()
            .validate("user", &json!({ "name": "" }))
            .unwrap_err();

        match err {
            SchemaError::Validation { schema, errors } => {
                assert_eq!(schema, "user");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_body_is_not_bound() {
        let validator = validator();

        assert!(matches!(
            validator.validate_bind::<NewUser>("user", br#"{ "name": "Alice" "#),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(
            validator.validate_bind::<NewUser>("user", br#"{ "name": "Alice" }"#),
            Err(SchemaError::Validation { .. })
        ));
    }

    #[test]
    fn test_bind_failure_after_validation() {
        let mut validator = SchemaValidator::new();
        validator.add_schema("anything", &json!({})).unwrap();

        assert!(matches!(
            validator.validate_bind::<NewUser>("anything", br#"{ "name": 5 }"#),
            Err(SchemaError::Bind(_))
        ));
    }

    #[test]
    fn test_unknown_and_invalid_schemas() {
        let mut validator = SchemaValidator::new();

        assert_eq!(
            validator.validate("missing", &json!({})),
            Err(SchemaError::NotLoaded("missing".into()))
        );
        assert!(matches!(
            validator.add_schema("broken", &json!({ "type": 12 })),
            Err(SchemaError::InvalidSchema { .. })
        ));
        assert!(!validator.has_schema("broken"));
    }

    #[test]
    fn test_load_schema_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("query.json"), r#"{
            "type": "object",
            "properties": {
                "opts": {
                    "type": "object",
                    "properties": {
                        "skip": { "type": "integer", "minimum": 0 },
                        "limit": { "type": "integer", "minimum": 0 },
                        "count": { "type": "boolean" }
                    }
                },
                "query": { "type": "object" }
            }
        }"#)
        .unwrap();

        let mut validator = SchemaValidator::with_root(dir.path());
        validator.load_schema("query.json").unwrap();
        validator.load_schema("query.json").unwrap();
        assert!(validator.has_schema("query.json"));

        let request: QueryRequest = validator
            .validate_bind("query.json", br#"{ "opts": { "skip": 5, "limit": 5, "count": true }, "query": {} }"#)
            .unwrap();
        assert_eq!(request.options, Options::new().skip(5).limit(5).with_count());
        assert!(request.filter().is_all());

        assert!(matches!(
            validator.validate_bind::<QueryRequest>("query.json", br#"{ "opts": { "skip": -1 } }"#),
            Err(SchemaError::Validation { .. })
        ));

        assert!(matches!(
            validator.load_schema("absent.json"),
            Err(SchemaError::Load { .. })
        ));
    }
}
