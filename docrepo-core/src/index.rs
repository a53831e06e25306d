//! Index specifications for the setup step.
//!
//! An adapter's `setup` takes a slice of [`IndexSpec`] and makes sure each index exists on
//! the bound collection. Applying the same specification again is a no-op. A key prefixed
//! with `-` is indexed in descending order.

use bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Describes one index: an ordered list of key fields and whether it enforces uniqueness.
///
/// # Example
///
/// ```ignore
/// use docrepo::index::IndexSpec;
///
/// let indexes = [
///     IndexSpec::new(["email"]).unique(),
///     IndexSpec::new(["last_name", "-created_at"]),
/// ];
/// assert_eq!(indexes[1].name(), "last_name_1_created_at_-1");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    keys: Vec<String>,
    #[serde(default)]
    unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl IndexSpec {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            unique: false,
            name: None,
        }
    }

    /// Makes the index enforce uniqueness over its key tuple.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Overrides the generated index name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// The index name: the explicit one, or the store convention `field_1_other_-1`.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .fields()
                .map(|(field, direction)| format!("{field}_{direction}"))
                .collect::<Vec<_>>()
                .join("_"),
        }
    }

    /// Iterates over `(field, direction)` pairs, `1` for ascending and `-1` for descending.
    pub fn fields(&self) -> impl Iterator<Item = (&str, i32)> {
        self.keys.iter().map(|key| match key.strip_prefix('-') {
            Some(field) => (field, -1),
            None => (key.strip_prefix('+').unwrap_or(key), 1),
        })
    }

    /// The key document in the store's native form, e.g. `{ "email": 1 }`.
    pub fn key_document(&self) -> Document {
        self.fields().fold(doc! {}, |mut keys, (field, direction)| {
            keys.insert(field, direction);
            keys
        })
    }

    /// Checks that the specification names at least one non-empty, non-repeated field.
    pub fn validate(&self) -> RepoResult<()> {
        if self.keys.is_empty() {
            return Err(RepoError::Index("index specification has no keys".to_string()));
        }

        let mut seen = Vec::with_capacity(self.keys.len());
        for (field, _) in self.fields() {
            if field.is_empty() {
                return Err(RepoError::Index(format!("index {} has an empty key", self.name())));
            }
            if seen.contains(&field) {
                return Err(RepoError::Index(format!(
                    "index {} repeats key {field}",
                    self.name()
                )));
            }
            seen.push(field);
        }

        Ok(())
    }

    /// Returns `true` if both specifications describe the same index definition.
    ///
    /// Two specs with the same definition are interchangeable for setup purposes even if
    /// one spells an ascending key with a `+` prefix.
    pub fn same_definition(&self, other: &IndexSpec) -> bool {
        self.name() == other.name()
            && self.unique == other.unique
            && self.fields().eq(other.fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names() {
        assert_eq!(IndexSpec::new(["email"]).name(), "email_1");
        assert_eq!(IndexSpec::new(["timestamp"]).unique().name(), "timestamp_1");
        assert_eq!(IndexSpec::new(["a", "-b"]).name(), "a_1_b_-1");
        assert_eq!(IndexSpec::new(["a"]).named("by_a").name(), "by_a");
    }

    #[test]
    fn test_key_document_keeps_order() {
        let keys = IndexSpec::new(["last", "-first", "+age"]).key_document();

        assert_eq!(keys, doc! { "last": 1, "first": -1, "age": 1 });
    }

    #[test]
    fn test_validate() {
        assert!(IndexSpec::new(["email"]).validate().is_ok());
        assert!(matches!(IndexSpec::new(Vec::<String>::new()).validate(), Err(RepoError::Index(_))));
        assert!(matches!(IndexSpec::new(["-"]).validate(), Err(RepoError::Index(_))));
        assert!(matches!(IndexSpec::new(["a", "-a"]).validate(), Err(RepoError::Index(_))));
    }

    #[test]
    fn test_same_definition() {
        let email = IndexSpec::new(["email"]).unique();

        assert!(email.same_definition(&IndexSpec::new(["+email"]).unique()));
        assert!(!email.same_definition(&IndexSpec::new(["email"])));
        assert!(!email.same_definition(&IndexSpec::new(["-email"]).unique().named("email_1")));
    }
}
