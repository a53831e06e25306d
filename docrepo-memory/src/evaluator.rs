//! Filter evaluation for in-memory documents.
//!
//! This module understands the subset of the native query language needed to run the same
//! filters the MongoDB adapter forwards to the server: implicit equality, dotted paths,
//! the comparison operators, `$in`/`$nin`, `$exists`, `$regex`, `$size`, `$all`, `$not`
//! and the `$and`/`$or`/`$nor` combinators.

use std::cmp::Ordering;
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use regex::RegexBuilder;

use docrepo_core::error::{RepoError, RepoResult};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so `1`, `1i64` and `1.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null or missing value
    Null,
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    /// Embedded document; equality is field-order sensitive
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Types the evaluator does not order or compare (binary, code, ...)
    Opaque(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            other => Comparable::Opaque(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Opaque(a), Comparable::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


/// Resolves a dotted path against a document.
///
/// Arrays met along the way fan out: `tags.name` over `{ tags: [{ name: "a" }, { name: "b" }] }`
/// yields both names. A path that does not resolve yields nothing.
pub(crate) fn resolve_path<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut current = vec![];
    let mut segments = path.split('.');

    match segments.next().and_then(|first| document.get(first)) {
        Some(value) => current.push(value),
        None => return current,
    }

    for segment in segments {
        current = current
            .into_iter()
            .flat_map(|value| descend(value, segment))
            .collect();
    }

    current
}

fn descend<'a>(value: &'a Bson, segment: &str) -> Vec<&'a Bson> {
    match value {
        Bson::Document(doc) => doc.get(segment).into_iter().collect(),
        Bson::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get(index).into_iter().collect(),
            Err(_) => items
                .iter()
                .filter_map(|item| item.as_document().and_then(|doc| doc.get(segment)))
                .collect(),
        },
        _ => vec![],
    }
}


/// Evaluates a filter document against stored documents.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies `filter`. An empty filter matches.
    pub fn matches(&self, filter: &Document) -> RepoResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.all_of(condition)?,
                "$or" => self.any_of(condition)?,
                "$nor" => !self.any_of(condition)?,
                op if op.starts_with('$') => {
                    return Err(RepoError::InvalidQuery(format!("unknown top level operator: {op}")));
                }
                field => self.field_matches(field, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Keeps the documents matching `filter`, preserving their order.
    pub fn filter_documents<I>(documents: I, filter: &Document) -> RepoResult<Vec<&'a Document>>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched = Vec::new();

        for doc in documents {
            if DocumentEvaluator::new(doc).matches(filter)? {
                matched.push(doc);
            }
        }

        Ok(matched)
    }

    fn all_of(&self, condition: &Bson) -> RepoResult<bool> {
        for clause in clauses(condition, "$and")? {
            if !self.matches(clause)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any_of(&self, condition: &Bson) -> RepoResult<bool> {
        for clause in clauses(condition, "$or")? {
            if self.matches(clause)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn field_matches(&self, field: &str, condition: &Bson) -> RepoResult<bool> {
        let values = resolve_path(self.document, field);

        match condition {
            Bson::Document(ops) if is_operator_document(ops) => {
                for (op, operand) in ops {
                    // $options is consumed together with $regex.
                    if op == "$options" {
                        continue;
                    }
                    if !eval_operator(&values, op, operand, ops)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            _ => Ok(equals_any(&values, condition)),
        }
    }
}

fn clauses<'b>(condition: &'b Bson, op: &str) -> RepoResult<Vec<&'b Document>> {
    match condition {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| {
                item.as_document()
                    .ok_or_else(|| RepoError::InvalidQuery(format!("{op} entries must be documents")))
            })
            .collect(),
        _ => Err(RepoError::InvalidQuery(format!("{op} must be a nonempty array"))),
    }
}

fn is_operator_document(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|key| key.starts_with('$'))
}

/// Implicit equality: matches when any resolved value equals `expected`, or contains it when
/// the value is an array. A missing field equals `null`.
fn equals_any(values: &[&Bson], expected: &Bson) -> bool {
    let expected = Comparable::from(expected);

    if values.is_empty() {
        return expected == Comparable::Null;
    }

    values.iter().any(|value| {
        let candidate = Comparable::from(*value);
        match &candidate {
            Comparable::Array(items) => candidate == expected || items.iter().any(|item| *item == expected),
            _ => candidate == expected,
        }
    })
}

/// Ordering comparison against every resolved value (and array element).
fn compare_any(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);

    values.iter().any(|value| {
        let candidate = Comparable::from(*value);
        let hit = |item: &Comparable<'_>| item.partial_cmp(&operand).is_some_and(&accept);

        match &candidate {
            Comparable::Array(items) => items.iter().any(hit),
            _ => hit(&candidate),
        }
    })
}

fn eval_operator(values: &[&Bson], op: &str, operand: &Bson, siblings: &Document) -> RepoResult<bool> {
    Ok(match op {
        "$eq" => equals_any(values, operand),
        "$ne" => !equals_any(values, operand),
        "$gt" => compare_any(values, operand, |o| o == Ordering::Greater),
        "$gte" => compare_any(values, operand, |o| o != Ordering::Less),
        "$lt" => compare_any(values, operand, |o| o == Ordering::Less),
        "$lte" => compare_any(values, operand, |o| o != Ordering::Greater),
        "$in" => in_list(values, operand, op)?,
        "$nin" => !in_list(values, operand, op)?,
        "$exists" => {
            let should_exist = match operand {
                Bson::Boolean(flag) => *flag,
                Bson::Int32(n) => *n != 0,
                Bson::Int64(n) => *n != 0,
                _ => true,
            };
            values.is_empty() != should_exist
        }
        "$regex" => {
            let options = siblings.get_str("$options").unwrap_or_default();
            regex_any(values, operand, options)?
        }
        "$size" => {
            let size = match operand {
                Bson::Int32(n) => *n as i64,
                Bson::Int64(n) => *n,
                _ => return Err(RepoError::InvalidQuery("$size needs a number".to_string())),
            };
            values
                .iter()
                .any(|value| matches!(value, Bson::Array(items) if items.len() as i64 == size))
        }
        "$all" => match operand {
            Bson::Array(required) => required.iter().all(|item| equals_any(values, item)),
            _ => return Err(RepoError::InvalidQuery("$all needs an array".to_string())),
        },
        "$not" => match operand {
            Bson::Document(ops) if is_operator_document(ops) => {
                for (inner, inner_operand) in ops {
                    if inner == "$options" {
                        continue;
                    }
                    if !eval_operator(values, inner, inner_operand, ops)? {
                        return Ok(true);
                    }
                }
                false
            }
            Bson::String(_) => !regex_any(values, operand, "")?,
            _ => return Err(RepoError::InvalidQuery("$not needs a regex or a document".to_string())),
        },
        other => return Err(RepoError::InvalidQuery(format!("unknown operator: {other}"))),
    })
}

fn in_list(values: &[&Bson], operand: &Bson, op: &str) -> RepoResult<bool> {
    match operand {
        Bson::Array(candidates) => Ok(candidates.iter().any(|candidate| equals_any(values, candidate))),
        _ => Err(RepoError::InvalidQuery(format!("{op} needs an array"))),
    }
}

fn regex_any(values: &[&Bson], pattern: &Bson, options: &str) -> RepoResult<bool> {
    let pattern = match pattern {
        Bson::String(pattern) => pattern,
        _ => return Err(RepoError::InvalidQuery("$regex has to be a string".to_string())),
    };

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|e| RepoError::InvalidQuery(format!("invalid $regex: {e}")))?;

    Ok(values.iter().any(|value| match value {
        Bson::String(s) => regex.is_match(s),
        Bson::Array(items) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| regex.is_match(s))),
        _ => false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn user() -> Document {
        doc! {
            "name": "Linus Langbein",
            "email": "l.langbein@litixsoft.de",
            "age": 31,
            "tags": ["admin", "ops"],
            "address": { "city": "Leipzig", "zip": "04109" },
            "logins": [{ "ip": "10.0.0.1" }, { "ip": "10.0.0.2" }],
        }
    }

    fn eval(filter: Document) -> bool {
        DocumentEvaluator::new(&user()).matches(&filter).unwrap()
    }

    #[test]
    fn test_implicit_equality() {
        assert!(eval(doc! {}));
        assert!(eval(doc! { "name": "Linus Langbein" }));
        assert!(eval(doc! { "age": 31.0 }));
        assert!(!eval(doc! { "name": "Timo" }));
        assert!(eval(doc! { "missing": null }));
    }

    #[test]
    fn test_array_membership_and_paths() {
        assert!(eval(doc! { "tags": "ops" }));
        assert!(eval(doc! { "address.city": "Leipzig" }));
        assert!(eval(doc! { "logins.ip": "10.0.0.2" }));
        assert!(eval(doc! { "tags.0": "admin" }));
        assert!(!eval(doc! { "address.street": "Main" }));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(eval(doc! { "age": { "$gt": 30, "$lte": 31 } }));
        assert!(!eval(doc! { "age": { "$lt": 31 } }));
        assert!(eval(doc! { "age": { "$ne": 30 } }));
        assert!(eval(doc! { "age": { "$in": [1, 31] } }));
        assert!(eval(doc! { "tags": { "$nin": ["guest"] } }));
        assert!(!eval(doc! { "name": { "$gt": 5 } }));
    }

    #[test]
    fn test_exists_regex_size_all() {
        assert!(eval(doc! { "email": { "$exists": true } }));
        assert!(eval(doc! { "phone": { "$exists": false } }));
        assert!(eval(doc! { "email": { "$regex": ".langbein@litixsoft.de" } }));
        assert!(eval(doc! { "name": { "$regex": "^linus", "$options": "i" } }));
        assert!(!eval(doc! { "name": { "$regex": "^linus" } }));
        assert!(eval(doc! { "tags": { "$size": 2 } }));
        assert!(eval(doc! { "tags": { "$all": ["ops", "admin"] } }));
    }

    #[test]
    fn test_logical_operators() {
        assert!(eval(doc! { "$or": [{ "name": "Timo" }, { "age": 31 }] }));
        assert!(!eval(doc! { "$and": [{ "name": "Timo" }, { "age": 31 }] }));
        assert!(eval(doc! { "$nor": [{ "name": "Timo" }] }));
        assert!(eval(doc! { "age": { "$not": { "$gt": 40 } } }));
    }

    #[test]
    fn test_embedded_document_equality_is_ordered() {
        assert!(eval(doc! { "address": { "city": "Leipzig", "zip": "04109" } }));
        assert!(!eval(doc! { "address": { "zip": "04109", "city": "Leipzig" } }));
        assert!(!eval(doc! { "address": { "city": "Leipzig" } }));
        assert!(eval(doc! { "logins": { "ip": "10.0.0.1" } }));
    }

    #[test]
    fn test_object_id_equality() {
        let id = ObjectId::new();
        let document = doc! { "_id": id };

        assert!(DocumentEvaluator::new(&document).matches(&doc! { "_id": id }).unwrap());
        assert!(!DocumentEvaluator::new(&document).matches(&doc! { "_id": ObjectId::new() }).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let result = DocumentEvaluator::new(&user()).matches(&doc! { "age": { "$near": 1 } });
        assert!(matches!(result, Err(RepoError::InvalidQuery(_))));

        let result = DocumentEvaluator::new(&user()).matches(&doc! { "$where": "1" });
        assert!(matches!(result, Err(RepoError::InvalidQuery(_))));
    }
}
