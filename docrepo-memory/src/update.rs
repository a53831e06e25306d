//! Merge updates for in-memory documents.
//!
//! A patch is applied with `$set` semantics: every field in the patch overwrites (or
//! creates) the field at the same path, everything else is left alone. Dotted keys address
//! nested documents and create missing intermediate documents.

use bson::{Bson, Document};

use docrepo_core::error::{RepoError, RepoResult};

/// Largest number of `null` elements a positional update may pad an array with.
pub(crate) const MAX_ARRAY_PADDING: usize = 1_500_000;

/// Returns a copy of `document` with `patch` merged in.
pub(crate) fn apply_set(document: &Document, patch: &Document) -> RepoResult<Document> {
    let mut updated = document.clone();

    for (path, value) in patch {
        if path.starts_with('$') {
            return Err(RepoError::InvalidQuery(format!(
                "patch field {path} must not be an operator"
            )));
        }
        if (path == "_id" || path.starts_with("_id.")) && document.get("_id").is_some() {
            let unchanged = path == "_id" && document.get("_id") == Some(value);
            if !unchanged {
                return Err(RepoError::Constraint(
                    "performing an update on the path '_id' would modify the immutable field '_id'"
                        .to_string(),
                ));
            }
        }

        set_path(&mut updated, path, value.clone())?;
    }

    Ok(updated)
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> RepoResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if document.get(head).is_none() {
                document.insert(head, Document::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(child)) => set_path(child, rest, value),
                Some(Bson::Array(items)) => {
                    let (index, rest) = match rest.split_once('.') {
                        Some((index, rest)) => (index, Some(rest)),
                        None => (rest, None),
                    };
                    let index = index.parse::<usize>().map_err(|_| {
                        RepoError::InvalidQuery(format!("cannot create field {index} in array {head}"))
                    })?;

                    if index.saturating_sub(items.len()) > MAX_ARRAY_PADDING {
                        return Err(RepoError::InvalidQuery(format!(
                            "cannot pad array {head} with more than {MAX_ARRAY_PADDING} null entries"
                        )));
                    }

                    while items.len() <= index {
                        items.push(Bson::Null);
                    }

                    match rest {
                        None => {
                            items[index] = value;
                            Ok(())
                        }
                        Some(rest) => match &mut items[index] {
                            Bson::Document(child) => set_path(child, rest, value),
                            Bson::Null => {
                                let mut child = Document::new();
                                set_path(&mut child, rest, value)?;
                                items[index] = Bson::Document(child);
                                Ok(())
                            }
                            _ => Err(RepoError::InvalidQuery(format!(
                                "cannot create field {rest} in non-document element {head}.{index}"
                            ))),
                        },
                    }
                }
                _ => Err(RepoError::InvalidQuery(format!(
                    "cannot create field {rest} in non-document field {head}"
                ))),
            }
        }
    }
}
