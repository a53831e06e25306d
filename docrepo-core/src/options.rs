//! Paging options, result pages and bulk-mutation reports.
//!
//! [`Options`] controls which slice of the matching documents a listing returns and
//! whether the total match count is computed. [`Page`] carries the slice back together
//! with that optional count, and [`ChangeInfo`] summarises a bulk update or delete.

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::{error::RepoResult, filter::Filter};

/// Paging and counting controls for a listing.
///
/// `skip` and `limit` only shape the returned page. `count` asks the adapter to also
/// report how many documents match the filter before paging is applied. The three
/// controls are independent and can be combined freely.
///
/// # Example
///
/// ```ignore
/// use docrepo::options::Options;
///
/// let options = Options::new().skip(5).limit(5).with_count();
/// assert_eq!(options.skip, 5);
/// assert!(options.count);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Options {
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return. `0` means no limit.
    pub limit: u64,
    /// Whether to report the total number of matches, ignoring `skip` and `limit`.
    pub count: bool,
}

impl Options {
    /// Creates options that return every matching document without counting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the maximum page size (`0` for unbounded).
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Requests the total match count alongside the page.
    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Returns the limit as an `Option`, mapping the unbounded `0` to `None`.
    pub fn page_limit(&self) -> Option<u64> {
        (self.limit > 0).then_some(self.limit)
    }

    /// Builds a page out of every matching document, in order.
    ///
    /// Adapters that cannot push paging down to the store collect all matches and hand
    /// them to this method, which applies `skip`/`limit` and fills in the count when it
    /// was requested.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let items: Vec<i32> = (1..=10).collect();
    /// let page = Options::new().skip(5).limit(5).with_count().paginate(items);
    ///
    /// assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
    /// assert_eq!(page.count, Some(10));
    /// ```
    pub fn paginate<T>(&self, items: impl IntoIterator<Item = T>) -> Page<T> {
        let mut total = 0u64;
        let mut page_items = Vec::new();
        let skip = self.skip;
        let limit = self.page_limit().unwrap_or(u64::MAX);

        for item in items {
            if total >= skip && total - skip < limit {
                page_items.push(item);
            }
            total += 1;

            // Nothing left to collect and nobody asked for the total.
            if !self.count && total - skip.min(total) >= limit {
                break;
            }
        }

        Page::new(page_items, self.count.then_some(total))
    }
}

/// A single page of documents returned by a listing.
///
/// `count` is `Some` only when the listing was asked to count; it then holds the number
/// of documents matching the filter before paging. A `None` count carries no
/// information about how many documents matched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The documents on this page, in store order.
    pub items: Vec<T>,
    /// Total number of matches, if counting was requested.
    pub count: Option<u64>,
}

impl<T> Page<T> {
    /// Creates a page from its items and optional total count.
    pub fn new(items: Vec<T>, count: Option<u64>) -> Self {
        Self { items, count }
    }

    /// Returns the count, or `0` when counting was not requested.
    ///
    /// This mirrors the untyped "0 means not counted" convention; check the `count`
    /// flag you passed before trusting a zero.
    pub fn count_or_zero(&self) -> u64 {
        self.count.unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Converts every item, keeping the count. Stops at the first conversion error.
    pub fn try_map<U, F>(self, f: F) -> RepoResult<Page<U>>
    where
        F: FnMut(T) -> RepoResult<U>,
    {
        Ok(Page {
            items: self
                .items
                .into_iter()
                .map(f)
                .collect::<RepoResult<Vec<U>>>()?,
            count: self.count,
        })
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: None,
        }
    }
}

/// Aggregate outcome of a bulk update or delete.
///
/// `updated` and `removed` never exceed `matched`. A bulk delete reports
/// `updated == 0`, a bulk update reports `removed == 0`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeInfo {
    /// Number of documents matched by the filter.
    pub matched: u64,
    /// Number of documents actually modified.
    pub updated: u64,
    /// Number of documents removed.
    pub removed: u64,
}

impl ChangeInfo {
    /// Report for a bulk update that matched `matched` documents and changed `updated` of them.
    pub fn updated(matched: u64, updated: u64) -> Self {
        Self {
            matched,
            updated,
            removed: 0,
        }
    }

    /// Report for a bulk delete that removed `removed` documents.
    pub fn removed(removed: u64) -> Self {
        Self {
            matched: removed,
            updated: 0,
            removed,
        }
    }
}

/// A listing request as decoded from an HTTP body: paging options plus a filter.
///
/// ```json
/// { "opts": { "skip": 0, "limit": 10, "count": true }, "query": { "name": "Alice" } }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    #[serde(rename = "opts", default, skip_serializing_if = "is_default_options")]
    pub options: Options,
    #[serde(default)]
    pub query: Document,
}

impl QueryRequest {
    /// The request's filter; an empty `query` matches every document.
    pub fn filter(&self) -> Filter {
        Filter::from(self.query.clone())
    }
}

fn is_default_options(options: &Options) -> bool {
    *options == Options::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_paginate_second_half_with_count() {
        let page = Options::new().skip(5).limit(5).with_count().paginate(1..=10);

        assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.count, Some(10));
    }

    #[test]
    fn test_paginate_unbounded_returns_everything() {
        let page = Options::new().paginate(1..=4);

        assert_eq!(page.items, vec![1, 2, 3, 4]);
        assert_eq!(page.count, None);
        assert_eq!(page.count_or_zero(), 0);
    }

    #[test]
    fn test_paginate_skip_past_end() {
        let page = Options::new().skip(20).with_count().paginate(1..=3);

        assert!(page.is_empty());
        assert_eq!(page.count, Some(3));
    }

    #[test]
    fn test_change_info_constructors() {
        assert_eq!(ChangeInfo::removed(3), ChangeInfo { matched: 3, updated: 0, removed: 3 });
        assert_eq!(ChangeInfo::updated(4, 2), ChangeInfo { matched: 4, updated: 2, removed: 0 });
    }

    #[test]
    fn test_query_request_from_json() {
        let request: QueryRequest = serde_json::from_str(
            r#"{ "opts": { "skip": 2, "limit": 3, "count": true }, "query": { "name": "Alice" } }"#,
        )
        .unwrap();

        assert_eq!(request.options, Options::new().skip(2).limit(3).with_count());
        assert_eq!(request.query.get_str("name").unwrap(), "Alice");
        assert!(!request.filter().is_all());
    }

    #[test]
    fn test_query_request_defaults() {
        let request: QueryRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(request.options, Options::default());
        assert!(request.filter().is_all());
    }

    proptest! {
        #[test]
        fn prop_paginate_matches_slice(len in 0u64..60, skip in 0u64..70, limit in 0u64..70, count in any::<bool>()) {
            let options = Options { skip, limit, count };
            let page = options.paginate(0..len);

            let expected: Vec<u64> = (0..len)
                .skip(skip as usize)
                .take(if limit == 0 { usize::MAX } else { limit as usize })
                .collect();

            prop_assert_eq!(page.items, expected);
            prop_assert_eq!(page.count, count.then_some(len));
        }
    }
}
