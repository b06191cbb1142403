//! The document store seam
//!
//! [`DocumentStore`] is the narrow set of primitives the event search needs
//! from a CouchDB-compatible database: selector lookup, a single insert, and
//! a search-index query.

use crate::search::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Document selector, rendered as a Mango selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `{"_id": id}`
    IdEquals(String),
    /// `{"_id": {"$in": ids}}`
    IdIn(Vec<String>),
}

impl Selector {
    pub fn to_mango(&self) -> Value {
        match self {
            Selector::IdEquals(id) => json!({ "_id": id }),
            Selector::IdIn(ids) => json!({ "_id": { "$in": ids } }),
        }
    }

    /// Upper bound on the number of documents the selector can match
    pub fn max_matches(&self) -> usize {
        match self {
            Selector::IdEquals(_) => 1,
            Selector::IdIn(ids) => ids.len(),
        }
    }
}

/// A search-index query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Design document name without the `_design/` prefix
    pub design: String,
    pub index: String,
    pub query: String,
    pub include_docs: bool,
    /// Maximum number of rows to collect, every matching row when `None`
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(design: impl Into<String>, index: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            design: design.into(),
            index: index.into(),
            query: query.into(),
            include_docs: true,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// A ranked search row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRow {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub order: Vec<Value>,

    #[serde(default)]
    pub fields: Value,

    /// Present when the query asked for full documents
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Search response as returned by the store.
///
/// `rows` is optional: a response without a rows collection is treated as
/// having no results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_rows: u64,

    #[serde(default)]
    pub bookmark: Option<String>,

    #[serde(default)]
    pub rows: Option<Vec<SearchRow>>,
}

/// Identity of a written document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRevision {
    pub id: String,
    pub rev: String,
}

/// Primitive operations of a schema-less document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents matching the selector, in no particular order
    async fn find(&self, selector: &Selector) -> StoreResult<Vec<Value>>;

    /// Insert a new document; fails with `StoreError::Conflict` when its id
    /// is taken
    async fn insert(&self, doc: Value) -> StoreResult<DocumentRevision>;

    /// Run a query against a search index
    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_to_mango() {
        assert_eq!(
            Selector::IdEquals("_design/search".into()).to_mango(),
            json!({"_id": "_design/search"})
        );
        assert_eq!(
            Selector::IdIn(vec!["a".into(), "c".into()]).to_mango(),
            json!({"_id": {"$in": ["a", "c"]}})
        );
    }

    #[test]
    fn test_search_response_without_rows() {
        let response: SearchResponse =
            serde_json::from_value(json!({"total_rows": 0})).unwrap();
        assert!(response.rows.is_none());

        let response: SearchResponse = serde_json::from_value(json!({
            "total_rows": 1,
            "bookmark": "g1",
            "rows": [{"id": "e1", "order": [1.5, 0], "fields": {}, "doc": {"_id": "e1"}}]
        }))
        .unwrap();
        let rows = response.rows.unwrap();
        assert_eq!(rows[0].id, "e1");
        assert_eq!(rows[0].doc.as_ref().unwrap()["_id"], "e1");
    }
}
