//! In-memory document store for development and tests
//!
//! Search support covers the query forms this crate produces: `*:*` and
//! `field:term` clauses joined by `OR`, with backslash escapes. Terms match
//! case-insensitively on whole words (or a contiguous run of words for
//! multi-word terms). Rows are ranked by the summed boosts of matching index
//! entries, ties broken by insertion order.

use crate::search::backend::{
    DocumentRevision, DocumentStore, SearchRequest, SearchResponse, SearchRow, Selector,
};
use crate::search::error::{StoreError, StoreResult};
use crate::search::index::{IndexCatalog, IndexDefinition, IndexName};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    body: Value,
}

/// Process-local document store
#[derive(Clone)]
pub struct InMemoryStore {
    documents: Arc<DashMap<String, StoredDocument>>,
    next_seq: Arc<AtomicU64>,
    catalog: Arc<IndexCatalog>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_catalog(IndexCatalog::standard())
    }

    /// Store whose search evaluates the given index definitions
    pub fn with_catalog(catalog: IndexCatalog) -> Self {
        Self {
            documents: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(1)),
            catalog: Arc::new(catalog),
        }
    }

    /// Load a JSON array of documents
    pub async fn load_seed_file(&self, path: &Path) -> StoreResult<usize> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::Configuration(format!("cannot read seed file {}: {}", path.display(), e))
        })?;
        let docs: Vec<Value> = serde_json::from_str(&raw)?;
        let count = docs.len();
        for doc in docs {
            self.insert(doc).await?;
        }
        tracing::info!(path = %path.display(), documents = count, "Seeded in-memory store");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn definition(&self, request: &SearchRequest) -> StoreResult<&IndexDefinition> {
        let design_id = format!("_design/{}", request.design);
        let declared = self
            .documents
            .get(&design_id)
            .map(|d| d.body.get("indexes").and_then(|i| i.get(&request.index)).is_some())
            .unwrap_or(false);
        if !declared {
            return Err(StoreError::NotFound(format!(
                "index {} not defined in {}",
                request.index, design_id
            )));
        }

        IndexName::from_str(&request.index)
            .ok()
            .and_then(|name| self.catalog.get(name))
            .ok_or_else(|| StoreError::NotFound(format!("unknown index {}", request.index)))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, selector: &Selector) -> StoreResult<Vec<Value>> {
        let docs = match selector {
            Selector::IdEquals(id) => self
                .documents
                .get(id)
                .map(|d| vec![d.body.clone()])
                .unwrap_or_default(),
            Selector::IdIn(ids) => {
                let mut seen = HashSet::new();
                ids.iter()
                    .filter(|id| seen.insert(id.as_str()))
                    .filter_map(|id| self.documents.get(id).map(|d| d.body.clone()))
                    .collect()
            }
        };
        Ok(docs)
    }

    async fn insert(&self, mut doc: Value) -> StoreResult<DocumentRevision> {
        let Some(body) = doc.as_object_mut() else {
            return Err(StoreError::Query("document must be a JSON object".to_string()));
        };

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = match body.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => format!("doc-{:08}", seq),
        };
        let rev = format!("1-{:032x}", seq);
        body.insert("_id".to_string(), json!(id));
        body.insert("_rev".to_string(), json!(rev));

        match self.documents.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "Document update conflict: {}",
                id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(StoredDocument { seq, body: doc });
                Ok(DocumentRevision { id, rev })
            }
        }
    }

    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResponse> {
        let definition = self.definition(request)?;
        let query = ParsedQuery::parse(&request.query)?;

        let mut hits: Vec<(u32, u64, String, Value)> = self
            .documents
            .iter()
            .filter(|d| !d.key().starts_with("_design/"))
            .filter_map(|d| {
                let entries = definition.entries(&d.body);
                if entries.is_empty() {
                    return None;
                }
                let score = match &query {
                    ParsedQuery::All => 1,
                    ParsedQuery::Clauses(clauses) => clauses
                        .iter()
                        .flat_map(|(field, term)| {
                            entries
                                .iter()
                                .filter(move |e| e.field == field.as_str() && term_matches(term, &e.value))
                        })
                        .map(|e| e.weight)
                        .sum(),
                };
                (score > 0).then(|| (score, d.seq, d.key().clone(), d.body.clone()))
            })
            .collect();

        hits.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let total_rows = hits.len() as u64;

        let rows = hits
            .into_iter()
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|(score, seq, id, body)| SearchRow {
                id,
                order: vec![json!(score), json!(seq)],
                fields: json!({}),
                doc: request.include_docs.then_some(body),
            })
            .collect();

        Ok(SearchResponse {
            total_rows,
            bookmark: None,
            rows: Some(rows),
        })
    }
}

#[derive(Debug, PartialEq)]
enum ParsedQuery {
    All,
    /// (field, words of the term)
    Clauses(Vec<(String, Vec<String>)>),
}

impl ParsedQuery {
    fn parse(query: &str) -> StoreResult<Self> {
        let mut clauses = Vec::new();

        for token in split_unescaped_whitespace(query) {
            if token.raw == "OR" {
                continue;
            }
            if token.raw == "*:*" {
                return Ok(ParsedQuery::All);
            }
            let Some(colon) = token.separator else {
                return Err(StoreError::Query(format!(
                    "clause {} has no field",
                    token.raw
                )));
            };
            let field: String = token.text[..colon].iter().collect();
            let term: String = token.text[colon + 1..].iter().collect();
            let words = words(&term);
            if field.is_empty() || words.is_empty() {
                return Err(StoreError::Query(format!("malformed clause {}", token.raw)));
            }
            clauses.push((field, words));
        }

        if clauses.is_empty() {
            return Err(StoreError::Query("empty query".to_string()));
        }
        Ok(ParsedQuery::Clauses(clauses))
    }
}

struct Token {
    /// Token as written, escapes included
    raw: String,
    /// Token with escapes resolved
    text: Vec<char>,
    /// Position in `text` of the first unescaped `:`
    separator: Option<usize>,
}

fn split_unescaped_whitespace(query: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = Token {
        raw: String::new(),
        text: Vec::new(),
        separator: None,
    };
    let mut chars = query.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.raw.push(c);
                if let Some(next) = chars.next() {
                    current.raw.push(next);
                    current.text.push(next);
                }
            }
            c if c.is_whitespace() => {
                if !current.raw.is_empty() {
                    tokens.push(std::mem::replace(
                        &mut current,
                        Token {
                            raw: String::new(),
                            text: Vec::new(),
                            separator: None,
                        },
                    ));
                }
            }
            ':' if current.separator.is_none() => {
                current.separator = Some(current.text.len());
                current.raw.push(c);
                current.text.push(c);
            }
            c => {
                current.raw.push(c);
                current.text.push(c);
            }
        }
    }
    if !current.raw.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether the term's words appear contiguously in `value`
fn term_matches(term: &[String], value: &str) -> bool {
    let value_words = words(value);
    !term.is_empty() && value_words.windows(term.len()).any(|window| window == term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clauses() {
        assert_eq!(ParsedQuery::parse("*:*").unwrap(), ParsedQuery::All);
        assert_eq!(
            ParsedQuery::parse("name:Rust OR tag:rust").unwrap(),
            ParsedQuery::Clauses(vec![
                ("name".into(), vec!["rust".into()]),
                ("tag".into(), vec!["rust".into()]),
            ])
        );
    }

    #[test]
    fn test_parse_escaped_term() {
        assert_eq!(
            ParsedQuery::parse("speaker:Grace\\ Hopper").unwrap(),
            ParsedQuery::Clauses(vec![(
                "speaker".into(),
                vec!["grace".into(), "hopper".into()]
            )])
        );
        // An escaped colon is part of the term
        assert_eq!(
            ParsedQuery::parse("speaker:a\\:b").unwrap(),
            ParsedQuery::Clauses(vec![("speaker".into(), vec!["a".into(), "b".into()])])
        );
    }

    #[test]
    fn test_parse_rejects_fieldless_clause() {
        assert!(matches!(
            ParsedQuery::parse("rust"),
            Err(StoreError::Query(_))
        ));
        assert!(matches!(ParsedQuery::parse(""), Err(StoreError::Query(_))));
    }

    #[test]
    fn test_term_matches_whole_words() {
        let term = words("Hopper");
        assert!(term_matches(&term, "Grace Hopper"));
        assert!(!term_matches(&term, "Grasshopper"));
        assert!(term_matches(&words("grace hopper"), "Admiral Grace Hopper"));
        assert!(!term_matches(&words("hopper grace"), "Grace Hopper"));
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let store = InMemoryStore::new();
        store.insert(json!({"_id": "e1"})).await.unwrap();

        let err = store.insert(json!({"_id": "e1"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_search_requires_design_document() {
        let store = InMemoryStore::new();
        let err = store
            .search(&SearchRequest::new("search", "by_topic", "*:*"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
