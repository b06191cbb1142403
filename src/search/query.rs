//! Search query composition
//!
//! Queries use the Lucene syntax understood by the store's search engine:
//! `field:term` clauses joined with `OR`, or the match-all `*:*`.

use crate::search::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Query that matches every indexed document
pub const MATCH_ALL: &str = "*:*";

/// Characters with meaning in the Lucene query parser
const RESERVED: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

const OPERATOR_WORDS: &[&str] = &["AND", "OR", "NOT"];

/// How a caller-supplied term is placed into a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TermPolicy {
    /// Reserved characters, whitespace and operator words are backslash-escaped
    #[default]
    Escape,
    /// The term is inserted verbatim, so callers may use wildcards, phrases
    /// and field syntax themselves
    Raw,
}

impl TermPolicy {
    /// Prepare `term` for interpolation into a clause
    pub fn apply(self, term: &str) -> StoreResult<String> {
        let term = term.trim();
        if term.is_empty() {
            return Err(StoreError::InvalidTerm(
                "search term must not be blank".to_string(),
            ));
        }

        Ok(match self {
            TermPolicy::Raw => term.to_string(),
            TermPolicy::Escape => escape_term(term),
        })
    }
}

/// Escape a term so the query parser reads it as a single literal
pub fn escape_term(term: &str) -> String {
    if OPERATOR_WORDS.contains(&term) {
        return format!("\\{}", term);
    }

    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if RESERVED.contains(&c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds `field:term OR field:term ...` query strings
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    policy: TermPolicy,
}

impl QueryBuilder {
    pub fn new(policy: TermPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TermPolicy {
        self.policy
    }

    /// One clause per field, all matching the same term
    pub fn any_field(&self, fields: &[&str], term: &str) -> StoreResult<String> {
        let term = self.policy.apply(term)?;
        Ok(fields
            .iter()
            .map(|field| format!("{}:{}", field, term))
            .collect::<Vec<_>>()
            .join(" OR "))
    }

    /// A single `field:term` clause
    pub fn field(&self, field: &str, term: &str) -> StoreResult<String> {
        self.any_field(&[field], term)
    }

    pub fn match_all(&self) -> String {
        MATCH_ALL.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_terms_are_unchanged() {
        let builder = QueryBuilder::default();
        let query = builder
            .any_field(&["name", "description", "track", "tag"], "blockchain")
            .unwrap();

        assert_eq!(
            query,
            "name:blockchain OR description:blockchain OR track:blockchain OR tag:blockchain"
        );
    }

    #[test]
    fn test_escape_reserved_characters() {
        assert_eq!(escape_term("c++"), "c\\+\\+");
        assert_eq!(escape_term("speaker:x"), "speaker\\:x");
        assert_eq!(escape_term("\"quoted\""), "\\\"quoted\\\"");
        assert_eq!(escape_term("machine learning"), "machine\\ learning");
        assert_eq!(escape_term("a/b"), "a\\/b");
    }

    #[test]
    fn test_escape_operator_words() {
        assert_eq!(escape_term("OR"), "\\OR");
        assert_eq!(escape_term("NOT"), "\\NOT");
        // Lowercase words are not operators
        assert_eq!(escape_term("or"), "or");
    }

    #[test]
    fn test_escaped_term_cannot_add_clauses() {
        let builder = QueryBuilder::new(TermPolicy::Escape);
        let query = builder.field("speaker", "x OR *:*").unwrap();

        assert_eq!(query, "speaker:x\\ OR\\ \\*\\:\\*");
        assert!(!query.contains(" OR "));
    }

    #[test]
    fn test_raw_policy_passes_term_through() {
        let builder = QueryBuilder::new(TermPolicy::Raw);
        let query = builder.field("artist", "Jo*").unwrap();

        assert_eq!(query, "artist:Jo*");
    }

    #[test]
    fn test_blank_term_rejected() {
        for policy in [TermPolicy::Escape, TermPolicy::Raw] {
            let builder = QueryBuilder::new(policy);
            assert!(matches!(
                builder.field("speaker", "   "),
                Err(StoreError::InvalidTerm(_))
            ));
        }
    }

    #[test]
    fn test_match_all() {
        assert_eq!(QueryBuilder::default().match_all(), "*:*");
    }
}
