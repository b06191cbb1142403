//! Event search over the document store

use crate::models::Event;
use crate::search::backend::{DocumentStore, SearchRequest, Selector};
use crate::search::cloudant::CloudantStore;
use crate::search::config::{StoreBackend, StoreConfig};
use crate::search::error::{StoreError, StoreResult};
use crate::search::index::{design_name, DesignDocument, IndexCatalog, IndexName};
use crate::search::memory::InMemoryStore;
use crate::search::query::{QueryBuilder, TermPolicy};
use crate::search::retry::RetryPolicy;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const TOPIC_FIELDS: &[&str] = &["name", "description", "track", "tag"];
const MUSIC_TOPIC_FIELDS: &[&str] = &["name", "description", "track", "tag", "artist"];

/// Maximum number of events a search returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultLimit {
    #[default]
    Unbounded,
    AtMost(usize),
}

impl ResultLimit {
    /// `count <= 0` means unbounded
    pub fn from_count(count: i64) -> Self {
        if count <= 0 {
            ResultLimit::Unbounded
        } else {
            ResultLimit::AtMost(usize::try_from(count).unwrap_or(usize::MAX))
        }
    }

    pub fn as_option(self) -> Option<usize> {
        match self {
            ResultLimit::Unbounded => None,
            ResultLimit::AtMost(n) => Some(n),
        }
    }
}

impl From<i64> for ResultLimit {
    fn from(count: i64) -> Self {
        Self::from_count(count)
    }
}

impl From<Option<usize>> for ResultLimit {
    fn from(max: Option<usize>) -> Self {
        match max {
            Some(0) | None => ResultLimit::Unbounded,
            Some(n) => ResultLimit::AtMost(n),
        }
    }
}

impl fmt::Display for ResultLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultLimit::Unbounded => write!(f, "unbounded"),
            ResultLimit::AtMost(n) => write!(f, "{}", n),
        }
    }
}

/// Result of provisioning the search design document
#[derive(Debug, Clone)]
pub enum InitOutcome {
    /// The design document was already present and was left untouched
    AlreadyExists,
    /// The design document was inserted
    Created,
    /// The check or the insert failed
    Failed(StoreError),
}

impl InitOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, InitOutcome::Failed(_))
    }

    pub fn into_result(self) -> StoreResult<()> {
        match self {
            InitOutcome::Failed(e) => Err(e),
            _ => Ok(()),
        }
    }
}

/// Typed event queries over a schema-less document store.
///
/// Call [`initialize`](Self::initialize) once at startup, before issuing
/// queries; every other operation is a stateless read.
#[derive(Clone)]
pub struct EventSearchStore {
    store: Arc<dyn DocumentStore>,
    design_id: String,
    queries: QueryBuilder,
    retry: RetryPolicy,
}

impl EventSearchStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            design_id: crate::search::index::DESIGN_DOCUMENT_ID.to_string(),
            queries: QueryBuilder::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build the configured backend and wrap it
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let store: Arc<dyn DocumentStore> = match config.backend {
            StoreBackend::Cloudant => Arc::new(CloudantStore::new(config)?),
            StoreBackend::Memory => {
                let memory = InMemoryStore::new();
                if let Some(path) = &config.seed_file {
                    memory.load_seed_file(path).await?;
                }
                Arc::new(memory)
            }
        };

        info!(
            backend = ?config.backend,
            database = %config.database,
            term_policy = ?config.term_policy,
            "Event store configured"
        );

        Ok(Self::new(store)
            .with_design_document(config.design_document.clone())
            .with_term_policy(config.term_policy)
            .with_retry_policy(RetryPolicy::new(config.max_retries, config.retry_backoff())))
    }

    pub fn with_design_document(mut self, id: impl Into<String>) -> Self {
        self.design_id = id.into();
        self
    }

    pub fn with_term_policy(mut self, policy: TermPolicy) -> Self {
        self.queries = QueryBuilder::new(policy);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn design_id(&self) -> &str {
        &self.design_id
    }

    /// Ensure the search design document exists.
    ///
    /// An existing document is never overwritten. Losing an insert race to
    /// another initializer counts as `AlreadyExists`.
    pub async fn initialize(&self) -> InitOutcome {
        info!(design = %self.design_id, "Checking search index definitions");

        let selector = Selector::IdEquals(self.design_id.clone());
        let existing = self
            .retry
            .run("find design document", || self.store.find(&selector))
            .await;

        match existing {
            Ok(docs) if !docs.is_empty() => {
                debug!(design = %self.design_id, "Search index definitions already present");
                return InitOutcome::AlreadyExists;
            }
            Ok(_) => {}
            Err(e) => {
                error!(design = %self.design_id, error = %e, "Failed to look up search index definitions");
                return InitOutcome::Failed(e);
            }
        }

        let doc = match DesignDocument::from_catalog(&self.design_id, &IndexCatalog::standard()).to_value() {
            Ok(doc) => doc,
            Err(e) => return InitOutcome::Failed(e.into()),
        };

        match self
            .retry
            .run("insert design document", || self.store.insert(doc.clone()))
            .await
        {
            Ok(rev) => {
                info!(design = %rev.id, rev = %rev.rev, "Created search index definitions");
                InitOutcome::Created
            }
            Err(StoreError::Conflict(reason)) => {
                info!(design = %self.design_id, reason = %reason, "Search index definitions created concurrently");
                InitOutcome::AlreadyExists
            }
            Err(e) => {
                error!(design = %self.design_id, error = %e, "Failed to create search index definitions");
                InitOutcome::Failed(e)
            }
        }
    }

    /// Events whose name, description, track or tags match `term`
    pub async fn find_events_by_topic(
        &self,
        term: &str,
        max: i64,
    ) -> StoreResult<Vec<Event>> {
        let query = self.queries.any_field(TOPIC_FIELDS, term)?;
        self.search_index(IndexName::ByTopic, &query, ResultLimit::from_count(max)).await
    }

    /// Events with a speaker matching `term`
    pub async fn find_events_by_speaker(
        &self,
        term: &str,
        max: i64,
    ) -> StoreResult<Vec<Event>> {
        let query = self.queries.field("speaker", term)?;
        self.search_index(IndexName::BySpeaker, &query, ResultLimit::from_count(max)).await
    }

    /// Suggested events.
    ///
    /// This is a match-all over `by_speaker`, so only events with at least
    /// one speaker are suggested.
    pub async fn find_suggested_events(&self, max: i64) -> StoreResult<Vec<Event>> {
        let query = self.queries.match_all();
        self.search_index(IndexName::BySpeaker, &query, ResultLimit::from_count(max)).await
    }

    /// Music events matching `term` on topic fields or artist
    pub async fn find_music_events_by_topic(
        &self,
        term: &str,
        max: i64,
    ) -> StoreResult<Vec<Event>> {
        let query = self.queries.any_field(MUSIC_TOPIC_FIELDS, term)?;
        self.search_index(IndexName::ByMusicTopic, &query, ResultLimit::from_count(max)).await
    }

    /// Music events with an artist matching `term`
    pub async fn find_music_events_by_artist(
        &self,
        term: &str,
        max: i64,
    ) -> StoreResult<Vec<Event>> {
        let query = self.queries.field("artist", term)?;
        self.search_index(IndexName::ByMusicArtist, &query, ResultLimit::from_count(max)).await
    }

    async fn search_index(&self, index: IndexName, query: &str, max: ResultLimit) -> StoreResult<Vec<Event>> {
        let design = design_name(&self.design_id).to_string();
        self.search(&design, index.as_ref(), query, max).await
    }

    /// Run `query` against `index` of design document `design` and return at
    /// most `max` events in the store's ranking order.
    pub async fn search(
        &self,
        design: &str,
        index: &str,
        query: &str,
        max: ResultLimit,
    ) -> StoreResult<Vec<Event>> {
        let request = SearchRequest::new(design, index, query).with_limit(max.as_option());

        let response = self
            .retry
            .run("search", || self.store.search(&request))
            .await?;

        let Some(rows) = response.rows else {
            debug!(index, query, "Search response carried no rows");
            return Ok(Vec::new());
        };
        let row_count = rows.len();

        let docs = rows.into_iter().filter_map(|row| row.doc);
        let events: Vec<Event> = match max {
            ResultLimit::Unbounded => docs.filter_map(decode_event).collect(),
            ResultLimit::AtMost(n) => docs.filter_map(decode_event).take(n).collect(),
        };

        debug!(
            index,
            query,
            max = %max,
            rows = row_count,
            returned = events.len(),
            "Search completed"
        );
        Ok(events)
    }

    /// Events whose ids are in `ids`, in no particular order. Unknown ids are
    /// skipped.
    pub async fn get_events_for_ids(&self, ids: &[String]) -> StoreResult<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let selector = Selector::IdIn(ids.to_vec());
        let docs = self
            .retry
            .run("find events by id", || self.store.find(&selector))
            .await?;

        let events: Vec<Event> = docs.into_iter().filter_map(decode_event).collect();
        debug!(requested = ids.len(), returned = events.len(), "Fetched events by id");
        Ok(events)
    }
}

fn decode_event(doc: Value) -> Option<Event> {
    match doc {
        Value::Object(doc) => Some(Event::from_document(doc)),
        _ => {
            warn!("Skipping row whose document is not an object");
            None
        }
    }
}
