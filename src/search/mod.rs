//! Event search over a CouchDB-compatible document database
//!
//! The database does the indexing and ranking; this module makes sure the
//! search indexes exist and turns typed requests into index queries:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           EventSearchStore                       │
//! ├─────────────────────────────────────────────────┤
//! │  - initialize()                                  │
//! │  - find_events_by_topic()   - by_speaker()       │
//! │  - find_suggested_events()                       │
//! │  - find_music_events_by_topic() / _by_artist()   │
//! │  - search()    - get_events_for_ids()            │
//! └─────────────────────────────────────────────────┘
//!          │ QueryBuilder          │ IndexCatalog
//!          ▼                       ▼
//! ┌─────────────────────────────────────────────────┐
//! │           DocumentStore (trait)                  │
//! ├─────────────────────────────────────────────────┤
//! │  - find(selector)  - insert(doc)  - search(req)  │
//! └─────────────────────────────────────────────────┘
//!          │                       │
//!          ▼                       ▼
//!   CloudantStore (HTTP)     InMemoryStore (dev/test)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use event_assistant::search::{EventSearchStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = EventSearchStore::from_config(&StoreConfig::default()).await?;
//!     store.initialize().await.into_result()?;
//!
//!     let events = store.find_events_by_topic("rust", 10).await?;
//!     println!("Found {} events", events.len());
//!
//!     Ok(())
//! }
//! ```

mod backend;
mod cloudant;
mod config;
mod error;
mod index;
mod memory;
mod query;
mod retry;
mod service;

pub use backend::{
    DocumentRevision, DocumentStore, SearchRequest, SearchResponse, SearchRow, Selector,
};
pub use cloudant::{CloudantStore, MAX_SEARCH_LIMIT};
pub use config::{StoreBackend, StoreConfig, StoreConfigBuilder};
pub use error::{StoreError, StoreResult};
pub use index::{
    design_name, DesignDocument, FieldMapping, IndexCatalog, IndexDefinition, IndexEntry,
    IndexFunction, IndexName, SourceField, DESIGN_DOCUMENT_ID,
};
pub use memory::InMemoryStore;
pub use query::{escape_term, QueryBuilder, TermPolicy, MATCH_ALL};
pub use retry::RetryPolicy;
pub use service::{EventSearchStore, InitOutcome, ResultLimit};
