//! Document store configuration

use crate::search::query::TermPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which document store implementation backs the event search
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Hosted CouchDB-compatible database over HTTP
    #[default]
    Cloudant,
    /// Process-local store for development and tests
    Memory,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the database server
    #[serde(default = "default_url")]
    pub url: String,

    /// Database holding the event documents
    #[serde(default = "default_database")]
    pub database: String,

    /// Id of the design document carrying the search indexes
    #[serde(default = "default_design_document")]
    pub design_document: String,

    /// Basic-auth user (set through the environment)
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password (set through the environment)
    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for connectivity failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// How user-supplied search terms are placed into queries
    #[serde(default)]
    pub term_policy: TermPolicy,

    /// JSON array of event documents loaded into the memory backend
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_url(),
            database: default_database(),
            design_document: default_design_document(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            term_policy: TermPolicy::default(),
            seed_file: None,
        }
    }
}

fn default_url() -> String {
    "http://localhost:5984".to_string()
}

fn default_database() -> String {
    "events".to_string()
}

fn default_design_document() -> String {
    "_design/search".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    200
}

/// Builder for StoreConfig
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    pub fn design_document(mut self, id: impl Into<String>) -> Self {
        self.config.design_document = id.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn term_policy(mut self, policy: TermPolicy) -> Self {
        self.config.term_policy = policy;
        self
    }

    pub fn seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.seed_file = Some(path.into());
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}

impl Default for StoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
