//! CouchDB / Cloudant document store over HTTP

use crate::search::backend::{DocumentRevision, DocumentStore, SearchRequest, SearchResponse, Selector};
use crate::search::config::StoreConfig;
use crate::search::error::{StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Largest page the search endpoint will return
pub const MAX_SEARCH_LIMIT: usize = 200;

const USER_AGENT: &str = concat!("event-assistant/", env!("CARGO_PKG_VERSION"));

/// HTTP client for a single CouchDB-compatible database
#[derive(Clone)]
pub struct CloudantStore {
    client: Client,
    base_url: Url,
    database: String,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    docs: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: String,
    rev: String,
}

#[derive(Debug, Deserialize)]
struct CouchError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

impl CloudantStore {
    /// Create a client from the store configuration
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| StoreError::Configuration(format!("invalid store url {}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Configuration(format!(
                "store url {} cannot carry a path",
                config.url
            )));
        }
        if config.database.is_empty() {
            return Err(StoreError::Configuration("database name is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base_url,
            database: config.database.clone(),
            credentials,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// URL of `segments` below the database
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StoreError::Configuration(format!("store url {} cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty().push(&self.database);
            path.extend(segments);
        }
        Ok(url)
    }

    /// URL of a document. Design document ids keep their `_design/` segment.
    fn doc_url(&self, id: &str) -> StoreResult<Url> {
        match id.strip_prefix("_design/") {
            Some(name) => self.url(&["_design", name]),
            None => self.url(&[id]),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.credentials {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Map a non-success response to a store error
async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let reason = match serde_json::from_str::<CouchError>(&body) {
        Ok(err) if !err.error.is_empty() || !err.reason.is_empty() => {
            format!("{}: {}", err.error, err.reason)
        }
        _ if body.is_empty() => status.canonical_reason().unwrap_or("no response body").to_string(),
        _ => body,
    };

    match status {
        StatusCode::BAD_REQUEST => StoreError::Query(reason),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(reason),
        StatusCode::NOT_FOUND => StoreError::NotFound(reason),
        StatusCode::CONFLICT => StoreError::Conflict(reason),
        StatusCode::TOO_MANY_REQUESTS => StoreError::Unavailable {
            status: status.as_u16(),
            reason,
        },
        s if s.is_server_error() => StoreError::Unavailable {
            status: s.as_u16(),
            reason,
        },
        s => StoreError::Response(format!("unexpected status {}: {}", s, reason)),
    }
}

#[async_trait]
impl DocumentStore for CloudantStore {
    async fn find(&self, selector: &Selector) -> StoreResult<Vec<Value>> {
        match selector {
            // Mango `_find` never returns design documents, so single ids are
            // fetched directly
            Selector::IdEquals(id) => {
                debug!(database = %self.database, id = %id, "Fetching document");
                let request = self.request(Method::GET, self.doc_url(id)?);
                match self.send(request).await {
                    Ok(response) => Ok(vec![response.json::<Value>().await?]),
                    Err(StoreError::NotFound(_)) => Ok(Vec::new()),
                    Err(e) => Err(e),
                }
            }
            Selector::IdIn(_) => {
                debug!(
                    database = %self.database,
                    max = selector.max_matches(),
                    "Running selector query"
                );
                let body = json!({
                    "selector": selector.to_mango(),
                    "limit": selector.max_matches(),
                });
                let request = self.request(Method::POST, self.url(&["_find"])?).json(&body);
                let response: FindResponse = self.send(request).await?.json().await?;
                Ok(response.docs.unwrap_or_default())
            }
        }
    }

    async fn insert(&self, doc: Value) -> StoreResult<DocumentRevision> {
        let request = self.request(Method::POST, self.url(&[])?).json(&doc);
        let written: WriteResponse = self.send(request).await?.json().await?;
        debug!(database = %self.database, id = %written.id, rev = %written.rev, "Document inserted");
        Ok(DocumentRevision {
            id: written.id,
            rev: written.rev,
        })
    }

    /// Collects up to `request.limit` rows (every row when unbounded),
    /// following the bookmark across pages of at most [`MAX_SEARCH_LIMIT`].
    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResponse> {
        let wanted = request.limit.unwrap_or(usize::MAX);
        let mut collected = SearchResponse::default();
        let mut rows = Vec::new();

        while rows.len() < wanted {
            let page_size = (wanted - rows.len()).min(MAX_SEARCH_LIMIT);
            let bookmark = collected.bookmark.clone();
            let Some(page) = self.search_page(request, page_size, bookmark.as_deref()).await? else {
                break;
            };

            collected.total_rows = page.total_rows;
            let page_rows = page.rows.unwrap_or_default();
            let last_page = page_rows.len() < page_size
                || page.bookmark.is_none()
                || page.bookmark == bookmark;
            rows.extend(page_rows);
            collected.bookmark = page.bookmark;

            if last_page {
                break;
            }
        }

        rows.truncate(wanted);
        debug!(
            index = %request.index,
            total = collected.total_rows,
            rows = rows.len(),
            "Search pages collected"
        );
        collected.rows = Some(rows);
        Ok(collected)
    }
}

impl CloudantStore {
    /// One page of search results, `None` when the response cannot be read
    async fn search_page(
        &self,
        request: &SearchRequest,
        page_size: usize,
        bookmark: Option<&str>,
    ) -> StoreResult<Option<SearchResponse>> {
        let url = self.url(&["_design", request.design.as_str(), "_search", request.index.as_str()])?;

        let mut params: Vec<(&str, String)> = vec![
            ("q", request.query.clone()),
            ("include_docs", request.include_docs.to_string()),
            ("limit", page_size.to_string()),
        ];
        if let Some(bookmark) = bookmark {
            params.push(("bookmark", bookmark.to_string()));
        }

        debug!(
            database = %self.database,
            design = %request.design,
            index = %request.index,
            query = %request.query,
            page_size,
            "Querying search index"
        );

        let response = self
            .send(self.request(Method::GET, url).query(&params))
            .await?;

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(index = %request.index, error = %e, "Search response is not JSON, treating as empty");
                return Ok(None);
            }
        };

        match serde_json::from_value::<SearchResponse>(body) {
            Ok(page) if page.rows.is_some() => Ok(Some(page)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(index = %request.index, error = %e, "Unexpected search response shape, treating as empty");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::StoreConfigBuilder;

    fn store(url: &str) -> CloudantStore {
        CloudantStore::new(&StoreConfigBuilder::new().url(url).database("events").build()).unwrap()
    }

    #[test]
    fn test_urls() {
        let store = store("https://acct.cloudant.com");

        assert_eq!(
            store.url(&["_find"]).unwrap().as_str(),
            "https://acct.cloudant.com/events/_find"
        );
        assert_eq!(
            store.doc_url("_design/search").unwrap().as_str(),
            "https://acct.cloudant.com/events/_design/search"
        );
        assert_eq!(
            store.doc_url("a/b").unwrap().as_str(),
            "https://acct.cloudant.com/events/a%2Fb"
        );
    }

    #[test]
    fn test_urls_keep_base_path() {
        let store = store("http://proxy.local/couch/");

        assert_eq!(
            store.url(&[]).unwrap().as_str(),
            "http://proxy.local/couch/events"
        );
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let config = StoreConfigBuilder::new().url("not a url").build();
        assert!(matches!(
            CloudantStore::new(&config),
            Err(StoreError::Configuration(_))
        ));

        let config = StoreConfigBuilder::new().database("").build();
        assert!(matches!(
            CloudantStore::new(&config),
            Err(StoreError::Configuration(_))
        ));
    }
}
