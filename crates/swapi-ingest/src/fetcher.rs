//! Fetching person records from the remote API

use crate::config::{ApiConfig, USER_AGENT};
use crate::error::{IngestError, Result};
use crate::models::{PersonId, RawFetchResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Source of raw person records
///
/// Implementations are shared by every fetch in a wave, so they must be
/// usable concurrently through `&self`.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    /// Fetch one identifier
    ///
    /// Absence is a normal result; only transport and protocol failures
    /// are errors.
    async fn fetch(&self, id: PersonId) -> Result<RawFetchResult>;

    /// Release the underlying connection resources
    async fn close(&self) {}
}

/// Fetcher backed by one pooled HTTP client
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Create a fetcher from API settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(IngestError::HttpClient)?;

        Ok(Self::with_client(client, &config.base_url))
    }

    /// Use an existing client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL for one person, e.g. `https://swapi.dev/api/people/4/`
    pub fn person_url(&self, id: PersonId) -> String {
        format!("{}/{}/", self.base_url, id)
    }
}

#[async_trait]
impl RecordFetcher for HttpFetcher {
    async fn fetch(&self, id: PersonId) -> Result<RawFetchResult> {
        let url = self.person_url(id);
        debug!(person_id = id, url = %url, "Fetching person");

        let transport = |source| IngestError::Transport { id, source };

        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(RawFetchResult::NotFound);
        }

        let body: Value = response
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        match body {
            Value::Object(map) => Ok(RawFetchResult::from_body(map)),
            other => Err(IngestError::UnexpectedBody {
                id,
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    async fn close(&self) {
        // reqwest releases pooled connections once the last client handle drops
        info!(base_url = %self.base_url, "HTTP session closed");
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
