//! HTTP client for the filter query service.

use crate::{QueryError, QueryResult, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, FILTER_ENDPOINT};
use htable_types::FormSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// How the snapshot is laid out in the request body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestShape {
    /// `{ "filters": <snapshot> }`
    #[default]
    Wrapped,
    /// The snapshot object itself.
    Bare,
}

/// Request body for the wrapped shape.
#[derive(Debug, Serialize)]
pub struct FilterRequest<'a> {
    pub filters: &'a FormSnapshot,
}

/// Successful response: matching records plus the query the service ran.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FilterResponse {
    pub compositions: Vec<Map<String, Value>>,
    /// A query string or a structured query object, depending on the service.
    #[serde(default)]
    pub query: Value,
}

impl FilterResponse {
    /// The query as display text: strings verbatim, anything else as pretty JSON.
    pub fn query_text(&self) -> String {
        match &self.query {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    endpoint: String,
    shape: RequestShape,
    timeout: Duration,
}

impl ClientConfig {
    /// Create a new `ClientConfig` posting wrapped snapshots to the general filter endpoint.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidConfig` if `base_url` is blank or not an http(s) URL.
    pub fn new(base_url: impl Into<String>) -> QueryResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(QueryError::InvalidConfig("base URL must not be empty".into()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(QueryError::InvalidConfig(format!(
                "base URL {base_url:?} must start with http:// or https://"
            )));
        }

        Ok(Self {
            base_url,
            endpoint: FILTER_ENDPOINT.to_string(),
            shape: RequestShape::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = if endpoint.starts_with('/') {
            endpoint
        } else {
            format!("/{endpoint}")
        };
        self
    }

    pub fn with_shape(mut self, shape: RequestShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }

    pub fn shape(&self) -> RequestShape {
        self.shape
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Parse a request timeout in whole seconds from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn timeout_from_env_value(value: Option<String>) -> QueryResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };

    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(QueryError::InvalidConfig(format!(
            "timeout {value:?} must be a positive number of seconds"
        ))),
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: FILTER_ENDPOINT.to_string(),
            shape: RequestShape::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Posts form snapshots to the filter query service.
#[derive(Clone, Debug)]
pub struct FilterClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl FilterClient {
    /// # Errors
    ///
    /// Returns `QueryError::ClientBuild` if the underlying HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> QueryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(QueryError::ClientBuild)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Posts `snapshot` and decodes the matching compositions.
    ///
    /// Every failure is logged at `error` with its details; callers should show only
    /// [`QueryError::user_message`].
    pub async fn submit(&self, snapshot: &FormSnapshot) -> QueryResult<FilterResponse> {
        let url = self.config.url();
        tracing::debug!("posting {} filter values to {}", snapshot.len(), url);

        let result = self.post(&url, snapshot).await;
        match &result {
            Ok(response) => tracing::info!(
                "filter query returned {} compositions",
                response.compositions.len()
            ),
            Err(err) => tracing::error!("filter query failed: {}", err),
        }
        result
    }

    async fn post(&self, url: &str, snapshot: &FormSnapshot) -> QueryResult<FilterResponse> {
        let request = self.http.post(url);
        let request = match self.config.shape {
            RequestShape::Wrapped => request.json(&FilterRequest { filters: snapshot }),
            RequestShape::Bare => request.json(snapshot),
        };

        let response = request.send().await.map_err(|source| QueryError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| QueryError::Transport {
            url: url.to_string(),
            source,
        })?;
        decode(url, &body)
    }
}

fn decode(url: &str, body: &str) -> QueryResult<FilterResponse> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    let response = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        QueryError::Decode {
            url: url.to_string(),
            path: if path.is_empty() { ".".into() } else { path },
            reason: err.into_inner().to_string(),
        }
    })?;
    deserializer.end().map_err(|err| QueryError::Decode {
        url: url.to_string(),
        path: ".".into(),
        reason: err.to_string(),
    })?;
    Ok(response)
}
