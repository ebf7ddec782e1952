//! # htable query
//!
//! Client side of the filter query service.
//!
//! Takes a [`FormSnapshot`](htable_types::FormSnapshot) by value, posts it to the service and
//! decodes the matching compositions. Nothing here touches form state: a failed submission
//! leaves the caller's state exactly as it was.

pub mod client;
pub mod table;

pub use client::{
    timeout_from_env_value, ClientConfig, FilterClient, FilterRequest, FilterResponse, RequestShape,
};
pub use table::ResultTable;

/// Default base URL of the filter query service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Endpoint of the general filter query.
pub const FILTER_ENDPOINT: &str = "/api/filter";

/// Endpoint of the chemotherapy filter query.
pub const CHEMO_FILTER_ENDPOINT: &str = "/api/filter/chemo";

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The only failure text shown to users, whatever went wrong.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data";

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url} at {path}: {reason}")]
    Decode {
        url: String,
        path: String,
        reason: String,
    },
}

impl QueryError {
    /// The message to show a user. Details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
