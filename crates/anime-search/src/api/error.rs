//! Transport failures of the catalog client.

use reqwest::StatusCode;
use thiserror::Error;

/// Any failure to obtain a usable response from the catalog service
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built or sent, or the body could not be read
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// The body was not the expected JSON shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint URL could not be derived from the configured base URL
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
