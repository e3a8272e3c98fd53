// src/error.rs
//! Typed failures for the producer and the popup consumer.

use thiserror::Error;

/// Everything that can go wrong while asking the model for a fresh digest.
/// The producer recovers all of these by republishing the previous digest.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid digest date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("upstream response contained no text")]
    EmptyResponse,

    /// Stored without the request URL.
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("response is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("response JSON does not match the digest schema: {0}")]
    InvalidSchema(String),
}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        GenerateError::Transport(e.without_url())
    }
}

#[derive(Debug, Error)]
pub enum ProducerError {
    /// Generation failed and there is nothing to fall back to.
    #[error("generation failed and no previous digest is available: {cause}")]
    NoPreviousDigest { cause: String },

    #[error("publishing digest failed: {0}")]
    Publish(#[source] anyhow::Error),
}

/// Failure to obtain the published artifact over the network.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection errors and timeouts.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("artifact returned HTTP {0}")]
    Status(u16),

    #[error("artifact is not a valid digest: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    /// No cache entry exists and the fetch failed.
    #[error("news digest unavailable: {0}")]
    Unavailable(#[source] FetchError),
}
