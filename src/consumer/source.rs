// src/consumer/source.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};

use crate::digest::Digest;
use crate::error::FetchError;

/// Where the popup gets the published artifact from.
#[async_trait]
pub trait DigestSource: Send + Sync {
    async fn fetch(&self) -> Result<Digest, FetchError>;
}

/// Plain HTTP GET of the artifact, bypassing intermediate caches.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// A request exceeding `timeout` fails like any other network error.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("daily-news-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DigestSource for HttpSource {
    async fn fetch(&self) -> Result<Digest, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
