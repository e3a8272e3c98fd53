// src/producer.rs
//! One producer pass: generate a fresh digest, or republish the previous one.
//!
//! Idle -> Generating -> Validating -> Publishing -> Done
//!                    \-> GenerationFailed -> LoadingPrevious -> PublishingFallback -> Done
//!                                                           \-> NoPreviousAvailable -> Fatal
//!
//! There is no retry loop here; every scheduled invocation is one pass.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{error, info, warn};

use crate::config::GenerationConfig;
use crate::digest::{stamp, Digest};
use crate::error::ProducerError;
use crate::generate::{generate, DynGenerator, PromptContext, Provenance};
use crate::metrics::ensure_metrics_described;

/// Durable location of the published digest.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// `Ok(None)` when nothing was ever published.
    async fn load(&self) -> Result<Option<Digest>>;
    /// Replace the artifact as a whole.
    async fn publish(&self, digest: &Digest) -> Result<()>;
}

/// JSON file on disk, replaced atomically via temp file + rename.
#[derive(Debug, Clone)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArtifactStore for FileArtifact {
    async fn load(&self) -> Result<Option<Digest>> {
        let s = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let digest = serde_json::from_str(&s)
            .with_context(|| format!("parsing previous digest {}", self.path.display()))?;
        Ok(Some(digest))
    }

    async fn publish(&self, digest: &Digest) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_vec_pretty(digest).context("serializing digest")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A freshly generated digest was published.
    Fresh { stories: usize },
    /// Generation failed; the previous digest was republished with `fallback: true`.
    Fallback { cause: String },
}

pub struct Producer {
    generator: DynGenerator,
    store: Arc<dyn ArtifactStore>,
    cfg: GenerationConfig,
    provenance: Provenance,
}

impl Producer {
    pub fn new(
        generator: DynGenerator,
        store: Arc<dyn ArtifactStore>,
        cfg: GenerationConfig,
        provenance: Provenance,
    ) -> Self {
        Self {
            generator,
            store,
            cfg,
            provenance,
        }
    }

    /// One pass for today's UTC date.
    pub async fn run_once(&self) -> Result<RunOutcome, ProducerError> {
        let now = Utc::now();
        self.run_once_at(&PromptContext::for_day(now), now).await
    }

    pub async fn run_once_at(
        &self,
        ctx: &PromptContext,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, ProducerError> {
        ensure_metrics_described();

        let cause = match generate(
            self.generator.as_ref(),
            &self.cfg,
            &self.provenance,
            ctx,
            now,
        )
        .await
        {
            Ok(digest) if !digest.stories.is_empty() => {
                return self.publish_fresh(digest, now).await;
            }
            Ok(_) => "generation returned zero stories".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(target: "producer", %cause, provider = self.generator.name(), "generation failed, falling back");
        self.publish_fallback(cause, now).await
    }

    async fn publish_fresh(
        &self,
        mut digest: Digest,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, ProducerError> {
        // Only needed to keep updatedAt monotonic; an unreadable artifact is overwritten.
        let previous = match self.store.load().await {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "producer", error = ?e, "previous digest unreadable");
                None
            }
        };
        digest.updated_at = stamp(Digest::next_timestamp(previous.as_ref(), now));

        self.publish(&digest, "fresh").await?;
        info!(
            target: "producer",
            date = %digest.date,
            stories = digest.stories.len(),
            updated_at = %digest.updated_at,
            "fresh digest published"
        );
        Ok(RunOutcome::Fresh {
            stories: digest.stories.len(),
        })
    }

    async fn publish_fallback(
        &self,
        cause: String,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, ProducerError> {
        fall_back(self.store.as_ref(), cause, now).await
    }

    async fn publish(&self, digest: &Digest, outcome: &'static str) -> Result<(), ProducerError> {
        publish_as(self.store.as_ref(), digest, outcome).await
    }
}

/// Republish the previous digest with `fallback: true` and a bumped `updatedAt`.
///
/// Also used directly when no generator could even be built (e.g. missing API key),
/// which is just another way for generation to fail.
pub async fn fall_back(
    store: &dyn ArtifactStore,
    cause: String,
    now: DateTime<Utc>,
) -> Result<RunOutcome, ProducerError> {
    ensure_metrics_described();

    let previous = match store.load().await {
        Ok(Some(prev)) => prev,
        Ok(None) => return Err(fatal(cause)),
        Err(e) => return Err(fatal(format!("{cause}; previous digest unreadable: {e:#}"))),
    };

    let digest = previous.carried_forward(now);
    publish_as(store, &digest, "fallback").await?;
    info!(
        target: "producer",
        date = %digest.date,
        updated_at = %digest.updated_at,
        "fallback digest republished"
    );
    Ok(RunOutcome::Fallback { cause })
}

async fn publish_as(
    store: &dyn ArtifactStore,
    digest: &Digest,
    outcome: &'static str,
) -> Result<(), ProducerError> {
    if let Err(e) = store.publish(digest).await {
        error!(target: "producer", error = ?e, outcome, "publish failed");
        counter!("producer_runs_total", "outcome" => "publish_error").increment(1);
        return Err(ProducerError::Publish(e));
    }
    counter!("producer_runs_total", "outcome" => outcome).increment(1);
    Ok(())
}

fn fatal(cause: String) -> ProducerError {
    error!(target: "producer", %cause, "no previous digest to fall back to");
    counter!("producer_runs_total", "outcome" => "fatal").increment(1);
    ProducerError::NoPreviousDigest { cause }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Story;

    fn digest(updated_at: &str) -> Digest {
        Digest {
            date: "2026-10-18".into(),
            updated_at: updated_at.into(),
            version: "1.0".into(),
            source: "gemini".into(),
            stories: vec![Story {
                headline: "H".into(),
                summary: "S".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn file_artifact_missing_file_is_none_then_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifact::new(dir.path().join("out/news.json"));
        assert!(store.load().await.unwrap().is_none());

        let d = digest("2026-10-18T06:00:00.000Z");
        store.publish(&d).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(d));
        assert!(!dir.path().join("out/news.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_artifact_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileArtifact::new(path).load().await.is_err());
    }
}
