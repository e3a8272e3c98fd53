//! Artifact server — Binary Entrypoint
//! Serves the published `news.json` (plus `/health` and `/metrics`) over plain HTTP.

use anyhow::Context;
use daily_news_digest::{api, config::DigestConfig, metrics::Metrics, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing("daily_news_digest=info,news_digest=info,warn");

    let cfg = DigestConfig::load_default()?;
    let metrics = Metrics::init(cfg.cache_ttl_secs)?;

    let app = api::router(&cfg.artifact_path).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!(
        addr = %cfg.bind_addr,
        artifact = %cfg.artifact_path.display(),
        "serving news digest"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
