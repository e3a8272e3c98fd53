//! Popup renderer: loads the digest (cache -> network -> stale cache) and prints the
//! HTML fragment to stdout. On a cold-start failure prints the retry view and exits 1.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use daily_news_digest::config::DigestConfig;
use daily_news_digest::consumer::{Consumer, FileCache, HttpSource};
use daily_news_digest::{render, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing("daily_news_digest=info,digest_popup=info,warn");

    let cfg = match DigestConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %format!("{e:#}"), "config error");
            print!("{}", render::render_error());
            return ExitCode::FAILURE;
        }
    };

    let source = match HttpSource::new(cfg.artifact_url.clone(), cfg.fetch_timeout()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "http client init failed");
            print!("{}", render::render_error());
            return ExitCode::FAILURE;
        }
    };
    let consumer = Consumer::new(
        Arc::new(source),
        Arc::new(FileCache::new(&cfg.cache_path)),
        cfg.cache_ttl(),
    );

    let now = Utc::now();
    match consumer.load_at(now).await {
        Ok(loaded) => {
            info!(path = ?loaded.path, date = %loaded.digest.date, "digest loaded");
            print!("{}", render::render_digest(&loaded.digest, now));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "digest unavailable");
            print!("{}", render::render_error());
            ExitCode::FAILURE
        }
    }
}
