//! One producer pass, meant to be run by an external scheduler (cron, CI).
//! Exit code 0 when a fresh or fallback digest was published, 1 otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use daily_news_digest::config::{DigestConfig, GenerationConfig};
use daily_news_digest::generate::{build_generator, PromptContext, Provenance};
use daily_news_digest::producer::{fall_back, FileArtifact, Producer, RunOutcome};
use daily_news_digest::telemetry;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing("daily_news_digest=info,digest_generate=info,warn");

    match run().await {
        Ok(RunOutcome::Fresh { stories }) => {
            info!(stories, "news digest updated");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Fallback { cause }) => {
            info!(%cause, "previous news digest republished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "news digest run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<RunOutcome> {
    let digest_cfg = DigestConfig::load_default()?;
    let store = Arc::new(FileArtifact::new(&digest_cfg.artifact_path));
    let now = Utc::now();

    // A broken generation setup is one more generation failure: fall back, don't abort.
    let setup = GenerationConfig::load_default()
        .and_then(|cfg| build_generator(&cfg).map(|generator| (cfg, generator)));
    let (gen_cfg, generator) = match setup {
        Ok(ok) => ok,
        Err(e) => return Ok(fall_back(store.as_ref(), format!("{e:#}"), now).await?),
    };

    let ctx = match std::env::var("DIGEST_DATE") {
        Ok(date) => PromptContext::new(date),
        Err(_) => PromptContext::for_day(now),
    };

    let producer = Producer::new(
        generator,
        store,
        gen_cfg,
        Provenance::from_config(&digest_cfg),
    );
    Ok(producer.run_once_at(&ctx, now).await?)
}
