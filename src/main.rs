//! Feed Digest Curator — Binary Entrypoint
//! Boots the capture loop: timer ticks trigger the pipeline, learning
//! reruns between ticks when a feedback directory is configured.

use std::sync::Arc;

use anyhow::{Context, Result};
use feed_digest_curator::ingest::rss::HttpFeedProvider;
use feed_digest_curator::learn::FileDocumentSource;
use feed_digest_curator::pipeline::{CaptureEngine, TracingSink};
use feed_digest_curator::state::FileStateStore;
use feed_digest_curator::{CaptureConfig, TopicCatalog};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("capture=info,learn=info,ingest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = CaptureConfig::load_default().context("loading capture config")?;
    let topics = TopicCatalog::load_default().context("loading topic catalog")?;
    let feedback_dir = config.feedback_dir.clone();
    let learning_enabled = config.learning_enabled;
    let tick_secs = config.tick_secs;

    let engine = CaptureEngine::new(
        config,
        topics,
        Arc::new(FileStateStore::from_env()),
        Arc::new(HttpFeedProvider::new()),
        Arc::new(TracingSink),
    );

    tracing::info!(target: "capture", tick_secs, "capture loop starting");
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(tick_secs));
    loop {
        ticker.tick().await;

        if learning_enabled {
            if let Some(dir) = &feedback_dir {
                let docs = FileDocumentSource::new(dir);
                if let Err(e) = engine.run_learning(&docs) {
                    tracing::warn!(target: "learn", error = %format!("{e:#}"), "learning pass failed");
                }
            }
        }

        let outcome = engine.run_capture(chrono::Utc::now()).await;
        tracing::info!(target: "capture", status = %outcome.summary(), "tick finished");
    }
}
