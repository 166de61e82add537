// src/ingest/mod.rs
pub mod rss;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::ingest::types::{CandidateItem, FeedProvider, FeedSource};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("capture_items_parsed_total", "Items parsed from feeds.");
        describe_counter!("capture_items_fetched_total", "Items fetched across sources.");
        describe_counter!("capture_source_errors_total", "Per-source fetch/parse errors.");
        describe_counter!("capture_dedup_total", "Items removed by window dedup.");
        describe_counter!("capture_windows_total", "Windows processed.");
        describe_histogram!("capture_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("capture_last_run_ts", "Unix ts of the last capture run.");
    });
}

/// A per-source failure, collected rather than aborting the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

/// Everything one window's fetch produced.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub items: Vec<(FeedSource, CandidateItem)>,
    pub errors: Vec<SourceError>,
}

/// Fetch all enabled sources in parallel, best-effort. A single source's
/// failure is recorded and does not abort the others.
pub async fn fetch_all(provider: Arc<dyn FeedProvider>, sources: &[FeedSource]) -> FetchReport {
    ensure_metrics_described();

    let mut handles = Vec::new();
    for source in sources.iter().filter(|s| s.enabled).cloned() {
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(async move {
            let result = provider.fetch(&source).await;
            (source, result)
        }));
    }

    let mut report = FetchReport::default();
    for handle in handles {
        match handle.await {
            Ok((source, Ok(items))) => {
                counter!("capture_items_fetched_total").increment(items.len() as u64);
                for item in items {
                    report.items.push((source.clone(), item));
                }
            }
            Ok((source, Err(e))) => {
                tracing::warn!(target: "ingest", source = %source.name, error = %e, "source fetch failed");
                counter!("capture_source_errors_total").increment(1);
                report.errors.push(SourceError {
                    source: source.name,
                    message: format!("{e:#}"),
                });
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "fetch task panicked");
                counter!("capture_source_errors_total").increment(1);
                report.errors.push(SourceError {
                    source: "<task>".into(),
                    message: e.to_string(),
                });
            }
        }
    }
    report
}
