// src/pipeline.rs
//! The capture pipeline: one logical worker that walks due windows,
//! fetches and filters candidates, ranks them, selects a diverse batch,
//! and hands it to the output sink.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::CaptureConfig;
use crate::dedup::{build_keys, DedupKeySet};
use crate::enrich::{translate_cached, DescriptionEnricher, TranslationCache, Translator};
use crate::ingest::types::FeedProvider;
use crate::ingest::{fetch_all, SourceError};
use crate::learn::{learn_weights, DocumentSource, LearnParams};
use crate::normalize::normalize_text;
use crate::schedule::{due_windows, latest_completed_window, parse_boundaries, Window};
use crate::score::preference::{preference_score, PreferenceWeightTable};
use crate::score::priority::priority_boost;
use crate::score::quality::quality_score;
use crate::score::relevance::{is_mismatched, ScoreTable};
use crate::score::{combined_total, preference_feature_text, ScoredRow};
use crate::select::{select_diverse, SelectParams};
use crate::state::StateStore;
use crate::topics::{TopicCatalog, OTHER_TOPIC};

/// Counters for one run, surfaced to the sink and the status line.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub windows: usize,
    pub fetched: usize,
    pub deduped: usize,
    pub filtered_low_relevance: usize,
    pub filtered_mismatch: usize,
    /// Rows that ranked but did not fit the batch or a per-topic cap.
    pub capped: usize,
    pub selected: usize,
    pub source_errors: Vec<SourceError>,
}

/// Result of one trigger (timer tick, manual command, or startup).
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// A capture run was already in progress; request rejected, not queued.
    AlreadyRunning,
    NothingDue,
    InvalidSchedule(String),
    NoSources,
    Completed(RunStats),
    Failed(String),
}

impl RunOutcome {
    /// Short, specific status line for the caller.
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::AlreadyRunning => "capture already running".into(),
            RunOutcome::NothingDue => "nothing due".into(),
            RunOutcome::InvalidSchedule(msg) => format!("invalid schedule: {msg}"),
            RunOutcome::NoSources => "no enabled sources configured".into(),
            RunOutcome::Completed(stats) if stats.source_errors.is_empty() => format!(
                "captured {} window(s): {} selected of {} fetched ({} deduped)",
                stats.windows, stats.selected, stats.fetched, stats.deduped
            ),
            RunOutcome::Completed(stats) => format!(
                "captured {} window(s) with partial failures: {} selected of {} fetched, {} source error(s)",
                stats.windows,
                stats.selected,
                stats.fetched,
                stats.source_errors.len()
            ),
            RunOutcome::Failed(msg) => format!("hard failure: {msg}"),
        }
    }
}

/// The final batch for one window, regrouped by topic for rendering.
#[derive(Debug, Clone)]
pub struct TopicGroup {
    pub topic: String,
    pub rows: Vec<ScoredRow>,
}

#[derive(Debug, Clone)]
pub struct DigestBatch {
    pub window: Window,
    pub groups: Vec<TopicGroup>,
}

/// Output collaborator: document formatting and storage live behind it.
#[async_trait]
pub trait DigestSink: Send + Sync {
    async fn publish(&self, batch: &DigestBatch, stats: &RunStats) -> Result<()>;
}

/// Minimal sink for the binary: logs the batch shape.
pub struct TracingSink;

#[async_trait]
impl DigestSink for TracingSink {
    async fn publish(&self, batch: &DigestBatch, stats: &RunStats) -> Result<()> {
        for group in &batch.groups {
            tracing::info!(
                target: "capture",
                topic = %group.topic,
                items = group.rows.len(),
                window_end = %batch.window.end,
                "digest group"
            );
        }
        tracing::info!(
            target: "capture",
            selected = stats.selected,
            deduped = stats.deduped,
            errors = stats.source_errors.len(),
            "window published"
        );
        Ok(())
    }
}

/// Clears the reentrancy flag on every exit path, including panics.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct CaptureEngine {
    config: CaptureConfig,
    topics: TopicCatalog,
    state: Arc<dyn StateStore>,
    provider: Arc<dyn FeedProvider>,
    enricher: Option<Arc<dyn DescriptionEnricher>>,
    translator: Option<Arc<dyn Translator>>,
    sink: Arc<dyn DigestSink>,
    running: AtomicBool,
}

impl CaptureEngine {
    pub fn new(
        config: CaptureConfig,
        topics: TopicCatalog,
        state: Arc<dyn StateStore>,
        provider: Arc<dyn FeedProvider>,
        sink: Arc<dyn DigestSink>,
    ) -> Self {
        Self {
            config,
            topics,
            state,
            provider,
            enricher: None,
            translator: None,
            sink,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn DescriptionEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Run the scheduled capture: all due windows, oldest first, advancing
    /// the persisted pointer after each.
    pub async fn run_capture(&self, now: DateTime<Utc>) -> RunOutcome {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::warn!(target: "capture", "trigger rejected, run in progress");
            return RunOutcome::AlreadyRunning;
        };
        match self.capture_due(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(target: "capture", error = %format!("{e:#}"), "capture run failed");
                RunOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    /// Manual trigger: recapture the most recent fully elapsed window,
    /// independent of the catch-up pointer. Never regresses the pointer.
    pub async fn run_latest_window(&self, now: DateTime<Utc>) -> RunOutcome {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            return RunOutcome::AlreadyRunning;
        };
        match self.capture_latest(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(target: "capture", error = %format!("{e:#}"), "manual capture failed");
                RunOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    /// Rescan feedback documents and atomically replace the weight table.
    pub fn run_learning(&self, docs: &dyn DocumentSource) -> Result<usize> {
        let documents = docs.load_documents();
        let table = learn_weights(documents.iter().map(String::as_str), &LearnParams::default());
        let learned = table.len();
        let mut state = self.state.load()?;
        state.weights = table;
        self.state.save(&state)?;
        tracing::info!(target: "learn", tokens = learned, docs = documents.len(), "weight table replaced");
        Ok(learned)
    }

    async fn capture_due(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let boundaries = match parse_boundaries(&self.config.schedule) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => return Ok(RunOutcome::InvalidSchedule("no boundaries configured".into())),
            Err(e) => return Ok(RunOutcome::InvalidSchedule(format!("{e:#}"))),
        };
        if self.config.enabled_sources().is_empty() {
            return Ok(RunOutcome::NoSources);
        }

        let mut state = self.state.load()?;
        let windows = due_windows(now, state.last_window_end, &boundaries, self.config.max_catchup);
        if windows.is_empty() {
            return Ok(RunOutcome::NothingDue);
        }

        let mut stats = RunStats::default();
        let mut cache = TranslationCache::new();
        for window in windows {
            self.process_window(window, &state.weights, &mut cache, &mut stats)
                .await?;
            state.last_window_end = Some(window.end);
            self.state.save(&state)?;
        }

        gauge!("capture_last_run_ts").set(now.timestamp() as f64);
        Ok(RunOutcome::Completed(stats))
    }

    async fn capture_latest(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let boundaries = match parse_boundaries(&self.config.schedule) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => return Ok(RunOutcome::InvalidSchedule("no boundaries configured".into())),
            Err(e) => return Ok(RunOutcome::InvalidSchedule(format!("{e:#}"))),
        };
        if self.config.enabled_sources().is_empty() {
            return Ok(RunOutcome::NoSources);
        }
        let window = match latest_completed_window(now, &boundaries) {
            Ok(w) => w,
            Err(e) => return Ok(RunOutcome::InvalidSchedule(format!("{e:#}"))),
        };

        let mut state = self.state.load()?;
        let mut stats = RunStats::default();
        let mut cache = TranslationCache::new();
        self.process_window(window, &state.weights, &mut cache, &mut stats)
            .await?;

        // Advance only; a manual recapture never moves the pointer back.
        if state.last_window_end.map(|ts| window.end > ts).unwrap_or(true) {
            state.last_window_end = Some(window.end);
            self.state.save(&state)?;
        }
        Ok(RunOutcome::Completed(stats))
    }

    async fn process_window(
        &self,
        window: Window,
        weights: &PreferenceWeightTable,
        cache: &mut TranslationCache,
        stats: &mut RunStats,
    ) -> Result<()> {
        let sources = self.config.enabled_sources();
        let report = fetch_all(Arc::clone(&self.provider), &sources).await;
        stats.fetched += report.items.len();
        stats.source_errors.extend(report.errors);

        let mut dedup = DedupKeySet::new();
        let mut enrich_budget = self.config.enrichment_cap;
        let mut rows: Vec<ScoredRow> = Vec::new();

        for (source, mut item) in report.items {
            // Best-effort description enrichment, bounded per window.
            if item.description.is_empty() && enrich_budget > 0 {
                if let Some(enricher) = &self.enricher {
                    enrich_budget -= 1;
                    match enricher.extract(&item.link).await {
                        Ok(text) => item.description = normalize_text(&text),
                        Err(e) => {
                            tracing::debug!(target: "capture", error = %e, link = %item.link, "enrichment failed");
                        }
                    }
                }
            }

            if let (Some(lang), Some(translator)) =
                (self.config.translate_to.as_deref(), self.translator.as_deref())
            {
                if let Some(t) = translate_cached(translator, cache, &item.title, lang).await {
                    item.title = t;
                }
                if let Some(t) = translate_cached(translator, cache, &item.description, lang).await
                {
                    item.description = t;
                }
            }

            let keys = build_keys(&source, &item, self.config.enhanced_dedup);
            if dedup.check_and_insert(&keys) {
                stats.deduped += 1;
                counter!("capture_dedup_total").increment(1);
                continue;
            }

            let declared = self.topics.resolve(&source.topic_label).to_string();
            let haystack = format!(
                "{} {} {} {} {}",
                item.title, item.description, item.link, source.name, source.topic_label
            );
            let table = ScoreTable::compute(&self.topics, &haystack);
            let relevance = table.score_for(&declared);

            if self.config.mismatch_filter
                && is_mismatched(
                    &table,
                    &declared,
                    self.config.mismatch_margin,
                    self.config.mismatch_floor,
                )
            {
                stats.filtered_mismatch += 1;
                continue;
            }
            // The threshold stage only judges topics that have a profile;
            // uncategorized feeds pass through at relevance zero.
            if let Some(min) = self.config.min_relevance {
                if declared != OTHER_TOPIC && relevance < min {
                    stats.filtered_low_relevance += 1;
                    continue;
                }
            }

            let quality = quality_score(&item, window.end);
            let boost = priority_boost(
                &declared,
                &self.config.priority_topics,
                self.config.max_priority_boost,
            );
            let preference = preference_score(
                weights,
                &preference_feature_text(&declared, &source, &item),
                self.config.learning_enabled,
            );
            let total = combined_total(
                quality,
                relevance,
                self.config.relevance_weight,
                boost,
                preference,
                self.config.preference_weight,
            );

            rows.push(ScoredRow {
                item,
                source,
                topic: declared,
                quality,
                relevance,
                priority_boost: boost,
                preference,
                total,
            });
        }

        let candidates = rows.len();
        let selected = select_diverse(
            rows,
            &SelectParams {
                batch_size: self.config.batch_size,
                min_per_topic: self.config.min_per_topic,
                max_per_topic: self.config.max_per_topic,
                topic_penalty: self.config.topic_penalty,
            },
        );
        stats.capped += candidates - selected.len();
        stats.selected += selected.len();

        let batch = DigestBatch {
            window,
            groups: self.group_by_topic(selected),
        };
        self.sink.publish(&batch, stats).await?;

        stats.windows += 1;
        counter!("capture_windows_total").increment(1);
        tracing::info!(
            target: "capture",
            window_start = %window.start,
            window_end = %window.end,
            selected = batch.groups.iter().map(|g| g.rows.len()).sum::<usize>(),
            "window processed"
        );
        Ok(())
    }

    /// Regroup the selection for display: prioritized topics first in
    /// their configured order, the rest alphabetically, rows by score.
    fn group_by_topic(&self, selected: Vec<ScoredRow>) -> Vec<TopicGroup> {
        let mut groups: Vec<TopicGroup> = Vec::new();
        for row in selected {
            match groups.iter_mut().find(|g| g.topic == row.topic) {
                Some(g) => g.rows.push(row),
                None => groups.push(TopicGroup {
                    topic: row.topic.clone(),
                    rows: vec![row],
                }),
            }
        }
        for g in &mut groups {
            g.rows.sort_by(|a, b| {
                b.total
                    .total_cmp(&a.total)
                    .then(a.item.title.cmp(&b.item.title))
            });
        }
        let rank = |topic: &str| {
            self.config
                .priority_topics
                .iter()
                .position(|t| t == topic)
                .unwrap_or(usize::MAX)
        };
        groups.sort_by(|a, b| rank(&a.topic).cmp(&rank(&b.topic)).then(a.topic.cmp(&b.topic)));
        groups
    }
}
