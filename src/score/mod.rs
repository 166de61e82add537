// src/score/mod.rs
//! Scoring model: relevance, quality, priority and preference components
//! combined into one ranked row per candidate.

pub mod preference;
pub mod priority;
pub mod quality;
pub mod relevance;

use chrono::{DateTime, Utc};

use crate::ingest::types::{CandidateItem, FeedSource};
use crate::normalize::link_host;

/// A candidate with its owning source and score components. Ephemeral;
/// lives only inside one window's ranking pass.
#[derive(Debug, Clone)]
pub struct ScoredRow {
    pub item: CandidateItem,
    pub source: FeedSource,
    /// Canonical topic key resolved from the source's declared label.
    pub topic: String,
    pub quality: f64,
    pub relevance: i32,
    pub priority_boost: f64,
    pub preference: f64,
    pub total: f64,
}

impl ScoredRow {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.item.published_at
    }
}

/// Feature text the preference model scores: canonical topic, feed name,
/// title, description, and the link host only. Link paths stay out, so
/// slug and section words cannot pick up learned weights.
pub fn preference_feature_text(topic: &str, source: &FeedSource, item: &CandidateItem) -> String {
    format!(
        "{} {} {} {} {}",
        topic,
        source.name,
        item.title,
        item.description,
        link_host(&item.link)
    )
}

/// Combined total: quality is the base, relevance and preference carry
/// configurable weights, the priority boost is additive as-is.
pub fn combined_total(
    quality: f64,
    relevance: i32,
    relevance_weight: f64,
    priority_boost: f64,
    preference: f64,
    preference_weight: f64,
) -> f64 {
    quality + relevance as f64 * relevance_weight + priority_boost + preference * preference_weight
}
