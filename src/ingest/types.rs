// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Where a configured feed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    #[default]
    Manual,
    Synced,
}

fn default_enabled() -> bool {
    true
}

/// One configured syndication feed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Free-text topic label; resolved to a canonical topic key at capture time.
    pub topic_label: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub origin: SourceOrigin,
}

/// One normalized feed entry, produced fresh per fetch.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateItem {
    /// Stable id from the guid → link → title+date fallback chain.
    pub id: String,
    pub title: String,
    pub link: String,
    /// None when the feed's timestamp was missing or unparseable.
    pub published_at: Option<DateTime<Utc>>,
    pub description: String,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<CandidateItem>>;
    fn name(&self) -> &'static str;
}
