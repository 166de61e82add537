// src/config.rs
//! Capture configuration: schedule, selection limits, filter toggles,
//! scoring weights, and the feed source list. Loaded from TOML with env
//! path override, hardened against out-of-range values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::ingest::types::FeedSource;

pub const ENV_CONFIG_PATH: &str = "CAPTURE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/capture.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Daily window boundaries as "HH:MM".
    pub schedule: Vec<String>,
    /// Safety cap on catch-up windows per invocation.
    pub max_catchup: usize,
    /// Timer tick for the binary's capture loop, seconds.
    pub tick_secs: u64,

    // --- selection ---
    pub batch_size: usize,
    pub min_per_topic: usize,
    pub max_per_topic: usize,
    pub topic_penalty: f64,

    // --- scoring ---
    pub relevance_weight: f64,
    pub preference_weight: f64,
    /// Minimum declared-topic relevance; `None` disables the stage.
    pub min_relevance: Option<i32>,
    pub priority_topics: Vec<String>,
    pub max_priority_boost: f64,

    // --- filters / dedup ---
    pub enhanced_dedup: bool,
    pub mismatch_filter: bool,
    pub mismatch_margin: i32,
    pub mismatch_floor: i32,

    // --- collaborators ---
    /// Per-window cap on description-enrichment calls.
    pub enrichment_cap: usize,
    /// Target language for title/description translation; `None` disables.
    pub translate_to: Option<String>,
    pub learning_enabled: bool,
    /// Directory of prior digest documents mined for feedback markers.
    pub feedback_dir: Option<String>,

    #[serde(rename = "source")]
    pub sources: Vec<FeedSource>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            schedule: vec!["08:00".into(), "17:00".into()],
            max_catchup: 6,
            tick_secs: 300,
            batch_size: 12,
            min_per_topic: 1,
            max_per_topic: 4,
            topic_penalty: 1.5,
            relevance_weight: 1.5,
            preference_weight: 1.0,
            min_relevance: Some(1),
            priority_topics: Vec::new(),
            max_priority_boost: 3.0,
            enhanced_dedup: true,
            mismatch_filter: true,
            mismatch_margin: 3,
            mismatch_floor: 4,
            enrichment_cap: 10,
            translate_to: None,
            learning_enabled: true,
            feedback_dir: None,
            sources: Vec::new(),
        }
    }
}

impl CaptureConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut cfg: CaptureConfig = toml::from_str(toml_str).context("parsing capture config")?;
        cfg.harden();
        Ok(cfg)
    }

    /// Load from $CAPTURE_CONFIG_PATH or config/capture.toml; a missing
    /// default file yields the built-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let content = fs::read_to_string(&p)
                .with_context(|| format!("reading capture config at {p}"))?;
            return Self::from_toml_str(&content);
        }
        let path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading capture config at {}", path.display()))?;
            return Self::from_toml_str(&content);
        }
        Ok(Self::default())
    }

    /// Clamp nonsense values instead of failing the run.
    fn harden(&mut self) {
        if self.max_catchup == 0 {
            self.max_catchup = 1;
        }
        if self.max_per_topic == 0 {
            self.max_per_topic = 1;
        }
        if self.min_per_topic > self.max_per_topic {
            self.min_per_topic = self.max_per_topic;
        }
        if self.topic_penalty < 0.0 {
            self.topic_penalty = 0.0;
        }
        if self.tick_secs == 0 {
            self.tick_secs = 60;
        }
    }

    pub fn enabled_sources(&self) -> Vec<FeedSource> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }
}
