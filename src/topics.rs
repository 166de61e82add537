// src/topics.rs
//! Topic catalog: canonical topic keys with alias lists and keyword
//! buckets, loaded read-only from TOML. Catalog order is the configured
//! precedence for alias resolution.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Sentinel key for items no profile claims.
pub const OTHER_TOPIC: &str = "other";

pub const ENV_TOPICS_CONFIG_PATH: &str = "TOPICS_CONFIG_PATH";
pub const DEFAULT_TOPICS_CONFIG_PATH: &str = "config/topics.toml";

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct TopicsRoot {
    #[serde(default, rename = "topic")]
    pub topics: Vec<TopicCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicCfg {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub normal: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub cross_signal: Option<CrossSignalCfg>,
}

/// Cross-signal adjustment applied after the base bucket score: a topic
/// can require indicator keywords to co-occur with its topical keywords.
#[derive(Debug, Clone, Deserialize)]
pub struct CrossSignalCfg {
    pub indicators: Vec<String>,
    #[serde(default = "default_bonus")]
    pub bonus: i32,
    #[serde(default = "default_missing_penalty")]
    pub missing_penalty: i32,
    #[serde(default = "default_indicator_only_penalty")]
    pub indicator_only_penalty: i32,
}

fn default_bonus() -> i32 {
    2
}
fn default_missing_penalty() -> i32 {
    2
}
fn default_indicator_only_penalty() -> i32 {
    4
}

/* ----------------------------
Compiled catalog structures
---------------------------- */

/// One keyword compiled for matching. Pure latin letter/digit keywords are
/// matched on word boundaries; anything else (e.g. Korean script) falls
/// back to plain substring containment on the lowercased haystack.
#[derive(Debug, Clone)]
pub enum KeywordMatcher {
    Word(Regex),
    Substring(String),
}

impl KeywordMatcher {
    pub fn compile(keyword: &str) -> Result<Self> {
        let kw = keyword.trim();
        if kw.is_empty() {
            return Err(anyhow!("empty keyword"));
        }
        let latin = kw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');
        if latin {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw)))
                .with_context(|| format!("keyword `{}`", kw))?;
            Ok(KeywordMatcher::Word(re))
        } else {
            Ok(KeywordMatcher::Substring(kw.to_lowercase()))
        }
    }

    /// `hay` is the original text, `hay_lower` its lowercased form.
    pub fn is_match(&self, hay: &str, hay_lower: &str) -> bool {
        match self {
            KeywordMatcher::Word(re) => re.is_match(hay),
            KeywordMatcher::Substring(s) => hay_lower.contains(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledTopic {
    pub key: String,
    pub label: String,
    pub aliases: Vec<String>,
    pub high: Vec<KeywordMatcher>,
    pub normal: Vec<KeywordMatcher>,
    pub negative: Vec<KeywordMatcher>,
    pub cross_signal: Option<CompiledCrossSignal>,
    // raw keyword strings kept for the resolver's substring pass
    high_raw: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CompiledCrossSignal {
    pub indicators: Vec<KeywordMatcher>,
    pub bonus: i32,
    pub missing_penalty: i32,
    pub indicator_only_penalty: i32,
}

fn compile_bucket(raw: &[String], topic: &str) -> Result<Vec<KeywordMatcher>> {
    raw.iter()
        .map(|k| KeywordMatcher::compile(k).with_context(|| format!("topic `{}`", topic)))
        .collect()
}

/// The read-only catalog; order is configured precedence.
#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: Vec<CompiledTopic>,
}

impl TopicCatalog {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let root: TopicsRoot = toml::from_str(toml_str).context("parsing topics config")?;
        let mut topics = Vec::with_capacity(root.topics.len());
        for cfg in &root.topics {
            if cfg.key.trim().is_empty() {
                return Err(anyhow!("topic with empty key"));
            }
            let cross_signal = match &cfg.cross_signal {
                Some(cs) => Some(CompiledCrossSignal {
                    indicators: compile_bucket(&cs.indicators, &cfg.key)?,
                    bonus: cs.bonus,
                    missing_penalty: cs.missing_penalty,
                    indicator_only_penalty: cs.indicator_only_penalty,
                }),
                None => None,
            };
            topics.push(CompiledTopic {
                key: cfg.key.to_lowercase(),
                label: if cfg.label.is_empty() {
                    cfg.key.clone()
                } else {
                    cfg.label.clone()
                },
                aliases: cfg.aliases.iter().map(|a| a.to_lowercase()).collect(),
                high: compile_bucket(&cfg.high, &cfg.key)?,
                normal: compile_bucket(&cfg.normal, &cfg.key)?,
                negative: compile_bucket(&cfg.negative, &cfg.key)?,
                cross_signal,
                high_raw: cfg.high.iter().map(|k| k.to_lowercase()).collect(),
            });
        }
        Ok(Self { topics })
    }

    /// Load from $TOPICS_CONFIG_PATH or config/topics.toml.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_TOPICS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOPICS_CONFIG_PATH));
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading topics config at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn topics(&self) -> &[CompiledTopic] {
        &self.topics
    }

    pub fn get(&self, key: &str) -> Option<&CompiledTopic> {
        self.topics.iter().find(|t| t.key == key)
    }

    /// Map a free-text label to a canonical topic key.
    ///
    /// First pass: exact substring match of the lowercased input against
    /// each topic's key/alias list, catalog order wins. Second pass: count
    /// aliases + high-signal keywords present as substrings and take the
    /// best positive score. Everything else lands in `other`.
    pub fn resolve(&self, label: &str) -> &str {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return OTHER_TOPIC;
        }

        for t in &self.topics {
            if needle.contains(&t.key) || t.aliases.iter().any(|a| needle.contains(a.as_str())) {
                return &t.key;
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for t in &self.topics {
            let score = t
                .aliases
                .iter()
                .chain(t.high_raw.iter())
                .filter(|kw| needle.contains(kw.as_str()))
                .count();
            if score > 0 && best.map(|(_, b)| score > b).unwrap_or(true) {
                best = Some((&t.key, score));
            }
        }
        best.map(|(k, _)| k).unwrap_or(OTHER_TOPIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TOML: &str = r#"
[[topic]]
key = "ai"
label = "AI & ML"
aliases = ["artificial intelligence", "machine learning", "인공지능"]
high = ["llm", "neural"]
normal = ["model"]

[[topic]]
key = "climate"
aliases = ["environment"]
high = ["emissions", "carbon"]
"#;

    fn catalog() -> TopicCatalog {
        TopicCatalog::from_toml_str(TEST_TOML).expect("load test catalog")
    }

    #[test]
    fn resolve_exact_alias_wins_in_order() {
        let c = catalog();
        assert_eq!(c.resolve("Machine Learning weekly"), "ai");
        assert_eq!(c.resolve("environment digest"), "climate");
    }

    #[test]
    fn resolve_second_pass_counts_keywords() {
        let c = catalog();
        // No alias hit, but two climate keywords as substrings.
        assert_eq!(c.resolve("emissions and carbon report"), "climate");
    }

    #[test]
    fn resolve_unknown_is_other() {
        let c = catalog();
        assert_eq!(c.resolve("cooking corner"), OTHER_TOPIC);
        assert_eq!(c.resolve(""), OTHER_TOPIC);
    }

    #[test]
    fn non_latin_alias_resolves() {
        let c = catalog();
        assert_eq!(c.resolve("주간 인공지능 뉴스"), "ai");
    }

    #[test]
    fn keyword_matcher_word_boundary() {
        let m = KeywordMatcher::compile("ai").unwrap();
        assert!(m.is_match("AI policy update", "ai policy update"));
        assert!(!m.is_match("he said so", "he said so"));
    }

    #[test]
    fn keyword_matcher_non_latin_substring() {
        let m = KeywordMatcher::compile("인공지능").unwrap();
        assert!(m.is_match("오늘의 인공지능 소식", "오늘의 인공지능 소식"));
        assert!(!m.is_match("다른 소식", "다른 소식"));
    }
}
