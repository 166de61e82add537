// src/score/relevance.rs
//! Keyword-bucket relevance scoring against a topic profile, plus the
//! shared per-catalog score table the filter stages consume.

use crate::topics::{CompiledTopic, KeywordMatcher, TopicCatalog, OTHER_TOPIC};

/// Per-bucket match cap, so a keyword-stuffed item cannot run away.
pub const BUCKET_CAP: usize = 3;

const HIGH_WEIGHT: i32 = 2;
const NORMAL_WEIGHT: i32 = 1;
const NEGATIVE_WEIGHT: i32 = -2;

fn count_matches(bucket: &[KeywordMatcher], hay: &str, hay_lower: &str) -> usize {
    bucket
        .iter()
        .filter(|m| m.is_match(hay, hay_lower))
        .count()
        .min(BUCKET_CAP)
}

/// Score a haystack against one topic profile. Output is unbounded in
/// sign; callers apply their own acceptance threshold.
pub fn score_topic(topic: &CompiledTopic, haystack: &str) -> i32 {
    let lower = haystack.to_lowercase();

    let high = count_matches(&topic.high, haystack, &lower);
    let normal = count_matches(&topic.normal, haystack, &lower);
    let negative = count_matches(&topic.negative, haystack, &lower);

    let mut score = high as i32 * HIGH_WEIGHT
        + normal as i32 * NORMAL_WEIGHT
        + negative as i32 * NEGATIVE_WEIGHT;

    // Cross-signal adjustment: topical keywords without the required
    // indicators are suspect; indicators alone even more so.
    if let Some(cs) = &topic.cross_signal {
        let indicators = count_matches(&cs.indicators, haystack, &lower);
        let topical = high + normal;
        if topical > 0 && indicators > 0 {
            score += cs.bonus;
        } else if topical > 0 {
            score -= cs.missing_penalty;
        } else if indicators > 0 {
            score -= cs.indicator_only_penalty;
        }
    }

    score
}

/// Relevance of one haystack against every topic in the catalog, computed
/// once and consulted by both the threshold and the mismatch filter.
#[derive(Debug, Clone)]
pub struct ScoreTable {
    entries: Vec<(String, i32)>,
}

impl ScoreTable {
    pub fn compute(catalog: &TopicCatalog, haystack: &str) -> Self {
        let entries = catalog
            .topics()
            .iter()
            .map(|t| (t.key.clone(), score_topic(t, haystack)))
            .collect();
        Self { entries }
    }

    /// Score for a canonical key; `other` and unknown keys score zero.
    pub fn score_for(&self, key: &str) -> i32 {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| *s)
            .unwrap_or(0)
    }

    /// Dominant topic implied by the text itself: highest positive score,
    /// catalog order breaking ties. Falls back to `other` at score 0.
    pub fn dominant(&self) -> (&str, i32) {
        let mut best: Option<(&str, i32)> = None;
        for (k, s) in &self.entries {
            if *s > 0 && best.map(|(_, b)| *s > b).unwrap_or(true) {
                best = Some((k, *s));
            }
        }
        best.unwrap_or((OTHER_TOPIC, 0))
    }
}

/// Topic-mismatch check: the item's own text names another topic clearly
/// enough (absolute floor + margin over the declared topic's score).
pub fn is_mismatched(table: &ScoreTable, declared: &str, margin: i32, floor: i32) -> bool {
    let (dominant, dominant_score) = table.dominant();
    if dominant == declared || dominant == OTHER_TOPIC {
        return false;
    }
    dominant_score >= floor && dominant_score - table.score_for(declared) >= margin
}
