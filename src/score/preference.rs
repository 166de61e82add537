// src/score/preference.rs
//! Learned token-weight preference model: tokenizer shared with the
//! learner, the bounded weight table, and the clamped scoring pass.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Per-token weight bound.
pub const WEIGHT_CLAMP: f32 = 5.0;
/// Clamp for the summed preference score of one item.
pub const SCORE_CLAMP: f64 = 8.0;
/// Table cap; least-significant weights evicted first.
pub const MAX_TOKENS: usize = 400;

const TOKEN_MIN_LEN: usize = 2;
const TOKEN_MAX_LEN: usize = 24;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "has", "have", "its",
    "but", "not", "you", "all", "can", "will", "more", "new", "how", "why", "what", "about",
    "into", "over", "after", "before", "their", "than", "when", "who", "out", "off", "our",
];

fn token_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?u)[\p{Alphabetic}\p{Nd}]+").unwrap())
}

/// Lowercase alphanumeric tokens of bounded length, stopwords and pure
/// numbers dropped, deduplicated in order of first appearance.
pub fn feature_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in token_re().find_iter(&lower) {
        let tok = m.as_str();
        let len = tok.chars().count();
        if !(TOKEN_MIN_LEN..=TOKEN_MAX_LEN).contains(&len) {
            continue;
        }
        if tok.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if STOPWORDS.contains(&tok) {
            continue;
        }
        if seen.insert(tok.to_string()) {
            out.push(tok.to_string());
        }
    }
    out
}

/// Signed per-token weights, bounded in count and magnitude. Mutated only
/// by the learner; read-only for scoring.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreferenceWeightTable {
    weights: BTreeMap<String, f32>,
}

impl PreferenceWeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw accumulated entries: clamp each weight, order by
    /// descending magnitude (token as tiebreak), truncate to the cap.
    pub fn from_entries(entries: Vec<(String, f32)>) -> Self {
        let mut sorted = entries;
        sorted.sort_by(|(ta, wa), (tb, wb)| {
            wb.abs()
                .partial_cmp(&wa.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ta.cmp(tb))
        });
        sorted.truncate(MAX_TOKENS);
        let weights = sorted
            .into_iter()
            .map(|(t, w)| (t, w.clamp(-WEIGHT_CLAMP, WEIGHT_CLAMP)))
            .collect();
        Self { weights }
    }

    pub fn get(&self, token: &str) -> Option<f32> {
        self.weights.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }
}

/// Sum token weights over the item's feature text, clamped symmetrically.
/// Zero when learning is disabled or nothing has been learned yet.
pub fn preference_score(table: &PreferenceWeightTable, feature_text: &str, enabled: bool) -> f64 {
    if !enabled || table.is_empty() {
        return 0.0;
    }
    let sum: f64 = feature_tokens(feature_text)
        .iter()
        .filter_map(|t| table.get(t))
        .map(f64::from)
        .sum();
    sum.clamp(-SCORE_CLAMP, SCORE_CLAMP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_lowercased_bounded_and_deduped() {
        let toks = feature_tokens("Local AI Model, local model 2026 a x");
        assert_eq!(toks, vec!["local", "ai", "model"]);
    }

    #[test]
    fn stopwords_and_numbers_dropped() {
        let toks = feature_tokens("the 12345 and model");
        assert_eq!(toks, vec!["model"]);
    }

    #[test]
    fn score_sums_and_clamps() {
        let table = PreferenceWeightTable::from_entries(vec![
            ("local".into(), 3.0),
            ("model".into(), 4.0),
            ("crypto".into(), -9.0), // clamped to -5
        ]);
        assert_eq!(preference_score(&table, "local model", true), 7.0);
        assert_eq!(preference_score(&table, "local model local", true), 7.0);
        // 3 + 4 + 4 would exceed the clamp
        let big = PreferenceWeightTable::from_entries(vec![
            ("aa".into(), 4.0),
            ("bb".into(), 4.0),
            ("cc".into(), 4.0),
        ]);
        assert_eq!(preference_score(&big, "aa bb cc", true), SCORE_CLAMP);
        assert_eq!(preference_score(&table, "crypto crypto", true), -5.0);
    }

    #[test]
    fn disabled_or_empty_scores_zero() {
        let table = PreferenceWeightTable::from_entries(vec![("local".into(), 3.0)]);
        assert_eq!(preference_score(&table, "local", false), 0.0);
        assert_eq!(preference_score(&PreferenceWeightTable::new(), "local", true), 0.0);
    }

    #[test]
    fn eviction_drops_smallest_magnitudes() {
        let mut entries: Vec<(String, f32)> = (0..MAX_TOKENS)
            .map(|i| (format!("tok{i:04}"), 2.0))
            .collect();
        entries.push(("weak".into(), 0.5));
        entries.push(("strong".into(), 4.5));
        let table = PreferenceWeightTable::from_entries(entries);
        assert_eq!(table.len(), MAX_TOKENS);
        assert!(table.get("strong").is_some());
        assert!(table.get("weak").is_none());
    }
}
