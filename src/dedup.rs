// src/dedup.rs
//! Multi-key deduplication: an item is a duplicate within a window if any
//! of its derived keys collides with one already seen.

use std::collections::HashSet;

use crate::ingest::types::{CandidateItem, FeedSource};
use crate::normalize::{canonicalize_link, normalize_title_key};

/// Short stable digest so composite keys stay bounded.
fn digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let out = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for b in out.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut hex, "{:02x}", b);
    }
    hex
}

/// Derive 1–3 dedup keys for an item.
///
/// - primary: feed URL + the item's stable id (always present)
/// - enhanced: canonicalized link, and normalized title + publish day
pub fn build_keys(source: &FeedSource, item: &CandidateItem, enhanced: bool) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    keys.push(format!("src:{}", digest(&format!("{}|{}", source.url, item.id))));

    if enhanced {
        let link = canonicalize_link(&item.link);
        if !link.is_empty() {
            keys.push(format!("link:{}", link));
        }
        let title = normalize_title_key(&item.title);
        if !title.is_empty() {
            let day = item
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "undated".to_string());
            keys.push(format!("title:{}@{}", title, day));
        }
    }

    keys
}

/// Process-local, per-window set of composite keys. Reset every window.
#[derive(Debug, Default)]
pub struct DedupKeySet {
    seen: HashSet<String>,
}

impl DedupKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the item is a duplicate (any key already seen).
    /// All keys are recorded either way, so later variants of a rejected
    /// item still collide.
    pub fn check_and_insert(&mut self, keys: &[String]) -> bool {
        let duplicate = keys.iter().any(|k| self.seen.contains(k));
        for k in keys {
            self.seen.insert(k.clone());
        }
        duplicate
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
