// src/score/quality.rs
//! Intrinsic signal quality: recency, title/description shape, link
//! shape, and promotional-content penalties. The primary ranking and
//! tiebreak signal.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::CandidateItem;

/// Maximum recency bonus at age zero.
const RECENCY_MAX: f64 = 10.0;
/// Past this age the recency bonus is zero.
const RECENCY_CUTOFF_HOURS: f64 = 72.0;

const SPAM_PENALTY: f64 = -6.0;

/// Linear decay from `RECENCY_MAX` at age 0 to 0 at the cutoff.
/// Undated items get no recency bonus.
fn recency_bonus(published_at: Option<DateTime<Utc>>, window_end: DateTime<Utc>) -> f64 {
    let Some(ts) = published_at else {
        return 0.0;
    };
    let age_hours = (window_end - ts).num_minutes() as f64 / 60.0;
    if age_hours < 0.0 {
        // Future-dated item; treat as fresh.
        return RECENCY_MAX;
    }
    (RECENCY_MAX * (1.0 - age_hours / RECENCY_CUTOFF_HOURS)).max(0.0)
}

/// Sweet spot 20..=90 chars scores full; short-but-real titles partial.
fn title_bonus(title: &str) -> f64 {
    match title.chars().count() {
        20..=90 => 3.0,
        8..=19 => 1.5,
        _ => 0.0,
    }
}

/// Five-tier step function over description length.
fn description_bonus(description: &str) -> f64 {
    match description.chars().count() {
        n if n >= 600 => 4.0,
        n if n >= 300 => 3.0,
        n if n >= 120 => 2.0,
        n if n >= 40 => 1.0,
        _ => 0.0,
    }
}

fn article_path_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        // dated segments, long numeric ids, or article/news/story markers
        Regex::new(r"(?ix)
            /20\d{2}/\d{1,2}/          # /2026/03/
          | /\d{6,}                    # /20260301123 style ids
          | /(article|news|story|post)s?/
        ")
        .unwrap()
    })
}

fn link_bonus(link: &str) -> f64 {
    let mut bonus = 0.0;
    if link.starts_with("https://") {
        bonus += 1.0;
    }
    if article_path_re().is_match(link) {
        bonus += 2.0;
    }
    bonus
}

fn spam_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        // language-agnostic promotional markers
        Regex::new(r"(?i)(sponsored|advertorial|promoted|press\s+release|pr\s+newswire|giveaway|\[ad\]|\[pr\]|광고|프로모션|할인)").unwrap()
    })
}

/// Score one item's intrinsic quality relative to the window end.
/// Sub-scores sum into one real number; no clamping.
pub fn quality_score(item: &CandidateItem, window_end: DateTime<Utc>) -> f64 {
    let mut score = recency_bonus(item.published_at, window_end)
        + title_bonus(&item.title)
        + description_bonus(&item.description)
        + link_bonus(&item.link);
    if spam_re().is_match(&item.title) {
        score += SPAM_PENALTY;
    }
    score
}
