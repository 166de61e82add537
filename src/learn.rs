// src/learn.rs
//! Preference learning: mine prefer/avoid feedback out of prior digest
//! documents and re-derive the token-weight table.
//!
//! Digest documents follow the convention:
//!
//! ```text
//! ## Topic Name
//! ### Item Title
//! - source: Feed Name
//! > quoted excerpt line
//! #prefer        (or #avoid)
//! ```
//!
//! A block counts only when it carries markers of exactly one polarity;
//! both or neither is discarded as noise.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::score::preference::{feature_tokens, PreferenceWeightTable};

pub const PREFER_MARKER: &str = "#prefer";
pub const AVOID_MARKER: &str = "#avoid";

#[derive(Debug, Clone, Copy)]
pub struct LearnParams {
    /// Minimum accumulated |weight| for a token to be retained.
    pub min_count: f32,
    pub max_tokens: usize,
}

impl Default for LearnParams {
    fn default() -> Self {
        Self {
            min_count: 1.0,
            max_tokens: crate::score::preference::MAX_TOKENS,
        }
    }
}

/// One labeled feedback sample extracted from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// +1 prefer, -1 avoid.
    pub label: i32,
    /// topic + title + source line + quoted excerpt lines.
    pub text: String,
}

#[derive(Default)]
struct Block {
    title: String,
    source_line: String,
    quotes: Vec<String>,
    prefer: usize,
    avoid: usize,
}

impl Block {
    fn into_sample(self, topic: &str) -> Option<Sample> {
        let label = match (self.prefer > 0, self.avoid > 0) {
            (true, false) => 1,
            (false, true) => -1,
            // both or neither: noise
            _ => return None,
        };
        let mut parts = vec![topic.to_string(), self.title];
        if !self.source_line.is_empty() {
            parts.push(self.source_line);
        }
        parts.extend(self.quotes);
        Some(Sample {
            label,
            text: parts.join(" "),
        })
    }
}

/// Explicit line scanner: topic header → item header → item body lines.
pub fn extract_samples(doc: &str) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut topic = String::new();
    let mut block: Option<Block> = None;

    let flush = |topic: &str, block: &mut Option<Block>, out: &mut Vec<Sample>| {
        if let Some(b) = block.take() {
            if let Some(s) = b.into_sample(topic) {
                out.push(s);
            }
        }
    };

    for line in doc.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("## ") {
            flush(&topic, &mut block, &mut samples);
            topic = rest.trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix("### ") {
            flush(&topic, &mut block, &mut samples);
            block = Some(Block {
                title: rest.trim().to_string(),
                ..Default::default()
            });
        } else if let Some(b) = block.as_mut() {
            if let Some(rest) = trimmed.strip_prefix("- source:") {
                b.source_line = rest.trim().to_string();
            } else if let Some(rest) = trimmed.strip_prefix('>') {
                // excerpt text may mention a marker without being one
                b.quotes.push(rest.trim().to_string());
            } else if trimmed == PREFER_MARKER {
                b.prefer += 1;
            } else if trimmed == AVOID_MARKER {
                b.avoid += 1;
            }
        }
    }
    flush(&topic, &mut block, &mut samples);

    samples
}

/// Accumulate ±1 per deduplicated token per sample, retain tokens whose
/// magnitude meets the threshold, and build the bounded table. Scanning
/// is from scratch every pass, so unchanged inputs yield an identical
/// table.
pub fn learn_weights<'a, I>(docs: I, params: &LearnParams) -> PreferenceWeightTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut acc: HashMap<String, f32> = HashMap::new();
    let mut samples_seen = 0usize;

    for doc in docs {
        for sample in extract_samples(doc) {
            samples_seen += 1;
            for token in feature_tokens(&sample.text) {
                *acc.entry(token).or_insert(0.0) += sample.label as f32;
            }
        }
    }

    tracing::debug!(target: "learn", samples = samples_seen, tokens = acc.len(), "learning pass");

    let entries: Vec<(String, f32)> = acc
        .into_iter()
        .filter(|(_, w)| w.abs() >= params.min_count)
        .collect();
    PreferenceWeightTable::from_entries(truncated(entries, params.max_tokens))
}

fn truncated(mut entries: Vec<(String, f32)>, max: usize) -> Vec<(String, f32)> {
    entries.sort_by(|(ta, wa), (tb, wb)| {
        wb.abs()
            .partial_cmp(&wa.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ta.cmp(tb))
    });
    entries.truncate(max);
    entries
}

/// Supplies prior digest documents to the learner.
pub trait DocumentSource: Send + Sync {
    /// Raw document texts. Individual read failures are skipped by the
    /// implementation, not surfaced.
    fn load_documents(&self) -> Vec<String>;
}

/// Reads every `.md` file in a directory. Unreadable files are skipped
/// at debug level; the scan continues.
pub struct FileDocumentSource {
    dir: PathBuf,
}

impl FileDocumentSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl DocumentSource for FileDocumentSource {
    fn load_documents(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(target: "learn", error = %e, dir = %self.dir.display(), "feedback dir unreadable");
                return Vec::new();
            }
        };
        let mut docs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(text) => docs.push(text),
                Err(e) => {
                    tracing::debug!(target: "learn", error = %e, file = %path.display(), "skipping unreadable document");
                }
            }
        }
        docs.sort();
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
# Digest 2026-03-01

## AI

### Local models keep getting better
- source: AI Weekly
> local ai model runs offline
#prefer

### Crypto angle on AI
- source: Hype Daily
> token prices soar
#avoid

## Climate

### Both markers are noise
- source: X
> whatever
#prefer
#avoid

### No marker at all
- source: Y
> silent block
"#;

    #[test]
    fn extracts_single_polarity_blocks_only() {
        let samples = extract_samples(DOC);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, 1);
        assert!(samples[0].text.contains("local ai model"));
        assert!(samples[0].text.contains("AI Weekly"));
        assert_eq!(samples[1].label, -1);
    }

    #[test]
    fn prefer_sample_yields_positive_weights() {
        let table = learn_weights([DOC], &LearnParams::default());
        assert!(table.get("local").unwrap() > 0.0);
        assert!(table.get("model").unwrap() > 0.0);
        assert!(table.get("prices").unwrap() < 0.0);
        // noise blocks contribute nothing
        assert!(table.get("whatever").is_none());
        assert!(table.get("silent").is_none());
    }

    #[test]
    fn learning_is_idempotent_over_unchanged_docs() {
        let a = learn_weights([DOC], &LearnParams::default());
        let b = learn_weights([DOC], &LearnParams::default());
        assert_eq!(a, b);
    }

    #[test]
    fn min_count_threshold_filters_weak_tokens() {
        let params = LearnParams {
            min_count: 2.0,
            ..Default::default()
        };
        // one sample → every token magnitude is 1 → all filtered
        let table = learn_weights([DOC], &params);
        assert!(table.get("local").is_none());

        // same doc twice → magnitudes reach 2
        let table2 = learn_weights([DOC, DOC], &params);
        assert_eq!(table2.get("local"), Some(2.0));
    }

    #[test]
    fn marker_mention_inside_a_quote_is_not_a_marker() {
        let doc = r#"
## T

### Discussed
- source: X
> readers tag #prefer on items like this
#avoid

### Mention only
- source: Y
> people keep writing #prefer in replies
"#;
        let samples = extract_samples(doc);
        // the quote text stays in the sample, the polarity is the
        // standalone marker's
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, -1);
        assert!(samples[0].text.contains("readers tag"));
        // a block whose only "marker" lives inside a quote has none
        assert!(!samples.iter().any(|s| s.text.contains("replies")));
    }

    #[test]
    fn topic_header_flushes_open_block() {
        let doc = "## A\n### t1\n#prefer\n## B\n### t2\n#avoid\n";
        let samples = extract_samples(doc);
        assert_eq!(samples.len(), 2);
        assert!(samples[0].text.starts_with('A'));
        assert!(samples[1].text.starts_with('B'));
    }
}
