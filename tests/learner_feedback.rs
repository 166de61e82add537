// tests/learner_feedback.rs
use feed_digest_curator::learn::{extract_samples, learn_weights, LearnParams};
use feed_digest_curator::score::preference::preference_score;

const DIGEST: &str = r#"
# Digest 2026-03-01 08:00

## AI

### Local models keep improving
- source: AI Weekly
> local ai model runs offline on a laptop
#prefer

### Celebrity gossip with an AI angle
- source: Buzz Feedly
> celebrity gossip roundup
#avoid

## Climate

### Carbon report
- source: Climate Wire
> emissions fell in february
"#;

#[test]
fn prefer_marker_yields_positive_token_weights() {
    let table = learn_weights([DIGEST], &LearnParams::default());
    assert!(table.get("local").unwrap() > 0.0);
    assert!(table.get("model").unwrap() > 0.0);
    assert!(table.get("gossip").unwrap() < 0.0);
    // unmarked block contributes nothing
    assert!(table.get("emissions").is_none());
}

#[test]
fn learning_twice_on_unchanged_documents_is_idempotent() {
    let params = LearnParams::default();
    let first = learn_weights([DIGEST], &params);
    let second = learn_weights([DIGEST], &params);
    assert_eq!(first, second);
}

#[test]
fn learned_table_steers_preference_scoring() {
    let table = learn_weights([DIGEST], &LearnParams::default());
    let liked = preference_score(&table, "A new local ai model appears", true);
    let disliked = preference_score(&table, "celebrity gossip special", true);
    assert!(liked > 0.0);
    assert!(disliked < 0.0);
}

#[test]
fn conflicting_markers_are_noise() {
    let doc = r#"
## T

### Conflicted
- source: X
> text here
#prefer
#avoid

### Clean
- source: X
> unambiguous sample
#prefer
"#;
    let samples = extract_samples(doc);
    assert_eq!(samples.len(), 1);
    assert!(samples[0].text.contains("unambiguous"));
}

#[test]
fn markers_accumulate_across_documents() {
    let params = LearnParams::default();
    let table = learn_weights([DIGEST, DIGEST, DIGEST], &params);
    assert_eq!(table.get("local"), Some(3.0));
    assert_eq!(table.get("gossip"), Some(-3.0));
}
