// src/enrich.rs
//! External enrichment collaborators: article description extraction and
//! machine translation, with a run-scoped translation cache.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::normalize::normalize_text;

/// Best-effort description text for an article URL. Empty string means
/// "nothing usable"; callers never fail on it.
#[async_trait]
pub trait DescriptionEnricher: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String>;
}

/// Machine-translation collaborator.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
    fn provider(&self) -> &str;
    fn model(&self) -> &str;
}

/// Cache keyed by (provider, model, target language, normalized text).
/// Scoped to one capture run; no eviction.
#[derive(Debug, Default)]
pub struct TranslationCache {
    map: HashMap<(String, String, String, String), String>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(translator: &dyn Translator, target_lang: &str, text: &str) -> (String, String, String, String) {
        (
            translator.provider().to_string(),
            translator.model().to_string(),
            target_lang.to_string(),
            normalize_text(text),
        )
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Translate through the cache. Failures are swallowed individually:
/// `None` means "keep the original text".
pub async fn translate_cached(
    translator: &dyn Translator,
    cache: &mut TranslationCache,
    text: &str,
    target_lang: &str,
) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let key = TranslationCache::key(translator, target_lang, text);
    if let Some(hit) = cache.map.get(&key) {
        return Some(hit.clone());
    }
    match translator.translate(text, target_lang).await {
        Ok(translated) => {
            cache.map.insert(key, translated.clone());
            Some(translated)
        }
        Err(e) => {
            tracing::debug!(target: "capture", error = %e, "translation failed, keeping original");
            None
        }
    }
}
