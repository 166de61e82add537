// src/normalize.rs
//! Canonical text and link normalization used by dedup keys, scoring
//! haystacks, and the translation cache key.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize text: decode entities, strip HTML, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 2000 chars
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Query parameters that identify a click, not a document.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "igshid", "mc_cid", "mc_eid", "ref", "cmpid", "ocid", "spm", "s_cid",
];

fn is_tracking_param(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    n.starts_with("utm_") || TRACKING_PARAMS.contains(&n.as_str())
}

/// Canonicalize a link for dedup: drop the fragment and known tracking
/// parameters, lowercase scheme+host, keep the remaining query parameters
/// in their original order.
pub fn canonicalize_link(link: &str) -> String {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // Fragment never survives.
    let no_frag = trimmed.split('#').next().unwrap_or(trimmed);

    let (base, query) = match no_frag.split_once('?') {
        Some((b, q)) => (b, Some(q)),
        None => (no_frag, None),
    };

    // Lowercase scheme://host, leave the path untouched.
    let base = match base.find("://") {
        Some(idx) => {
            let after = &base[idx + 3..];
            let host_end = after.find('/').unwrap_or(after.len());
            format!(
                "{}://{}{}",
                base[..idx].to_ascii_lowercase(),
                after[..host_end].to_ascii_lowercase(),
                &after[host_end..]
            )
        }
        None => base.to_string(),
    };

    let kept: Vec<&str> = query
        .map(|q| {
            q.split('&')
                .filter(|pair| {
                    let name = pair.split('=').next().unwrap_or("");
                    !name.is_empty() && !is_tracking_param(name)
                })
                .collect()
        })
        .unwrap_or_default();

    if kept.is_empty() {
        base
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

/// Host part of a link, lowercased. Empty when the link carries no
/// scheme/authority.
pub fn link_host(link: &str) -> String {
    let trimmed = link.trim();
    let rest = match trimmed.find("://") {
        Some(idx) => &trimmed[idx + 3..],
        None => return String::new(),
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    rest[..end].to_ascii_lowercase()
}

/// Normalize a title into a dedup key fragment: lowercase, strip
/// punctuation, collapse whitespace.
pub fn normalize_title_key(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = true;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}
