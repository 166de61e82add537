// src/ingest/rss.rs
//! RSS 2.0 / Atom parsing into normalized candidate items, and the live
//! HTTP provider built on it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{CandidateItem, FeedProvider, FeedSource};
use crate::normalize::normalize_text;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}
#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    id: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

fn parse_timestamp(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    // Feeds still emit the obsolete RFC 822 zone names.
    let ts = ts
        .trim()
        .replace(" GMT", " +0000")
        .replace(" UTC", " +0000")
        .replace(" UT", " +0000");
    let parsed = OffsetDateTime::parse(&ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(&ts, &Rfc3339))
        .ok()?;
    chrono::DateTime::from_timestamp(parsed.unix_timestamp(), 0)
}

/// Short digest used by the title+date id fallback.
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

/// Stable id: guid → link → digest of title+date.
fn fallback_id(guid: Option<&str>, link: &str, title: &str, date_raw: Option<&str>) -> String {
    if let Some(g) = guid {
        let g = g.trim();
        if !g.is_empty() {
            return g.to_string();
        }
    }
    if !link.is_empty() {
        return link.to_string();
    }
    digest(&format!("{}|{}", title, date_raw.unwrap_or_default()))
}

fn item_from_rss(it: RssItem) -> Option<CandidateItem> {
    let title = normalize_text(it.title.as_deref().unwrap_or_default());
    let link = it.link.unwrap_or_default().trim().to_string();
    if title.is_empty() && link.is_empty() {
        return None;
    }
    Some(CandidateItem {
        id: fallback_id(it.guid.as_deref(), &link, &title, it.pub_date.as_deref()),
        title,
        link,
        published_at: it.pub_date.as_deref().and_then(parse_timestamp),
        description: normalize_text(it.description.as_deref().unwrap_or_default()),
    })
}

fn item_from_atom(it: AtomEntry) -> Option<CandidateItem> {
    let title = normalize_text(it.title.as_deref().unwrap_or_default());
    let link = it
        .link
        .into_iter()
        .find_map(|l| l.href)
        .unwrap_or_default()
        .trim()
        .to_string();
    if title.is_empty() && link.is_empty() {
        return None;
    }
    let date_raw = it.published.or(it.updated);
    Some(CandidateItem {
        id: fallback_id(it.id.as_deref(), &link, &title, date_raw.as_deref()),
        title,
        link,
        published_at: date_raw.as_deref().and_then(parse_timestamp),
        description: normalize_text(
            it.summary
                .as_deref()
                .or(it.content.as_deref())
                .unwrap_or_default(),
        ),
    })
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse an RSS or Atom document into candidate items.
pub fn parse_feed(xml: &str) -> Result<Vec<CandidateItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let items: Vec<CandidateItem> = if let Ok(rss) = from_str::<Rss>(&xml_clean) {
        rss.channel.item.into_iter().filter_map(item_from_rss).collect()
    } else {
        let atom: AtomFeed = from_str(&xml_clean).context("parsing feed xml (rss and atom)")?;
        atom.entry.into_iter().filter_map(item_from_atom).collect()
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("capture_parse_ms").record(ms);
    counter!("capture_items_parsed_total").increment(items.len() as u64);
    Ok(items)
}

/// Live provider: fetches `source.url` over HTTP and parses the body.
pub struct HttpFeedProvider {
    client: reqwest::Client,
}

impl HttpFeedProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFeedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedProvider for HttpFeedProvider {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<CandidateItem>> {
        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("GET {}", source.url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned {}", source.url, status));
        }
        let body = resp.text().await.context("reading feed body")?;
        parse_feed(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_FIXTURE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>AI Weekly</title>
  <item>
    <title>Local &nbsp;models keep improving</title>
    <link>https://ai.example.com/news/2026/03/local-models</link>
    <guid>ai-001</guid>
    <pubDate>Sun, 01 Mar 2026 08:30:00 GMT</pubDate>
    <description><![CDATA[<p>Offline <b>inference</b> matures.</p>]]></description>
  </item>
  <item>
    <title>Untitled link only</title>
    <link>https://ai.example.com/2</link>
    <pubDate>not a date</pubDate>
  </item>
</channel></rss>"#;

    const ATOM_FIXTURE: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Climate Feed</title>
  <entry>
    <title>Carbon levels update</title>
    <id>urn:climate:1</id>
    <link href="https://cl.example.com/article/1"/>
    <published>2026-03-01T06:00:00Z</published>
    <summary>Emissions data for February.</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_with_guid_and_date() {
        let items = parse_feed(RSS_FIXTURE).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "ai-001");
        assert_eq!(items[0].title, "Local models keep improving");
        assert_eq!(items[0].description, "Offline inference matures.");
        assert!(items[0].published_at.is_some());
        // unparseable date → None, id falls back to the link
        assert!(items[1].published_at.is_none());
        assert_eq!(items[1].id, "https://ai.example.com/2");
    }

    #[test]
    fn parses_atom_entries() {
        let items = parse_feed(ATOM_FIXTURE).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "urn:climate:1");
        assert_eq!(items[0].link, "https://cl.example.com/article/1");
        assert!(items[0].published_at.is_some());
        assert_eq!(items[0].description, "Emissions data for February.");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_feed("this is not xml").is_err());
    }

    #[test]
    fn title_date_digest_when_no_guid_or_link() {
        let id = fallback_id(None, "", "Some title", Some("Sun, 01 Mar 2026 08:30:00 GMT"));
        assert_eq!(id.len(), 16);
        assert_eq!(
            id,
            fallback_id(None, "", "Some title", Some("Sun, 01 Mar 2026 08:30:00 GMT"))
        );
    }
}
