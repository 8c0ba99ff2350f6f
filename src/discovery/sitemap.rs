//! Sitemap fetching and parsing
//!
//! Sitemap documents are parsed with the `sitemap` crate. A document
//! can be a plain URL set or a sitemap index pointing at child
//! sitemaps; indexes are expanded breadth-first with a visited set, so
//! self-referencing or cyclic indexes terminate.

use reqwest::Client;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::collections::HashSet;
use std::io::Cursor;

/// Upper bound on sitemap documents fetched per check. Guards against
/// pathological indexes; normal sites use a handful.
const MAX_SITEMAP_FETCHES: usize = 50;

/// URLs and nested sitemap references from one sitemap document
#[derive(Debug, Default)]
pub struct ParsedSitemap {
    pub urls: Vec<String>,
    pub nested: Vec<String>,
}

/// Parses one sitemap XML document
///
/// Malformed XML degrades to an empty result; discovery fails open.
pub fn parse_sitemap_xml(xml: &[u8]) -> ParsedSitemap {
    let mut parsed = ParsedSitemap::default();
    let reader = SiteMapReader::new(Cursor::new(xml));

    for entity in reader {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.nested.push(url.to_string());
                }
            }
            _ => {}
        }
    }

    parsed
}

/// Fetches a sitemap document, returning the body only on HTTP 200
async fn fetch_sitemap(client: &Client, url: &str) -> Option<Vec<u8>> {
    let response = client.get(url).send().await.ok()?;
    if response.status().as_u16() != 200 {
        return None;
    }
    response.bytes().await.ok().map(|b| b.to_vec())
}

/// Expands one sitemap candidate into page URLs
///
/// Index entries are followed through a worklist with a visited set;
/// revisits and fetch failures are skipped.
pub async fn expand_sitemap(client: &Client, candidate: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut worklist = vec![candidate.to_string()];
    let mut fetches = 0;

    while let Some(sitemap_url) = worklist.pop() {
        if !visited.insert(sitemap_url.clone()) {
            continue;
        }
        if fetches >= MAX_SITEMAP_FETCHES {
            tracing::warn!(
                "Sitemap fetch budget exhausted after {} documents",
                fetches
            );
            break;
        }
        fetches += 1;

        let Some(xml) = fetch_sitemap(client, &sitemap_url).await else {
            tracing::debug!("Sitemap not available: {}", sitemap_url);
            continue;
        };

        let parsed = parse_sitemap_xml(&xml);
        tracing::debug!(
            "Sitemap {}: {} URLs, {} nested sitemaps",
            sitemap_url,
            parsed.urls.len(),
            parsed.nested.len()
        );

        for url in parsed.urls {
            if seen_urls.insert(url.clone()) {
                urls.push(url);
            }
        }
        for nested in parsed.nested {
            worklist.push(nested);
        }
    }

    urls
}

/// Tries sitemap candidates in order; the first that yields any URLs
/// wins
pub async fn collect_from_candidates(client: &Client, candidates: &[String]) -> Vec<String> {
    for candidate in candidates {
        let urls = expand_sitemap(client, candidate).await;
        if !urls.is_empty() {
            tracing::info!("Using sitemap {} ({} URLs)", candidate, urls.len());
            return urls;
        }
    }
    Vec::new()
}
