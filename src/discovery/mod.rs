//! URL discovery: robots.txt resolution and sitemap expansion
//!
//! Discovery turns a site's root URL into the bounded, deduplicated,
//! robots-filtered list of URLs a check will crawl. Every failure mode
//! here fails open: a missing robots.txt allows everything, a missing
//! sitemap falls back to crawling the root URL alone.

mod robots;
mod sitemap;

pub use robots::{match_target, RobotsRules};
pub use sitemap::{collect_from_candidates, expand_sitemap, parse_sitemap_xml};

use crate::storage::UrlSource;
use reqwest::Client;
use std::collections::HashSet;
use url::Url;

/// Well-known sitemap locations probed before robots-declared ones
const SITEMAP_CANDIDATE_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemaps.xml"];

/// One URL selected for crawling
#[derive(Debug, Clone)]
pub struct DiscoveredUrl {
    pub url: Url,
    pub source: UrlSource,
}

/// The resolved crawl set for one check
#[derive(Debug)]
pub struct CrawlSet {
    pub urls: Vec<DiscoveredUrl>,
    pub used_sitemap: bool,
    pub robots_checked: bool,
}

/// Resolves the crawl set for a site
///
/// Fetches and parses robots.txt (fail open), probes sitemap
/// candidates in order, expands sitemap indexes, filters everything
/// through the robots rules, deduplicates, and truncates to
/// `max_urls`. With no usable sitemap the set is the root URL alone;
/// if even the root is disallowed the set is empty.
pub async fn resolve_crawl_set(client: &Client, root_url: &Url, max_urls: usize) -> CrawlSet {
    let origin = root_url.origin().ascii_serialization();

    // Fetch robots.txt; absence or failure means allow-all
    let robots_url = format!("{}/robots.txt", origin);
    let (rules, robots_checked) = match fetch_robots(client, &robots_url).await {
        Some(content) => (RobotsRules::parse(&content), true),
        None => {
            tracing::debug!("No robots.txt at {}, allowing all", robots_url);
            (RobotsRules::allow_all(), false)
        }
    };

    // Probe well-known sitemap paths first, then robots declarations
    let mut candidates: Vec<String> = SITEMAP_CANDIDATE_PATHS
        .iter()
        .map(|path| format!("{}{}", origin, path))
        .collect();
    candidates.extend(rules.sitemaps().iter().cloned());

    let sitemap_urls = collect_from_candidates(client, &candidates).await;
    let used_sitemap = !sitemap_urls.is_empty();

    let mut urls = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if used_sitemap {
        for raw in sitemap_urls {
            let Ok(url) = Url::parse(&raw) else {
                tracing::debug!("Skipping unparseable sitemap URL: {}", raw);
                continue;
            };
            if !rules.is_url_allowed(&url) {
                continue;
            }
            if seen.insert(url.as_str().to_string()) {
                urls.push(DiscoveredUrl {
                    url,
                    source: UrlSource::Sitemap,
                });
            }
            if urls.len() >= max_urls {
                break;
            }
        }
    } else if rules.is_url_allowed(root_url) {
        urls.push(DiscoveredUrl {
            url: root_url.clone(),
            source: UrlSource::Discovery,
        });
    }

    tracing::info!(
        "Discovery for {}: {} crawlable URLs (sitemap: {}, robots: {})",
        root_url,
        urls.len(),
        used_sitemap,
        robots_checked
    );

    CrawlSet {
        urls,
        used_sitemap,
        robots_checked,
    }
}

async fn fetch_robots(client: &Client, robots_url: &str) -> Option<String> {
    let response = client.get(robots_url).send().await.ok()?;
    if response.status().as_u16() != 200 {
        return None;
    }
    response.text().await.ok()
}
