//! HTTP fetcher implementation
//!
//! One GET per URL, redirects never followed (3xx responses plus their
//! `location` header are audit data), and transport failures collapsed
//! into a sentinel record instead of an error so the crawl loop keeps
//! going.

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};
use url::Url;

/// Raw result of fetching one URL
///
/// `http_status` 0 means the request failed at the transport level
/// (DNS, connect, timeout); the body is empty in that case.
#[derive(Debug)]
pub struct FetchedPage {
    pub http_status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub response_time_ms: u64,
    pub page_size_bytes: u64,
    pub html_size_bytes: u64,
}

impl FetchedPage {
    fn transport_failure(elapsed_ms: u64) -> Self {
        Self {
            http_status: 0,
            headers: Vec::new(),
            body: String::new(),
            response_time_ms: elapsed_ms,
            page_size_bytes: 0,
            html_size_bytes: 0,
        }
    }
}

/// Builds the shared HTTP client
///
/// The user agent identifies the auditor and how to reach its
/// operator. Redirects are handled as data, so the policy is `none`.
/// The timeout bounds each individual fetch independently of the
/// overall crawl.
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a single URL
///
/// Never returns an error: transport failures become a status-0
/// `FetchedPage` with the elapsed time recorded, because a failed
/// fetch is an observation the rest of the pipeline needs, not a
/// reason to stop crawling.
pub async fn fetch_page(client: &Client, url: &Url) -> FetchedPage {
    let started = Instant::now();

    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            if e.is_timeout() {
                tracing::debug!("Fetch timeout for {}", url);
            } else if e.is_connect() {
                tracing::debug!("Connection failure for {}: {}", url, e);
            } else {
                tracing::debug!("Fetch failure for {}: {}", url, e);
            }
            return FetchedPage::transport_failure(elapsed_ms);
        }
    };

    let http_status = response.status().as_u16();

    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Body read failure for {}: {}", url, e);
            return FetchedPage::transport_failure(started.elapsed().as_millis() as u64);
        }
    };

    let response_time_ms = started.elapsed().as_millis() as u64;

    // Name + value + ": " + CRLF per header line
    let header_bytes: u64 = headers
        .iter()
        .map(|(name, value)| (name.len() + value.len() + 4) as u64)
        .sum();
    let html_size_bytes = body.len() as u64;

    FetchedPage {
        http_status,
        headers,
        body,
        response_time_ms,
        page_size_bytes: header_bytes + html_size_bytes,
        html_size_bytes,
    }
}
