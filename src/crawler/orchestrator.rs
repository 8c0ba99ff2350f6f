//! Audit orchestration
//!
//! The `Auditor` owns a check's lifecycle: it creates the check row,
//! resolves the crawl set once, drives fetch and extraction over the
//! URL list with a bounded worker pool, and hands the finished page
//! set to issue detection and scoring. Issue detection never starts
//! until the crawl loop has fully drained; that ordering is a
//! correctness requirement, not an optimization.

use crate::check::CheckStatus;
use crate::config::Config;
use crate::crawler::extractor::extract_content;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchedPage};
use crate::discovery::{resolve_crawl_set, DiscoveredUrl};
use crate::issues::detect_issues;
use crate::score::recompute_health_score;
use crate::storage::{CheckRecord, PageRecord, SqliteStorage, Storage};
use crate::{AuditError, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Drives audit checks end to end
pub struct Auditor {
    config: Arc<Config>,
    config_hash: String,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    cancel: Arc<AtomicBool>,
}

impl Auditor {
    /// Creates an auditor backed by the configured database file
    pub fn new(config: Config, config_hash: &str) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, config_hash, storage)
    }

    /// Creates an auditor over an existing storage handle
    ///
    /// Tests use this with `SqliteStorage::in_memory()`.
    pub fn with_storage(
        config: Config,
        config_hash: &str,
        storage: SqliteStorage,
    ) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.audit.fetch_timeout_secs)?;
        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.to_string(),
            storage: Arc::new(Mutex::new(storage)),
            client,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for requesting cooperative cancellation from outside
    ///
    /// Setting the flag aborts the crawl at the next loop iteration;
    /// pages already persisted are kept and the check ends `failed`.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Starts a new check for a site and runs the pipeline to a
    /// terminal state
    ///
    /// Always returns the check ID once the row exists; pipeline
    /// failures are recorded on the check (`failed` status plus error
    /// message) rather than propagated, so a started check is never
    /// silently dropped.
    pub async fn start_check(&self, site_url: &str) -> Result<i64> {
        let root = parse_site_url(site_url)?;

        let check_id = {
            let mut storage = self.storage.lock().unwrap();
            let check_id = storage.create_check(site_url, &self.config_hash)?;
            storage.mark_check_running(check_id)?;
            check_id
        };

        tracing::info!("Check {} started for {}", check_id, site_url);

        match self.run_pipeline(check_id, &root).await {
            Ok(()) => {
                tracing::info!("Check {} completed", check_id);
            }
            Err(e) => {
                tracing::error!("Check {} failed: {}", check_id, e);
                let mut storage = self.storage.lock().unwrap();
                if let Err(finish_err) =
                    storage.finish_check(check_id, CheckStatus::Failed, Some(&e.to_string()))
                {
                    tracing::error!(
                        "Could not record failure for check {}: {}",
                        check_id,
                        finish_err
                    );
                }
            }
        }

        Ok(check_id)
    }

    /// Reads the current state of a check
    pub fn check_status(&self, check_id: i64) -> Result<CheckRecord> {
        let storage = self.storage.lock().unwrap();
        Ok(storage.get_check(check_id)?)
    }

    /// Recomputes the cached health score and issue counters
    ///
    /// Standalone maintenance entry point; safe to call repeatedly
    /// and out-of-band from crawling.
    pub fn recompute_health_score(&self, check_id: i64) -> Result<()> {
        let mut storage = self.storage.lock().unwrap();
        recompute_health_score(&mut *storage, check_id)?;
        Ok(())
    }

    /// Runs discovery, the crawl loop, detection, and scoring
    async fn run_pipeline(&self, check_id: i64, root: &Url) -> Result<()> {
        let crawl_set =
            resolve_crawl_set(&self.client, root, self.config.audit.max_urls as usize).await;

        {
            let mut storage = self.storage.lock().unwrap();
            storage.set_discovery_summary(
                check_id,
                crawl_set.urls.len() as u32,
                crawl_set.used_sitemap,
                crawl_set.robots_checked,
            )?;
        }

        self.crawl(check_id, crawl_set.urls).await?;

        {
            let mut storage = self.storage.lock().unwrap();
            storage.finish_check(check_id, CheckStatus::Completed, None)?;
        }

        // The crawl loop has drained; the page set is complete and
        // detection may run.
        {
            let mut storage = self.storage.lock().unwrap();
            let issue_count = detect_issues(&mut *storage, check_id, &self.config.rules)?;
            tracing::info!("Check {}: {} issues detected", check_id, issue_count);

            recompute_health_score(&mut *storage, check_id)?;

            // Raw markup was only kept for detection
            storage.clear_raw_html(check_id)?;
        }

        Ok(())
    }

    /// Fetches every discovered URL through a bounded worker pool
    ///
    /// Each completed fetch (including transport failures) persists
    /// one page record and bumps the crawled counter. Record inserts
    /// happen on this task, serialized behind the storage mutex.
    async fn crawl(&self, check_id: i64, urls: Vec<DiscoveredUrl>) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(
            self.config.audit.max_concurrent_fetches as usize,
        ));
        let mut join_set: JoinSet<(DiscoveredUrl, FetchedPage)> = JoinSet::new();

        for discovered in urls {
            if self.cancel.load(Ordering::Relaxed) {
                join_set.abort_all();
                return Err(AuditError::Aborted("cancelled during crawl".to_string()));
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AuditError::Crawl(e.to_string()))?;
            let client = self.client.clone();

            join_set.spawn(async move {
                let fetched = fetch_page(&client, &discovered.url).await;
                drop(permit);
                (discovered, fetched)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if self.cancel.load(Ordering::Relaxed) {
                join_set.abort_all();
                return Err(AuditError::Aborted("cancelled during crawl".to_string()));
            }

            let (discovered, fetched) = joined.map_err(|e| AuditError::Crawl(e.to_string()))?;
            tracing::debug!(
                "Fetched {} ({} in {}ms)",
                discovered.url,
                fetched.http_status,
                fetched.response_time_ms
            );

            let page = build_page_record(check_id, &discovered, fetched);
            let mut storage = self.storage.lock().unwrap();
            storage.insert_page(&page)?;
            storage.increment_urls_crawled(check_id)?;
        }

        Ok(())
    }
}

/// Validates and parses the audit target URL
fn parse_site_url(site_url: &str) -> Result<Url> {
    let url = Url::parse(site_url)
        .map_err(|_| AuditError::InvalidSiteUrl(site_url.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AuditError::InvalidSiteUrl(site_url.to_string()));
    }

    Ok(url)
}

/// Turns a fetch result into an unsaved page record
///
/// Markup is parsed for 2xx responses only; everything else keeps the
/// transport-level observations and empty content fields.
fn build_page_record(
    check_id: i64,
    discovered: &DiscoveredUrl,
    fetched: FetchedPage,
) -> PageRecord {
    let mut page = PageRecord {
        id: 0,
        check_id,
        url: discovered.url.as_str().to_string(),
        http_status: fetched.http_status,
        canonical_url: None,
        title: None,
        meta_description: None,
        h1s: Vec::new(),
        internal_links: Vec::new(),
        external_links: Vec::new(),
        images_total: 0,
        images_missing_alt: 0,
        mixed_content_urls: Vec::new(),
        response_headers: fetched.headers,
        response_time_ms: fetched.response_time_ms,
        page_size_bytes: fetched.page_size_bytes,
        html_size_bytes: fetched.html_size_bytes,
        raw_html: None,
        robots_allowed: true,
        source: discovered.source,
        fetched_at: String::new(),
    };

    if (200..300).contains(&fetched.http_status) {
        let content = extract_content(&fetched.body, &discovered.url);
        page.canonical_url = content.canonical_url;
        page.title = content.title;
        page.meta_description = content.meta_description;
        page.h1s = content.h1s;
        page.internal_links = content.internal_links;
        page.external_links = content.external_links;
        page.images_total = content.images_total;
        page.images_missing_alt = content.images_missing_alt;
        page.mixed_content_urls = content.mixed_content_urls;
        page.raw_html = Some(fetched.body);
    }

    page
}
