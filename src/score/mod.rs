//! Health score calculation
//!
//! Reduces a check's stored pages and issues into a single 0..100
//! score plus cached issue counters. The calculator reads only stored
//! rows, so it can be re-run at any time after a crawl completes,
//! including as a standalone maintenance operation.

use crate::issues::Severity;
use crate::storage::{Storage, StorageResult};
use std::collections::{HashMap, HashSet};

/// Aggregates written back to the check row
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSummary {
    pub health_score: f64,
    pub errors_count: u32,
    pub warnings_count: u32,
    pub notices_count: u32,
    pub http_errors_count: u32,
}

/// Recomputes and caches the health score and issue counters
///
/// The score is `100 * (crawled - errorAffected) / crawled`, clamped
/// to [0, 100] and rounded to two decimals; zero crawled URLs score
/// 0. `errorAffected` counts distinct URLs that either returned an
/// HTTP error status or carry at least one error-severity issue on a
/// non-error status (so HTTP errors are not double counted).
pub fn recompute_health_score(
    storage: &mut dyn Storage,
    check_id: i64,
) -> StorageResult<HealthSummary> {
    let pages = storage.get_pages_for_check(check_id)?;
    let issues = storage.get_issues_for_check(check_id)?;

    let crawled = pages.len();

    let mut status_by_url: HashMap<&str, u16> = HashMap::new();
    let mut http_error_urls: HashSet<&str> = HashSet::new();
    for page in &pages {
        status_by_url.entry(page.url.as_str()).or_insert(page.http_status);
        if page.is_error() {
            http_error_urls.insert(page.url.as_str());
        }
    }

    let mut issue_error_urls: HashSet<&str> = HashSet::new();
    let mut errors_count = 0u32;
    let mut warnings_count = 0u32;
    let mut notices_count = 0u32;

    for issue in &issues {
        match issue.severity {
            Severity::Error => {
                errors_count += 1;
                // Only count URLs whose own fetch was not already an
                // HTTP error
                if let Some(&status) = status_by_url.get(issue.url.as_str()) {
                    if status < 400 {
                        issue_error_urls.insert(issue.url.as_str());
                    }
                }
            }
            Severity::Warning => warnings_count += 1,
            Severity::Notice => notices_count += 1,
        }
    }

    let error_affected = http_error_urls.len() + issue_error_urls.len();
    let health_score = compute_score(crawled, error_affected);
    let http_errors_count = http_error_urls.len() as u32;

    storage.update_check_scores(
        check_id,
        health_score,
        errors_count,
        warnings_count,
        notices_count,
        http_errors_count,
    )?;

    Ok(HealthSummary {
        health_score,
        errors_count,
        warnings_count,
        notices_count,
        http_errors_count,
    })
}

/// The raw score arithmetic, clamped and rounded
///
/// `error_affected` can exceed `crawled` when cross-page rules pile
/// onto a small crawl; the clamp keeps the score at zero instead of
/// going negative.
fn compute_score(crawled: usize, error_affected: usize) -> f64 {
    if crawled == 0 {
        return 0.0;
    }

    let raw = 100.0 * (crawled as f64 - error_affected as f64) / crawled as f64;
    let clamped = raw.clamp(0.0, 100.0);
    (clamped * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{Issue, IssueDetail};
    use crate::storage::{PageRecord, SqliteStorage, UrlSource};

    fn insert_page(storage: &mut SqliteStorage, check_id: i64, url: &str, status: u16) -> i64 {
        let page = PageRecord {
            id: 0,
            check_id,
            url: url.to_string(),
            http_status: status,
            canonical_url: None,
            title: None,
            meta_description: None,
            h1s: vec![],
            internal_links: vec![],
            external_links: vec![],
            images_total: 0,
            images_missing_alt: 0,
            mixed_content_urls: vec![],
            response_headers: vec![],
            response_time_ms: 0,
            page_size_bytes: 0,
            html_size_bytes: 0,
            raw_html: None,
            robots_allowed: true,
            source: UrlSource::Sitemap,
            fetched_at: String::new(),
        };
        storage.insert_page(&page).unwrap()
    }

    fn insert_issue(
        storage: &mut SqliteStorage,
        check_id: i64,
        page_id: i64,
        url: &str,
        severity: Severity,
    ) {
        let issue = Issue::for_page(
            check_id,
            page_id,
            url,
            "missing_title",
            severity,
            "Missing title",
            "no title".to_string(),
            IssueDetail::None,
        );
        storage.insert_issues(&[issue]).unwrap();
    }

    #[test]
    fn test_compute_score_basics() {
        assert_eq!(compute_score(0, 0), 0.0);
        assert_eq!(compute_score(10, 0), 100.0);
        assert_eq!(compute_score(10, 2), 80.0);
        assert_eq!(compute_score(1, 1), 0.0);
    }

    #[test]
    fn test_compute_score_clamps_negative() {
        // Cross-page rules can push error-affected past crawled
        assert_eq!(compute_score(2, 5), 0.0);
    }

    #[test]
    fn test_compute_score_rounds_two_decimals() {
        // 100 * 2/3 = 66.666...
        assert_eq!(compute_score(3, 1), 66.67);
        // 100 * 6/7 = 85.714...
        assert_eq!(compute_score(7, 1), 85.71);
    }

    #[test]
    fn test_http_errors_counted_once() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let check_id = storage.create_check("https://example.com", "h").unwrap();

        for i in 0..8 {
            insert_page(
                &mut storage,
                check_id,
                &format!("https://example.com/ok-{}", i),
                200,
            );
        }
        insert_page(&mut storage, check_id, "https://example.com/gone-1", 404);
        insert_page(&mut storage, check_id, "https://example.com/gone-2", 404);

        let summary = recompute_health_score(&mut storage, check_id).unwrap();
        assert_eq!(summary.http_errors_count, 2);
        assert_eq!(summary.health_score, 80.0);

        let check = storage.get_check(check_id).unwrap();
        assert_eq!(check.health_score, Some(80.0));
        assert_eq!(check.http_errors_count, 2);
    }

    #[test]
    fn test_error_issue_on_http_error_page_not_double_counted() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let check_id = storage.create_check("https://example.com", "h").unwrap();

        let ok_id = insert_page(&mut storage, check_id, "https://example.com/ok", 200);
        let gone_id = insert_page(&mut storage, check_id, "https://example.com/gone", 404);

        // Error issue on the 404 URL must not count that URL twice
        insert_issue(
            &mut storage,
            check_id,
            gone_id,
            "https://example.com/gone",
            Severity::Error,
        );
        let summary = recompute_health_score(&mut storage, check_id).unwrap();
        assert_eq!(summary.health_score, 50.0);

        // An error issue on the healthy URL drops the score to zero
        insert_issue(
            &mut storage,
            check_id,
            ok_id,
            "https://example.com/ok",
            Severity::Error,
        );
        let summary = recompute_health_score(&mut storage, check_id).unwrap();
        assert_eq!(summary.health_score, 0.0);
        assert_eq!(summary.errors_count, 2);
    }

    #[test]
    fn test_severity_counters() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let check_id = storage.create_check("https://example.com", "h").unwrap();
        let page_id = insert_page(&mut storage, check_id, "https://example.com/", 200);

        insert_issue(
            &mut storage,
            check_id,
            page_id,
            "https://example.com/",
            Severity::Warning,
        );
        insert_issue(
            &mut storage,
            check_id,
            page_id,
            "https://example.com/",
            Severity::Notice,
        );
        insert_issue(
            &mut storage,
            check_id,
            page_id,
            "https://example.com/",
            Severity::Notice,
        );

        let summary = recompute_health_score(&mut storage, check_id).unwrap();
        assert_eq!(summary.errors_count, 0);
        assert_eq!(summary.warnings_count, 1);
        assert_eq!(summary.notices_count, 2);
        // Warnings and notices do not reduce the score
        assert_eq!(summary.health_score, 100.0);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let check_id = storage.create_check("https://example.com", "h").unwrap();
        insert_page(&mut storage, check_id, "https://example.com/", 404);

        let first = recompute_health_score(&mut storage, check_id).unwrap();
        let second = recompute_health_score(&mut storage, check_id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.health_score, 0.0);
    }

    #[test]
    fn test_empty_crawl_scores_zero() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let check_id = storage.create_check("https://example.com", "h").unwrap();

        let summary = recompute_health_score(&mut storage, check_id).unwrap();
        assert_eq!(summary.health_score, 0.0);
        assert_eq!(summary.http_errors_count, 0);
    }

    #[test]
    fn test_transport_failures_are_not_http_errors() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let check_id = storage.create_check("https://example.com", "h").unwrap();
        insert_page(&mut storage, check_id, "https://example.com/ok", 200);
        insert_page(&mut storage, check_id, "https://example.com/dead", 0);

        let summary = recompute_health_score(&mut storage, check_id).unwrap();
        // Status 0 never reached the server; it is not in [400, 600)
        assert_eq!(summary.http_errors_count, 0);
        assert_eq!(summary.health_score, 100.0);
    }
}
