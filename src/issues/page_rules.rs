//! Per-page issue detection rules
//!
//! Each rule is evaluated independently against one page record. The
//! redirect-loop rule applies to 3xx records; every other rule
//! presupposes a parsed 2xx page and is skipped otherwise. Two rules
//! (broken internal links, broken canonical) consult the statuses of
//! other crawled pages through a URL index, but still emit against
//! the page under evaluation.

use crate::issues::{Issue, IssueDetail, Severity};
use crate::storage::PageRecord;
use std::collections::{HashMap, HashSet};

/// Recommended title length band, in bytes
pub const TITLE_MIN_LEN: usize = 30;
pub const TITLE_MAX_LEN: usize = 60;

/// Response time above which a page is flagged slow
pub const SLOW_RESPONSE_THRESHOLD_MS: u64 = 1000;

/// Internal link count band; both extremes are flagged
pub const INTERNAL_LINKS_MIN: usize = 3;
pub const INTERNAL_LINKS_MAX: usize = 100;

/// Evaluates all per-page rules for one page record
///
/// `crawled` indexes every page of the check by URL so link-target
/// statuses can be looked up.
pub fn evaluate_page(
    page: &PageRecord,
    crawled: &HashMap<&str, &PageRecord>,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    if page.is_redirect() {
        check_redirect_loop(page, &mut issues);
        return issues;
    }

    if !page.is_success() {
        return issues;
    }

    check_title(page, &mut issues);
    check_meta_description(page, &mut issues);
    check_h1s(page, &mut issues);
    check_response_time(page, &mut issues);
    check_image_alt(page, &mut issues);
    check_internal_link_count(page, &mut issues);
    check_broken_internal_links(page, crawled, &mut issues);
    check_canonical(page, crawled, &mut issues);
    check_mixed_content(page, &mut issues);
    check_https(page, &mut issues);

    issues
}

fn check_redirect_loop(page: &PageRecord, issues: &mut Vec<Issue>) {
    let Some(location) = page.redirect_location() else {
        return;
    };

    // A relative location still loops if it resolves back to the page
    let resolved = url::Url::parse(&page.url)
        .ok()
        .and_then(|base| base.join(location).ok())
        .map(|u| u.as_str().to_string())
        .unwrap_or_else(|| location.to_string());

    if resolved == page.url {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "redirect_loop",
            Severity::Error,
            "Redirect loop",
            "The page redirects to itself via its location header".to_string(),
            IssueDetail::RedirectLoop {
                location: location.to_string(),
            },
        ));
    }
}

fn check_title(page: &PageRecord, issues: &mut Vec<Issue>) {
    match &page.title {
        None => {
            issues.push(Issue::for_page(
                page.check_id,
                page.id,
                &page.url,
                "missing_title",
                Severity::Error,
                "Missing title",
                "The page has no <title> element".to_string(),
                IssueDetail::None,
            ));
        }
        Some(title) if title.len() < TITLE_MIN_LEN => {
            issues.push(Issue::for_page(
                page.check_id,
                page.id,
                &page.url,
                "title_too_short",
                Severity::Notice,
                "Title too short",
                format!(
                    "The title is {} characters; {} to {} is recommended",
                    title.len(),
                    TITLE_MIN_LEN,
                    TITLE_MAX_LEN
                ),
                IssueDetail::TitleLength { length: title.len() },
            ));
        }
        Some(title) if title.len() > TITLE_MAX_LEN => {
            issues.push(Issue::for_page(
                page.check_id,
                page.id,
                &page.url,
                "title_too_long",
                Severity::Notice,
                "Title too long",
                format!(
                    "The title is {} characters; {} to {} is recommended",
                    title.len(),
                    TITLE_MIN_LEN,
                    TITLE_MAX_LEN
                ),
                IssueDetail::TitleLength { length: title.len() },
            ));
        }
        Some(_) => {}
    }
}

fn check_meta_description(page: &PageRecord, issues: &mut Vec<Issue>) {
    if page.meta_description.is_none() {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "missing_meta_description",
            Severity::Warning,
            "Missing meta description",
            "The page has no meta description".to_string(),
            IssueDetail::None,
        ));
    }
}

fn check_h1s(page: &PageRecord, issues: &mut Vec<Issue>) {
    match page.h1s.len() {
        0 => issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "missing_h1",
            Severity::Warning,
            "Missing H1 heading",
            "The page has no <h1> element".to_string(),
            IssueDetail::None,
        )),
        1 => {}
        count => issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "multiple_h1",
            Severity::Warning,
            "Multiple H1 headings",
            format!("The page has {} <h1> elements; one is expected", count),
            IssueDetail::H1Count { count },
        )),
    }
}

fn check_response_time(page: &PageRecord, issues: &mut Vec<Issue>) {
    if page.response_time_ms > SLOW_RESPONSE_THRESHOLD_MS {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "slow_response",
            Severity::Warning,
            "Slow response",
            format!(
                "The page responded in {}ms (threshold {}ms)",
                page.response_time_ms, SLOW_RESPONSE_THRESHOLD_MS
            ),
            IssueDetail::SlowResponse {
                response_time_ms: page.response_time_ms,
                threshold_ms: SLOW_RESPONSE_THRESHOLD_MS,
            },
        ));
    }
}

fn check_image_alt(page: &PageRecord, issues: &mut Vec<Issue>) {
    if page.images_missing_alt > 0 {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "missing_alt_text",
            Severity::Notice,
            "Images missing alt text",
            format!(
                "{} of {} images have no alt attribute",
                page.images_missing_alt, page.images_total
            ),
            IssueDetail::MissingAltText {
                images_missing_alt: page.images_missing_alt,
                images_total: page.images_total,
            },
        ));
    }
}

fn check_internal_link_count(page: &PageRecord, issues: &mut Vec<Issue>) {
    let count = page.internal_links.len();

    if count < INTERNAL_LINKS_MIN {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "low_internal_links",
            Severity::Notice,
            "Few internal links",
            format!(
                "The page has {} internal links; poorly linked pages are hard to discover",
                count
            ),
            IssueDetail::InternalLinkCount { count },
        ));
    } else if count > INTERNAL_LINKS_MAX {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "excessive_internal_links",
            Severity::Notice,
            "Excessive internal links",
            format!(
                "The page has {} internal links; link equity is spread thin",
                count
            ),
            IssueDetail::InternalLinkCount { count },
        ));
    }
}

fn check_broken_internal_links(
    page: &PageRecord,
    crawled: &HashMap<&str, &PageRecord>,
    issues: &mut Vec<Issue>,
) {
    // One issue per distinct broken target, not per anchor occurrence
    let mut reported: HashSet<&str> = HashSet::new();

    for link in &page.internal_links {
        if !reported.insert(link.url.as_str()) {
            continue;
        }
        let Some(target) = crawled.get(link.url.as_str()) else {
            continue;
        };
        if target.is_error() {
            issues.push(Issue::for_page(
                page.check_id,
                page.id,
                &page.url,
                "broken_internal_link",
                Severity::Error,
                "Broken internal link",
                format!(
                    "The page links to {} which returned HTTP {}",
                    link.url, target.http_status
                ),
                IssueDetail::BrokenLink {
                    target_url: link.url.clone(),
                    status: target.http_status,
                },
            ));
        }
    }
}

fn check_canonical(
    page: &PageRecord,
    crawled: &HashMap<&str, &PageRecord>,
    issues: &mut Vec<Issue>,
) {
    let Some(canonical) = &page.canonical_url else {
        return;
    };
    let Some(target) = crawled.get(canonical.as_str()) else {
        return;
    };

    if !target.is_success() {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "broken_canonical",
            Severity::Error,
            "Canonical URL not reachable",
            format!(
                "The canonical URL {} returned HTTP {}",
                canonical, target.http_status
            ),
            IssueDetail::BrokenCanonical {
                canonical_url: canonical.clone(),
                status: target.http_status,
            },
        ));
    }
}

fn check_mixed_content(page: &PageRecord, issues: &mut Vec<Issue>) {
    if !page.mixed_content_urls.is_empty() {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "mixed_content",
            Severity::Error,
            "Mixed content",
            format!(
                "This HTTPS page loads {} resources over plain HTTP",
                page.mixed_content_urls.len()
            ),
            IssueDetail::MixedContent {
                resources: page.mixed_content_urls.clone(),
            },
        ));
    }
}

fn check_https(page: &PageRecord, issues: &mut Vec<Issue>) {
    if page.url.starts_with("http://") {
        issues.push(Issue::for_page(
            page.check_id,
            page.id,
            &page.url,
            "no_https",
            Severity::Error,
            "Served over plain HTTP",
            "The page is served over HTTP without redirecting to HTTPS".to_string(),
            IssueDetail::None,
        ));
    }
}
