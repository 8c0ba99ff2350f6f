//! Cross-page issue detection rules
//!
//! These rules need the complete page set of a finished crawl rather
//! than a single record.

use crate::issues::{Issue, IssueDetail, Severity};
use crate::storage::PageRecord;
use std::collections::{BTreeMap, HashSet};

/// Flags groups of pages sharing the same non-empty title
///
/// Every page in a duplicate group gets its own issue, with the
/// sibling URLs listed in the detail payload. Titles are grouped
/// exactly as stored; pages without a title are never grouped.
pub fn detect_duplicate_titles(pages: &[PageRecord]) -> Vec<Issue> {
    // BTreeMap keeps issue output deterministic across runs
    let mut groups: BTreeMap<&str, Vec<&PageRecord>> = BTreeMap::new();

    for page in pages {
        if !page.is_success() {
            continue;
        }
        if let Some(title) = page.title.as_deref() {
            if !title.is_empty() {
                groups.entry(title).or_default().push(page);
            }
        }
    }

    let mut issues = Vec::new();

    for (title, members) in groups {
        if members.len() < 2 {
            continue;
        }

        for page in &members {
            let shared_with: Vec<String> = members
                .iter()
                .filter(|other| other.id != page.id)
                .map(|other| other.url.clone())
                .collect();

            issues.push(Issue::for_page(
                page.check_id,
                page.id,
                &page.url,
                "duplicate_title",
                Severity::Warning,
                "Duplicate title",
                format!(
                    "{} pages share the title \"{}\"",
                    members.len(),
                    title
                ),
                IssueDetail::DuplicateTitle {
                    title: title.to_string(),
                    shared_with,
                },
            ));
        }
    }

    issues
}

/// Flags pages no other crawled page links to
///
/// Known-noisy heuristic: entry points and pages reached through
/// non-HTML navigation are reported as orphans too. The engine only
/// runs this when `rules.detect-orphan-pages` is enabled.
pub fn detect_orphan_pages(pages: &[PageRecord]) -> Vec<Issue> {
    let mut linked_urls: HashSet<&str> = HashSet::new();

    for page in pages {
        for link in &page.internal_links {
            if link.url != page.url {
                linked_urls.insert(link.url.as_str());
            }
        }
    }

    pages
        .iter()
        .filter(|page| page.is_success())
        .filter(|page| !linked_urls.contains(page.url.as_str()))
        .map(|page| {
            Issue::for_page(
                page.check_id,
                page.id,
                &page.url,
                "orphan_page",
                Severity::Notice,
                "Orphaned page",
                "No other crawled page links to this URL".to_string(),
                IssueDetail::OrphanPage,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageLink, UrlSource};

    fn page(id: i64, url: &str, title: Option<&str>) -> PageRecord {
        PageRecord {
            id,
            check_id: 1,
            url: url.to_string(),
            http_status: 200,
            canonical_url: None,
            title: title.map(|t| t.to_string()),
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
        }
    }

    #[test]
    fn test_duplicate_titles_one_issue_per_group_member() {
        let pages = vec![
            page(1, "https://example.com/a", Some("Shared")),
            page(2, "https://example.com/b", Some("Shared")),
            page(3, "https://example.com/c", Some("Shared")),
            page(4, "https://example.com/d", Some("Unique")),
        ];

        let issues = detect_duplicate_titles(&pages);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.issue_type == "duplicate_title"));

        // Each issue lists the two siblings, not itself
        for issue in &issues {
            let IssueDetail::DuplicateTitle { shared_with, .. } = &issue.detail else {
                panic!("wrong detail variant");
            };
            assert_eq!(shared_with.len(), 2);
            assert!(!shared_with.contains(&issue.url));
        }
    }

    #[test]
    fn test_untitled_pages_never_grouped() {
        let pages = vec![
            page(1, "https://example.com/a", None),
            page(2, "https://example.com/b", None),
            page(3, "https://example.com/c", Some("")),
            page(4, "https://example.com/d", Some("")),
        ];
        assert!(detect_duplicate_titles(&pages).is_empty());
    }

    #[test]
    fn test_error_pages_excluded_from_title_groups() {
        let mut error_page = page(2, "https://example.com/b", Some("Shared"));
        error_page.http_status = 500;

        let pages = vec![page(1, "https://example.com/a", Some("Shared")), error_page];
        assert!(detect_duplicate_titles(&pages).is_empty());
    }

    #[test]
    fn test_orphan_detection() {
        let mut home = page(1, "https://example.com/", Some("Home"));
        home.internal_links = vec![PageLink {
            url: "https://example.com/linked".to_string(),
            anchor_text: "linked".to_string(),
        }];

        let pages = vec![
            home,
            page(2, "https://example.com/linked", Some("Linked")),
            page(3, "https://example.com/orphan", Some("Orphan")),
        ];

        let issues = detect_orphan_pages(&pages);
        let urls: Vec<&str> = issues.iter().map(|i| i.url.as_str()).collect();

        // The home page itself is unlinked too; the heuristic reports
        // it, which is exactly why the rule defaults to off
        assert!(urls.contains(&"https://example.com/orphan"));
        assert!(urls.contains(&"https://example.com/"));
        assert!(!urls.contains(&"https://example.com/linked"));
    }

    #[test]
    fn test_self_links_do_not_rescue_orphans() {
        let mut lonely = page(1, "https://example.com/lonely", Some("Lonely"));
        lonely.internal_links = vec![PageLink {
            url: "https://example.com/lonely".to_string(),
            anchor_text: "me".to_string(),
        }];

        let issues = detect_orphan_pages(&[lonely]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "orphan_page");
    }
}
