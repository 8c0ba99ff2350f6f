//! Issue detection engine
//!
//! Consumes the full page set of a finished crawl and replaces the
//! check's stored issues with a freshly derived set. Re-running the
//! engine on unchanged pages yields the same issues, because detection
//! deletes before it inserts and never re-fetches.

use crate::config::RulesConfig;
use crate::issues::page_rules::evaluate_page;
use crate::issues::site_rules::{detect_duplicate_titles, detect_orphan_pages};
use crate::storage::{PageRecord, Storage, StorageResult};
use std::collections::HashMap;

/// Issues are bulk-written in chunks of this size
pub const ISSUE_INSERT_BATCH_SIZE: usize = 100;

/// Runs all detection rules for a check and stores the result
///
/// Returns the number of issues written. Idempotent by replacement:
/// existing issues for the check are deleted before the new set is
/// inserted.
pub fn detect_issues(
    storage: &mut dyn Storage,
    check_id: i64,
    rules: &RulesConfig,
) -> StorageResult<usize> {
    let pages = storage.get_pages_for_check(check_id)?;

    let crawled: HashMap<&str, &PageRecord> = pages
        .iter()
        .map(|page| (page.url.as_str(), page))
        .collect();

    let mut issues = Vec::new();

    for page in &pages {
        issues.extend(evaluate_page(page, &crawled));
    }

    issues.extend(detect_duplicate_titles(&pages));

    if rules.detect_orphan_pages {
        issues.extend(detect_orphan_pages(&pages));
    }

    storage.delete_issues_for_check(check_id)?;
    for chunk in issues.chunks(ISSUE_INSERT_BATCH_SIZE) {
        storage.insert_issues(chunk)?;
    }

    Ok(issues.len())
}
