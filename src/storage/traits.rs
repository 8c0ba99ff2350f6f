//! Storage traits and error types

use crate::check::CheckStatus;
use crate::issues::{Issue, Severity};
use crate::storage::{CheckRecord, PageRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Check not found: {0}")]
    CheckNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: CheckStatus, to: CheckStatus },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the audit
/// pipeline. The orchestrator serializes access behind a mutex, so
/// implementations do not need interior locking.
pub trait Storage {
    // ===== Check Management =====

    /// Creates a new check in `pending` status and returns its ID
    fn create_check(&mut self, site_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a check by ID
    fn get_check(&self, check_id: i64) -> StorageResult<CheckRecord>;

    /// Transitions a check to `running` and stamps `started_at`
    ///
    /// Fails with `InvalidTransition` unless the check is `pending`.
    fn mark_check_running(&mut self, check_id: i64) -> StorageResult<()>;

    /// Transitions a check to a terminal status and stamps `finished_at`
    ///
    /// `error_message` is recorded for `failed` checks. Fails with
    /// `InvalidTransition` if the check is already terminal or the
    /// target status is not terminal.
    fn finish_check(
        &mut self,
        check_id: i64,
        status: CheckStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Records the outcome of URL discovery on the check row
    fn set_discovery_summary(
        &mut self,
        check_id: i64,
        total_urls_crawlable: u32,
        used_sitemap: bool,
        robots_checked: bool,
    ) -> StorageResult<()>;

    /// Increments `total_urls_crawled` by one
    fn increment_urls_crawled(&mut self, check_id: i64) -> StorageResult<()>;

    /// Writes the cached health score and issue counters
    ///
    /// Called by the score calculator, including out-of-band reruns
    /// on already-finished checks.
    fn update_check_scores(
        &mut self,
        check_id: i64,
        health_score: f64,
        errors_count: u32,
        warnings_count: u32,
        notices_count: u32,
        http_errors_count: u32,
    ) -> StorageResult<()>;

    // ===== Page Management =====

    /// Appends one page record; `page.id` is ignored and the new row
    /// ID returned
    fn insert_page(&mut self, page: &PageRecord) -> StorageResult<i64>;

    /// Reads all page records for a check
    fn get_pages_for_check(&self, check_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Counts page records for a check
    fn count_pages_for_check(&self, check_id: i64) -> StorageResult<u32>;

    /// Drops stored raw markup for all of a check's pages
    ///
    /// Raw markup is only kept while issue detection still needs it.
    fn clear_raw_html(&mut self, check_id: i64) -> StorageResult<()>;

    // ===== Issue Management =====

    /// Deletes all issues belonging to a check
    fn delete_issues_for_check(&mut self, check_id: i64) -> StorageResult<()>;

    /// Inserts a batch of issues; `issue.id` values are ignored
    fn insert_issues(&mut self, issues: &[Issue]) -> StorageResult<()>;

    /// Reads all issues for a check
    fn get_issues_for_check(&self, check_id: i64) -> StorageResult<Vec<Issue>>;

    /// Counts a check's issues with the given severity
    fn count_issues_by_severity(&self, check_id: i64, severity: Severity) -> StorageResult<u32>;
}
