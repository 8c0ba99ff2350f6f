//! SQLite storage implementation

use crate::check::CheckStatus;
use crate::issues::{Issue, IssueDetail, Severity};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CheckRecord, PageRecord, UrlSource};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// Decodes a JSON text column inside a row-mapping closure
fn decode_json<T: serde::de::DeserializeOwned>(idx: usize, text: String) -> rusqlite::Result<T> {
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn encode_json<T: serde::Serialize>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

impl SqliteStorage {
    /// Opens or creates a database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (used by tests)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn check_from_row(row: &Row) -> rusqlite::Result<CheckRecord> {
        Ok(CheckRecord {
            id: row.get(0)?,
            site_url: row.get(1)?,
            status: CheckStatus::from_db_string(&row.get::<_, String>(2)?)
                .unwrap_or(CheckStatus::Failed),
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            total_urls_crawled: row.get(5)?,
            total_urls_crawlable: row.get(6)?,
            used_sitemap: row.get(7)?,
            robots_checked: row.get(8)?,
            errors_count: row.get(9)?,
            warnings_count: row.get(10)?,
            notices_count: row.get(11)?,
            http_errors_count: row.get(12)?,
            health_score: row.get(13)?,
            error_message: row.get(14)?,
            config_hash: row.get(15)?,
            created_at: row.get(16)?,
        })
    }

    fn page_from_row(row: &Row) -> rusqlite::Result<PageRecord> {
        Ok(PageRecord {
            id: row.get(0)?,
            check_id: row.get(1)?,
            url: row.get(2)?,
            http_status: row.get(3)?,
            canonical_url: row.get(4)?,
            title: row.get(5)?,
            meta_description: row.get(6)?,
            h1s: decode_json(7, row.get(7)?)?,
            internal_links: decode_json(8, row.get(8)?)?,
            external_links: decode_json(9, row.get(9)?)?,
            images_total: row.get(10)?,
            images_missing_alt: row.get(11)?,
            mixed_content_urls: decode_json(12, row.get(12)?)?,
            response_headers: decode_json(13, row.get(13)?)?,
            response_time_ms: row.get::<_, i64>(14)? as u64,
            page_size_bytes: row.get::<_, i64>(15)? as u64,
            html_size_bytes: row.get::<_, i64>(16)? as u64,
            raw_html: row.get(17)?,
            robots_allowed: row.get(18)?,
            source: UrlSource::from_db_string(&row.get::<_, String>(19)?)
                .unwrap_or(UrlSource::Discovery),
            fetched_at: row.get(20)?,
        })
    }

    fn issue_from_row(row: &Row) -> rusqlite::Result<Issue> {
        Ok(Issue {
            id: row.get(0)?,
            check_id: row.get(1)?,
            page_id: row.get(2)?,
            issue_type: row.get(3)?,
            severity: Severity::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(Severity::Notice),
            url: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
            detail: decode_json::<IssueDetail>(8, row.get(8)?)?,
        })
    }

    const PAGE_COLUMNS: &'static str = "id, check_id, url, http_status, canonical_url, title, \
         meta_description, h1s, internal_links, external_links, images_total, \
         images_missing_alt, mixed_content_urls, response_headers, response_time_ms, \
         page_size_bytes, html_size_bytes, raw_html, robots_allowed, source, fetched_at";

    const CHECK_COLUMNS: &'static str = "id, site_url, status, started_at, finished_at, \
         total_urls_crawled, total_urls_crawlable, used_sitemap, robots_checked, \
         errors_count, warnings_count, notices_count, http_errors_count, health_score, \
         error_message, config_hash, created_at";
}

impl Storage for SqliteStorage {
    // ===== Check Management =====

    fn create_check(&mut self, site_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO checks (site_url, status, config_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                site_url,
                CheckStatus::Pending.to_db_string(),
                config_hash,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_check(&self, check_id: i64) -> StorageResult<CheckRecord> {
        let sql = format!(
            "SELECT {} FROM checks WHERE id = ?1",
            Self::CHECK_COLUMNS
        );
        let check = self
            .conn
            .query_row(&sql, params![check_id], Self::check_from_row)
            .optional()?
            .ok_or(StorageError::CheckNotFound(check_id))?;
        Ok(check)
    }

    fn mark_check_running(&mut self, check_id: i64) -> StorageResult<()> {
        let current = self.get_check(check_id)?.status;
        if !current.can_transition_to(CheckStatus::Running) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: CheckStatus::Running,
            });
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE checks SET status = ?1, started_at = ?2 WHERE id = ?3",
            params![CheckStatus::Running.to_db_string(), now, check_id],
        )?;
        Ok(())
    }

    fn finish_check(
        &mut self,
        check_id: i64,
        status: CheckStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let current = self.get_check(check_id)?.status;
        if !status.is_terminal() || !current.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE checks SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, error_message, check_id],
        )?;
        Ok(())
    }

    fn set_discovery_summary(
        &mut self,
        check_id: i64,
        total_urls_crawlable: u32,
        used_sitemap: bool,
        robots_checked: bool,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE checks SET total_urls_crawlable = ?1, used_sitemap = ?2, robots_checked = ?3
             WHERE id = ?4",
            params![total_urls_crawlable, used_sitemap, robots_checked, check_id],
        )?;
        Ok(())
    }

    fn increment_urls_crawled(&mut self, check_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE checks SET total_urls_crawled = total_urls_crawled + 1 WHERE id = ?1",
            params![check_id],
        )?;
        Ok(())
    }

    fn update_check_scores(
        &mut self,
        check_id: i64,
        health_score: f64,
        errors_count: u32,
        warnings_count: u32,
        notices_count: u32,
        http_errors_count: u32,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE checks SET health_score = ?1, errors_count = ?2, warnings_count = ?3,
             notices_count = ?4, http_errors_count = ?5 WHERE id = ?6",
            params![
                health_score,
                errors_count,
                warnings_count,
                notices_count,
                http_errors_count,
                check_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::CheckNotFound(check_id));
        }
        Ok(())
    }

    // ===== Page Management =====

    fn insert_page(&mut self, page: &PageRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pages (check_id, url, http_status, canonical_url, title,
             meta_description, h1s, internal_links, external_links, images_total,
             images_missing_alt, mixed_content_urls, response_headers, response_time_ms,
             page_size_bytes, html_size_bytes, raw_html, robots_allowed, source, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20)",
            params![
                page.check_id,
                page.url,
                page.http_status,
                page.canonical_url,
                page.title,
                page.meta_description,
                encode_json(&page.h1s)?,
                encode_json(&page.internal_links)?,
                encode_json(&page.external_links)?,
                page.images_total,
                page.images_missing_alt,
                encode_json(&page.mixed_content_urls)?,
                encode_json(&page.response_headers)?,
                page.response_time_ms as i64,
                page.page_size_bytes as i64,
                page.html_size_bytes as i64,
                page.raw_html,
                page.robots_allowed,
                page.source.to_db_string(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_pages_for_check(&self, check_id: i64) -> StorageResult<Vec<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM pages WHERE check_id = ?1 ORDER BY id",
            Self::PAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![check_id], Self::page_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    fn count_pages_for_check(&self, check_id: i64) -> StorageResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE check_id = ?1",
            params![check_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn clear_raw_html(&mut self, check_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE pages SET raw_html = NULL WHERE check_id = ?1",
            params![check_id],
        )?;
        Ok(())
    }

    // ===== Issue Management =====

    fn delete_issues_for_check(&mut self, check_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM issues WHERE check_id = ?1",
            params![check_id],
        )?;
        Ok(())
    }

    fn insert_issues(&mut self, issues: &[Issue]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO issues (check_id, page_id, issue_type, severity, url, title,
                 description, detail) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for issue in issues {
                stmt.execute(params![
                    issue.check_id,
                    issue.page_id,
                    issue.issue_type,
                    issue.severity.to_db_string(),
                    issue.url,
                    issue.title,
                    issue.description,
                    encode_json(&issue.detail)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_issues_for_check(&self, check_id: i64) -> StorageResult<Vec<Issue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, check_id, page_id, issue_type, severity, url, title, description, detail
             FROM issues WHERE check_id = ?1 ORDER BY id",
        )?;
        let issues = stmt
            .query_map(params![check_id], Self::issue_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(issues)
    }

    fn count_issues_by_severity(&self, check_id: i64, severity: Severity) -> StorageResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE check_id = ?1 AND severity = ?2",
            params![check_id, severity.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
