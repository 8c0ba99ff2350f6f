//! Database schema definitions
//!
//! All SQL schema for the SitePulse database. List-valued page fields
//! (headings, links, headers) are stored as JSON text columns.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per audit run
CREATE TABLE IF NOT EXISTS checks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_url TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    total_urls_crawled INTEGER NOT NULL DEFAULT 0,
    total_urls_crawlable INTEGER NOT NULL DEFAULT 0,
    used_sitemap INTEGER NOT NULL DEFAULT 0,
    robots_checked INTEGER NOT NULL DEFAULT 0,
    errors_count INTEGER NOT NULL DEFAULT 0,
    warnings_count INTEGER NOT NULL DEFAULT 0,
    notices_count INTEGER NOT NULL DEFAULT 0,
    http_errors_count INTEGER NOT NULL DEFAULT 0,
    health_score REAL,
    error_message TEXT,
    config_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checks_status ON checks(status);

-- One row per fetched URL within a check. URLs are unbounded TEXT;
-- long query strings must survive intact.
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    check_id INTEGER NOT NULL REFERENCES checks(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    http_status INTEGER NOT NULL,
    canonical_url TEXT,
    title TEXT,
    meta_description TEXT,
    h1s TEXT NOT NULL DEFAULT '[]',
    internal_links TEXT NOT NULL DEFAULT '[]',
    external_links TEXT NOT NULL DEFAULT '[]',
    images_total INTEGER NOT NULL DEFAULT 0,
    images_missing_alt INTEGER NOT NULL DEFAULT 0,
    mixed_content_urls TEXT NOT NULL DEFAULT '[]',
    response_headers TEXT NOT NULL DEFAULT '[]',
    response_time_ms INTEGER NOT NULL DEFAULT 0,
    page_size_bytes INTEGER NOT NULL DEFAULT 0,
    html_size_bytes INTEGER NOT NULL DEFAULT 0,
    raw_html TEXT,
    robots_allowed INTEGER NOT NULL DEFAULT 1,
    source TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_check ON pages(check_id);
CREATE INDEX IF NOT EXISTS idx_pages_check_status ON pages(check_id, http_status);

-- Detected defects, bulk-written after a crawl completes
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    check_id INTEGER NOT NULL REFERENCES checks(id) ON DELETE CASCADE,
    page_id INTEGER REFERENCES pages(id) ON DELETE SET NULL,
    issue_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '{"kind":"none"}'
);

CREATE INDEX IF NOT EXISTS idx_issues_check ON issues(check_id);
CREATE INDEX IF NOT EXISTS idx_issues_check_severity ON issues(check_id, severity);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
