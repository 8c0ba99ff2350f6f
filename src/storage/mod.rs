//! Storage module for persisting audit data
//!
//! This module handles all database operations for the auditor:
//! - SQLite database initialization and schema management
//! - Check lifecycle persistence
//! - Page record persistence (append-only per check)
//! - Issue bulk writes and reads

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::check::CheckStatus;
use serde::{Deserialize, Serialize};

/// Represents one audit run in the database
#[derive(Debug, Clone)]
pub struct CheckRecord {
    pub id: i64,
    pub site_url: String,
    pub status: CheckStatus,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub total_urls_crawled: u32,
    pub total_urls_crawlable: u32,
    pub used_sitemap: bool,
    pub robots_checked: bool,
    pub errors_count: u32,
    pub warnings_count: u32,
    pub notices_count: u32,
    pub http_errors_count: u32,
    pub health_score: Option<f64>,
    pub error_message: Option<String>,
    pub config_hash: String,
    pub created_at: String,
}

/// A hyperlink captured from a page, with its anchor text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub url: String,
    #[serde(default)]
    pub anchor_text: String,
}

/// How a URL entered the crawl set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    /// Listed in a sitemap (or sitemap index)
    Sitemap,
    /// Fallback discovery (the root URL itself)
    Discovery,
}

impl UrlSource {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Sitemap => "sitemap",
            Self::Discovery => "discovery",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "sitemap" => Some(Self::Sitemap),
            "discovery" => Some(Self::Discovery),
            _ => None,
        }
    }
}

/// The captured observation for one crawled URL
///
/// Created once per fetched URL and immutable afterwards, except for
/// `raw_html`, which is cleared once issue detection no longer needs
/// it. `http_status` 0 means the fetch failed at the transport level.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub check_id: i64,
    pub url: String,
    pub http_status: u16,
    pub canonical_url: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1s: Vec<String>,
    pub internal_links: Vec<PageLink>,
    pub external_links: Vec<PageLink>,
    pub images_total: u32,
    pub images_missing_alt: u32,
    pub mixed_content_urls: Vec<String>,
    pub response_headers: Vec<(String, String)>,
    pub response_time_ms: u64,
    pub page_size_bytes: u64,
    pub html_size_bytes: u64,
    pub raw_html: Option<String>,
    pub robots_allowed: bool,
    pub source: UrlSource,
    pub fetched_at: String,
}

impl PageRecord {
    /// HTTP status in [200, 300)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }

    /// HTTP status in [300, 400)
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.http_status)
    }

    /// HTTP status in [400, 500)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status)
    }

    /// HTTP status in [500, 600)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.http_status)
    }

    /// HTTP status in [400, 600)
    ///
    /// Status 0 (transport failure) is not an HTTP error; it never
    /// reached the server.
    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }

    /// The `location` response header, if any (case-insensitive)
    pub fn redirect_location(&self) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("location"))
            .map(|(_, value)| value.as_str())
    }
}
