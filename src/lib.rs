//! SitePulse: automated website health auditing
//!
//! This crate crawls a bounded set of pages discovered from a site's
//! robots.txt and sitemaps, extracts SEO-relevant data from each page,
//! runs a rule engine over the full crawl, and reduces the result into
//! a single 0..100 health score.

pub mod check;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod issues;
pub mod score;
pub mod storage;

use thiserror::Error;

/// Main error type for SitePulse operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid site URL: {0}")]
    InvalidSiteUrl(String),

    #[error("Check {0} not found")]
    CheckNotFound(i64),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: check::CheckStatus,
        to: check::CheckStatus,
    },

    #[error("Crawl aborted: {0}")]
    Aborted(String),

    #[error("Crawl task failure: {0}")]
    Crawl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for SitePulse operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use check::CheckStatus;
pub use config::Config;
pub use crawler::Auditor;
pub use issues::Severity;
