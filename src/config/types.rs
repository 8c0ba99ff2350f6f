use serde::Deserialize;

/// Main configuration structure for SitePulse
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub audit: AuditConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Audit behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Maximum number of URLs crawled per check
    #[serde(rename = "max-urls", default = "default_max_urls")]
    pub max_urls: u32,

    /// Timeout for a single page fetch, in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of concurrent page fetches (1 = sequential)
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,
}

fn default_max_urls() -> u32 {
    100
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> u32 {
    4
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the auditor bot
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the auditor bot
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the auditor
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Rule toggles for the issue detection engine
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Flag pages no other crawled page links to. Off by default; the
    /// heuristic is noisy on sites with non-HTML navigation.
    #[serde(rename = "detect-orphan-pages", default)]
    pub detect_orphan_pages: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            detect_orphan_pages: false,
        }
    }
}
