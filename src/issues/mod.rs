//! Issue model and detection engine
//!
//! An issue is one detected defect: typed by a stable string key,
//! tagged with a severity, and carrying a structured detail payload.
//! Issues are derived from the stored page records of a finished
//! crawl, never from live fetches.

mod engine;
mod page_rules;
mod site_rules;

pub use engine::{detect_issues, ISSUE_INSERT_BATCH_SIZE};
pub use page_rules::evaluate_page;
pub use site_rules::{detect_duplicate_titles, detect_orphan_pages};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl Severity {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "notice" => Some(Self::Notice),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Structured payload attached to an issue
///
/// Each rule gets its own variant so payload shapes stay
/// compiler-checked instead of degrading into a free-form map. The
/// serialized form is tagged JSON stored in the `detail` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueDetail {
    None,
    TitleLength {
        length: usize,
    },
    H1Count {
        count: usize,
    },
    SlowResponse {
        response_time_ms: u64,
        threshold_ms: u64,
    },
    MissingAltText {
        images_missing_alt: u32,
        images_total: u32,
    },
    InternalLinkCount {
        count: usize,
    },
    BrokenLink {
        target_url: String,
        status: u16,
    },
    BrokenCanonical {
        canonical_url: String,
        status: u16,
    },
    MixedContent {
        resources: Vec<String>,
    },
    RedirectLoop {
        location: String,
    },
    DuplicateTitle {
        title: String,
        shared_with: Vec<String>,
    },
    OrphanPage,
}

/// One detected defect
///
/// `id` is 0 until the row is inserted; `page_id` is None for issues
/// that concern a URL rather than a stored page row.
#[derive(Debug, Clone)]
pub struct Issue {
    pub id: i64,
    pub check_id: i64,
    pub page_id: Option<i64>,
    pub issue_type: String,
    pub severity: Severity,
    pub url: String,
    pub title: String,
    pub description: String,
    pub detail: IssueDetail,
}

impl Issue {
    /// Builds an unsaved issue for a page
    pub fn for_page(
        check_id: i64,
        page_id: i64,
        url: &str,
        issue_type: &str,
        severity: Severity,
        title: &str,
        description: String,
        detail: IssueDetail,
    ) -> Self {
        Self {
            id: 0,
            check_id,
            page_id: Some(page_id),
            issue_type: issue_type.to_string(),
            severity,
            url: url.to_string(),
            title: title.to_string(),
            description,
            detail,
        }
    }
}
