//! Crawler module: fetching, extraction, and audit orchestration
//!
//! The fetch stage runs behind a bounded worker pool; extraction and
//! persistence happen on the orchestrator task. Fetch failures are
//! recorded as sentinel page records, never raised.

mod extractor;
mod fetcher;
mod orchestrator;

pub use extractor::{extract_content, ExtractedContent};
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use orchestrator::Auditor;
