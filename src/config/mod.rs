//! Configuration loading and validation
//!
//! Configuration is a TOML file with `[audit]`, `[user-agent]`,
//! `[output]`, and optional `[rules]` sections. A SHA-256 hash of the
//! file content is recorded on every check for provenance.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{AuditConfig, Config, OutputConfig, RulesConfig, UserAgentConfig};
pub use validation::validate;
