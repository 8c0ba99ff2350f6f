use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
///
/// Checks value ranges and required fields that TOML deserialization
/// alone cannot enforce.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.audit.max_urls == 0 {
        return Err(ConfigError::Validation(
            "audit.max-urls must be at least 1".to_string(),
        ));
    }

    if config.audit.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "audit.fetch-timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.audit.max_concurrent_fetches == 0 {
        return Err(ConfigError::Validation(
            "audit.max-concurrent-fetches must be at least 1".to_string(),
        ));
    }

    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name must not be empty".to_string(),
        ));
    }

    if config.user_agent.contact_email.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.contact-email must not be empty".to_string(),
        ));
    }

    // The contact URL goes into the User-Agent header verbatim, so it
    // must at least parse.
    Url::parse(&config.user_agent.contact_url)
        .map_err(|_| ConfigError::InvalidUrl(config.user_agent.contact_url.clone()))?;

    if config.output.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output.database-path must not be empty".to_string(),
        ));
    }

    Ok(())
}
