use crate::config::types::{Config, CrawlerConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
const MAX_PARALLELISM: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;

    if config.parallelism < 1 || config.parallelism > MAX_PARALLELISM {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and {}, got {}",
            MAX_PARALLELISM, config.parallelism
        )));
    }

    if config.idle_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "idle_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// The start URL must be an absolute http(s) URL
fn validate_start_url(start_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", start_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            start_url, other
        ))),
    }
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    // Header values must stay on one line
    if config
        .crawler_name
        .chars()
        .chain(config.crawler_version.chars())
        .any(|c| c.is_control())
    {
        return Err(ConfigError::Validation(
            "user agent must not contain control characters".to_string(),
        ));
    }

    Ok(())
}
