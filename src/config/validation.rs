use crate::config::types::{Config, EngineConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates engine limits
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_request_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_request_retries must be <= 10, got {}",
            config.max_request_retries
        )));
    }

    if config.retry_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "retry_delay_ms must be <= 60000ms, got {}ms",
            config.retry_delay_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
