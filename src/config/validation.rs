use crate::config::types::CrawlConfig;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_scheduling(config)?;
    validate_timing(config)?;
    validate_extraction(config)?;
    Ok(())
}

/// Validates worker count and page budget
fn validate_scheduling(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates timing budgets
fn validate_timing(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.poll_timeout_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_timeout_ms must be >= 10ms, got {}ms",
            config.poll_timeout_ms
        )));
    }

    Ok(())
}

/// Validates content extraction settings
fn validate_extraction(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_text_chars < 1 {
        return Err(ConfigError::Validation(
            "max_text_chars must be >= 1".to_string(),
        ));
    }

    if let Some(selector) = &config.wait_selector {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "wait_selector cannot be empty".to_string(),
            ));
        }

        if scraper::Selector::parse(selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "wait_selector is not a valid CSS selector: '{}'",
                selector
            )));
        }
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
