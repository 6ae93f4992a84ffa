use crate::config::types::{Config, CrawlerConfig, FetcherConfig, FieldEntry, TargetConfig};
use crate::crawler::PAGE_PLACEHOLDER;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_fields(&config.fields)?;
    // Duplicate names and mode/attribute consistency
    config.field_map()?;
    Ok(())
}

/// Validates the crawl target
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.pagination_template.contains(PAGE_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "pagination_template must contain the {} placeholder, got '{}'",
            PAGE_PLACEHOLDER, config.pagination_template
        )));
    }

    if config.container_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "container_selector cannot be empty".to_string(),
        ));
    }

    if config.first_page > config.last_page {
        tracing::warn!(
            "first_page {} is after last_page {}; no pages will be fetched",
            config.first_page,
            config.last_page
        );
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 32, got {}",
            config.max_concurrent_pages
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the `[[field]]` entries
fn validate_fields(fields: &[FieldEntry]) -> Result<(), ConfigError> {
    if fields.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[field]] entry is required".to_string(),
        ));
    }

    for field in fields {
        if field.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Field name cannot be empty".to_string(),
            ));
        }

        // Syntax is checked at extraction time, where a bad selector only blanks its field
        if field.selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Field '{}' has an empty selector",
                field.name
            )));
        }
    }

    Ok(())
}
