use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, OutputConfig, PoolConfig, ServerConfig,
};
use crate::fetch::MAX_RECORD_SIZE_PER_PAGE;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_pool_config(&config.pool)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation("port must be non-zero".to_string()));
    }

    Ok(())
}

fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.thread_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "thread_prefix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl job configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.retry_limit < 1 || config.retry_limit > 20 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be between 1 and 20, got {}",
            config.retry_limit
        )));
    }

    if config.page_size < 1 || config.page_size > MAX_RECORD_SIZE_PER_PAGE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_RECORD_SIZE_PER_PAGE, config.page_size
        )));
    }

    if config.details_batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "details_batch_size must be >= 1, got {}",
            config.details_batch_size
        )));
    }

    if config.read_retry_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "read_retry_limit must be >= 1, got {}",
            config.read_retry_limit
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.log_dir.is_empty() {
        return Err(ConfigError::Validation("log_dir cannot be empty".to_string()));
    }

    validate_file_prefix(&config.file_prefix)?;

    if config.max_records_per_file < 1 {
        return Err(ConfigError::Validation(format!(
            "max_records_per_file must be >= 1, got {}",
            config.max_records_per_file
        )));
    }

    if config.dump_retry_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "dump_retry_limit must be >= 1, got {}",
            config.dump_retry_limit
        )));
    }

    Ok(())
}

/// Dump files are matched back by name, so the prefix must not contain
/// separators that would confuse `<prefix>_<id>.json.<n>` parsing.
fn validate_file_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation(
            "file_prefix cannot be empty".to_string(),
        ));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "file_prefix must contain only alphanumeric characters, '-' or '_', got '{}'",
            prefix
        )));
    }

    Ok(())
}
