use crate::config::types::{Config, CrawlerConfig, ScheduleConfig, SiteConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_schedule_config(&config.schedule)?;

    if config.server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "bind_address cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the target site endpoints
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("listing_url", &config.listing_url)?;
    validate_http_url("base_url", &config.base_url)?;
    validate_http_url("phone_url", &config.phone_url)?;

    if config.detail_marker.is_empty() {
        return Err(ConfigError::Validation(
            "detail_marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_empty_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_empty_pages must be >= 1, got {}",
            config.max_empty_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.dump_dir.is_empty() {
        return Err(ConfigError::Validation(
            "dump_dir cannot be empty".to_string(),
        ));
    }

    if config.dump_utility.is_empty() {
        return Err(ConfigError::Validation(
            "dump_utility cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the daily trigger times
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    validate_time_of_day("crawl", config.crawl_hour, config.crawl_minute)?;
    validate_time_of_day("dump", config.dump_hour, config.dump_minute)
}

fn validate_time_of_day(job: &str, hour: u32, minute: u32) -> Result<(), ConfigError> {
    if hour > 23 {
        return Err(ConfigError::Validation(format!(
            "{}_hour must be between 0 and 23, got {}",
            job, hour
        )));
    }

    if minute > 59 {
        return Err(ConfigError::Validation(format!(
            "{}_minute must be between 0 and 59, got {}",
            job, minute
        )));
    }

    Ok(())
}

/// Checks that a configured endpoint is an absolute http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
