use crate::config::types::{Config, SiteConfig, StoreConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_store_config(&config.store)?;

    let mut seen_keys = HashSet::new();
    for site in &config.sites {
        validate_site_config(site)?;
        if !seen_keys.insert(site.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site key '{}'",
                site.key
            )));
        }
    }

    Ok(())
}

/// Validates storage configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates one site entry
fn validate_site_config(site: &SiteConfig) -> Result<(), ConfigError> {
    if site.key.is_empty() {
        return Err(ConfigError::Validation(
            "site key cannot be empty".to_string(),
        ));
    }

    if !site
        .key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site key must be lowercase alphanumeric with '-' or '_', got '{}'",
            site.key
        )));
    }

    if site.name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "site '{}' must have a name",
            site.key
        )));
    }

    Url::parse(&site.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url for '{}': {}", site.key, e))
    })?;

    if site.search_url.is_empty() {
        return Err(ConfigError::Validation(format!(
            "site '{}' must have a search-url",
            site.key
        )));
    }

    if site.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages for '{}' must be >= 1, got {}",
            site.key, site.max_pages
        )));
    }

    validate_delay_range(&site.key, "delay-range", site.delay_range.min_secs(), site.delay_range.max_secs())?;
    if let Some(detail) = site.detail_delay_range {
        validate_delay_range(&site.key, "detail-delay-range", detail.min_secs(), detail.max_secs())?;
    }

    if site.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs for '{}' must be >= 1, got {}",
            site.key, site.timeout_secs
        )));
    }

    if site.detail_batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "detail-batch-size for '{}' must be >= 1, got {}",
            site.key, site.detail_batch_size
        )));
    }

    if site.search_url.contains("{page}") && site.pagination_start < 1 {
        return Err(ConfigError::Validation(format!(
            "pagination-start for '{}' must be >= 1 with a {{page}} template",
            site.key
        )));
    }

    Ok(())
}

fn validate_delay_range(
    site_key: &str,
    field: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    if min < 0.0 || max < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} for '{}' must be non-negative, got [{}, {}]",
            field, site_key, min, max
        )));
    }
    if min > max {
        return Err(ConfigError::Validation(format!(
            "{} for '{}' must have min <= max, got [{}, {}]",
            field, site_key, min, max
        )));
    }
    Ok(())
}
