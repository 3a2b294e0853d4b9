use crate::config::types::{
    Config, FetcherConfig, NormalizerConfig, ScanConfig, StorageConfig, TriggerConfig,
};
use crate::ConfigError;
use image::ImageFormat;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_normalizer_config(&config.normalizer)?;
    validate_scan_config(&config.scan)?;
    validate_storage_config(&config.storage)?;
    validate_trigger_config(&config.trigger)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
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

    // reqwest rejects header values with control characters at build time
    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user_agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates normalizer configuration
fn validate_normalizer_config(config: &NormalizerConfig) -> Result<(), ConfigError> {
    target_format(&config.target_mime)?;

    if config.jpeg_quality < 1 || config.jpeg_quality > 100 {
        return Err(ConfigError::Validation(format!(
            "jpeg_quality must be between 1 and 100, got {}",
            config.jpeg_quality
        )));
    }

    Ok(())
}

/// Resolves a target MIME type to an image format the normalizer can write
pub fn target_format(mime: &str) -> Result<ImageFormat, ConfigError> {
    match ImageFormat::from_mime_type(mime) {
        Some(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) => Ok(format),
        _ => Err(ConfigError::UnsupportedFormat(mime.to_string())),
    }
}

/// Validates scan configuration
fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.record_type.is_empty() {
        return Err(ConfigError::Validation(
            "record_type cannot be empty".to_string(),
        ));
    }

    if !config
        .record_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "record_type must contain only alphanumeric characters, '-' and '_', got '{}'",
            config.record_type
        )));
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

    if config.media_dir.is_empty() {
        return Err(ConfigError::Validation(
            "media_dir cannot be empty".to_string(),
        ));
    }

    if matches!(&config.temp_dir, Some(dir) if dir.is_empty()) {
        return Err(ConfigError::Validation(
            "temp_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates trigger configuration
fn validate_trigger_config(config: &TriggerConfig) -> Result<(), ConfigError> {
    if config.token_ttl_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "token_ttl_secs must be >= 1, got {}",
            config.token_ttl_secs
        )));
    }

    Ok(())
}
