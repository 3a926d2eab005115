use crate::config::types::{Config, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Anything rejected here is fatal: the crawl never starts.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_seed_config(&config.seeds)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.target < 1 {
        return Err(ConfigError::Validation(
            "target must be at least 1".to_string(),
        ));
    }

    if config.pop_timeout_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "pop_timeout_ms must be >= 10ms, got {}ms",
            config.pop_timeout_ms
        )));
    }

    if config.fetch_timeout_secs < 1 || config.robots_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch and robots timeouts must be at least 1 second".to_string(),
        ));
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

/// Validates the seed section
fn validate_seed_config(config: &SeedConfig) -> Result<(), ConfigError> {
    if config.phrase.trim().is_empty() {
        return Err(ConfigError::Validation(
            "seed phrase cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.search_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search_url: {}", e)))?;

    for seed in &config.urls {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("csv_path", &config.csv_path),
        ("json_path", &config.json_path),
        ("database_path", &config.database_path),
        ("domains_path", &config.domains_path),
    ];

    for (name, path) in paths {
        if matches!(path, Some(p) if p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                name
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain exactly one @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
