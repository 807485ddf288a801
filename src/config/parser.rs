use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ria_cars::config::load_config;
///
/// let config = load_config(Path::new("ria-cars.toml")).unwrap();
/// println!("Workers: {}", config.crawler.max_workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be compared for configuration drift.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Builds the effective configuration for a process
///
/// Starts from the file at `path` (or the built-in defaults when no file is
/// given), applies environment overrides through `lookup`, then validates.
/// Returns the file hash alongside when a file was read.
pub fn resolve_config<F>(
    path: Option<&Path>,
    lookup: F,
) -> Result<(Config, Option<String>), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (mut config, hash) = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            (config, Some(compute_config_hash(path)?))
        }
        None => (Config::default(), None),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate(&config)?;

    Ok((config, hash))
}

/// Applies `RIA_*` environment overrides on top of a parsed configuration
///
/// `lookup` abstracts the environment so callers decide where values come
/// from; the binary passes `std::env::var`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("RIA_LISTING_URL") {
        config.site.listing_url = value;
    }
    if let Some(value) = lookup("RIA_BASE_URL") {
        config.site.base_url = value;
    }
    if let Some(value) = lookup("RIA_PHONE_URL") {
        config.site.phone_url = value;
    }
    if let Some(value) = lookup("RIA_DATABASE_PATH") {
        config.storage.database_path = value;
    }
    if let Some(value) = lookup("RIA_BIND_ADDRESS") {
        config.server.bind_address = value;
    }

    override_number(&lookup, "RIA_MAX_WORKERS", &mut config.crawler.max_workers)?;
    override_number(
        &lookup,
        "RIA_MAX_CONCURRENT_REQUESTS",
        &mut config.crawler.max_concurrent_requests,
    )?;
    override_number(&lookup, "RIA_SCRAPE_HOUR", &mut config.schedule.crawl_hour)?;
    override_number(&lookup, "RIA_SCRAPE_MINUTE", &mut config.schedule.crawl_minute)?;
    override_number(&lookup, "RIA_DUMP_HOUR", &mut config.schedule.dump_hour)?;
    override_number(&lookup, "RIA_DUMP_MINUTE", &mut config.schedule.dump_minute)?;

    Ok(())
}

fn override_number<F, T>(lookup: &F, name: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: name.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[site]
listing-url = "https://auto.ria.com/uk/car/used/"
base-url = "https://auto.ria.com"
phone-url = "https://auto.ria.com/bff/popUp/"

[crawler]
max-workers = 4
max-concurrent-requests = 2
max-empty-pages = 3

[storage]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_workers, 4);
        assert_eq!(config.crawler.max_concurrent_requests, 2);
        assert_eq!(config.crawler.max_empty_pages, 3);
        assert_eq!(config.storage.database_path, "./test.db");
        // Untouched sections keep their defaults
        assert_eq!(config.schedule.crawl_hour, 12);
        assert_eq!(config.storage.dump_utility, "sqlite3");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawler.max_empty_pages, 10);
        assert_eq!(config.site.detail_marker, "/auto_");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nmax-workers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("RIA_LISTING_URL", "https://example.com/cars/"),
                ("RIA_MAX_WORKERS", "3"),
                ("RIA_MAX_CONCURRENT_REQUESTS", " 7 "),
                ("RIA_DUMP_HOUR", "4"),
            ]),
        )
        .unwrap();

        assert_eq!(config.site.listing_url, "https://example.com/cars/");
        assert_eq!(config.crawler.max_workers, 3);
        assert_eq!(config.crawler.max_concurrent_requests, 7);
        assert_eq!(config.schedule.dump_hour, 4);
    }

    #[test]
    fn test_env_override_rejects_garbage_number() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, env(&[("RIA_MAX_WORKERS", "lots")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_resolve_without_file_validates_overrides() {
        let (config, hash) = resolve_config(None, env(&[])).unwrap();
        assert!(hash.is_none());
        assert_eq!(config.crawler.max_workers, 10);

        let result = resolve_config(None, env(&[("RIA_SCRAPE_HOUR", "25")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_with_file_returns_hash() {
        let file = create_temp_config("[crawler]\nmax-workers = 2\n");
        let (config, hash) =
            resolve_config(Some(file.path()), env(&[("RIA_MAX_WORKERS", "6")])).unwrap();
        assert_eq!(config.crawler.max_workers, 6);
        assert_eq!(hash.map(|h| h.len()), Some(64));
    }
}
