//! Configuration loading: the `sites`, `user_agent`, `referrer` and tuning
//! parameters loaded once at process start (§6).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One configured site (`{url, name}` per §6).
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    pub name: String,
}

/// Tuning knobs for the Crawler's worker pool and rate limiting (§5 AMBIENT).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub workers_per_site: usize,
    pub fetch_timeout_secs: u64,
    pub rate_limit_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers_per_site: default_worker_count(),
            fetch_timeout_secs: 10,
            rate_limit_ms: 500,
        }
    }
}

fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 4)
}

/// Tuning knobs for Store's retry-with-backoff wrapper (§4.1).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_retries: u32,
    pub retry_base_delay_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_secs: 1,
        }
    }
}

/// Top-level configuration, loaded once at startup from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sites: Vec<SiteConfig>,
    pub user_agent: String,
    pub referrer: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_database_path() -> String {
    "lexisearch.db".to_string()
}

impl Config {
    /// Loads and parses a TOML configuration file from `path`, rejecting any
    /// configured site whose `url` isn't an absolute url or carries a
    /// trailing slash (§3's Site identity invariant).
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        for site in &config.sites {
            validate_site_url(&site.url)
                .with_context(|| format!("invalid site url in config: {}", site.url))?;
        }
        Ok(config)
    }
}

/// Rejects relative urls and urls with a trailing slash (§3: "url (absolute,
/// no trailing slash)").
fn validate_site_url(raw: &str) -> Result<()> {
    url::Url::parse(raw).with_context(|| format!("not an absolute url: {raw}"))?;
    if raw.ends_with('/') {
        anyhow::bail!("site url must not have a trailing slash: {raw}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
            user_agent = "lexisearch/0.1"
            referrer = "https://lexisearch.local/"

            [[sites]]
            url = "https://example.com"
            name = "Example"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].url, "https://example.com");
        assert_eq!(config.database_path, "lexisearch.db");
        assert_eq!(config.crawl.rate_limit_ms, 500);
        assert_eq!(config.store.max_retries, 3);
    }

    #[test]
    fn rejects_trailing_slash_site_url() {
        assert!(validate_site_url("https://example.com/").is_err());
        assert!(validate_site_url("https://example.com").is_ok());
    }

    #[test]
    fn rejects_relative_site_url() {
        assert!(validate_site_url("/example.com").is_err());
    }
}
