use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for jobsift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Which transport a site is crawled with.
///
/// Fixed per site by configuration; sites rendered client-side need
/// `Browser`, everything else uses the lighter `Http` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    Http,
    Browser,
}

/// An inclusive delay range in seconds, sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DelayRange(pub f64, pub f64);

impl DelayRange {
    pub fn min_secs(&self) -> f64 {
        self.0
    }

    pub fn max_secs(&self) -> f64 {
        self.1
    }

    /// Draws a random duration from the range
    pub fn sample(&self) -> std::time::Duration {
        use rand::Rng;
        let secs = if self.1 > self.0 {
            rand::thread_rng().gen_range(self.0..=self.1)
        } else {
            self.0
        };
        std::time::Duration::from_secs_f64(secs)
    }
}

/// Configuration for one job site, immutable for the duration of a crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Stable key identifying the site in the store and adapter registry
    pub key: String,

    /// Display name
    pub name: String,

    /// Base URL of the site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search URL template with a `{page}` or `{start}` placeholder
    #[serde(rename = "search-url")]
    pub search_url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Transport used for every page of this site
    #[serde(rename = "fetch-mode", default = "default_fetch_mode")]
    pub fetch_mode: FetchMode,

    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Delay between listing-page requests, seconds
    #[serde(rename = "delay-range", default = "default_delay_range")]
    pub delay_range: DelayRange,

    /// Delay before each detail-page request; defaults to the listing
    /// range widened by (+2, +4) seconds
    #[serde(rename = "detail-delay-range")]
    pub detail_delay_range: Option<DelayRange>,

    #[serde(rename = "detail-batch-size", default = "default_detail_batch")]
    pub detail_batch_size: u32,

    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout, seconds
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Base headers merged under the randomized identity headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Query parameter appended when the template has no placeholder
    #[serde(rename = "pagination-param", default = "default_pagination_param")]
    pub pagination_param: String,

    #[serde(rename = "pagination-start", default = "default_pagination_start")]
    pub pagination_start: u32,
}

impl SiteConfig {
    /// Effective delay range for detail-page requests
    pub fn detail_delay(&self) -> DelayRange {
        self.detail_delay_range.unwrap_or(DelayRange(
            self.delay_range.min_secs() + 2.0,
            self.delay_range.max_secs() + 4.0,
        ))
    }
}

fn default_enabled() -> bool {
    true
}

fn default_fetch_mode() -> FetchMode {
    FetchMode::Http
}

fn default_max_pages() -> u32 {
    10
}

fn default_delay_range() -> DelayRange {
    DelayRange(2.0, 5.0)
}

fn default_detail_batch() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

fn default_pagination_param() -> String {
    "page".to_string()
}

fn default_pagination_start() -> u32 {
    1
}

impl Config {
    /// Sites that are enabled for crawling, in config order
    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|s| s.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_delay_defaults_to_widened_listing_range() {
        let config: SiteConfig = toml::from_str(
            r#"
key = "hirebase"
name = "Hirebase"
base-url = "https://hirebase.org"
search-url = "https://hirebase.org/search?page={page}"
delay-range = [3.0, 8.0]
"#,
        )
        .unwrap();

        let detail = config.detail_delay();
        assert_eq!(detail.min_secs(), 5.0);
        assert_eq!(detail.max_secs(), 12.0);
    }

    #[test]
    fn test_explicit_detail_delay_wins() {
        let config: SiteConfig = toml::from_str(
            r#"
key = "hirebase"
name = "Hirebase"
base-url = "https://hirebase.org"
search-url = "https://hirebase.org/search?page={page}"
delay-range = [3.0, 8.0]
detail-delay-range = [5.0, 12.0]
"#,
        )
        .unwrap();

        assert_eq!(config.detail_delay(), DelayRange(5.0, 12.0));
    }

    #[test]
    fn test_delay_sample_within_range() {
        let range = DelayRange(0.1, 0.3);
        for _ in 0..50 {
            let d = range.sample().as_secs_f64();
            assert!((0.1..=0.3).contains(&d));
        }
    }

    #[test]
    fn test_degenerate_delay_range() {
        let range = DelayRange(0.2, 0.2);
        assert_eq!(range.sample().as_secs_f64(), 0.2);
    }

    #[test]
    fn test_defaults_applied() {
        let config: SiteConfig = toml::from_str(
            r#"
key = "hirebase"
name = "Hirebase"
base-url = "https://hirebase.org"
search-url = "https://hirebase.org/search?page={page}"
"#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.fetch_mode, FetchMode::Http);
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.pagination_param, "page");
        assert_eq!(config.pagination_start, 1);
    }
}
