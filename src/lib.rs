//! Jobsift: a change-aware job posting harvester
//!
//! This crate continuously harvests job postings from configured websites,
//! walking paginated search results with randomized request identities and
//! maintaining a deduplicated record store keyed by content fingerprints.

pub mod adapter;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod fetch;
pub mod model;
pub mod output;
pub mod store;

use thiserror::Error;

/// Main error type for jobsift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record from {site} missing required field '{field}'")]
    DataIntegrity { site: String, field: &'static str },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for jobsift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, FetchMode, SiteConfig};
pub use dedup::{fingerprint, Classification};
pub use model::{CandidateRecord, CrawlStats, JobRecord, RunSummary};
