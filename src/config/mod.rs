//! Configuration module for jobsift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use jobsift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sites.toml")).unwrap();
//! for site in config.enabled_sites() {
//!     println!("{} -> {} pages max", site.key, site.max_pages);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DelayRange, FetchMode, SiteConfig, StoreConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
