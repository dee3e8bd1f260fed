//! Site adapters: per-site HTML extraction logic
//!
//! An adapter knows how one site lays out its listings. Everything transport
//! related (pagination URLs, delays, retries) lives in the crawler; adapters
//! only read parsed documents.

mod hirebase;

pub use hirebase::HirebaseAdapter;

use crate::model::CandidateRecord;
use scraper::Html;
use std::collections::BTreeMap;

/// Extraction logic for one job site.
///
/// Implementations must be forgiving: a listing that cannot be parsed is
/// skipped, never an error.
pub trait SiteAdapter: Send + Sync {
    /// Extracts all job candidates from a listing page
    fn extract_candidates(&self, document: &Html, page_url: &str) -> Vec<CandidateRecord>;

    /// Whether the listing page suggests more pages exist after
    /// `current_page`. The crawler still enforces its own page cap.
    fn has_more(&self, document: &Html, current_page: u32) -> bool;

    /// Whether the site exposes per-posting detail pages worth fetching
    fn supports_detail_pages(&self) -> bool {
        false
    }

    /// Extracts supplemental fields from a detail page
    fn extract_details(&self, _document: &Html) -> Option<BTreeMap<String, String>> {
        None
    }

    /// CSS selector the browser should wait for on listing pages
    fn wait_selector(&self) -> Option<&str> {
        None
    }

    /// CSS selector the browser should wait for on detail pages
    fn detail_wait_selector(&self) -> Option<&str> {
        None
    }
}

/// Looks up the adapter registered for a site key.
///
/// Sites present in configuration but without an adapter are skipped by the
/// coordinator with a warning.
pub fn adapter_for(site_key: &str) -> Option<Box<dyn SiteAdapter>> {
    match site_key {
        "hirebase" => Some(Box::new(HirebaseAdapter::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_site_resolves() {
        assert!(adapter_for("hirebase").is_some());
    }

    #[test]
    fn test_unknown_site_is_none() {
        assert!(adapter_for("nonexistent").is_none());
    }
}
