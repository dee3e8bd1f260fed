//! Core data types shared across the harvester
//!
//! This module defines the canonical persisted record, the not-yet-reconciled
//! candidate form produced by site adapters, and the statistics types
//! aggregated over a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A job listing extracted from a page, not yet reconciled against the store.
///
/// Produced by a [`crate::adapter::SiteAdapter`]; `external_id` and `title`
/// are required before classification, everything else is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Identifier assigned by the source site
    pub external_id: String,

    /// Role title
    pub title: String,

    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,

    /// Direct URL of the posting; doubles as the detail-page URL when the
    /// adapter supports detail enrichment
    pub url: Option<String>,

    /// URL of the listing page this candidate was extracted from
    pub source_page: String,

    /// Free-form fields merged in from detail pages (ordered for stable
    /// fingerprinting)
    pub additional_details: BTreeMap<String, String>,
}

/// The canonical persisted form of a job posting.
///
/// `(external_id, site_key)` is the natural key; `fingerprint` is a SHA-256
/// digest over the content fields used to detect meaningful change.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    /// Database row id (0 until persisted)
    pub id: i64,

    pub external_id: String,
    pub site_key: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub additional_details: BTreeMap<String, String>,
    pub url: Option<String>,

    /// First time this posting was sighted
    pub first_seen: DateTime<Utc>,

    /// Most recent sighting; refreshed on every re-sighting
    pub last_seen: DateTime<Utc>,

    pub is_new: bool,

    /// Owned by downstream phases; never mutated by the core once set
    pub is_relevant: bool,

    /// Owned by downstream phases; never mutated by the core once set
    pub is_processed: bool,

    /// Hex-encoded SHA-256 over the content fields
    pub fingerprint: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-site crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_fetched: u64,
    pub records_found: u64,
    pub new: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: u64,
}

impl CrawlStats {
    /// Folds another stats block into this one
    pub fn absorb(&mut self, other: &CrawlStats) {
        self.pages_fetched += other.pages_fetched;
        self.records_found += other.records_found;
        self.new += other.new;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.errors += other.errors;
    }
}

/// Terminal status of one site's crawl within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteStatus {
    Completed,
    Failed { error: String },
}

/// Result of crawling a single site
#[derive(Debug, Clone)]
pub struct SiteOutcome {
    pub status: SiteStatus,
    pub stats: CrawlStats,
}

impl SiteOutcome {
    pub fn completed(stats: CrawlStats) -> Self {
        Self {
            status: SiteStatus::Completed,
            stats,
        }
    }

    pub fn failed(stats: CrawlStats, error: String) -> Self {
        Self {
            status: SiteStatus::Failed { error },
            stats,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SiteStatus::Failed { .. })
    }
}

/// Aggregated result of a full run across all enabled sites
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,

    /// Per-site outcomes keyed by site key
    pub per_site: BTreeMap<String, SiteOutcome>,

    /// Counters summed over all sites
    pub totals: CrawlStats,
}

impl RunSummary {
    /// Number of sites that finished without a site-level failure
    pub fn sites_completed(&self) -> usize {
        self.per_site.values().filter(|o| !o.is_failed()).count()
    }

    /// Number of sites that failed outright
    pub fn sites_failed(&self) -> usize {
        self.per_site.values().filter(|o| o.is_failed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_absorb() {
        let mut a = CrawlStats {
            pages_fetched: 2,
            records_found: 10,
            new: 4,
            updated: 1,
            unchanged: 5,
            errors: 1,
        };
        let b = CrawlStats {
            pages_fetched: 1,
            records_found: 3,
            new: 3,
            updated: 0,
            unchanged: 0,
            errors: 0,
        };
        a.absorb(&b);
        assert_eq!(a.pages_fetched, 3);
        assert_eq!(a.records_found, 13);
        assert_eq!(a.new, 7);
        assert_eq!(a.errors, 1);
    }

    #[test]
    fn test_summary_site_counts() {
        let mut per_site = BTreeMap::new();
        per_site.insert(
            "alpha".to_string(),
            SiteOutcome::completed(CrawlStats::default()),
        );
        per_site.insert(
            "beta".to_string(),
            SiteOutcome::failed(CrawlStats::default(), "boom".to_string()),
        );

        let now = Utc::now();
        let summary = RunSummary {
            started_at: now,
            finished_at: now,
            duration_seconds: 0.0,
            per_site,
            totals: CrawlStats::default(),
        };

        assert_eq!(summary.sites_completed(), 1);
        assert_eq!(summary.sites_failed(), 1);
    }
}
