//! Scrape coordinator
//!
//! Runs every enabled site in sequence and reconciles extracted candidates
//! against the store. A site-level failure is isolated: it is recorded in
//! the run summary and the remaining sites still run.

use crate::adapter::{adapter_for, SiteAdapter};
use crate::config::{Config, SiteConfig};
use crate::crawler::PaginationCrawler;
use crate::dedup::{Classification, DedupEngine};
use crate::model::{CandidateRecord, CrawlStats, RunSummary, SiteOutcome};
use crate::store::Store;
use crate::SiftError;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Drives a full run over all enabled sites
pub struct ScrapeCoordinator {
    dedup: DedupEngine,
    dry_run: bool,
}

impl ScrapeCoordinator {
    pub fn new() -> Self {
        Self {
            dedup: DedupEngine::new(),
            dry_run: false,
        }
    }

    /// In dry-run mode candidates are extracted and counted but nothing is
    /// written to the store
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Crawls every enabled site and returns the aggregated summary.
    ///
    /// The summary always covers all sites attempted; failures appear as
    /// per-site outcomes, never as an error from this function.
    pub async fn run_all(
        &self,
        config: &Config,
        store: &mut dyn Store,
        cancel: Arc<AtomicBool>,
    ) -> RunSummary {
        let started_at = Utc::now();
        let started = Instant::now();

        let mut per_site = BTreeMap::new();
        let mut totals = CrawlStats::default();

        for site in config.enabled_sites() {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!("Run cancelled, skipping remaining sites");
                break;
            }

            // Sites without extraction logic are configuration leftovers,
            // not failures; they get no per-site outcome
            let Some(adapter) = adapter_for(&site.key) else {
                tracing::warn!("No adapter registered for site '{}', skipping", site.key);
                continue;
            };

            tracing::info!("Starting crawl of {} ({})", site.name, site.key);
            let (stats, failure) = self
                .crawl_site(site, adapter, store, Arc::clone(&cancel))
                .await;

            let outcome = match failure {
                None => {
                    tracing::info!(
                        "Finished {}: {} pages, {} listings ({} new, {} updated, {} unchanged, {} errors)",
                        site.key,
                        stats.pages_fetched,
                        stats.records_found,
                        stats.new,
                        stats.updated,
                        stats.unchanged,
                        stats.errors
                    );
                    SiteOutcome::completed(stats)
                }
                Some(error) => {
                    tracing::error!("Crawl of {} failed: {}", site.key, error);
                    SiteOutcome::failed(stats, error.to_string())
                }
            };

            totals.absorb(&outcome.stats);
            per_site.insert(site.key.clone(), outcome);
        }

        RunSummary {
            started_at,
            finished_at: Utc::now(),
            duration_seconds: started.elapsed().as_secs_f64(),
            per_site,
            totals,
        }
    }

    async fn crawl_site(
        &self,
        site: &SiteConfig,
        adapter: Box<dyn SiteAdapter>,
        store: &mut dyn Store,
        cancel: Arc<AtomicBool>,
    ) -> (CrawlStats, Option<SiftError>) {
        let mut crawler = match PaginationCrawler::open(site.clone(), adapter, cancel).await {
            Ok(crawler) => crawler,
            Err(e) => return (CrawlStats::default(), Some(e)),
        };

        let mut delta = CrawlStats::default();
        let mut failure = None;

        'pages: loop {
            match crawler.next_batch().await {
                Ok(Some(batch)) => {
                    for candidate in batch {
                        if let Err(e) = validate(site, &candidate) {
                            tracing::warn!("{}", e);
                            delta.errors += 1;
                            continue;
                        }

                        if self.dry_run {
                            tracing::info!(
                                "[dry run] would reconcile {} ({})",
                                candidate.title,
                                candidate.external_id
                            );
                            continue;
                        }

                        match self.dedup.reconcile(store, &site.key, &candidate) {
                            Ok(Classification::New) => delta.new += 1,
                            Ok(Classification::Updated) => delta.updated += 1,
                            Ok(Classification::Unchanged) => delta.unchanged += 1,
                            Err(e) => {
                                // Store failures are site-fatal
                                failure = Some(e.into());
                                break 'pages;
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        crawler.finish().await;

        let mut stats = crawler.stats();
        stats.absorb(&delta);
        (stats, failure)
    }
}

impl Default for ScrapeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidates missing the fields the natural key and display depend on are
/// dropped before reconciliation
fn validate(site: &SiteConfig, candidate: &CandidateRecord) -> Result<(), SiftError> {
    if candidate.external_id.trim().is_empty() {
        return Err(SiftError::DataIntegrity {
            site: site.key.clone(),
            field: "external_id",
        });
    }
    if candidate.title.trim().is_empty() {
        return Err(SiftError::DataIntegrity {
            site: site.key.clone(),
            field: "title",
        });
    }
    Ok(())
}
