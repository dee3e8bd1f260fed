//! Pull-based pagination crawler
//!
//! Walks one site's search results page by page. The caller drives the crawl
//! by asking for the next batch; termination (page cap, empty page, no-more
//! signal, error threshold, cancellation) is decided here.

use crate::adapter::SiteAdapter;
use crate::config::SiteConfig;
use crate::fetch::{BrowserSession, FetchClient, Fetcher, Renderer};
use crate::model::{CandidateRecord, CrawlStats};
use crate::{FetchMode, SiftError};
use scraper::Html;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Consecutive page failures tolerated before the crawl is abandoned
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// How long the browser waits for the adapter's listing selector
const BROWSER_WAIT: Duration = Duration::from_secs(10);

/// Offset-paginated sites expose this many results per page
const RESULTS_PER_PAGE: u32 = 10;

enum Transport {
    Http(Box<dyn Fetcher>),
    Browser(Box<dyn Renderer>),
}

/// Walks one site's paginated search results.
///
/// Each [`PaginationCrawler::next_batch`] call fetches and extracts one
/// listing page; `None` means the crawl is over. [`PaginationCrawler::finish`]
/// must run on every exit path to release the browser.
pub struct PaginationCrawler {
    site: SiteConfig,
    adapter: Box<dyn SiteAdapter>,
    transport: Transport,
    cancel: Arc<AtomicBool>,
    cursor: u32,
    first_fetch: bool,
    consecutive_errors: u32,
    done: bool,
    stats: CrawlStats,
}

impl PaginationCrawler {
    /// Opens a crawler with the transport the site is configured for
    pub async fn open(
        site: SiteConfig,
        adapter: Box<dyn SiteAdapter>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, SiftError> {
        let transport = match site.fetch_mode {
            FetchMode::Http => Transport::Http(Box::new(FetchClient::new(&site)?)),
            FetchMode::Browser => {
                Transport::Browser(Box::new(BrowserSession::open(BROWSER_WAIT).await?))
            }
        };
        Ok(Self::with_transport(site, adapter, transport, cancel))
    }

    /// Opens a crawler over a caller-supplied fetcher (used by tests)
    pub fn with_fetcher(
        site: SiteConfig,
        adapter: Box<dyn SiteAdapter>,
        fetcher: Box<dyn Fetcher>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self::with_transport(site, adapter, Transport::Http(fetcher), cancel)
    }

    fn with_transport(
        site: SiteConfig,
        adapter: Box<dyn SiteAdapter>,
        transport: Transport,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let cursor = site.pagination_start;
        Self {
            site,
            adapter,
            transport,
            cancel,
            cursor,
            first_fetch: true,
            consecutive_errors: 0,
            done: false,
            stats: CrawlStats::default(),
        }
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> CrawlStats {
        self.stats
    }

    /// Builds the URL for a given page number.
    ///
    /// Templates may carry a `{page}` or `{start}` placeholder; without one,
    /// the configured pagination parameter is appended.
    pub fn page_url(&self, page: u32) -> String {
        let template = &self.site.search_url;

        if template.contains("{page}") {
            return template.replace("{page}", &page.to_string());
        }
        if template.contains("{start}") {
            let start = page.saturating_sub(1) * RESULTS_PER_PAGE;
            return template.replace("{start}", &start.to_string());
        }

        let separator = if template.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            template, separator, self.site.pagination_param, page
        )
    }

    /// Fetches and extracts the next listing page.
    ///
    /// Returns `Ok(None)` once the crawl is over. Page-level failures are
    /// absorbed: the crawler logs, counts the error, and moves to the next
    /// page until the consecutive-error threshold is hit.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<CandidateRecord>>, SiftError> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!("Crawl of {} cancelled", self.site.key);
                self.done = true;
                return Ok(None);
            }
            if self.cursor > self.site.max_pages {
                tracing::info!(
                    "Reached page cap ({}) for {}",
                    self.site.max_pages,
                    self.site.key
                );
                self.done = true;
                return Ok(None);
            }

            let page = self.cursor;
            let url = self.page_url(page);
            tracing::info!("Crawling {} page {}: {}", self.site.key, page, url);

            // Pace between pages, but never before the first request
            if !self.first_fetch {
                let delay = self.site.delay_range.sample();
                tracing::debug!("Sleeping {:.2}s before next page", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
            self.first_fetch = false;

            let wait = self.adapter.wait_selector().map(str::to_string);
            let Some(html) = self.fetch_page(&url, wait.as_deref()).await else {
                self.record_page_failure(page);
                continue;
            };

            self.stats.pages_fetched += 1;
            self.consecutive_errors = 0;

            // Parsing is confined to this block; the document does not
            // survive across awaits
            let (mut candidates, has_more) = {
                let document = Html::parse_document(&html);
                let candidates = self.adapter.extract_candidates(&document, &url);
                let has_more = self.adapter.has_more(&document, page);
                (candidates, has_more)
            };

            if candidates.is_empty() {
                tracing::warn!("No listings found on {} page {}, stopping", self.site.key, page);
                self.done = true;
                return Ok(None);
            }

            if self.adapter.supports_detail_pages() {
                self.enrich_with_details(&mut candidates).await;
            }

            self.stats.records_found += candidates.len() as u64;
            tracing::info!(
                "Found {} listings on {} page {}",
                candidates.len(),
                self.site.key,
                page
            );

            if !has_more {
                tracing::info!("No further pages signalled by {} page {}", self.site.key, page);
                self.done = true;
            }
            self.cursor += 1;

            return Ok(Some(candidates));
        }
    }

    /// Releases the transport; required on every exit path
    pub async fn finish(&mut self) {
        if let Transport::Browser(renderer) = &mut self.transport {
            renderer.close().await;
        }
    }

    fn record_page_failure(&mut self, page: u32) {
        self.stats.errors += 1;
        self.consecutive_errors += 1;
        self.cursor += 1;

        if self.consecutive_errors > MAX_CONSECUTIVE_ERRORS {
            tracing::error!(
                "{} consecutive failures on {}, abandoning crawl at page {}",
                self.consecutive_errors,
                self.site.key,
                page
            );
            self.done = true;
        }
    }

    async fn fetch_page(&mut self, url: &str, wait_selector: Option<&str>) -> Option<String> {
        match &mut self.transport {
            Transport::Http(fetcher) => match fetcher.fetch(url).await {
                Ok(Some(response)) => Some(response.body),
                Ok(None) => {
                    tracing::warn!("Skipping {} (blocked or rate limited)", url);
                    None
                }
                Err(e) => {
                    tracing::error!("Failed to fetch {}: {}", url, e);
                    None
                }
            },
            Transport::Browser(renderer) => renderer.render(url, wait_selector).await,
        }
    }

    /// Fetches detail pages for the first batch-size candidates and merges
    /// the extracted fields. Failures degrade to the listing-level data.
    async fn enrich_with_details(&mut self, candidates: &mut [CandidateRecord]) {
        let detail_delay = self.site.detail_delay();
        let detail_wait = self
            .adapter
            .detail_wait_selector()
            .map(str::to_string);
        let batch = self.site.detail_batch_size as usize;

        let indices: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.url.is_some())
            .map(|(i, _)| i)
            .take(batch)
            .collect();

        for i in indices {
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }

            let Some(url) = candidates[i].url.clone() else {
                continue;
            };

            tokio::time::sleep(detail_delay.sample()).await;

            let Some(html) = self.fetch_page(&url, detail_wait.as_deref()).await else {
                tracing::warn!("Failed to fetch details from {}", url);
                continue;
            };

            let details = {
                let document = Html::parse_document(&html);
                self.adapter.extract_details(&document)
            };

            if let Some(details) = details {
                candidates[i].additional_details.extend(details);
            }
        }
    }
}
