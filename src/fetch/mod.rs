//! Fetch layer: HTTP client, browser session, and randomized identities
//!
//! Two independent capabilities are exposed as traits and injected into the
//! crawler: [`Fetcher`] for plain HTTP pages and [`Renderer`] for pages that
//! need a scripted browser. Both absorb adverse outcomes (blocking,
//! rate-limiting, rendering failures) instead of raising them.

mod browser;
mod client;
mod identity;

pub use browser::BrowserSession;
pub use client::FetchClient;
pub use identity::{random_user_agent, randomized_headers};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by the fetch layer
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Retries exhausted for {url} after {attempts} attempts (last status {status})")]
    RetriesExhausted {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("Browser error: {0}")]
    Browser(String),
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// Final URL after redirects
    pub final_url: String,

    /// Page body
    pub body: String,
}

/// Capability for fetching a page over plain HTTP.
///
/// `Ok(None)` is a soft failure: the site is blocking or rate-limiting us
/// and the page should be skipped, not treated as fatal.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Option<FetchResponse>, FetchError>;
}

/// Capability for rendering a script-driven page in a browser.
///
/// `None` means the page could not be rendered; rendering failures are
/// never errors at this boundary.
#[async_trait]
pub trait Renderer: Send {
    /// Navigates to `url`, waits for the page to be usable, and returns the
    /// rendered HTML
    async fn render(&mut self, url: &str, wait_selector: Option<&str>) -> Option<String>;

    /// Releases the underlying browser; must be idempotent
    async fn close(&mut self);
}
