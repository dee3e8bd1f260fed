//! Headless browser session for script-rendered sites
//!
//! Wraps a Chromium instance driven over CDP with a configuration that
//! minimizes automation fingerprints: fixed viewport, automation switches
//! disabled, a rotated user agent from the shared identity pool, and a
//! new-document script masking the usual bot-detection signals.
//!
//! The session is single-owner: one per site crawl, closed on every exit
//! path. Rendering failures degrade to `None` and never cross this boundary
//! as errors.

use crate::config::DelayRange;
use crate::fetch::identity::random_user_agent;
use crate::fetch::{FetchError, Renderer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Human-like settle delay applied after navigation
const SETTLE_DELAY: DelayRange = DelayRange(1.5, 3.0);

/// Pause between scroll positions when triggering lazy loading
const SCROLL_PAUSE: Duration = Duration::from_secs(1);

/// Polling interval while waiting for page conditions
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Script injected on every new document to mask automation indicators
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
"#;

/// Heuristic for SPA pages: the application shell has rendered something
const SHELL_POPULATED: &str =
    "document.querySelector('#root') !== null && document.querySelector('#root').children.length > 0";

/// A scoped headless-browser session.
///
/// Acquired with [`BrowserSession::open`]; [`BrowserSession::close`] is
/// idempotent and must run on every exit path, including early termination.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    page: Option<Page>,
    wait_timeout: Duration,
}

impl BrowserSession {
    /// Launches a stealth-configured headless Chromium instance
    pub async fn open(wait_timeout: Duration) -> Result<Self, FetchError> {
        let user_agent = random_user_agent();

        let config = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-infobars")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        // The handler must be polled for the browser connection to make
        // progress; it runs until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Browser session opened (user agent: {})", user_agent);

        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            page: None,
            wait_timeout,
        })
    }

    /// Navigates to a page, settles, and waits for it to become usable.
    ///
    /// Wait tiers, each degrading with a warning instead of failing:
    /// 1. the caller's CSS selector, up to the session wait timeout
    /// 2. application-shell heuristic (`#root` has children), then a grace
    ///    period for listings to populate
    /// 3. any visible `body`
    ///
    /// Returns the rendered HTML, or `None` on browser-level failure.
    pub async fn load_page(&mut self, url: &str, wait_selector: Option<&str>) -> Option<String> {
        // Close any page left over from the previous load
        self.close_page().await;

        let browser = self.browser.as_ref()?;

        let page = match browser.new_page("about:blank").await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Failed to open browser tab for {}: {}", url, e);
                return None;
            }
        };

        if let Err(e) = page.evaluate_on_new_document(STEALTH_SCRIPT).await {
            tracing::warn!("Failed to install stealth script: {}", e);
        }

        tracing::info!("Loading page in browser: {}", url);
        if let Err(e) = page.goto(url).await {
            tracing::error!("Navigation to {} failed: {}", url, e);
            let _ = page.close().await;
            return None;
        }

        // Human-like settle before poking at the page
        tokio::time::sleep(SETTLE_DELAY.sample()).await;
        self.simulate_pointer(&page).await;

        if let Some(selector) = wait_selector {
            if self.wait_for_selector(&page, selector, self.wait_timeout).await {
                tracing::debug!("Wait selector '{}' matched on {}", selector, url);
            } else {
                tracing::warn!("Timeout waiting for selector '{}' on {}", selector, url);
                self.wait_for_shell_or_body(&page, url).await;
            }
        } else {
            self.wait_for_shell_or_body(&page, url).await;
        }

        // Let late scripts finish before extracting
        tokio::time::sleep(DelayRange(1.0, 2.0).sample()).await;

        let html = match page.content().await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::error!("Failed to read rendered content of {}: {}", url, e);
                None
            }
        };

        self.page = Some(page);
        html
    }

    /// Scrolls to the bottom and back to trigger lazy loading
    pub async fn scroll_to_trigger_lazy_load(&self) {
        let Some(page) = self.page.as_ref() else {
            return;
        };

        if let Err(e) = page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
        {
            tracing::warn!("Error scrolling page: {}", e);
            return;
        }
        tokio::time::sleep(SCROLL_PAUSE).await;

        if let Err(e) = page.evaluate("window.scrollTo(0, 0)").await {
            tracing::warn!("Error scrolling page: {}", e);
        }
        tokio::time::sleep(SCROLL_PAUSE).await;
    }

    /// Re-reads the current page content (after scrolling)
    pub async fn content(&self) -> Option<String> {
        let page = self.page.as_ref()?;
        match page.content().await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::error!("Failed to read page content: {}", e);
                None
            }
        }
    }

    /// Closes the session; safe to call more than once
    pub async fn close(&mut self) {
        self.close_page().await;

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::error!("Error closing browser: {}", e);
            }
            let _ = browser.wait().await;
            tracing::info!("Browser session closed");
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }

    async fn close_page(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Error closing browser tab: {}", e);
            }
        }
    }

    /// Dispatches a synthetic pointer movement; best effort only
    async fn simulate_pointer(&self, page: &Page) {
        use rand::Rng;
        let (x, y) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(100..800), rng.gen_range(100..600))
        };
        let script = format!(
            "document.dispatchEvent(new MouseEvent('mousemove', {{ clientX: {}, clientY: {}, bubbles: true }}))",
            x, y
        );
        if let Err(e) = page.evaluate(script).await {
            tracing::debug!("Pointer simulation failed: {}", e);
        }
    }

    /// Polls for a CSS selector until it matches or the timeout elapses
    async fn wait_for_selector(&self, page: &Page, selector: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    /// Fallback tiers after the primary selector timed out (or was absent)
    async fn wait_for_shell_or_body(&self, page: &Page, url: &str) {
        if self
            .wait_for_condition(page, SHELL_POPULATED, Duration::from_secs(10))
            .await
        {
            tracing::info!("Application shell populated on {}, waiting for listings", url);
            tokio::time::sleep(Duration::from_secs(5)).await;
            return;
        }

        tracing::warn!("Shell check failed on {}, trying generic body wait", url);
        if !self
            .wait_for_selector(page, "body", Duration::from_secs(5))
            .await
        {
            tracing::warn!("No visible body on {}, proceeding anyway", url);
        }
    }

    /// Polls a JS boolean expression until it is true or the timeout elapses
    async fn wait_for_condition(&self, page: &Page, expression: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(result) = page.evaluate(expression).await {
                if result.into_value::<bool>().unwrap_or(false) {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }
}

#[async_trait]
impl Renderer for BrowserSession {
    async fn render(&mut self, url: &str, wait_selector: Option<&str>) -> Option<String> {
        self.load_page(url, wait_selector).await?;

        // Trigger lazy loading, then re-extract the settled document
        self.scroll_to_trigger_lazy_load().await;
        let html = self.content().await;
        self.close_page().await;
        html
    }

    async fn close(&mut self) {
        BrowserSession::close(self).await;
    }
}
