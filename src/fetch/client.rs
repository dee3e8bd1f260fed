//! HTTP fetch client
//!
//! Issues GET requests with a fresh randomized identity per call, retries
//! transient failures with exponential backoff, and absorbs rate-limiting
//! and blocking signals as soft failures instead of errors.

use crate::config::{DelayRange, SiteConfig};
use crate::fetch::identity::randomized_headers;
use crate::fetch::{FetchError, FetchResponse, Fetcher};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Default cool-down applied after a 429 before returning the soft failure
const RATE_LIMIT_COOLDOWN: DelayRange = DelayRange(30.0, 60.0);

/// Unit for exponential backoff; attempt n sleeps `unit * 2^n` (2s, 4s, 8s)
const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// HTTP fetch client bound to one site's configuration.
///
/// `fetch` returns `Ok(None)` for blocked/rate-limited responses (a soft
/// failure the caller may skip), `Ok(Some(_))` for usable pages, and `Err`
/// only for terminal failures.
pub struct FetchClient {
    client: Client,
    base_headers: BTreeMap<String, String>,
    max_retries: u32,
    backoff_unit: Duration,
    cooldown: DelayRange,
}

impl FetchClient {
    /// Creates a client for the given site configuration
    pub fn new(site: &SiteConfig) -> Result<Self, FetchError> {
        Self::with_pacing(site, BACKOFF_UNIT, RATE_LIMIT_COOLDOWN)
    }

    /// Creates a client with explicit backoff and cool-down pacing.
    ///
    /// Production callers use [`FetchClient::new`]; tests scale the pacing
    /// down so the 429 path is assertable without multi-second sleeps.
    pub fn with_pacing(
        site: &SiteConfig,
        backoff_unit: Duration,
        cooldown: DelayRange,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(site.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_headers: site.headers.clone(),
            max_retries: site.max_retries,
            backoff_unit,
            cooldown,
        })
    }

    /// Fetches a URL, returning the body on success or `None` when the site
    /// is actively blocking us.
    ///
    /// Retry behavior:
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 5xx / 429 | Retry up to max_retries with exponential backoff |
    /// | Timeout / connect error | Retry up to max_retries with backoff |
    /// | 429 after retries | Cool down 30-60s, return `Ok(None)` |
    /// | 403 / 503 after retries | Return `Ok(None)` |
    /// | Other 5xx after retries | `Err(RetriesExhausted)` |
    /// | Other non-success | `Err(Status)` |
    pub async fn fetch(&self, url: &str) -> Result<Option<FetchResponse>, FetchError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let headers = randomized_headers(&self.base_headers);

            match self.client.get(url).headers(headers).send().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status.is_server_error() || status.as_u16() == 429;

                    if retryable && attempt <= self.max_retries {
                        let backoff = self.backoff_unit * 2u32.saturating_pow(attempt);
                        tracing::warn!(
                            "HTTP {} from {} (attempt {}), backing off {:?}",
                            status,
                            url,
                            attempt,
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    match status.as_u16() {
                        429 => {
                            let cooldown = self.cooldown.sample();
                            tracing::warn!(
                                "Rate limited on {}, cooling down {:.1}s before skipping",
                                url,
                                cooldown.as_secs_f64()
                            );
                            tokio::time::sleep(cooldown).await;
                            return Ok(None);
                        }
                        403 | 503 => {
                            tracing::warn!(
                                "Potential blocking detected on {} (HTTP {}), skipping",
                                url,
                                status
                            );
                            return Ok(None);
                        }
                        s if status.is_server_error() => {
                            return Err(FetchError::RetriesExhausted {
                                url: url.to_string(),
                                status: s,
                                attempts: attempt,
                            });
                        }
                        s if !status.is_success() => {
                            return Err(FetchError::Status {
                                url: url.to_string(),
                                status: s,
                            });
                        }
                        _ => {
                            let final_url = response.url().to_string();
                            let body =
                                response
                                    .text()
                                    .await
                                    .map_err(|source| FetchError::Network {
                                        url: url.to_string(),
                                        source,
                                    })?;

                            tracing::debug!(
                                "Fetched {} ({}, {} bytes) in {:?}",
                                url,
                                status,
                                body.len(),
                                started.elapsed()
                            );

                            return Ok(Some(FetchResponse {
                                status: status.as_u16(),
                                final_url,
                                body,
                            }));
                        }
                    }
                }
                Err(source) => {
                    let transient = source.is_timeout() || source.is_connect();
                    if transient && attempt <= self.max_retries {
                        let backoff = self.backoff_unit * 2u32.saturating_pow(attempt);
                        tracing::warn!(
                            "Request to {} failed on attempt {} ({}), backing off {:?}",
                            url,
                            attempt,
                            source,
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    return Err(FetchError::Network {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &str) -> Result<Option<FetchResponse>, FetchError> {
        FetchClient::fetch(self, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchMode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_site(timeout_secs: u64) -> SiteConfig {
        SiteConfig {
            key: "testsite".to_string(),
            name: "Test Site".to_string(),
            base_url: "https://example.com".to_string(),
            search_url: "https://example.com/search?page={page}".to_string(),
            enabled: true,
            fetch_mode: FetchMode::Http,
            max_pages: 3,
            delay_range: DelayRange(0.0, 0.0),
            detail_delay_range: None,
            detail_batch_size: 10,
            max_retries: 2,
            timeout_secs,
            headers: BTreeMap::new(),
            pagination_param: "page".to_string(),
            pagination_start: 1,
        }
    }

    fn fast_client(site: &SiteConfig) -> FetchClient {
        FetchClient::with_pacing(site, Duration::from_millis(1), DelayRange(0.01, 0.02)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>jobs</html>"))
            .mount(&server)
            .await;

        let client = fast_client(&test_site(5));
        let response = client
            .fetch(&format!("{}/jobs", server.uri()))
            .await
            .unwrap()
            .expect("expected a page");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>jobs</html>");
    }

    #[tokio::test]
    async fn test_forbidden_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = fast_client(&test_site(5));
        let result = client.fetch(&server.uri()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_cools_down_then_soft_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let site = test_site(5);
        let client =
            FetchClient::with_pacing(&site, Duration::from_millis(1), DelayRange(0.05, 0.1))
                .unwrap();

        let started = Instant::now();
        let result = client.fetch(&server.uri()).await.unwrap();
        let elapsed = started.elapsed();

        // Soft failure, never an error
        assert!(result.is_none());
        // The cool-down must have been applied after the retries
        assert!(elapsed >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3) // initial attempt + 2 retries
            .mount(&server)
            .await;

        let client = fast_client(&test_site(5));
        let err = client.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::RetriesExhausted {
                status: 500,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = fast_client(&test_site(5));
        let response = client.fetch(&server.uri()).await.unwrap().unwrap();
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn test_not_found_is_a_hard_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = fast_client(&test_site(5));
        let err = client.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 1 is essentially guaranteed to refuse connections
        let client = fast_client(&test_site(1));
        let err = client.fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
