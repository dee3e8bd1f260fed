//! Randomized request identities
//!
//! Every outgoing request carries a freshly sampled user agent and header
//! variation so consecutive requests do not share an obvious fingerprint.

use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

/// Pool of realistic desktop user agents
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.8,es;q=0.7",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.5",
];

const ACCEPT_ENCODINGS: &[&str] = &["gzip, deflate, br", "gzip, deflate", "identity"];

/// Picks a random user agent from the pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Builds the headers for one request: the caller's base headers with a
/// freshly randomized User-Agent, Accept-Language and Accept-Encoding
/// merged on top.
pub fn randomized_headers(base: &BTreeMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in base {
        let parsed = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        );
        match parsed {
            (Ok(n), Ok(v)) => {
                headers.insert(n, v);
            }
            _ => {
                tracing::warn!("Skipping unparseable configured header '{}'", name);
            }
        }
    }

    let mut rng = rand::thread_rng();

    if let Ok(ua) = HeaderValue::from_str(random_user_agent()) {
        headers.insert(reqwest::header::USER_AGENT, ua);
    }
    if let Some(lang) = ACCEPT_LANGUAGES.choose(&mut rng) {
        if let Ok(v) = HeaderValue::from_str(lang) {
            headers.insert(reqwest::header::ACCEPT_LANGUAGE, v);
        }
    }
    if let Some(enc) = ACCEPT_ENCODINGS.choose(&mut rng) {
        if let Ok(v) = HeaderValue::from_str(enc) {
            headers.insert(reqwest::header::ACCEPT_ENCODING, v);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_is_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_randomized_headers_always_set_identity() {
        let headers = randomized_headers(&BTreeMap::new());
        assert!(headers.contains_key(reqwest::header::USER_AGENT));
        assert!(headers.contains_key(reqwest::header::ACCEPT_LANGUAGE));
        assert!(headers.contains_key(reqwest::header::ACCEPT_ENCODING));
    }

    #[test]
    fn test_base_headers_preserved() {
        let mut base = BTreeMap::new();
        base.insert("Accept".to_string(), "text/html".to_string());
        base.insert("Connection".to_string(), "keep-alive".to_string());

        let headers = randomized_headers(&base);
        assert_eq!(headers.get("accept").unwrap(), "text/html");
        assert_eq!(headers.get("connection").unwrap(), "keep-alive");
    }

    #[test]
    fn test_randomization_overrides_base_user_agent() {
        let mut base = BTreeMap::new();
        base.insert("User-Agent".to_string(), "StaticAgent/1.0".to_string());

        let headers = randomized_headers(&base);
        let ua = headers
            .get(reqwest::header::USER_AGENT)
            .unwrap()
            .to_str()
            .unwrap();
        assert_ne!(ua, "StaticAgent/1.0");
        assert!(USER_AGENTS.contains(&ua));
    }

    #[test]
    fn test_unparseable_header_skipped() {
        let mut base = BTreeMap::new();
        base.insert("Bad\nName".to_string(), "value".to_string());

        // Must not panic; the bad entry is dropped
        let headers = randomized_headers(&base);
        assert!(headers.contains_key(reqwest::header::USER_AGENT));
    }
}
