//! Adapter for hirebase.org listings
//!
//! Hirebase renders listings client-side with no stable markup contract, so
//! extraction is heuristic: a cascade of container selectors, then text
//! patterns for the fields. Anything that cannot be parsed is skipped.

use crate::adapter::SiteAdapter;
use crate::model::CandidateRecord;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

/// Container selectors tried in order; the first that matches wins
const LISTING_SELECTORS: &[&str] = &[
    r#"div[class*="job"]"#,
    r#"div[class*="listing"]"#,
    r#"div[class*="card"]"#,
    r#"div[class*="result"]"#,
    "article",
];

/// Selectors likely to hold the role title within a listing container
const TITLE_SELECTORS: &[&str] = &["h1", "h2", "h3", ".title", ".job-title", r#"[class*="title"]"#];

const COMPANY_SELECTORS: &[&str] = &[".company", ".company-name", r#"[class*="company"]"#];

const LOCATION_SELECTORS: &[&str] = &[".location", r#"[class*="location"]"#, ".address"];

/// Role keywords used to tell titles apart from surrounding text
const TITLE_KEYWORDS: &[&str] = &[
    "engineer",
    "scientist",
    "developer",
    "analyst",
    "manager",
    "director",
    "specialist",
    "consultant",
    "architect",
    "lead",
    "senior",
    "junior",
    "data",
    "machine learning",
    "software",
    "backend",
    "frontend",
    "fullstack",
    "devops",
    "cloud",
];

/// Descriptions longer than this are truncated before storage
const MAX_DESCRIPTION_LEN: usize = 2000;

lazy_static! {
    static ref LOCATION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b[A-Z][a-z]+,\s*[A-Z]{2}\b").unwrap(),
        Regex::new(r"\bRemote\b").unwrap(),
        Regex::new(
            r"\bNew York\b|\bSan Francisco\b|\bLos Angeles\b|\bChicago\b|\bBoston\b|\bSeattle\b|\bAustin\b"
        )
        .unwrap(),
    ];
    static ref SALARY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\$[\d,]+\s*-\s*\$[\d,]+").unwrap(),
        Regex::new(r"\$[\d,]+\+?").unwrap(),
        Regex::new(r"(?i)[\d,]+\s*-\s*[\d,]+\s*USD").unwrap(),
        Regex::new(r"(?i)[\d,]+k\s*-\s*[\d,]+k").unwrap(),
    ];
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref NOT_A_COMPANY: Regex = Regex::new(r"^\$|^\d+|^[A-Z]{2,3}$").unwrap();
}

const BASE_URL: &str = "https://hirebase.org";

/// Extraction logic for hirebase.org
pub struct HirebaseAdapter;

impl HirebaseAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Finds the listing containers on a page
    fn listing_elements<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for css in LISTING_SELECTORS {
            if let Ok(selector) = Selector::parse(css) {
                let elements: Vec<_> = document.select(&selector).collect();
                if !elements.is_empty() {
                    tracing::debug!("Found {} listings with selector '{}'", elements.len(), css);
                    return elements;
                }
            }
        }
        Vec::new()
    }

    /// Parses one listing container into a candidate; returns `None` when the
    /// element does not look like a job posting
    fn parse_listing(&self, element: ElementRef<'_>, page_url: &str) -> Option<CandidateRecord> {
        let text = collapsed_text(element);
        if text.len() < 20 {
            return None;
        }

        let title = self.extract_title(element)?;
        let company = self.extract_company(element, &title);
        let location = self.extract_location(element, &text);
        let salary = extract_salary(&text);
        let url = self.extract_url(element);
        let description = truncate(&text, MAX_DESCRIPTION_LEN);

        let external_id = match &url {
            Some(u) => short_digest(u),
            None => short_digest(&format!(
                "{}_{}",
                company.as_deref().unwrap_or("Unknown Company"),
                title
            )),
        };

        tracing::debug!(
            "Parsed listing: {} at {}",
            title,
            company.as_deref().unwrap_or("?")
        );

        Some(CandidateRecord {
            external_id,
            title,
            company,
            location,
            salary,
            requirements: Some(description.clone()),
            description: Some(description),
            url,
            source_page: page_url.to_string(),
            additional_details: Default::default(),
        })
    }

    fn extract_title(&self, element: ElementRef<'_>) -> Option<String> {
        for css in TITLE_SELECTORS {
            if let Ok(selector) = Selector::parse(css) {
                if let Some(found) = element.select(&selector).next() {
                    let text = collapsed_text(found);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }

        // Bold text or links often carry the title when no class does
        for css in ["strong, b", "a"] {
            if let Ok(selector) = Selector::parse(css) {
                for found in element.select(&selector) {
                    let text = collapsed_text(found);
                    if looks_like_title(&text) {
                        return Some(text);
                    }
                }
            }
        }

        // Last resort: the first line of text that reads like a role
        element
            .text()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(5)
            .find(|line| looks_like_title(line))
            .map(str::to_string)
    }

    fn extract_company(&self, element: ElementRef<'_>, title: &str) -> Option<String> {
        for css in COMPANY_SELECTORS {
            if let Ok(selector) = Selector::parse(css) {
                if let Some(found) = element.select(&selector).next() {
                    let text = collapsed_text(found);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }

        // The company usually follows the title in the text flow; skip
        // anything that reads like a salary, a number, or a state code
        let lines: Vec<String> = element
            .text()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        lines
            .iter()
            .skip(1)
            .take(3)
            .find(|line| {
                line.as_str() != title
                    && !looks_like_title(line)
                    && line.len() < 50
                    && !NOT_A_COMPANY.is_match(line)
            })
            .cloned()
    }

    fn extract_location(&self, element: ElementRef<'_>, text: &str) -> Option<String> {
        for css in LOCATION_SELECTORS {
            if let Ok(selector) = Selector::parse(css) {
                if let Some(found) = element.select(&selector).next() {
                    let found_text = collapsed_text(found);
                    if !found_text.is_empty() {
                        return Some(found_text);
                    }
                }
            }
        }

        LOCATION_PATTERNS
            .iter()
            .find_map(|p| p.find(text))
            .map(|m| m.as_str().trim().to_string())
    }

    fn extract_url(&self, element: ElementRef<'_>) -> Option<String> {
        let selector = Selector::parse("a[href]").ok()?;
        let base = Url::parse(BASE_URL).ok()?;
        for link in element.select(&selector) {
            if let Some(href) = link.value().attr("href") {
                if href.starts_with("http") {
                    return Some(href.to_string());
                }
                if href.starts_with('/') {
                    if let Ok(resolved) = base.join(href) {
                        return Some(resolved.to_string());
                    }
                }
            }
        }
        None
    }
}

impl Default for HirebaseAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for HirebaseAdapter {
    fn extract_candidates(&self, document: &Html, page_url: &str) -> Vec<CandidateRecord> {
        let elements = self.listing_elements(document);
        tracing::info!("Found {} potential listings on {}", elements.len(), page_url);

        elements
            .into_iter()
            .filter_map(|element| self.parse_listing(element, page_url))
            .collect()
    }

    fn has_more(&self, document: &Html, current_page: u32) -> bool {
        let next_page = (current_page + 1).to_string();

        for css in [".pagination", ".pager", r#"[class*="page"]"#, r#"a[href*="page"]"#] {
            if let Ok(selector) = Selector::parse(css) {
                for element in document.select(&selector) {
                    let text = collapsed_text(element).to_lowercase();
                    if text.contains("next") || text.contains(&next_page) {
                        return true;
                    }
                }
            }
        }

        // No pagination markup: keep going and let the page cap and the
        // empty-page check stop the crawl
        true
    }

    fn wait_selector(&self) -> Option<&str> {
        Some(r#"div[class*="job"]"#)
    }
}

/// All text of an element with runs of whitespace collapsed to one space
fn collapsed_text(element: ElementRef<'_>) -> String {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    WHITESPACE.replace_all(joined.trim(), " ").to_string()
}

fn looks_like_title(text: &str) -> bool {
    if text.len() < 5 || text.len() > 100 {
        return false;
    }
    let lower = text.to_lowercase();
    TITLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn extract_salary(text: &str) -> Option<String> {
    SALARY_PATTERNS
        .iter()
        .find_map(|p| p.find(text))
        .map(|m| m.as_str().trim().to_string())
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

/// Deterministic short id derived from a stable identifier
fn short_digest(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    hex::encode(digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"
        <html><body>
            <div class="job-card">
                <h3>Senior Machine Learning Engineer</h3>
                <span class="company">Acme Robotics</span>
                <span class="location">San Francisco, CA</span>
                <p>Build ML pipelines. $150,000 - $200,000. Remote friendly.</p>
                <a href="/jobs/ml-engineer-123">View</a>
            </div>
            <div class="job-card">
                <h3>Data Scientist</h3>
                <span class="company">Globex</span>
                <p>Analyze things in Boston, MA.</p>
                <a href="https://hirebase.org/jobs/ds-456">View</a>
            </div>
            <div class="pagination"><a href="?page=2">Next</a></div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_all_listings() {
        let adapter = HirebaseAdapter::new();
        let document = Html::parse_document(LISTING_PAGE);
        let candidates = adapter.extract_candidates(&document, "https://hirebase.org/search?page=1");

        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.title, "Senior Machine Learning Engineer");
        assert_eq!(first.company.as_deref(), Some("Acme Robotics"));
        assert_eq!(first.location.as_deref(), Some("San Francisco, CA"));
        assert_eq!(first.salary.as_deref(), Some("$150,000 - $200,000"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://hirebase.org/jobs/ml-engineer-123")
        );
        assert_eq!(first.source_page, "https://hirebase.org/search?page=1");
    }

    #[test]
    fn test_external_id_is_stable() {
        let adapter = HirebaseAdapter::new();
        let document = Html::parse_document(LISTING_PAGE);

        let a = adapter.extract_candidates(&document, "https://hirebase.org/search?page=1");
        let b = adapter.extract_candidates(&document, "https://hirebase.org/search?page=1");

        assert_eq!(a[0].external_id, b[0].external_id);
        assert_eq!(a[0].external_id.len(), 12);
        assert_ne!(a[0].external_id, a[1].external_id);
    }

    #[test]
    fn test_has_more_with_next_link() {
        let adapter = HirebaseAdapter::new();
        let document = Html::parse_document(LISTING_PAGE);
        assert!(adapter.has_more(&document, 1));
    }

    #[test]
    fn test_short_fragments_skipped() {
        let html = r#"<html><body><div class="job">ad</div></body></html>"#;
        let adapter = HirebaseAdapter::new();
        let document = Html::parse_document(html);
        assert!(adapter
            .extract_candidates(&document, "https://hirebase.org/search?page=1")
            .is_empty());
    }

    #[test]
    fn test_listing_without_title_skipped() {
        let html = r#"
            <html><body>
                <div class="job-card">
                    <p>We are a great place to work, apply today and join us!</p>
                </div>
            </body></html>
        "#;
        let adapter = HirebaseAdapter::new();
        let document = Html::parse_document(html);
        assert!(adapter
            .extract_candidates(&document, "https://hirebase.org/search?page=1")
            .is_empty());
    }

    #[test]
    fn test_description_truncated() {
        assert_eq!(truncate("short", 2000), "short");
        let long = "x".repeat(3000);
        let truncated = truncate(&long, 2000);
        assert_eq!(truncated.len(), 2003);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_salary_patterns() {
        assert_eq!(
            extract_salary("pays $120,000 - $160,000 a year").as_deref(),
            Some("$120,000 - $160,000")
        );
        assert_eq!(extract_salary("around 120k - 160k").as_deref(), Some("120k - 160k"));
        assert_eq!(extract_salary("competitive compensation"), None);
    }
}
