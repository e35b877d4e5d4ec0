//! Single GET with a configured user-agent/referrer/timeout; extracts the
//! outbound site-relative links (§4.3).

use crate::error::{AppError, Result};
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

fn link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

/// Result of a single fetch: status, raw HTML, and the distinct set of
/// site-relative outbound links.
pub struct FetchResult {
    pub http_code: i64,
    pub html: String,
    pub outbound_links: Vec<String>,
}

/// Plain `reqwest`-based fetcher (no stealth/emulation — spec has no
/// evasion requirement).
pub struct Fetcher {
    client: reqwest::Client,
    user_agent: String,
    referrer: String,
}

impl Fetcher {
    /// Builds a fetcher with the spec's default 10-second timeout (§4.3).
    pub fn new(user_agent: impl Into<String>, referrer: impl Into<String>) -> Result<Self> {
        Self::with_timeout(user_agent, referrer, Duration::from_secs(10))
    }

    pub fn with_timeout(
        user_agent: impl Into<String>,
        referrer: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::fetch("<client init>", e.to_string()))?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
            referrer: referrer.into(),
        })
    }

    /// GETs `url`. On network or protocol failure returns a retriable
    /// `AppError::Fetch` (per §7, the caller abandons the path, not the site).
    pub async fn fetch(&self, url: &str) -> Result<FetchResult> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Referer", &self.referrer)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e.to_string()))?;

        let http_code = response.status().as_u16() as i64;
        let html = response
            .text()
            .await
            .map_err(|e| AppError::fetch(url, e.to_string()))?;

        let outbound_links = extract_site_relative_links(&html);

        Ok(FetchResult {
            http_code,
            html,
            outbound_links,
        })
    }
}

/// Distinct `href` values starting with `/` but not `//` (protocol-relative,
/// per §4.4's tie-break).
pub fn extract_site_relative_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for element in document.select(link_selector()) {
        if let Some(href) = element.value().attr("href") {
            if href.starts_with('/') && !href.starts_with("//") && seen.insert(href.to_string()) {
                links.push(href.to_string());
            }
        }
    }
    links
}

/// Strips tags, leaving plain text for Analyzer/snippet construction.
pub fn extract_plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

/// Extracted page `<title>`, or an empty string if absent.
pub fn extract_title(html: &str) -> String {
    static TITLE_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = TITLE_SELECTOR.get_or_init(|| Selector::parse("title").expect("static selector"));
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_site_relative_links_only() {
        let html = r#"
            <html><body>
                <a href="/about">About</a>
                <a href="https://other.com/page">External</a>
                <a href="//cdn.example.com/x">Protocol relative</a>
                <a href="/about">Duplicate</a>
            </body></html>
        "#;
        let links = extract_site_relative_links(html);
        assert_eq!(links, vec!["/about".to_string()]);
    }

    #[test]
    fn extracts_title() {
        let html = "<html><head><title>Hello</title></head><body></body></html>";
        assert_eq!(extract_title(html), "Hello");
    }

    #[tokio::test]
    async fn fetch_reports_status_and_links() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<html><body><a href="/next">Next</a></body></html>"#)
            .create_async()
            .await;

        let fetcher = Fetcher::new("lexisearch/0.1", "https://lexisearch.local/").unwrap();
        let result = fetcher.fetch(&server.url()).await.unwrap();
        assert_eq!(result.http_code, 200);
        assert_eq!(result.outbound_links, vec!["/next".to_string()]);
    }

    #[tokio::test]
    async fn fetch_error_is_retriable_fetch_error() {
        let fetcher = Fetcher::new("lexisearch/0.1", "https://lexisearch.local/").unwrap();
        let result = fetcher.fetch("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(AppError::Fetch { .. })));
    }
}
