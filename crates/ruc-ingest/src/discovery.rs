//! Archive link discovery
//!
//! Fetches a page and collects every `<a href>` that points at a `.zip`
//! archive, resolved to an absolute http(s) URL. Discovery never fails the
//! run: a bad page URL or an unreachable page yields an empty list.

use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{IngestError, Result};

pub(crate) const USER_AGENT: &str = concat!("ruc-ingest/", env!("CARGO_PKG_VERSION"));

/// Whether `candidate` is an absolute http(s) URL with a host.
pub fn is_valid_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| is_http_with_host(&url))
        .unwrap_or(false)
}

fn is_http_with_host(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Whether an href looks like an archive link.
fn is_archive_href(href: &str) -> bool {
    let lower = href.to_lowercase();
    lower.ends_with(".zip") || lower.contains(".zip/")
}

/// Extract archive links from an HTML document, in document order.
///
/// Relative hrefs are resolved against `base`. Duplicates are kept.
pub fn extract_archive_links(html: &str, base: &Url) -> Vec<Url> {
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(e) => {
            warn!(error = ?e, "Failed to build link selector");
            return Vec::new();
        },
    };

    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if !is_archive_href(href) {
            continue;
        }

        match base.join(href.trim()) {
            Ok(resolved) if is_http_with_host(&resolved) => {
                debug!(href = %href, url = %resolved, "Found archive link");
                links.push(resolved);
            },
            Ok(resolved) => {
                debug!(url = %resolved, "Skipping archive link with unsupported scheme");
            },
            Err(e) => {
                debug!(href = %href, error = %e, "Skipping unresolvable archive link");
            },
        }
    }

    links
}

/// Finds archive links on a listing page
pub struct LinkDiscoverer {
    client: Client,
}

impl LinkDiscoverer {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Discover archive links on `page_url`.
    ///
    /// Returns an empty list when the URL is invalid or the page cannot be fetched.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, page_url: &str) -> Vec<Url> {
        let base = match Url::parse(page_url) {
            Ok(url) if is_http_with_host(&url) => url,
            _ => {
                warn!(url = %page_url, "Invalid page URL, expected http(s) with a host");
                return Vec::new();
            },
        };

        let html = match self.fetch_page(&base).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %base, error = %e, "Failed to fetch listing page");
                return Vec::new();
            },
        };

        let links = extract_archive_links(&html, &base);
        info!(url = %base, count = links.len(), "Discovered {} archive link(s)", links.len());
        links
    }

    async fn fetch_page(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "Fetching listing page");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/file.zip"));
        assert!(is_valid_url("http://example.com/file.zip"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_extract_archive_links_resolves_and_filters() {
        let base = Url::parse("https://example.com/datos/").unwrap();
        let html = r#"
            <html><body>
              <a href="a.zip">A</a>
              <a href="/x/B.ZIP">B</a>
              <a href="readme.txt">readme</a>
              <a href="https://cdn.example.com/c.zip/download">C</a>
              <a href="ftp://example.com/d.zip">D</a>
              <a>no href</a>
            </body></html>
        "#;

        let links: Vec<String> = extract_archive_links(html, &base)
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            links,
            vec![
                "https://example.com/datos/a.zip",
                "https://example.com/x/B.ZIP",
                "https://cdn.example.com/c.zip/download",
            ]
        );
    }

    #[test]
    fn test_extract_archive_links_keeps_duplicates_in_order() {
        let base = Url::parse("http://example.com/").unwrap();
        let html = r#"<a href="one.zip"></a><a href="two.zip"></a><a href="one.zip"></a>"#;

        let links = extract_archive_links(html, &base);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0], links[2]);
        assert!(links[1].path().ends_with("two.zip"));
    }

    #[tokio::test]
    async fn test_discover_invalid_page_url_is_empty() {
        let discoverer = LinkDiscoverer::new(Duration::from_secs(1)).unwrap();
        assert!(discoverer.discover("not a url").await.is_empty());
        assert!(discoverer.discover("ftp://example.com/").await.is_empty());
    }
}
