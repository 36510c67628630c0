use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::info;

use crate::models::job::ExtractionResponse;
use crate::page_scraper::html::HtmlDocument;
use crate::page_scraper::indicator::Indicator;

const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A loaded page: the scraper's view of the active tab.
#[derive(Debug, Clone)]
pub struct Page {
    url: String,
    html: String,
    indicator: Indicator,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            indicator: Indicator::default(),
        }
    }

    /// Downloads a page over HTTP. Non-2xx responses are errors.
    pub async fn fetch(client: &Client, url: &str) -> Result<Self> {
        info!(url, "Fetching page");
        let response = client
            .get(url)
            .timeout(PAGE_FETCH_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Fetching {url} returned HTTP {status}");
        }

        // Keep the post-redirect address, like a browser tab would.
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?;
        Ok(Self::new(final_url, html))
    }

    /// Reads a saved page from disk. `url` defaults to a `file://` address.
    pub async fn from_file(path: &Path, url: Option<String>) -> Result<Self> {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read page {}", path.display()))?;
        let url = url.unwrap_or_else(|| format!("file://{}", path.display()));
        Ok(Self::new(url, html))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[cfg(test)]
    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn show_indicator(&self) -> bool {
        self.indicator.show()
    }

    /// Parses the document and runs title/content extraction.
    pub fn extract(&self) -> ExtractionResponse {
        let document = HtmlDocument::parse(&self.html);
        crate::page_scraper::extract(&document, &self.url)
    }
}
