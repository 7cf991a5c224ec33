use crate::app::ports::PageFetcher;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Plain HTTP page fetcher for server-rendered listings. Script-built pages go
/// through [`super::browser_fetcher::BrowserPageFetcher`].
///
/// A host that cannot be reached at all (refused connection, DNS failure) makes
/// the fetcher unavailable; timeouts and bad statuses only fail that page.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let page_error = |message: String| FetchError::Page {
            url: url.to_string(),
            message,
        };

        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() || e.is_connect() {
                FetchError::Unavailable(e.to_string())
            } else {
                page_error(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(page_error(format!("HTTP status {}", status.as_u16())));
        }

        let body = resp.text().await.map_err(|e| page_error(e.to_string()))?;
        debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}
