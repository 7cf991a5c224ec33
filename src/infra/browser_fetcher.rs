use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::app::ports::PageFetcher;
use crate::config::BrowserConfig;
use crate::error::{FetchError, Result, ScraperError};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Page fetcher driving a real browser over WebDriver, for listings that are
/// built by scripts and grow as the page is scrolled.
pub struct BrowserPageFetcher {
    client: Client,
    max_scroll: usize,
    scroll_pause: Duration,
}

impl BrowserPageFetcher {
    /// Open a session against the configured WebDriver server.
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let mut capabilities = serde_json::Map::new();
        if config.headless {
            capabilities.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["--headless"] }),
            );
            capabilities.insert(
                "goog:chromeOptions".to_string(),
                json!({ "args": ["--headless=new"] }),
            );
        }

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| {
                ScraperError::Browser(format!(
                    "failed to connect to WebDriver at {}: {}",
                    config.webdriver_url, e
                ))
            })?;

        info!(webdriver = %config.webdriver_url, "Browser session started");
        Ok(Self {
            client,
            max_scroll: config.max_scroll,
            scroll_pause: config.scroll_pause(),
        })
    }

    /// Handle on the underlying session, for closing it once the run is over.
    pub fn session(&self) -> Client {
        self.client.clone()
    }

    async fn scroll_to_bottom(&self) -> std::result::Result<(), CmdError> {
        for _ in 0..self.max_scroll {
            self.client.execute(SCROLL_TO_BOTTOM, vec![]).await?;
            tokio::time::sleep(self.scroll_pause).await;
        }
        Ok(())
    }
}

/// A dropped WebDriver connection takes every later page with it.
fn command_error(url: &str, e: CmdError) -> FetchError {
    match e {
        CmdError::Lost(e) => FetchError::Unavailable(format!("browser session lost: {e}")),
        e => FetchError::Page {
            url: url.to_string(),
            message: e.to_string(),
        },
    }
}

#[async_trait]
impl PageFetcher for BrowserPageFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| command_error(url, e))?;
        self.scroll_to_bottom()
            .await
            .map_err(|e| command_error(url, e))?;

        let html = self
            .client
            .source()
            .await
            .map_err(|e| command_error(url, e))?;
        debug!(bytes = html.len(), scrolls = self.max_scroll, "rendered page");
        Ok(html)
    }
}
