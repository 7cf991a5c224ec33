use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants::*;
use crate::error::{Result, ScraperError};
use crate::pipeline::processing::assemble::{AssemblerConfig, DuplicatePolicy};
use crate::pipeline::processing::normalize::EventbriteDateFormat;
use crate::types::SourceKind;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub assembler: AssemblerSection,
    pub geocoding: GeocodingConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
    pub sources: Vec<SourceConfig>,
}

/// `[assembler]` table. Mirrors [`AssemblerConfig`] with file-friendly shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssemblerSection {
    pub default_city: String,
    pub default_country_code: String,
    pub geocode_api_key: Option<String>,
    /// `"fuzzy"` or `"exact"`
    pub duplicate_policy: String,
    pub fuzzy_threshold: u8,
    /// `"ranged"` or `"year_less"`
    pub eventbrite_date_format: String,
    /// Year assumed for year-less dates; current year when unset
    pub reference_year: Option<i32>,
    pub enrich_address: bool,
}

impl Default for AssemblerSection {
    fn default() -> Self {
        Self {
            default_city: DEFAULT_CITY.to_string(),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            geocode_api_key: None,
            duplicate_policy: "fuzzy".to_string(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            eventbrite_date_format: "ranged".to_string(),
            reference_year: None,
            enrich_address: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub nominatim_url: String,
    pub places_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            nominatim_url: NOMINATIM_URL.to_string(),
            places_url: GOOGLE_PLACES_FIND_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_seconds: HTTP_TIMEOUT_SECONDS,
            max_attempts: GEOCODE_MAX_ATTEMPTS,
            retry_delay_ms: GEOCODE_RETRY_DELAY_MS,
        }
    }
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// `[browser]` table: the WebDriver session used by `fetcher = "browser"` sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    /// Scrolls to the bottom of each page before reading it
    pub max_scroll: usize,
    pub scroll_pause_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: WEBDRIVER_URL.to_string(),
            headless: true,
            max_scroll: BROWSER_MAX_SCROLL,
            scroll_pause_ms: BROWSER_SCROLL_PAUSE_MS,
        }
    }
}

impl BrowserConfig {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
        }
    }
}

/// One `[[sources]]` entry: where to scrape and how to pick fields out of the markup.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Source label, matched case-insensitively against the known source kinds
    pub kind: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default)]
    pub next_page_selector: Option<String>,
    /// Which page fetcher loads this source's pages
    #[serde(default)]
    pub fetcher: FetcherKind,
    pub selectors: SourceSelectors,
}

/// Page fetcher a source is loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Plain HTTP GET; enough for server-rendered listings
    #[default]
    Http,
    /// WebDriver-controlled browser that runs scripts and scrolls the page
    Browser,
}

fn default_enabled() -> bool {
    true
}

fn default_max_pages() -> usize {
    1
}

impl SourceConfig {
    pub fn source_kind(&self) -> Option<SourceKind> {
        SourceKind::from_label(&self.kind)
    }
}

/// Selectors for the listing page cards and, optionally, the event detail page.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceSelectors {
    /// Selector matching one event card on the listing page
    pub event: String,
    #[serde(default)]
    pub listing: FieldSelectors,
    /// When present, each event URL is opened and these fields overlay the card's
    #[serde(default)]
    pub detail: Option<FieldSelectors>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FieldSelectors {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub organizer_name: Option<String>,
    pub organizer_image_url: Option<String>,
    pub event_url: Option<String>,
    pub tags: Option<String>,
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(GOOGLE_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.assembler.geocode_api_key = Some(key);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.duplicate_policy()?;
        self.eventbrite_date_format()?;
        if self.geocoding.max_attempts == 0 {
            return Err(ScraperError::Config(
                "geocoding.max_attempts must be at least 1".to_string(),
            ));
        }
        for source in &self.sources {
            if source.selectors.event.trim().is_empty() {
                return Err(ScraperError::Config(format!(
                    "source '{}' has an empty event selector",
                    source.name
                )));
            }
        }
        Ok(())
    }

    fn duplicate_policy(&self) -> Result<DuplicatePolicy> {
        match self.assembler.duplicate_policy.to_lowercase().as_str() {
            "fuzzy" => Ok(DuplicatePolicy::Fuzzy {
                threshold: self.assembler.fuzzy_threshold.min(100),
            }),
            "exact" => Ok(DuplicatePolicy::Exact),
            other => Err(ScraperError::Config(format!(
                "unknown duplicate_policy '{other}' (expected 'fuzzy' or 'exact')"
            ))),
        }
    }

    fn eventbrite_date_format(&self) -> Result<EventbriteDateFormat> {
        match self.assembler.eventbrite_date_format.to_lowercase().as_str() {
            "ranged" => Ok(EventbriteDateFormat::Ranged),
            "year_less" | "yearless" => Ok(EventbriteDateFormat::YearLess),
            other => Err(ScraperError::Config(format!(
                "unknown eventbrite_date_format '{other}' (expected 'ranged' or 'year_less')"
            ))),
        }
    }

    /// Build the assembler configuration. `current_year` backs year-less dates.
    pub fn assembler_config(&self, current_year: i32) -> Result<AssemblerConfig> {
        Ok(AssemblerConfig {
            default_city: self.assembler.default_city.clone(),
            default_country_code: self.assembler.default_country_code.clone(),
            geocode_api_key: self.assembler.geocode_api_key.clone(),
            duplicate_policy: self.duplicate_policy()?,
            eventbrite_date_format: self.eventbrite_date_format()?,
            reference_year: self.assembler.reference_year.unwrap_or(current_year),
            enrich_address: self.assembler.enrich_address,
        })
    }

    /// Whether any of `sources` needs a browser session.
    pub fn needs_browser(sources: &[&SourceConfig]) -> bool {
        sources.iter().any(|s| s.fetcher == FetcherKind::Browser)
    }

    /// Sources to run: every enabled source, or the named subset (case-insensitive).
    pub fn select_sources(&self, names: Option<&[String]>) -> Vec<&SourceConfig> {
        self.sources
            .iter()
            .filter(|s| match names {
                Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(&s.name)),
                None => s.enabled,
            })
            .collect()
    }
}
