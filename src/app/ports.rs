use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{FieldSelectors, SourceSelectors};
use crate::error::{FetchError, Result};
use crate::types::{CanonicalEvent, Coordinates, RawEventFields};

// Ingest-side ports
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Rendered HTML for `url`.
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Turns markup into raw event fields. Selectors are source-specific and opaque to the core.
pub trait FieldExtractor: Send + Sync {
    /// One `RawEventFields` per event card on a listing page.
    fn extract_events(&self, html: &str, selectors: &SourceSelectors) -> Result<Vec<RawEventFields>>;

    /// Fields from a single event's detail page.
    fn extract_detail(&self, html: &str, fields: &FieldSelectors) -> Result<RawEventFields>;

    /// Link to the next listing page, if the page has one.
    fn next_page(&self, html: &str, selector: &str) -> Result<Option<String>>;
}

/// Address parts recovered from a coordinate pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseAddress {
    pub address: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
}

/// Result of a structured (place-style) lookup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredPlace {
    pub formatted_address: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Geocoding as the core sees it: every call answers, absence means "could not resolve".
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    async fn forward(&self, text: &str) -> Option<Coordinates>;
    async fn reverse(&self, coordinates: Coordinates) -> Option<ReverseAddress>;
    async fn structured_lookup(&self, text: &str) -> Option<StructuredPlace>;
}

// Output-side ports
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist a whole run in one write.
    async fn write(&self, events: &[CanonicalEvent]) -> Result<()>;

    /// Where the sink writes, for run summaries.
    fn location(&self) -> Option<String> {
        None
    }
}
