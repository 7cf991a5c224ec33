//! Record assembly: normalized fields plus geocoding into one [`CanonicalEvent`].

pub mod dedupe;

pub use dedupe::{DuplicatePolicy, SeenTitles, TitleSimilarity};

use chrono::Datelike;
use tracing::debug;

use crate::app::ports::GeocodeProvider;
use crate::constants::{DEFAULT_CITY, DEFAULT_COUNTRY_CODE};
use crate::pipeline::processing::normalize::{
    extract_tags, DateRules, EventbriteDateFormat, FieldNormalizer, LocationDefaults,
};
use crate::types::{CanonicalEvent, RawEventFields, SourceKind};

/// Deployment settings handed to the assembler at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblerConfig {
    pub default_city: String,
    pub default_country_code: String,
    /// Google Places key handed to the geocoding backend at startup; the assembler itself never reads it
    pub geocode_api_key: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub eventbrite_date_format: EventbriteDateFormat,
    pub reference_year: i32,
    /// Fill a missing street address by reverse geocoding forward-resolved coordinates
    pub enrich_address: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            default_city: DEFAULT_CITY.to_string(),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            geocode_api_key: None,
            duplicate_policy: DuplicatePolicy::default(),
            eventbrite_date_format: EventbriteDateFormat::default(),
            reference_year: chrono::Local::now().year(),
            enrich_address: false,
        }
    }
}

/// Builds canonical events and answers duplicate checks for a run.
pub struct RecordAssembler {
    config: AssemblerConfig,
    normalizer: FieldNormalizer,
}

impl RecordAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        let normalizer = FieldNormalizer::new(
            DateRules {
                eventbrite_format: config.eventbrite_date_format,
                reference_year: config.reference_year,
            },
            LocationDefaults {
                city: config.default_city.clone(),
                country_code: config.default_country_code.clone(),
            },
        );
        Self { config, normalizer }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &FieldNormalizer {
        &self.normalizer
    }

    /// Whether `candidate` duplicates a title already accepted in this run.
    pub fn is_duplicate(&self, candidate: &str, seen: &SeenTitles) -> bool {
        self.config
            .duplicate_policy
            .is_duplicate(candidate, seen.titles())
    }

    /// Assemble one event. The geocoder is the only thing touched outside this call.
    pub async fn assemble(
        &self,
        raw: &RawEventFields,
        source: SourceKind,
        geocoder: &dyn GeocodeProvider,
    ) -> CanonicalEvent {
        let date = self.normalizer.normalize_date(raw.date.as_deref(), source);
        let mut location = self
            .normalizer
            .normalize_location(raw.location.as_deref(), source, geocoder)
            .await;

        // Structured lookups may already have placed the event
        if location.coordinates().is_none() {
            if let Some(text) = location.raw.clone() {
                let coordinates = geocoder.forward(&text).await;
                location.set_coordinates(coordinates);

                if let (Some(coordinates), true, None) = (
                    coordinates,
                    self.config.enrich_address,
                    location.street_address.as_ref(),
                ) {
                    if let Some(address) = geocoder.reverse(coordinates).await {
                        location.street_address = address.address;
                    }
                }
            }
        }

        debug!(
            title = raw.title.as_deref().unwrap_or_default(),
            source = %source,
            geocoded = location.coordinates().is_some(),
            "assembled event"
        );

        CanonicalEvent {
            title: raw.title.clone(),
            description: raw.description.clone(),
            price: raw.price.clone(),
            date,
            location,
            tags: extract_tags(&raw.tags),
            organizer_name: raw.organizer_name.clone(),
            organizer_image_url: raw.organizer_image_url.clone(),
            event_url: raw.event_url.clone(),
            image_url: raw.image_url.clone(),
            source,
        }
    }
}
