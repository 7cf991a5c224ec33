//! Field normalization: source-specific raw strings into typed values.
//!
//! Nothing in here fails on bad input. Unparseable text degrades to an absent
//! value and callers treat absence as "unknown".

pub mod date;
pub mod location;
pub mod tags;
pub mod time_range;

pub use date::{normalize_date, normalize_date_for_label, DateRules, EventbriteDateFormat};
pub use location::{normalize_location, LocationDefaults};
pub use tags::extract_tags;
pub use time_range::extract_time_range;

use crate::app::ports::GeocodeProvider;
use crate::types::{Location, NormalizedDate, SourceKind};

/// Field normalizer bound to one deployment's date rules and location defaults.
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    date_rules: DateRules,
    location_defaults: LocationDefaults,
}

impl FieldNormalizer {
    pub fn new(date_rules: DateRules, location_defaults: LocationDefaults) -> Self {
        Self {
            date_rules,
            location_defaults,
        }
    }

    pub fn date_rules(&self) -> &DateRules {
        &self.date_rules
    }

    pub fn location_defaults(&self) -> &LocationDefaults {
        &self.location_defaults
    }

    pub fn normalize_date(&self, raw: Option<&str>, source: SourceKind) -> NormalizedDate {
        normalize_date(raw, source, &self.date_rules)
    }

    pub async fn normalize_location(
        &self,
        raw: Option<&str>,
        source: SourceKind,
        geocoder: &dyn GeocodeProvider,
    ) -> Location {
        normalize_location(raw, source, &self.location_defaults, geocoder).await
    }
}
