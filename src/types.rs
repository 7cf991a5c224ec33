use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which listing site an event was scraped from. Decides the date and location rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Facebook,
    Eventbrite,
    Google,
}

impl SourceKind {
    /// Case-insensitive label lookup. Unknown labels are `None`, never an error.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "facebook" => Some(Self::Facebook),
            "eventbrite" => Some(Self::Eventbrite),
            "google" => Some(Self::Google),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Eventbrite => "eventbrite",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw fields for one scraped event, straight out of a field extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEventFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub organizer_name: Option<String>,
    pub organizer_image_url: Option<String>,
    pub event_url: Option<String>,
    /// Tag anchor texts as they appear on the page, `#` included
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawEventFields {
    /// Overlay `other` on top of `self`: present values in `other` win.
    pub fn merge_from(&mut self, other: RawEventFields) {
        fn pick(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        pick(&mut self.title, other.title);
        pick(&mut self.description, other.description);
        pick(&mut self.date, other.date);
        pick(&mut self.location, other.location);
        pick(&mut self.price, other.price);
        pick(&mut self.image_url, other.image_url);
        pick(&mut self.organizer_name, other.organizer_name);
        pick(&mut self.organizer_image_url, other.organizer_image_url);
        pick(&mut self.event_url, other.event_url);
        if !other.tags.is_empty() {
            self.tags = other.tags;
        }
    }
}

/// Parsed date information. Every part may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDate {
    pub timestamp: Option<NaiveDateTime>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl NormalizedDate {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.timestamp.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }
}

/// A latitude/longitude pair. Geocoding either yields both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn map_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Canonical location of an event.
///
/// Coordinates live in a single optional pair so latitude and longitude are
/// present together or not at all; the flat fields only exist when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "LocationRecord")]
pub struct Location {
    pub raw: Option<String>,
    pub display_name: Option<String>,
    pub city: String,
    pub country_code: String,
    pub street_address: Option<String>,
    coordinates: Option<Coordinates>,
    map_url: Option<String>,
}

#[derive(Serialize)]
struct LocationRecord {
    raw: Option<String>,
    display_name: Option<String>,
    city: String,
    country_code: String,
    street_address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    map_url: Option<String>,
}

impl From<Location> for LocationRecord {
    fn from(location: Location) -> Self {
        Self {
            latitude: location.latitude(),
            longitude: location.longitude(),
            raw: location.raw,
            display_name: location.display_name,
            city: location.city,
            country_code: location.country_code,
            street_address: location.street_address,
            map_url: location.map_url,
        }
    }
}

impl Location {
    /// A location carrying only the configured fallback city and country.
    pub fn with_defaults(raw: Option<String>, city: &str, country_code: &str) -> Self {
        Self {
            raw,
            display_name: None,
            city: city.to_string(),
            country_code: country_code.to_string(),
            street_address: None,
            coordinates: None,
            map_url: None,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    pub fn map_url(&self) -> Option<&str> {
        self.map_url.as_deref()
    }

    /// Set (or clear) the coordinate pair and the derived map URL together.
    pub fn set_coordinates(&mut self, coordinates: Option<Coordinates>) {
        self.coordinates = coordinates;
        self.map_url = coordinates.map(|c| c.map_url());
    }
}

/// The normalized, source-independent record written to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub date: NormalizedDate,
    pub location: Location,
    pub tags: Vec<String>,
    pub organizer_name: Option<String>,
    pub organizer_image_url: Option<String>,
    pub event_url: Option<String>,
    pub image_url: Option<String>,
    pub source: SourceKind,
}
