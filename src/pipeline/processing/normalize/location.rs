use tracing::debug;

use crate::app::ports::GeocodeProvider;
use crate::types::{Location, SourceKind};

/// Fallback city and country for locations no geocoder resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDefaults {
    pub city: String,
    pub country_code: String,
}

/// Normalize location text for the given source.
///
/// Facebook and Eventbrite text is trimmed and given the default city/country.
/// Facebook text with a comma splits into venue name and street address.
/// Google text goes through a structured place lookup whose locality and
/// country replace the defaults field by field.
pub async fn normalize_location(
    raw: Option<&str>,
    source: SourceKind,
    defaults: &LocationDefaults,
    geocoder: &dyn GeocodeProvider,
) -> Location {
    let text = raw.map(str::trim).filter(|t| !t.is_empty());
    let mut location = Location::with_defaults(
        text.map(str::to_string),
        &defaults.city,
        &defaults.country_code,
    );
    let Some(text) = text else {
        return location;
    };

    match source {
        SourceKind::Facebook => match text.split_once(',') {
            Some((venue, address)) => {
                location.display_name = Some(venue.trim().to_string()).filter(|v| !v.is_empty());
                location.street_address =
                    Some(address.trim().to_string()).filter(|a| !a.is_empty());
            }
            None => location.display_name = Some(text.to_string()),
        },
        SourceKind::Eventbrite => location.display_name = Some(text.to_string()),
        SourceKind::Google => {
            location.display_name = Some(text.to_string());
            match geocoder.structured_lookup(text).await {
                Some(place) => {
                    if let Some(address) = place.formatted_address {
                        if let Some(name) = address.split(',').next().map(str::trim) {
                            if !name.is_empty() {
                                location.display_name = Some(name.to_string());
                            }
                        }
                        location.street_address = Some(address);
                    }
                    if let Some(city) = place.city {
                        location.city = city;
                    }
                    if let Some(country_code) = place.country_code {
                        location.country_code = country_code;
                    }
                    location.set_coordinates(place.coordinates);
                }
                None => debug!(text, "structured lookup found nothing, keeping defaults"),
            }
        }
    }

    location
}
