use async_trait::async_trait;

use super::nominatim_client::NominatimClient;
use super::places_client::PlacesClient;
use crate::app::ports::{ReverseAddress, StructuredPlace};
use crate::config::GeocodingConfig;
use crate::error::Result;
use crate::geocoding::{GeocodeBackend, GeocodeResult};
use crate::types::Coordinates;

/// Nominatim for forward/reverse lookups plus Google Places for structured ones.
/// Structured lookups answer "no match" when no Places key is configured.
pub struct HttpGeocodeBackend {
    nominatim: NominatimClient,
    places: Option<PlacesClient>,
}

impl HttpGeocodeBackend {
    pub fn new(config: &GeocodingConfig, places_api_key: Option<&str>) -> Result<Self> {
        let nominatim =
            NominatimClient::new(&config.nominatim_url, &config.user_agent, config.timeout())?;
        let places = places_api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                PlacesClient::new(&config.places_url, key, &config.user_agent, config.timeout())
            })
            .transpose()?;

        if places.is_none() {
            tracing::info!("No Places API key configured; structured lookups disabled");
        }

        Ok(Self { nominatim, places })
    }
}

#[async_trait]
impl GeocodeBackend for HttpGeocodeBackend {
    async fn forward(&self, text: &str) -> GeocodeResult<Coordinates> {
        self.nominatim.search(text).await
    }

    async fn reverse(&self, coordinates: Coordinates) -> GeocodeResult<ReverseAddress> {
        self.nominatim.reverse(coordinates).await
    }

    async fn structured_lookup(&self, text: &str) -> GeocodeResult<StructuredPlace> {
        match &self.places {
            Some(places) => places.find_place(text).await,
            None => Ok(None),
        }
    }
}
