use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::app::ports::ReverseAddress;
use crate::error::{GeocodeError, Result};
use crate::geocoding::GeocodeResult;
use crate::types::Coordinates;

/// Nominatim `/search` hit
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Nominatim `/reverse` body. A miss comes back as `{"error": "..."}` with status 200.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<ReverseAddressParts>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddressParts {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country_code: Option<String>,
}

/// OpenStreetMap Nominatim client for forward and reverse geocoding.
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn search(&self, text: &str) -> GeocodeResult<Coordinates> {
        let body = self
            .get(
                "search",
                &[
                    ("q", text.to_string()),
                    ("format", "json".into()),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        coordinates_from_search(&body)
    }

    #[instrument(skip(self))]
    pub async fn reverse(&self, coordinates: Coordinates) -> GeocodeResult<ReverseAddress> {
        let body = self
            .get(
                "reverse",
                &[
                    ("lat", coordinates.latitude.to_string()),
                    ("lon", coordinates.longitude.to_string()),
                    ("format", "json".into()),
                    ("addressdetails", "1".into()),
                ],
            )
            .await?;
        address_from_reverse(&body)
    }

    async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<String, GeocodeError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body = response.text().await.map_err(transport_error)?;
        debug!(endpoint, bytes = body.len(), "nominatim response");
        Ok(body)
    }
}

/// Timeouts, connection failures and overload statuses are transient; everything else is not.
pub(crate) fn transport_error(e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        GeocodeError::Unavailable(e.to_string())
    } else if e.is_decode() || e.is_body() {
        GeocodeError::Malformed(e.to_string())
    } else {
        GeocodeError::Rejected(e.to_string())
    }
}

pub(crate) fn status_error(status: reqwest::StatusCode) -> GeocodeError {
    match status.as_u16() {
        code @ (429 | 502 | 503 | 504) => GeocodeError::Unavailable(format!("HTTP status {code}")),
        code => GeocodeError::Rejected(format!("HTTP status {code}")),
    }
}

fn coordinates_from_search(body: &str) -> GeocodeResult<Coordinates> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    let Some(hit) = hits.first() else {
        return Ok(None);
    };

    let latitude: f64 = hit
        .lat
        .parse()
        .map_err(|e| GeocodeError::Malformed(format!("Invalid latitude '{}': {}", hit.lat, e)))?;
    let longitude: f64 = hit
        .lon
        .parse()
        .map_err(|e| GeocodeError::Malformed(format!("Invalid longitude '{}': {}", hit.lon, e)))?;

    Ok(Some(Coordinates::new(latitude, longitude)))
}

fn address_from_reverse(body: &str) -> GeocodeResult<ReverseAddress> {
    let response: ReverseResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    if response.error.is_some() {
        return Ok(None);
    }

    let parts = response.address.unwrap_or_default();
    let street = match (parts.house_number, parts.road) {
        (Some(number), Some(road)) => Some(format!("{number} {road}")),
        (None, Some(road)) => Some(road),
        _ => None,
    };

    Ok(Some(ReverseAddress {
        address: street.or(response.display_name),
        city: parts.city.or(parts.town).or(parts.village),
        country_code: parts.country_code.map(|c| c.to_lowercase()),
    }))
}
