use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::nominatim_client::{status_error, transport_error};
use crate::app::ports::StructuredPlace;
use crate::error::{GeocodeError, Result};
use crate::geocoding::GeocodeResult;
use crate::types::Coordinates;

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Google Places "find place from text" client.
pub struct PlacesClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl PlacesClient {
    pub fn new(url: &str, api_key: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn find_place(&self, text: &str) -> GeocodeResult<StructuredPlace> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("input", text),
                ("inputtype", "textquery"),
                ("fields", "formatted_address,address_components,geometry"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body = response.text().await.map_err(transport_error)?;
        debug!(bytes = body.len(), "places response");
        place_from_response(&body)
    }
}

fn component<'a>(components: &'a [AddressComponent], kind: &str) -> Option<&'a AddressComponent> {
    components.iter().find(|c| c.types.iter().any(|t| t == kind))
}

fn place_from_response(body: &str) -> GeocodeResult<StructuredPlace> {
    let response: FindPlaceResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "UNKNOWN_ERROR" => {
            return Err(GeocodeError::Unavailable(
                response.error_message.unwrap_or(response.status),
            ))
        }
        _ => {
            let message = match response.error_message {
                Some(message) => format!("{}: {}", response.status, message),
                None => response.status,
            };
            return Err(GeocodeError::Rejected(message));
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(None);
    };

    let city = component(&candidate.address_components, "locality").map(|c| c.long_name.clone());
    let country_code = component(&candidate.address_components, "country")
        .map(|c| c.short_name.to_lowercase());

    Ok(Some(StructuredPlace {
        formatted_address: candidate.formatted_address,
        city,
        country_code,
        coordinates: candidate
            .geometry
            .map(|g| Coordinates::new(g.location.lat, g.location.lng)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_candidate() {
        let body = r#"{
            "status": "OK",
            "candidates": [{
                "formatted_address": "Olympic Stadium, 4545 Pierre-de Coubertin Ave, Montreal, QC H1V 0B2, Canada",
                "address_components": [
                    {"long_name": "Montréal", "short_name": "Montréal", "types": ["locality", "political"]},
                    {"long_name": "Canada", "short_name": "CA", "types": ["country", "political"]}
                ],
                "geometry": {"location": {"lat": 45.558, "lng": -73.5519}}
            }]
        }"#;
        let place = place_from_response(body).unwrap().unwrap();

        assert_eq!(place.city.as_deref(), Some("Montréal"));
        assert_eq!(place.country_code.as_deref(), Some("ca"));
        assert_eq!(place.coordinates, Some(Coordinates::new(45.558, -73.5519)));
        assert!(place
            .formatted_address
            .as_deref()
            .unwrap()
            .starts_with("Olympic Stadium,"));
    }

    #[test]
    fn test_candidate_without_components() {
        let body = r#"{"status": "OK", "candidates": [{"formatted_address": "Somewhere"}]}"#;
        let place = place_from_response(body).unwrap().unwrap();

        assert_eq!(place.city, None);
        assert_eq!(place.country_code, None);
        assert_eq!(place.coordinates, None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            place_from_response(r#"{"status": "ZERO_RESULTS", "candidates": []}"#).unwrap(),
            None
        );
        assert!(place_from_response(r#"{"status": "UNKNOWN_ERROR"}"#)
            .unwrap_err()
            .is_unavailable());
        assert!(matches!(
            place_from_response(r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#),
            Err(GeocodeError::Rejected(m)) if m.contains("bad key")
        ));
        assert!(matches!(
            place_from_response("not json"),
            Err(GeocodeError::Malformed(_))
        ));
    }
}
