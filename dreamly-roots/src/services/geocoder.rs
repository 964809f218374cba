//! City references and Mapbox geocoding

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const MAPBOX_BASE_URL: &str = "https://api.mapbox.com";

/// City used for map aggregation; id is `country|admin1|city`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRef {
    pub country: String,
    pub admin1: String,
    pub city: String,
}

impl CityRef {
    pub fn new(country: &str, admin1: &str, city: &str) -> Self {
        Self {
            country: country.trim().to_string(),
            admin1: admin1.trim().to_string(),
            city: city.trim().to_string(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}|{}|{}", self.country, self.admin1, self.city)
    }

    /// Parse `country|admin1|city`; the city part may itself contain `|`
    pub fn parse(city_id: &str) -> Option<Self> {
        let mut parts = city_id.splitn(3, '|').map(str::trim);
        let country = parts.next().filter(|s| !s.is_empty())?;
        let admin1 = parts.next().unwrap_or_default();
        let city = parts.next().filter(|s| !s.is_empty())?;
        Some(Self::new(country, admin1, city))
    }

    /// Geocoding query, `"city, admin1, country"`
    pub fn query(&self) -> String {
        [self.city.as_str(), self.admin1.as_str(), self.country.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for CityRef {
    fn default() -> Self {
        Self::new("US", "DC", "Washington")
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No geocoding result for {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    #[serde(default)]
    center: Vec<f64>,
}

/// Mapbox places geocoder
pub struct MapboxGeocoder {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MapboxGeocoder {
    pub fn new(token: String, timeout: Duration) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: MAPBOX_BASE_URL.to_string(),
            token,
        })
    }

    fn places_url(&self, query: &str) -> Result<reqwest::Url, GeocodeError> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| GeocodeError::Network(e.to_string()))?;
        let file = format!("{}.json", query);
        url.path_segments_mut()
            .map_err(|_| GeocodeError::Network("invalid geocoding base url".to_string()))?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", file.as_str()]);
        url.query_pairs_mut()
            .append_pair("access_token", &self.token)
            .append_pair("limit", "1")
            .append_pair("types", "place")
            .append_pair("language", "en");
        Ok(url)
    }

    pub async fn geocode(&self, city: &CityRef) -> Result<Coordinates, GeocodeError> {
        let query = city.query();
        let url = self.places_url(&query)?;

        tracing::debug!(city = %city.id(), "Geocoding city");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api(status.as_u16(), error_text));
        }

        let places: PlacesResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        parse_center(&places).ok_or(GeocodeError::NotFound(query))
    }
}

/// Mapbox `center` is `[lng, lat]`
fn parse_center(places: &PlacesResponse) -> Option<Coordinates> {
    let center = &places.features.first()?.center;
    let (lng, lat) = (*center.first()?, *center.get(1)?);
    (lat.is_finite() && lng.is_finite()).then_some(Coordinates { lat, lng })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_id_roundtrip() {
        let city = CityRef::default();
        assert_eq!(city.id(), "US|DC|Washington");
        assert_eq!(CityRef::parse(&city.id()), Some(city));
    }

    #[test]
    fn test_parse_city_id() {
        let city = CityRef::parse(" US | NY | New York ").unwrap();
        assert_eq!(city.city, "New York");
        assert_eq!(CityRef::parse("US|NY|A|B").unwrap().city, "A|B");
        assert!(CityRef::parse("US").is_none());
        assert!(CityRef::parse("|NY|New York").is_none());
    }

    #[test]
    fn test_query() {
        assert_eq!(CityRef::new("US", "NY", "New York").query(), "New York, NY, US");
        assert_eq!(CityRef::new("IL", "", "Haifa").query(), "Haifa, IL");
    }

    #[test]
    fn test_places_url_is_encoded() {
        let geocoder = MapboxGeocoder::new("tok".to_string(), Duration::from_secs(5)).unwrap();
        let url = geocoder.places_url("New York, NY, US").unwrap();
        assert!(url.as_str().starts_with(
            "https://api.mapbox.com/geocoding/v5/mapbox.places/New%20York,%20NY,%20US.json?"
        ));
        assert!(url.as_str().contains("access_token=tok"));
    }

    #[test]
    fn test_parse_center() {
        let places: PlacesResponse =
            serde_json::from_str(r#"{"features":[{"center":[-77.03,38.89]}]}"#).unwrap();
        assert_eq!(parse_center(&places), Some(Coordinates { lat: 38.89, lng: -77.03 }));

        let empty: PlacesResponse = serde_json::from_str(r#"{"features":[]}"#).unwrap();
        assert_eq!(parse_center(&empty), None);
    }
}
