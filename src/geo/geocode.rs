//! Reverse geocoding of device coordinates.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{Coordinates, GeoError};

const USER_AGENT: &str = concat!("timewarp/", env!("CARGO_PKG_VERSION"));

/// Administrative names for a coordinate. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Place {
    pub city: String,
    pub region: String,
    /// Upper-case ISO code, empty when the service omits it.
    pub country_code: String,
    pub country_name: String,
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coordinates: Coordinates) -> Result<Place, GeoError>;
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    county: Option<String>,
    state: Option<String>,
    province: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl From<Address> for Place {
    fn from(address: Address) -> Self {
        Self {
            city: address
                .city
                .or(address.town)
                .or(address.county)
                .unwrap_or_default(),
            region: address.state.or(address.province).unwrap_or_default(),
            country_code: address
                .country_code
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_default(),
            country_name: address.country.unwrap_or_default(),
        }
    }
}

/// Client for a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build geocoder HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, coordinates: Coordinates) -> Result<Place, GeoError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/reverse", self.base_url),
            &[
                ("format", "jsonv2".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("zoom", "10".to_string()),
                ("accept-language", "zh-CN".to_string()),
            ],
        )
        .map_err(|e| GeoError::Geocode(format!("invalid geocoder url: {e}")))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GeoError::Geocode(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Geocode(format!("status {status}")));
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Geocode(format!("malformed response: {e}")))?;
        if let Some(error) = body.error {
            return Err(GeoError::Geocode(error));
        }
        Ok(body.address.unwrap_or_default().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn town_and_province_fill_gaps() {
        let address: Address = serde_json::from_str(
            r#"{"town": "周庄镇", "province": "江苏省", "country": "中国", "country_code": "cn"}"#,
        )
        .unwrap();
        let place = Place::from(address);
        assert_eq!(place.city, "周庄镇");
        assert_eq!(place.region, "江苏省");
        assert_eq!(place.country_code, "CN");
    }

    #[test]
    fn empty_address_yields_empty_place() {
        assert_eq!(Place::from(Address::default()), Place::default());
    }
}
