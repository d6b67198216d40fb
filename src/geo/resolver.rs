use std::time::Duration;

use super::device::{self, DeviceLocator};
use super::edge::{EdgeLookup, HttpEdgeLookup};
use super::geocode::{NominatimGeocoder, ReverseGeocoder};
use super::{country_name, recommendations_for, GeoError, GeoResult, DEFAULT_COUNTRY_CODE, DEFAULT_TIMEZONE};
use crate::config::GeoConfig;

pub const DEFAULT_EDGE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Edge node reported for results derived from device coordinates.
pub const DEVICE_EDGE_NODE: &str = "Device";

/// Ordered fallback chain: edge, then device + reverse geocoding, then the
/// static default. Each step runs at most once per [`resolve`](Self::resolve).
pub struct GeoResolver {
    edge: Box<dyn EdgeLookup>,
    device: Box<dyn DeviceLocator>,
    geocoder: Box<dyn ReverseGeocoder>,
    edge_timeout: Duration,
    device_timeout: Duration,
}

impl GeoResolver {
    pub fn new(
        edge: Box<dyn EdgeLookup>,
        device: Box<dyn DeviceLocator>,
        geocoder: Box<dyn ReverseGeocoder>,
    ) -> Self {
        Self {
            edge,
            device,
            geocoder,
            edge_timeout: DEFAULT_EDGE_TIMEOUT,
            device_timeout: DEFAULT_DEVICE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, edge: Duration, device: Duration) -> Self {
        self.edge_timeout = edge;
        self.device_timeout = device;
        self
    }

    /// Build the HTTP-backed chain described by `[geo]`.
    pub fn from_config(config: &GeoConfig) -> anyhow::Result<Self> {
        let edge_timeout = Duration::from_millis(config.edge_timeout_ms);
        let device_timeout = Duration::from_millis(config.device_timeout_ms);
        let edge = HttpEdgeLookup::new(&config.edge_url, edge_timeout)?;
        let geocoder = NominatimGeocoder::new(&config.geocoder_url, device_timeout)?;
        Ok(Self::new(Box::new(edge), device::from_config(config), Box::new(geocoder))
            .with_timeouts(edge_timeout, device_timeout))
    }

    /// Resolve the current location. Never fails: the last step is static.
    pub async fn resolve(&self) -> GeoResult {
        match self.from_edge().await {
            Ok(geo) => {
                tracing::debug!(edge_node = %geo.edge_node, city = %geo.city, "resolved via edge");
                return geo;
            }
            Err(e) => tracing::info!(error = %e, "edge lookup failed, trying device location"),
        }

        match self.from_device().await {
            Ok(geo) => {
                tracing::debug!(city = %geo.city, "resolved via device location");
                return geo;
            }
            Err(e) => tracing::info!(error = %e, "device location failed, using default"),
        }

        GeoResult::fallback()
    }

    async fn from_edge(&self) -> Result<GeoResult, GeoError> {
        tokio::time::timeout(self.edge_timeout, self.edge.lookup())
            .await
            .map_err(|_| GeoError::EdgeTimeout)?
    }

    async fn from_device(&self) -> Result<GeoResult, GeoError> {
        let coordinates = tokio::time::timeout(self.device_timeout, self.device.locate())
            .await
            .map_err(|_| GeoError::DeviceTimeout)??;
        let place = self.geocoder.reverse(coordinates).await?;

        let country_code = if place.country_code.is_empty() {
            DEFAULT_COUNTRY_CODE.to_string()
        } else {
            place.country_code
        };
        let country_name = if place.country_name.is_empty() {
            country_name(&country_code)
        } else {
            place.country_name
        };
        // no city means the generic entry, even when a region is known
        let recommendations = recommendations_for(&place.city);

        Ok(GeoResult {
            ip: "unknown".into(),
            country_code,
            country_name,
            region: place.region,
            city: place.city,
            latitude: Some(coordinates.latitude),
            longitude: Some(coordinates.longitude),
            timezone: DEFAULT_TIMEZONE.into(),
            edge_node: DEVICE_EDGE_NODE.into(),
            recommendations,
        })
    }
}
