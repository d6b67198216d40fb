//! Device geolocation, the second step of the resolution chain.

use async_trait::async_trait;

use super::{Coordinates, GeoError};
use crate::config::GeoConfig;

/// Source of the device's own coordinates.
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, GeoError>;
}

/// Reports a fixed position, typically from `[geo] device_latitude/longitude`.
pub struct FixedLocator {
    coordinates: Coordinates,
}

impl FixedLocator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinates: Coordinates {
                latitude,
                longitude,
            },
        }
    }
}

#[async_trait]
impl DeviceLocator for FixedLocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        Ok(self.coordinates)
    }
}

/// A device with no positioning capability.
pub struct UnavailableLocator;

#[async_trait]
impl DeviceLocator for UnavailableLocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::Unavailable)
    }
}

/// Locator described by config: fixed coordinates when both are set and in
/// range, otherwise unavailable.
pub fn from_config(config: &GeoConfig) -> Box<dyn DeviceLocator> {
    match (config.device_latitude, config.device_longitude) {
        (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) => {
            Box::new(FixedLocator::new(lat, lon))
        }
        (Some(_), Some(_)) => {
            tracing::warn!("device coordinates out of range, geolocation disabled");
            Box::new(UnavailableLocator)
        }
        _ => Box::new(UnavailableLocator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_without_coordinates_is_unavailable() {
        let locator = from_config(&GeoConfig::default());
        assert!(matches!(locator.locate().await, Err(GeoError::Unavailable)));
    }

    #[tokio::test]
    async fn config_coordinates_are_reported() {
        let config = GeoConfig {
            device_latitude: Some(39.9),
            device_longitude: Some(116.4),
            ..Default::default()
        };
        let coords = from_config(&config).locate().await.unwrap();
        assert_eq!(coords.latitude, 39.9);
        assert_eq!(coords.longitude, 116.4);
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_ignored() {
        let config = GeoConfig {
            device_latitude: Some(120.0),
            device_longitude: Some(0.0),
            ..Default::default()
        };
        assert!(from_config(&config).locate().await.is_err());
    }
}
