//! Edge info: deriving location from proxy headers, and querying a relay's
//! `/api/edge/info` endpoint.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::{
    country_name, lenient_coordinate, recommendations_for, GeoError, GeoResult, Recommendation,
    DEFAULT_COUNTRY_CODE, DEFAULT_TIMEZONE,
};

/// Edge node reported when neither `x-edge-node` nor `cf-ray` is present.
pub const DEFAULT_EDGE_NODE: &str = "CN-Shanghai";

/// Wire shape of `GET /api/edge/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInfo {
    pub success: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Time spent building the response, in milliseconds.
    pub latency: i64,
    pub geo: EdgeGeo,
    pub edge_node: String,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGeo {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: String,
}

impl EdgeInfo {
    pub fn new(geo: GeoResult, latency: Duration) -> Self {
        Self {
            success: true,
            timestamp: chrono::Utc::now().timestamp_millis(),
            latency: i64::try_from(latency.as_millis()).unwrap_or(i64::MAX),
            geo: EdgeGeo {
                ip: geo.ip,
                country: geo.country_code,
                country_name: geo.country_name,
                region: geo.region,
                city: geo.city,
                latitude: geo.latitude,
                longitude: geo.longitude,
                timezone: geo.timezone,
            },
            edge_node: geo.edge_node,
            recommendations: geo.recommendations,
        }
    }
}

impl From<EdgeInfo> for GeoResult {
    fn from(info: EdgeInfo) -> Self {
        let EdgeInfo {
            geo,
            edge_node,
            recommendations,
            ..
        } = info;
        let country_code = if geo.country.is_empty() {
            DEFAULT_COUNTRY_CODE.to_string()
        } else {
            geo.country
        };
        let recommendations = if recommendations.is_empty() {
            recommendations_for(if geo.city.is_empty() { &geo.region } else { &geo.city })
        } else {
            recommendations
        };
        Self {
            ip: geo.ip,
            country_name: if geo.country_name.is_empty() {
                country_name(&country_code)
            } else {
                geo.country_name
            },
            country_code,
            region: geo.region,
            city: geo.city,
            latitude: geo.latitude,
            longitude: geo.longitude,
            timezone: if geo.timezone.is_empty() {
                DEFAULT_TIMEZONE.to_string()
            } else {
                geo.timezone
            },
            edge_node,
            recommendations,
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        // city and region headers may carry raw UTF-8, which to_str() rejects
        .filter_map(|value| std::str::from_utf8(value.as_bytes()).ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Build a location from the headers a CDN or reverse proxy attaches.
///
/// Missing headers degrade field by field: country defaults to `CN`, city and
/// region to empty, coordinates to `None`.
pub fn geo_from_headers(headers: &HeaderMap) -> GeoResult {
    let ip = header(headers, &["x-real-ip", "cf-connecting-ip"])
        .or_else(|| {
            header(headers, &["x-forwarded-for"])
                .and_then(|v| v.split(',').next())
                .map(str::trim)
        })
        .unwrap_or("unknown")
        .to_string();
    let country_code = header(headers, &["x-geo-country", "cf-ipcountry"])
        .unwrap_or(DEFAULT_COUNTRY_CODE)
        .to_ascii_uppercase();
    let region = header(headers, &["x-geo-region"]).unwrap_or("").to_string();
    let city = header(headers, &["x-geo-city"]).unwrap_or("").to_string();
    let timezone = header(headers, &["x-geo-timezone"])
        .unwrap_or(DEFAULT_TIMEZONE)
        .to_string();
    let latitude = header(headers, &["x-geo-latitude"]).and_then(|v| v.parse().ok());
    let longitude = header(headers, &["x-geo-longitude"]).and_then(|v| v.parse().ok());

    let edge_node = header(headers, &["x-edge-node"])
        .map(str::to_string)
        .or_else(|| {
            // cf-ray is "<ray id>-<colo>"
            header(headers, &["cf-ray"])
                .and_then(|ray| ray.split('-').nth(1))
                .filter(|colo| !colo.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_EDGE_NODE.to_string());

    let recommendations = recommendations_for(if city.is_empty() { &region } else { &city });

    GeoResult {
        ip,
        country_name: country_name(&country_code),
        country_code,
        region,
        city,
        latitude,
        longitude,
        timezone,
        edge_node,
        recommendations,
    }
}

/// First step of the resolution chain.
#[async_trait]
pub trait EdgeLookup: Send + Sync {
    async fn lookup(&self) -> Result<GeoResult, GeoError>;
}

/// Queries `{base_url}/api/edge/info` over HTTP.
pub struct HttpEdgeLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEdgeLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build edge HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EdgeLookup for HttpEdgeLookup {
    async fn lookup(&self) -> Result<GeoResult, GeoError> {
        let url = format!("{}/api/edge/info", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                GeoError::EdgeTimeout
            } else {
                GeoError::Edge(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Edge(format!("status {status}")));
        }

        let info: EdgeInfo = response
            .json()
            .await
            .map_err(|e| GeoError::Edge(format!("malformed edge info: {e}")))?;
        if !info.success {
            return Err(GeoError::Edge("edge reported failure".into()));
        }
        Ok(info.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::era::Era;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn no_headers_yields_defaults() {
        let geo = geo_from_headers(&HeaderMap::new());
        assert_eq!(geo.ip, "unknown");
        assert_eq!(geo.country_code, "CN");
        assert_eq!(geo.country_name, "中国");
        assert_eq!(geo.timezone, "Asia/Shanghai");
        assert_eq!(geo.edge_node, "CN-Shanghai");
        assert_eq!(geo.latitude, None);
        assert_eq!(geo.recommendations[0].title, "华夏文明");
    }

    #[test]
    fn proxy_headers_are_used() {
        let geo = geo_from_headers(&headers(&[
            ("cf-connecting-ip", "203.0.113.9"),
            ("cf-ipcountry", "cn"),
            ("x-geo-region", "陕西"),
            ("x-geo-city", "西安"),
            ("x-geo-latitude", "34.26"),
            ("x-geo-longitude", "108.94"),
            ("cf-ray", "8a1b2c3d4e-SJC"),
        ]));
        assert_eq!(geo.ip, "203.0.113.9");
        assert_eq!(geo.country_code, "CN");
        assert_eq!(geo.city, "西安");
        assert_eq!(geo.latitude, Some(34.26));
        assert_eq!(geo.edge_node, "SJC");
        assert_eq!(geo.recommendations[0].era, Era::Ancient);
    }

    #[test]
    fn explicit_edge_node_wins_over_ray() {
        let geo = geo_from_headers(&headers(&[
            ("x-edge-node", "HK-01"),
            ("cf-ray", "abc-NRT"),
            ("x-real-ip", "10.0.0.1"),
            ("cf-connecting-ip", "10.0.0.2"),
        ]));
        assert_eq!(geo.edge_node, "HK-01");
        assert_eq!(geo.ip, "10.0.0.1");
    }

    #[test]
    fn region_drives_recommendations_without_city() {
        let geo = geo_from_headers(&headers(&[("x-geo-region", "南京市")]));
        assert_eq!(geo.recommendations[0].title, "六朝古都");
    }

    #[test]
    fn edge_info_converts_back_to_result() {
        let derived = geo_from_headers(&headers(&[("x-geo-city", "杭州")]));
        let info = EdgeInfo::new(derived.clone(), Duration::from_millis(4));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["geo"]["country"], "CN");
        assert_eq!(json["edgeNode"], "CN-Shanghai");
        assert_eq!(json["latency"], 4);

        let back: GeoResult = serde_json::from_value::<EdgeInfo>(json).unwrap().into();
        assert_eq!(back, derived);
    }
}
