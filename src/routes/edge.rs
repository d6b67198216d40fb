use std::time::Instant;

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::geo::edge::{geo_from_headers, EdgeInfo};
use crate::geo::{recommendations_for, Recommendation};

/// `GET /api/edge/info`: the caller's location as seen by the edge.
pub async fn edge_info(headers: HeaderMap) -> Json<EdgeInfo> {
    let started = Instant::now();
    let geo = geo_from_headers(&headers);
    tracing::debug!(ip = %geo.ip, city = %geo.city, edge_node = %geo.edge_node, "edge info");
    Json(EdgeInfo::new(geo, started.elapsed()))
}

#[derive(Debug, Default, Deserialize)]
pub struct PlacesQuery {
    #[serde(default)]
    city: String,
}

/// `GET /api/places?city=`: story suggestions for a city.
pub async fn places(Query(query): Query<PlacesQuery>) -> Json<Vec<Recommendation>> {
    Json(recommendations_for(query.city.trim()))
}
