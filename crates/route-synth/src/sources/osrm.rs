//! OSRM road-snapping client.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::activity::ActivityType;
use crate::geo::{Coordinate, Path};

pub const DEFAULT_OSRM_ENDPOINT: &str = "https://router.project-osrm.org";

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("Route needs at least 2 points to snap to roads, got {0}")]
    TooFewPoints(usize),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Routing service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Routing service error {code}: {message}")]
    Service { code: String, message: String },
    #[error("Routing service returned no route")]
    NoRoute,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    geometry: Geometry,
}

/// GeoJSON LineString; positions are `[lon, lat]`.
#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

/// Replaces a freehand path with one that follows the road network.
pub struct RoadSnapClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RoadSnapClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_OSRM_ENDPOINT.to_string(),
        }
    }

    /// Sets a custom OSRM endpoint (scheme and host, no trailing path).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Requests a road-aligned version of `path`.
    ///
    /// On any failure the caller keeps its current path.
    pub async fn snap(&self, path: &Path, activity: ActivityType) -> Result<Path, SnapError> {
        let url = self.route_url(path, activity)?;
        debug!(%url, points = path.len(), "requesting road snap");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "road snap request rejected");
            return Err(SnapError::Status(status));
        }

        let text = response.text().await?;
        let snapped = Self::parse_response(&text)?;
        debug!(points = snapped.len(), "road snap succeeded");
        Ok(snapped)
    }

    /// `route/v1/{profile}/{lon,lat;...}` request for `path`.
    pub fn route_url(&self, path: &Path, activity: ActivityType) -> Result<String, SnapError> {
        if path.len() < 2 {
            return Err(SnapError::TooFewPoints(path.len()));
        }
        let coordinates = path
            .points()
            .iter()
            .map(|c| format!("{},{}", c.lon, c.lat))
            .collect::<Vec<_>>()
            .join(";");
        Ok(format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.endpoint,
            activity.routing_profile(),
            coordinates
        ))
    }

    /// Parses an OSRM route response into a path.
    fn parse_response(text: &str) -> Result<Path, SnapError> {
        let parsed: RouteResponse = serde_json::from_str(text)?;

        if parsed.code != "Ok" {
            return Err(SnapError::Service {
                code: parsed.code,
                message: parsed.message.unwrap_or_default(),
            });
        }

        let route = parsed.routes.into_iter().next().ok_or(SnapError::NoRoute)?;
        if route.geometry.coordinates.is_empty() {
            return Err(SnapError::NoRoute);
        }

        Ok(route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lon, lat]| Coordinate::new(lat, lon))
            .collect())
    }
}

impl Default for RoadSnapClient {
    fn default() -> Self {
        Self::new()
    }
}
