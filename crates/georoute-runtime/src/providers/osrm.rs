//! OSRM Route service provider (public demo server).
//!
//! The key-less open source in the registry. Mapbox Directions speaks the
//! same response dialect, so the parser here is shared with
//! [`mapbox`](super::mapbox).
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service>

use serde::Deserialize;

use super::{build_url, checked_leg, parse_json, ProviderError, ProviderRequest, RouteCodec};
use georoute_core::{RouteLeg, RouteQuery};

const DEMO_SERVER_URL: &str = "https://router.project-osrm.org";

/// OSRM Route API response.
///
/// `code` is `"Ok"` on success; `"NoRoute"` and `"NoSegment"` mean the
/// points could not be connected or snapped to the road network.
#[derive(Debug, Deserialize)]
pub(super) struct RouteResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsrmRoute {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
}

/// Parse an OSRM-dialect route response.
pub(super) fn parse_route_response(body: &str) -> Result<RouteLeg, ProviderError> {
    let response: RouteResponse = parse_json(body)?;

    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => {
            return Err(ProviderError::NoRoute(
                response.message.unwrap_or(response.code),
            ));
        }
        _ => {
            return Err(ProviderError::Service {
                code: response.code,
                message: response.message.unwrap_or_default(),
            });
        }
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NoRoute("code Ok but no routes".to_string()))?;

    checked_leg(RouteLeg::from_meters_seconds(route.distance, route.duration))
}

/// `lng,lat;lng,lat` coordinate list used in OSRM-style paths.
pub(super) fn lng_lat_path(query: &RouteQuery) -> String {
    format!(
        "{},{};{},{}",
        query.origin.lng, query.origin.lat, query.destination.lng, query.destination.lat
    )
}

/// OSRM demo server codec.
#[derive(Debug, Clone)]
pub struct OsrmDemo {
    base_url: String,
}

impl OsrmDemo {
    pub fn new() -> Self {
        Self {
            base_url: DEMO_SERVER_URL.to_string(),
        }
    }

    /// Point at a self-hosted OSRM instance instead of the demo server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for OsrmDemo {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteCodec for OsrmDemo {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let endpoint = format!(
            "{}/route/v1/driving/{}",
            self.base_url.trim_end_matches('/'),
            lng_lat_path(query)
        );
        let url = build_url(
            &endpoint,
            &[
                ("overview", "false"),
                ("alternatives", "false"),
                ("steps", "false"),
            ],
        )?;

        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        parse_route_response(body)
    }
}
