//! GraphHopper Routing API provider.
//!
//! Paths report `distance` in meters and `time` in milliseconds.

use serde::Deserialize;

use super::{
    build_url, checked_leg, parse_json, require_credential, secrets::ApiCredential,
    ProviderError, ProviderRequest, RouteCodec,
};
use georoute_core::{RouteLeg, RouteQuery};

/// Environment variable name for the GraphHopper API key.
pub const GRAPHHOPPER_API_KEY_ENV: &str = "GRAPHHOPPER_API_KEY";

const ROUTE_URL: &str = "https://graphhopper.com/api/1/route";

/// GraphHopper codec.
#[derive(Debug, Clone)]
pub struct GraphHopperRouting {
    credential: Option<ApiCredential>,
    base_url: String,
}

impl GraphHopperRouting {
    pub fn new(credential: Option<ApiCredential>) -> Self {
        Self {
            credential,
            base_url: ROUTE_URL.to_string(),
        }
    }

    /// Read the key from `GRAPHHOPPER_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(ApiCredential::from_env_optional(
            GRAPHHOPPER_API_KEY_ENV,
            "GraphHopper API key",
        ))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    paths: Vec<Path>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Path {
    /// Meters
    distance: f64,
    /// Milliseconds
    time: f64,
}

impl RouteCodec for GraphHopperRouting {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let key = require_credential(&self.credential, GRAPHHOPPER_API_KEY_ENV)?;

        let url = build_url(
            &self.base_url,
            &[
                ("point", query.origin.to_string()),
                ("point", query.destination.to_string()),
                ("profile", "car".to_string()),
                ("calc_points", "false".to_string()),
                ("key", key.expose().to_string()),
            ],
        )?;

        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        let response: RouteResponse = parse_json(body)?;

        let path = response.paths.into_iter().next().ok_or_else(|| {
            ProviderError::NoRoute(
                response
                    .message
                    .unwrap_or_else(|| "no paths returned".to_string()),
            )
        })?;

        checked_leg(RouteLeg::from_meters_seconds(path.distance, path.time / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CredentialSource;
    use georoute_core::Coordinates;

    fn codec() -> GraphHopperRouting {
        GraphHopperRouting::new(Some(ApiCredential::new(
            "gh-key",
            CredentialSource::Programmatic,
            "GraphHopper API key",
        )))
    }

    #[test]
    fn test_build_request_repeats_point() {
        let query = RouteQuery::new(
            Coordinates { lat: 51.1, lng: 12.3 },
            Coordinates { lat: 51.2, lng: 12.4 },
        );
        let request = codec().build_request(&query).unwrap();
        let points: Vec<String> = request
            .url
            .query_pairs()
            .filter(|(k, _)| k == "point")
            .map(|(_, v)| v.into_owned())
            .collect();

        assert_eq!(points, vec!["51.1,12.3", "51.2,12.4"]);
    }

    #[test]
    fn test_parse_converts_milliseconds() {
        let body = r#"{"paths": [{"distance": 2500.0, "time": 300000, "weight": 310.2}], "info": {}}"#;
        let leg = codec().parse_response(body).unwrap();
        assert_eq!(leg.distance_km, 2.5);
        assert_eq!(leg.duration_minutes, 5.0);
    }

    #[test]
    fn test_parse_error_message_is_no_route() {
        let body = r#"{"message": "Cannot find point 0: 51.1,12.3"}"#;
        match codec().parse_response(body).unwrap_err() {
            ProviderError::NoRoute(msg) => assert!(msg.contains("Cannot find point")),
            other => panic!("expected NoRoute, got {other:?}"),
        }
    }
}
