//! openrouteservice Directions provider.
//!
//! Uses the POST JSON endpoint with the key in the `Authorization` header.
//! Answers are `{"routes": [{"summary": {"distance", "duration"}}]}` with
//! meters and seconds.

use serde::Deserialize;
use serde_json::json;

use super::{
    checked_leg, parse_endpoint, parse_json, require_credential, secrets::ApiCredential,
    ProviderError, ProviderRequest, RouteCodec,
};
use georoute_core::{RouteLeg, RouteQuery};

/// Environment variable name for the openrouteservice API key.
pub const OPENROUTESERVICE_API_KEY_ENV: &str = "OPENROUTESERVICE_API_KEY";

const DIRECTIONS_URL: &str = "https://api.openrouteservice.org/v2/directions/driving-car";

/// openrouteservice codec.
#[derive(Debug, Clone)]
pub struct OpenRouteService {
    credential: Option<ApiCredential>,
    base_url: String,
}

impl OpenRouteService {
    pub fn new(credential: Option<ApiCredential>) -> Self {
        Self {
            credential,
            base_url: DIRECTIONS_URL.to_string(),
        }
    }

    /// Read the key from `OPENROUTESERVICE_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(ApiCredential::from_env_optional(
            OPENROUTESERVICE_API_KEY_ENV,
            "openrouteservice API key",
        ))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<OrsRoute>,
    #[serde(default)]
    error: Option<OrsError>,
}

#[derive(Debug, Deserialize)]
struct OrsRoute {
    summary: OrsSummary,
}

#[derive(Debug, Deserialize)]
struct OrsSummary {
    // Both are omitted when origin and destination coincide.
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OrsError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Error 2010 is "could not find routable point", 2009 "route not found".
const NO_ROUTE_CODES: [i64; 2] = [2009, 2010];

impl RouteCodec for OpenRouteService {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let key = require_credential(&self.credential, OPENROUTESERVICE_API_KEY_ENV)?;

        let url = parse_endpoint(&self.base_url)?;
        let body = json!({
            "coordinates": [
                [query.origin.lng, query.origin.lat],
                [query.destination.lng, query.destination.lat]
            ],
            "instructions": false
        });

        Ok(ProviderRequest::post_json(url, body).with_header("authorization", key.expose()))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        let response: DirectionsResponse = parse_json(body)?;

        if let Some(error) = response.error {
            return match error.code {
                Some(code) if NO_ROUTE_CODES.contains(&code) => {
                    Err(ProviderError::NoRoute(error.message))
                }
                code => Err(ProviderError::Service {
                    code: code.map(|c| c.to_string()).unwrap_or_default(),
                    message: error.message,
                }),
            };
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoRoute("no routes returned".to_string()))?;

        checked_leg(RouteLeg::from_meters_seconds(
            route.summary.distance,
            route.summary.duration,
        ))
    }
}
