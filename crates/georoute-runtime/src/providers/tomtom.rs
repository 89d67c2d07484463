//! TomTom Routing API provider.
//!
//! Locations go in the path as `lat,lng:lat,lng`; the summary reports
//! `lengthInMeters` and `travelTimeInSeconds`.

use serde::Deserialize;

use super::{
    build_url, checked_leg, parse_json, require_credential, secrets::ApiCredential,
    ProviderError, ProviderRequest, RouteCodec,
};
use georoute_core::{RouteLeg, RouteQuery};

/// Environment variable name for the TomTom API key.
pub const TOMTOM_API_KEY_ENV: &str = "TOMTOM_API_KEY";

const CALCULATE_ROUTE_URL: &str = "https://api.tomtom.com/routing/1/calculateRoute";

/// TomTom Routing codec.
#[derive(Debug, Clone)]
pub struct TomTomRouting {
    credential: Option<ApiCredential>,
    base_url: String,
}

impl TomTomRouting {
    pub fn new(credential: Option<ApiCredential>) -> Self {
        Self {
            credential,
            base_url: CALCULATE_ROUTE_URL.to_string(),
        }
    }

    /// Read the key from `TOMTOM_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(ApiCredential::from_env_optional(
            TOMTOM_API_KEY_ENV,
            "TomTom API key",
        ))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct CalculateRouteResponse {
    #[serde(default)]
    routes: Vec<TomTomRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomTomRoute {
    summary: TomTomSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomTomSummary {
    length_in_meters: f64,
    travel_time_in_seconds: f64,
}

impl RouteCodec for TomTomRouting {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let key = require_credential(&self.credential, TOMTOM_API_KEY_ENV)?;

        let endpoint = format!(
            "{}/{}:{}/json",
            self.base_url.trim_end_matches('/'),
            query.origin,
            query.destination
        );
        let url = build_url(
            &endpoint,
            &[
                ("travelMode", "car".to_string()),
                ("routeType", "fastest".to_string()),
                ("key", key.expose().to_string()),
            ],
        )?;

        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        let response: CalculateRouteResponse = parse_json(body)?;

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoRoute("no routes returned".to_string()))?;

        checked_leg(RouteLeg::from_meters_seconds(
            route.summary.length_in_meters,
            route.summary.travel_time_in_seconds,
        ))
    }
}
