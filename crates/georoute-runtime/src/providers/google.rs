//! Google Directions API provider.
//!
//! The primary commercial source. Answers carry a top-level `status` and a
//! list of routes whose legs hold `distance.value` (meters) and
//! `duration.value` (seconds).
//!
//! See: <https://developers.google.com/maps/documentation/directions/get-directions>

use serde::Deserialize;

use super::{
    build_url, checked_leg, parse_json, require_credential, secrets::ApiCredential,
    ProviderError, ProviderRequest, RouteCodec,
};
use georoute_core::{RouteLeg, RouteQuery};

/// Environment variable name for the Google Maps API key.
pub const GOOGLE_MAPS_API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Google Directions codec.
#[derive(Debug, Clone)]
pub struct GoogleDirections {
    credential: Option<ApiCredential>,
    base_url: String,
}

impl GoogleDirections {
    pub fn new(credential: Option<ApiCredential>) -> Self {
        Self {
            credential,
            base_url: DIRECTIONS_URL.to_string(),
        }
    }

    /// Read the key from `GOOGLE_MAPS_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(ApiCredential::from_env_optional(
            GOOGLE_MAPS_API_KEY_ENV,
            "Google Maps API key",
        ))
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: TextValue,
    duration: TextValue,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: f64,
}

impl RouteCodec for GoogleDirections {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let key = require_credential(&self.credential, GOOGLE_MAPS_API_KEY_ENV)?;

        let url = build_url(
            &self.base_url,
            &[
                ("origin", query.origin.to_string()),
                ("destination", query.destination.to_string()),
                ("mode", "driving".to_string()),
                ("key", key.expose().to_string()),
            ],
        )?;

        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        let response: DirectionsResponse = parse_json(body)?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => {
                return Err(ProviderError::NoRoute(response.status));
            }
            _ => {
                return Err(ProviderError::Service {
                    code: response.status,
                    message: response.error_message.unwrap_or_default(),
                });
            }
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoRoute("status OK but no routes".to_string()))?;

        let (meters, seconds) = route
            .legs
            .iter()
            .fold((0.0, 0.0), |(m, s), leg| (m + leg.distance.value, s + leg.duration.value));

        checked_leg(RouteLeg::from_meters_seconds(meters, seconds))
    }
}
