//! Mapbox Directions API provider.
//!
//! Same path layout and response dialect as OSRM, authenticated with an
//! `access_token` query parameter.

use super::{
    build_url, osrm, require_credential, secrets::ApiCredential, ProviderError, ProviderRequest,
    RouteCodec,
};
use georoute_core::{RouteLeg, RouteQuery};

/// Environment variable name for the Mapbox access token.
pub const MAPBOX_ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

const DIRECTIONS_URL: &str = "https://api.mapbox.com/directions/v5/mapbox/driving";

/// Mapbox Directions codec.
#[derive(Debug, Clone)]
pub struct MapboxDirections {
    credential: Option<ApiCredential>,
    base_url: String,
}

impl MapboxDirections {
    pub fn new(credential: Option<ApiCredential>) -> Self {
        Self {
            credential,
            base_url: DIRECTIONS_URL.to_string(),
        }
    }

    /// Read the token from `MAPBOX_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        Self::new(ApiCredential::from_env_optional(
            MAPBOX_ACCESS_TOKEN_ENV,
            "Mapbox access token",
        ))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl RouteCodec for MapboxDirections {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let token = require_credential(&self.credential, MAPBOX_ACCESS_TOKEN_ENV)?;

        let endpoint = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            osrm::lng_lat_path(query)
        );
        let url = build_url(
            &endpoint,
            &[
                ("overview", "false"),
                ("alternatives", "false"),
                ("access_token", token.expose()),
            ],
        )?;

        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        osrm::parse_route_response(body)
    }
}
