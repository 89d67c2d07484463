//! HERE Routing API v8 provider.
//!
//! A route is split into sections; each section summary carries `length`
//! (meters) and `duration` (seconds).
//!
//! See: <https://www.here.com/docs/bundle/routing-api-v8-api-reference>

use serde::Deserialize;

use super::{
    build_url, checked_leg, parse_json, require_credential, secrets::ApiCredential,
    ProviderError, ProviderRequest, RouteCodec,
};
use georoute_core::{RouteLeg, RouteQuery};

/// Environment variable name for the HERE API key.
pub const HERE_API_KEY_ENV: &str = "HERE_API_KEY";

const ROUTES_URL: &str = "https://router.hereapi.com/v8/routes";

/// HERE Routing codec.
#[derive(Debug, Clone)]
pub struct HereRouting {
    credential: Option<ApiCredential>,
    base_url: String,
}

impl HereRouting {
    pub fn new(credential: Option<ApiCredential>) -> Self {
        Self {
            credential,
            base_url: ROUTES_URL.to_string(),
        }
    }

    /// Read the key from `HERE_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(ApiCredential::from_env_optional(
            HERE_API_KEY_ENV,
            "HERE API key",
        ))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<HereRoute>,
    #[serde(default)]
    notices: Vec<Notice>,
}

#[derive(Debug, Deserialize)]
struct HereRoute {
    sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct Summary {
    length: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct Notice {
    #[serde(default)]
    title: String,
}

impl RouteCodec for HereRouting {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        let key = require_credential(&self.credential, HERE_API_KEY_ENV)?;

        let url = build_url(
            &self.base_url,
            &[
                ("transportMode", "car".to_string()),
                ("origin", query.origin.to_string()),
                ("destination", query.destination.to_string()),
                ("return", "summary".to_string()),
                ("apikey", key.expose().to_string()),
            ],
        )?;

        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        let response: RoutesResponse = parse_json(body)?;

        let Some(route) = response.routes.into_iter().next() else {
            let reason = response
                .notices
                .into_iter()
                .map(|n| n.title)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ProviderError::NoRoute(if reason.is_empty() {
                "no routes returned".to_string()
            } else {
                reason
            }));
        };

        let (meters, seconds) = route.sections.iter().fold((0.0, 0.0), |(m, s), section| {
            (m + section.summary.length, s + section.summary.duration)
        });

        checked_leg(RouteLeg::from_meters_seconds(meters, seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CredentialSource;
    use georoute_core::Coordinates;

    fn codec() -> HereRouting {
        HereRouting::new(Some(ApiCredential::new(
            "here-key",
            CredentialSource::Programmatic,
            "HERE API key",
        )))
    }

    #[test]
    fn test_build_request() {
        let query = RouteQuery::new(
            Coordinates { lat: 52.5, lng: 13.4 },
            Coordinates { lat: 52.52, lng: 13.45 },
        );
        let request = codec().build_request(&query).unwrap();
        let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("transportMode".into(), "car".into())));
        assert!(pairs.contains(&("origin".into(), "52.5,13.4".into())));
        assert!(pairs.contains(&("apikey".into(), "here-key".into())));
    }

    #[test]
    fn test_parse_sums_sections() {
        let body = r#"{
            "routes": [{
                "id": "r0",
                "sections": [
                    {"type": "vehicle", "summary": {"length": 4200, "duration": 600, "baseDuration": 540}},
                    {"type": "vehicle", "summary": {"length": 800, "duration": 120}}
                ]
            }]
        }"#;
        let leg = codec().parse_response(body).unwrap();
        assert_eq!(leg.distance_km, 5.0);
        assert_eq!(leg.duration_minutes, 12.0);
    }

    #[test]
    fn test_parse_empty_routes_reports_notices() {
        let body = r#"{"routes": [], "notices": [{"title": "Route calculation failed: Couldn't find a route.", "code": "couldNotMatchOrigin"}]}"#;
        match codec().parse_response(body).unwrap_err() {
            ProviderError::NoRoute(reason) => assert!(reason.contains("Couldn't find a route")),
            other => panic!("expected NoRoute, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let err = codec().parse_response("<html>502</html>").unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
