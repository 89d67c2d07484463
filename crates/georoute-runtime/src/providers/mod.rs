//! Routing provider abstractions.
//!
//! A provider is data: a [`ProviderDescriptor`] carrying its name, static
//! accuracy rank, rate limit, timeout and a [`RouteCodec`] that knows how to
//! build the provider's request and normalize its native JSON answer into a
//! [`RouteLeg`]. Adding a provider means adding a descriptor, never touching
//! the cascade.
//!
//! ## Security
//!
//! API keys are held in [`ApiCredential`] wrappers and request URLs are
//! redacted whenever they are logged. See the [`secrets`] module.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use georoute_core::{RouteLeg, RouteQuery};

mod graphhopper;
mod google;
mod here;
mod mapbox;
mod openroute;
mod osrm;
mod registry;
pub mod secrets;
mod tomtom;

pub use graphhopper::{GraphHopperRouting, GRAPHHOPPER_API_KEY_ENV};
pub use google::{GoogleDirections, GOOGLE_MAPS_API_KEY_ENV};
pub use here::{HereRouting, HERE_API_KEY_ENV};
pub use mapbox::{MapboxDirections, MAPBOX_ACCESS_TOKEN_ENV};
pub use openroute::{OpenRouteService, OPENROUTESERVICE_API_KEY_ENV};
pub use osrm::OsrmDemo;
pub use registry::{BuiltinProvider, ProviderRegistry, TerminalProvider, BUILTIN_PROVIDERS};
pub use secrets::{ApiCredential, CredentialSource};
pub use tomtom::{TomTomRouting, TOMTOM_API_KEY_ENV};

/// Errors from a single provider attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited upstream, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("No route found: {0}")]
    NoRoute(String),
}

impl ProviderError {
    /// The call succeeded but the provider found no drivable route.
    pub fn is_no_route(&self) -> bool {
        matches!(self, ProviderError::NoRoute(_))
    }

    /// Short machine-friendly category for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Http { .. } => "http",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Network(_) => "network",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Parse(_) => "parse",
            ProviderError::Service { .. } => "service",
            ProviderError::NoRoute(_) => "no_route",
        }
    }
}

/// HTTP verb for a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully-built outbound request.
///
/// The URL may carry an API key in its query string, so `Debug` only shows
/// the redacted form.
#[derive(Clone, PartialEq)]
pub struct ProviderRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl ProviderRequest {
    /// A GET request.
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A POST request with a JSON body.
    pub fn post_json(url: Url, body: JsonValue) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// URL without query string, safe to log.
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .field(
                "headers",
                &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Provider-specific request construction and response normalization.
pub trait RouteCodec: Send + Sync {
    /// Build the outbound request for a query.
    ///
    /// Fails fast with [`ProviderError::NotConfigured`] when a required API
    /// key is missing.
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError>;

    /// Normalize the provider's native JSON answer.
    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError>;
}

/// Immutable description of one routing provider.
#[derive(Clone)]
pub struct ProviderDescriptor {
    name: String,
    accuracy: u8,
    rate_limit_per_minute: u32,
    timeout: Duration,
    codec: Arc<dyn RouteCodec>,
}

/// Defaults for descriptors built without explicit limits.
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

impl ProviderDescriptor {
    /// Create a descriptor with default rate limit and timeout.
    pub fn new(name: impl Into<String>, accuracy: u8, codec: Arc<dyn RouteCodec>) -> Self {
        Self {
            name: name.into(),
            accuracy,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            timeout: DEFAULT_TIMEOUT,
            codec,
        }
    }

    /// Set the rate limit.
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Minimum spacing between two calls: `60s / rate_limit_per_minute`.
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(60) / self.rate_limit_per_minute.max(1)
    }

    /// Build the request for a query.
    pub fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        self.codec.build_request(query)
    }

    /// Parse a raw response body.
    pub fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        self.codec.parse_response(body)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("accuracy", &self.accuracy)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// Shared codec helpers

/// Fail fast when a provider's key is missing.
fn require_credential<'a>(
    credential: &'a Option<ApiCredential>,
    env_var: &str,
) -> Result<&'a ApiCredential, ProviderError> {
    match credential {
        Some(cred) if !cred.is_empty() => Ok(cred),
        _ => Err(ProviderError::NotConfigured(format!(
            "API key missing: set {}",
            env_var
        ))),
    }
}

fn parse_endpoint(base: &str) -> Result<Url, ProviderError> {
    Url::parse(base)
        .map_err(|e| ProviderError::NotConfigured(format!("invalid endpoint '{}': {}", base, e)))
}

fn build_url<I, K, V>(base: &str, params: I) -> Result<Url, ProviderError>
where
    I: IntoIterator,
    I::Item: std::borrow::Borrow<(K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    Url::parse_with_params(base, params)
        .map_err(|e| ProviderError::NotConfigured(format!("invalid endpoint '{}': {}", base, e)))
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Reject negative or non-finite legs some providers return for degenerate
/// input.
fn checked_leg(leg: RouteLeg) -> Result<RouteLeg, ProviderError> {
    if leg.is_plausible() {
        Ok(leg)
    } else {
        Err(ProviderError::Parse(format!(
            "implausible route: {} km / {} min",
            leg.distance_km, leg.duration_minutes
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullCodec;

    impl RouteCodec for NullCodec {
        fn build_request(&self, _query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
            Err(ProviderError::NotConfigured("null".to_string()))
        }

        fn parse_response(&self, _body: &str) -> Result<RouteLeg, ProviderError> {
            Err(ProviderError::Parse("null".to_string()))
        }
    }

    #[test]
    fn test_min_interval_from_rate_limit() {
        let descriptor =
            ProviderDescriptor::new("x", 80, Arc::new(NullCodec)).with_rate_limit(20);
        assert_eq!(descriptor.min_interval(), Duration::from_secs(3));

        let descriptor = descriptor.with_rate_limit(60);
        assert_eq!(descriptor.min_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_request_debug_redacts_query() {
        let url = Url::parse("https://api.example.com/route?key=sk-secret&mode=car").unwrap();
        let request = ProviderRequest::get(url).with_header("x-api-key", "sk-header-secret");

        let debug = format!("{:?}", request);
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("sk-header-secret"));
        assert_eq!(request.redacted_url(), "https://api.example.com/route");
    }

    #[test]
    fn test_require_credential_rejects_missing_and_empty() {
        let err = require_credential(&None, "SOME_KEY").unwrap_err();
        assert!(err.to_string().contains("SOME_KEY"));

        let empty = Some(ApiCredential::new("", CredentialSource::Programmatic, "k"));
        assert!(require_credential(&empty, "SOME_KEY").is_err());
    }

    #[test]
    fn test_checked_leg_rejects_nan() {
        let leg = RouteLeg {
            distance_km: f64::NAN,
            duration_minutes: 1.0,
        };
        assert!(matches!(checked_leg(leg), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_error_kinds() {
        assert!(ProviderError::NoRoute("none".into()).is_no_route());
        assert!(!ProviderError::Timeout(Duration::from_secs(1)).is_no_route());
        assert_eq!(
            ProviderError::Http {
                status: 503,
                message: "down".into()
            }
            .kind(),
            "http"
        );
    }
}
