//! In-memory doubles for driving the cascade without a network.
//!
//! A stub provider named `x` sends its requests to `http://stub.invalid/x`;
//! [`ScriptedTransport`] answers each provider from a per-name script and
//! counts calls. Stub bodies use the normalized
//! `{"distanceKm", "durationMinutes"}` shape.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use georoute_core::{RouteLeg, RouteQuery};

use crate::observability::{AttemptOutcome, AttemptRecord, AttemptSink};
use crate::providers::{
    ProviderDescriptor, ProviderError, ProviderRegistry, ProviderRequest, RouteCodec,
};
use crate::transport::{RouteTransport, TransportResponse};

const STUB_HOST: &str = "http://stub.invalid";

/// Codec for stub providers.
#[derive(Debug, Clone)]
pub struct StubCodec {
    name: String,
    configured: bool,
}

impl StubCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configured: true,
        }
    }

    /// A codec whose key is "missing": `build_request` always fails.
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configured: false,
        }
    }
}

impl RouteCodec for StubCodec {
    fn build_request(&self, query: &RouteQuery) -> Result<ProviderRequest, ProviderError> {
        if !self.configured {
            return Err(ProviderError::NotConfigured(format!(
                "API key missing: set STUB_{}_KEY",
                self.name.to_uppercase()
            )));
        }
        let url = Url::parse_with_params(
            &format!("{}/{}", STUB_HOST, self.name),
            &[
                ("olat", query.origin.lat.to_string()),
                ("olng", query.origin.lng.to_string()),
                ("dlat", query.destination.lat.to_string()),
                ("dlng", query.destination.lng.to_string()),
            ],
        )
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
        Ok(ProviderRequest::get(url))
    }

    fn parse_response(&self, body: &str) -> Result<RouteLeg, ProviderError> {
        let value: JsonValue =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        if value.get("noRoute").and_then(JsonValue::as_bool) == Some(true) {
            return Err(ProviderError::NoRoute("stub: no route".to_string()));
        }
        serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Descriptor for a stub provider with default limits (60/min, 5 s).
pub fn stub_descriptor(name: &str, accuracy: u8) -> ProviderDescriptor {
    ProviderDescriptor::new(name, accuracy, Arc::new(StubCodec::new(name)))
}

/// Descriptor for a stub provider that fails fast as unconfigured.
pub fn unconfigured_descriptor(name: &str, accuracy: u8) -> ProviderDescriptor {
    ProviderDescriptor::new(name, accuracy, Arc::new(StubCodec::unconfigured(name)))
}

/// Registry of stub providers.
///
/// # Panics
/// On an invalid provider set.
pub fn stub_registry(providers: &[(&str, u8)]) -> ProviderRegistry {
    ProviderRegistry::new(
        providers
            .iter()
            .map(|(name, accuracy)| stub_descriptor(name, *accuracy))
            .collect(),
    )
    .expect("valid stub registry")
}

/// Scripted answer for one provider.
#[derive(Debug, Clone, PartialEq)]
pub enum StubReply {
    /// 200 with a normalized route body
    Route {
        distance_km: f64,
        duration_minutes: f64,
    },

    /// 200 with distance = 100 km per degree of latitude between the points
    EchoLatitude,

    /// Empty body with this status
    Status(u16),

    /// 200 with a "no route" marker
    NoRoute,

    /// 200 with this raw body
    Body(String),

    /// Never answers
    Hang,
}

/// Transport that answers from per-provider scripts.
#[derive(Debug)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, StubReply>>,
    default_reply: StubReply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Unscripted providers answer 503.
    pub fn new() -> Self {
        Self::failing(503)
    }

    /// Every unscripted provider answers with `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            default_reply: StubReply::Status(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every provider succeeds with distances derived from latitude.
    pub fn echo_latitude(name: &str) -> Self {
        Self::new().with_reply(name, StubReply::EchoLatitude)
    }

    pub fn with_reply(self, name: &str, reply: StubReply) -> Self {
        self.set_reply(name, reply);
        self
    }

    /// Change a provider's script mid-test.
    pub fn set_reply(&self, name: &str, reply: StubReply) {
        self.replies.lock().insert(name.to_string(), reply);
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == name).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Provider names in the order they were called.
    pub fn call_order(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn reply_for(&self, name: &str) -> StubReply {
        self.replies
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn query_param(url: &Url, key: &str) -> Option<f64> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.parse().ok())
}

#[async_trait]
impl RouteTransport for ScriptedTransport {
    async fn execute(
        &self,
        request: &ProviderRequest,
        _timeout: Duration,
    ) -> Result<TransportResponse, ProviderError> {
        let name = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        self.calls.lock().push(name.clone());
        let reply = self.reply_for(&name);

        match reply {
            StubReply::Route {
                distance_km,
                duration_minutes,
            } => Ok(TransportResponse::ok(
                json!({"distanceKm": distance_km, "durationMinutes": duration_minutes})
                    .to_string(),
            )),
            StubReply::EchoLatitude => {
                let olat = query_param(&request.url, "olat").unwrap_or_default();
                let dlat = query_param(&request.url, "dlat").unwrap_or_default();
                let distance_km = (dlat - olat).abs() * 100.0;
                Ok(TransportResponse::ok(
                    json!({"distanceKm": distance_km, "durationMinutes": distance_km * 2.0})
                        .to_string(),
                ))
            }
            StubReply::Status(status) => Ok(TransportResponse::with_status(status, "")),
            StubReply::NoRoute => Ok(TransportResponse::ok(r#"{"noRoute": true}"#)),
            StubReply::Body(body) => Ok(TransportResponse::ok(body)),
            StubReply::Hang => {
                futures::future::pending::<Result<TransportResponse, ProviderError>>().await
            }
        }
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AttemptRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records.lock().clone()
    }

    pub fn outcomes(&self) -> Vec<AttemptOutcome> {
        self.records.lock().iter().map(|r| r.outcome).collect()
    }
}

impl AttemptSink for MemorySink {
    fn record(&self, record: &AttemptRecord) {
        self.records.lock().push(record.clone());
    }
}
