//! # georoute-runtime
//!
//! Cascading multi-provider driving distance resolution.
//!
//! Each destination is resolved by walking routing providers in descending
//! accuracy order. A provider is skipped while its circuit is open or while
//! it is inside its rate-limit interval; the first provider that answers
//! wins. When none does, the deterministic local estimator in
//! `georoute-core` produces the result, so resolution never fails.
//!
//! ## Example
//!
//! ```rust,ignore
//! use georoute_core::BatchRequest;
//! use georoute_runtime::{BatchOrchestrator, RuntimeConfig};
//!
//! let orchestrator = BatchOrchestrator::from_config(&RuntimeConfig::default())?;
//! let request = BatchRequest::from_file("markets.json")?;
//!
//! let response = orchestrator.resolve_batch(&request).await;
//! for record in &response.results {
//!     println!("{} {:.1} km via {}", record.destination.id,
//!         record.route.distance_km, record.route.provider_name);
//! }
//! ```
//!
//! ## Feature flags
//!
//! - `http` (default): reqwest-backed [`HttpTransport`]. Without it callers
//!   must supply their own [`RouteTransport`].

use thiserror::Error;

pub mod cascade;
pub mod config;
pub mod context;
pub mod invoker;
pub mod observability;
pub mod orchestrator;
pub mod providers;
pub mod resilience;
pub mod transport;

#[doc(hidden)]
pub mod test_support;

pub use cascade::CascadeResolver;
pub use config::{
    BatchConfig, ConfigError, HttpConfig, ProviderOverride, ProvidersConfig, RuntimeConfig,
};
pub use context::ResolverContext;
pub use invoker::ProviderInvoker;
pub use observability::{
    AttemptOutcome, AttemptRecord, AttemptSink, FileAttemptLog, NullAttemptLog,
};
pub use orchestrator::{BatchOrchestrator, BatchOrchestratorBuilder, BatchResponse, BatchSummary};
pub use providers::{
    ProviderDescriptor, ProviderError, ProviderRegistry, RouteCodec, TerminalProvider,
    BUILTIN_PROVIDERS,
};
pub use resilience::{
    Availability, CircuitState, HealthCache, HealthPolicy, HealthSnapshot, ProviderHealth,
};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{RouteTransport, TransportResponse};

/// Startup and configuration errors.
///
/// Resolution itself never fails; these only come out of building a
/// registry or an orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider registry is empty")]
    EmptyRegistry,

    #[error("Duplicate provider name: '{0}'")]
    DuplicateProvider(String),

    #[error("Invalid provider '{name}': {reason}")]
    InvalidProvider { name: String, reason: String },

    #[error("Unknown provider: '{0}'")]
    UnknownProvider(String),

    #[error("Missing component: {0}")]
    MissingComponent(&'static str),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
