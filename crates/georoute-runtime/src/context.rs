//! Shared resolver state.

use std::sync::Arc;

use crate::observability::{AttemptSink, NullAttemptLog};
use crate::providers::ProviderRegistry;
use crate::resilience::{HealthCache, HealthPolicy};
use crate::transport::RouteTransport;

/// Everything a resolver needs, shared by all resolvers of one
/// orchestrator.
///
/// The health cache lives here rather than in a global so that tests and
/// embedders can run isolated resolvers side by side.
#[derive(Clone)]
pub struct ResolverContext {
    pub registry: Arc<ProviderRegistry>,
    pub health: Arc<HealthCache>,
    pub transport: Arc<dyn RouteTransport>,
    pub sink: Arc<dyn AttemptSink>,
}

impl ResolverContext {
    /// Fresh health state with the default policy and no attempt log.
    pub fn new(registry: ProviderRegistry, transport: Arc<dyn RouteTransport>) -> Self {
        Self::with_policy(registry, transport, HealthPolicy::default())
    }

    pub fn with_policy(
        registry: ProviderRegistry,
        transport: Arc<dyn RouteTransport>,
        policy: HealthPolicy,
    ) -> Self {
        let health = Arc::new(HealthCache::new(&registry, policy));
        Self {
            registry: Arc::new(registry),
            health,
            transport,
            sink: Arc::new(NullAttemptLog),
        }
    }

    /// Replace the attempt sink.
    pub fn with_sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl std::fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverContext")
            .field("registry", &self.registry)
            .field("health", &self.health)
            .finish()
    }
}
