//! Batch orchestrator: resolve many destinations and rank them.
//!
//! The orchestrator implements:
//! - Bounded fan-out over destinations (`buffer_unordered`)
//! - One shared health cache for every cascade in the batch
//! - Sentinel results for destinations without usable coordinates
//! - Stable ascending sort by distance
//!
//! Nothing in a batch can fail: every destination comes back with exactly
//! one record.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;

use georoute_core::{
    rank_by_distance, BatchRequest, MarketDistanceRecord, RouteQuery, RouteResult,
};

use crate::cascade::CascadeResolver;
use crate::config::BatchConfig;
use crate::context::ResolverContext;
use crate::observability::{AttemptSink, NullAttemptLog};
use crate::providers::ProviderRegistry;
use crate::resilience::{HealthCache, HealthPolicy, HealthSnapshot};
use crate::transport::RouteTransport;
use crate::RuntimeError;

/// Ranked batch output.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    /// One record per input destination, nearest first
    pub results: Vec<MarketDistanceRecord>,
    pub summary: BatchSummary,
}

/// Where the answers in a batch came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,

    /// Result count per source, local estimator included
    pub by_provider: BTreeMap<String, usize>,

    pub local_estimates: usize,

    /// Destinations that got the sentinel distance
    pub unresolved: usize,

    pub elapsed_ms: u64,
}

impl BatchSummary {
    fn from_results(results: &[MarketDistanceRecord], elapsed_ms: u64) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            elapsed_ms,
            ..Default::default()
        };
        for record in results {
            let route = &record.route;
            if route.is_unresolved() {
                summary.unresolved += 1;
                continue;
            }
            if route.is_local_estimate() {
                summary.local_estimates += 1;
            }
            *summary
                .by_provider
                .entry(route.provider_name.clone())
                .or_default() += 1;
        }
        summary
    }
}

/// Resolves batches of destinations against one shared resolver context.
#[derive(Debug)]
pub struct BatchOrchestrator {
    ctx: ResolverContext,
    resolver: CascadeResolver,
    batch: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(ctx: ResolverContext, batch: BatchConfig) -> Self {
        let resolver = CascadeResolver::new(ctx.clone());
        Self {
            ctx,
            resolver,
            batch,
        }
    }

    pub fn builder() -> BatchOrchestratorBuilder {
        BatchOrchestratorBuilder::default()
    }

    /// Built-in providers over HTTP, configured from `config`.
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        let registry = ProviderRegistry::with_defaults(&config.providers)?;
        let transport = Arc::new(crate::transport::HttpTransport::new(&config.http)?);

        let mut builder = Self::builder()
            .registry(registry)
            .transport(transport)
            .policy(config.health.clone())
            .batch_config(config.batch.clone());

        if let Some(path) = &config.attempt_log {
            builder = builder.sink(Arc::new(crate::observability::FileAttemptLog::new(path)));
        }

        builder.build()
    }

    /// Resolve and rank every destination in `request`.
    pub async fn resolve_batch(&self, request: &BatchRequest) -> BatchResponse {
        let started = Instant::now();

        if request.force_fresh_cache {
            self.reset_health();
        }

        let queries = if request.origin.is_valid() {
            request.located_queries()
        } else {
            tracing::warn!(origin = %request.origin, "Invalid origin, no destination can be resolved");
            Vec::new()
        };

        let cap = self.batch.effective_concurrency(request.concurrency_cap);
        tracing::info!(
            destinations = request.destinations.len(),
            located = queries.len(),
            concurrency = cap,
            "Resolving batch"
        );

        let resolved: Vec<(usize, RouteResult)> = stream::iter(queries)
            .map(|(idx, query)| async move { (idx, self.resolver.resolve(&query).await) })
            .buffer_unordered(cap)
            .collect()
            .await;

        let mut routes: Vec<Option<RouteResult>> = vec![None; request.destinations.len()];
        for (idx, route) in resolved {
            routes[idx] = Some(route);
        }

        let mut results: Vec<MarketDistanceRecord> = request
            .destinations
            .iter()
            .cloned()
            .zip(routes)
            .map(|(destination, route)| match route {
                Some(route) => MarketDistanceRecord::new(destination, route),
                None => MarketDistanceRecord::unresolved(destination),
            })
            .collect();

        rank_by_distance(&mut results);

        let summary = BatchSummary::from_results(&results, started.elapsed().as_millis() as u64);
        tracing::info!(
            total = summary.total,
            local_estimates = summary.local_estimates,
            unresolved = summary.unresolved,
            elapsed_ms = summary.elapsed_ms,
            "Batch resolved"
        );

        BatchResponse { results, summary }
    }

    /// Resolve a single origin/destination pair.
    ///
    /// Invalid coordinates give the sentinel result without any call.
    pub async fn resolve_one(&self, query: &RouteQuery) -> RouteResult {
        if !query.origin.is_valid() || !query.destination.is_valid() {
            tracing::warn!(
                origin = %query.origin,
                destination = %query.destination,
                "Invalid coordinates, returning unresolved"
            );
            return RouteResult::unresolved();
        }
        self.resolver.resolve(query).await
    }

    /// Forget all provider health ("force fresh").
    pub fn reset_health(&self) {
        self.ctx.health.reset();
    }

    pub fn health_snapshot(&self) -> Vec<HealthSnapshot> {
        self.ctx.health.snapshot(Instant::now())
    }

    pub fn health(&self) -> &HealthCache {
        &self.ctx.health
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.ctx.registry
    }

    pub fn context(&self) -> &ResolverContext {
        &self.ctx
    }
}

/// Builder for [`BatchOrchestrator`].
#[derive(Default)]
pub struct BatchOrchestratorBuilder {
    registry: Option<ProviderRegistry>,
    transport: Option<Arc<dyn RouteTransport>>,
    sink: Option<Arc<dyn AttemptSink>>,
    policy: HealthPolicy,
    batch: BatchConfig,
}

impl BatchOrchestratorBuilder {
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn RouteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn policy(mut self, policy: HealthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// Assemble the orchestrator.
    ///
    /// Without an explicit transport the HTTP transport is used when the
    /// `http` feature is enabled.
    pub fn build(self) -> Result<BatchOrchestrator, RuntimeError> {
        let registry = self
            .registry
            .ok_or(RuntimeError::MissingComponent("registry"))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        let ctx = ResolverContext::with_policy(registry, transport, self.policy)
            .with_sink(self.sink.unwrap_or_else(|| Arc::new(NullAttemptLog)));

        Ok(BatchOrchestrator::new(ctx, self.batch))
    }
}

#[cfg(feature = "http")]
fn default_transport() -> Result<Arc<dyn RouteTransport>, RuntimeError> {
    let transport = crate::transport::HttpTransport::new(&crate::config::HttpConfig::default())?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "http"))]
fn default_transport() -> Result<Arc<dyn RouteTransport>, RuntimeError> {
    Err(RuntimeError::MissingComponent("transport"))
}
