//! Ordered provider cascade with local fallback.

use tokio::time::Instant;

use georoute_core::{LocalEstimator, RouteLeg, RouteQuery, RouteResult};

use crate::context::ResolverContext;
use crate::invoker::ProviderInvoker;
use crate::observability::AttemptRecord;
use crate::resilience::Availability;

/// Resolves one query by walking the registry in accuracy order.
///
/// Providers are tried one at a time, never raced. The first success wins;
/// if every provider is skipped or fails, the local estimator answers.
/// `resolve` is total: it always returns a result.
#[derive(Debug, Clone)]
pub struct CascadeResolver {
    ctx: ResolverContext,
    invoker: ProviderInvoker,
}

impl CascadeResolver {
    pub fn new(ctx: ResolverContext) -> Self {
        let invoker = ProviderInvoker::new(ctx.clone());
        Self { ctx, invoker }
    }

    pub async fn resolve(&self, query: &RouteQuery) -> RouteResult {
        for provider in self.ctx.registry.list() {
            match self.ctx.health.try_acquire(provider.name(), Instant::now()) {
                Availability::Available => {}
                skipped => {
                    tracing::debug!(
                        provider = %provider.name(),
                        destination = %query.display_label(),
                        reason = skipped.reason(),
                        "Skipping provider"
                    );
                    continue;
                }
            }

            if let Some(result) = self.invoker.invoke(provider, query).await {
                return result;
            }
        }

        let result = LocalEstimator::resolve(query);
        tracing::info!(
            destination = %query.display_label(),
            distance_km = result.distance_km,
            "All providers unavailable, using local estimate"
        );
        self.ctx.sink.record(&AttemptRecord::fallback(RouteLeg {
            distance_km: result.distance_km,
            duration_minutes: result.duration_minutes,
        }));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderRegistry;
    use crate::test_support::{stub_descriptor, MemorySink, ScriptedTransport, StubReply};
    use crate::AttemptOutcome;
    use georoute_core::Coordinates;
    use std::sync::Arc;

    fn query() -> RouteQuery {
        RouteQuery::new(
            Coordinates {
                lat: -23.5505,
                lng: -46.6333,
            },
            Coordinates {
                lat: -23.5618,
                lng: -46.6565,
            },
        )
    }

    fn resolver(
        transport: ScriptedTransport,
    ) -> (CascadeResolver, Arc<ScriptedTransport>, Arc<MemorySink>) {
        let registry = ProviderRegistry::new(vec![
            stub_descriptor("primary", 95),
            stub_descriptor("secondary", 85),
            stub_descriptor("tertiary", 75),
        ])
        .unwrap();
        let transport = Arc::new(transport);
        let sink = Arc::new(MemorySink::default());
        let ctx = ResolverContext::new(registry, transport.clone()).with_sink(sink.clone());
        (CascadeResolver::new(ctx), transport, sink)
    }

    fn route(km: f64) -> StubReply {
        StubReply::Route {
            distance_km: km,
            duration_minutes: km * 2.0,
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (resolver, transport, _) = resolver(
            ScriptedTransport::new()
                .with_reply("primary", route(3.0))
                .with_reply("secondary", route(4.0)),
        );

        let result = resolver.resolve(&query()).await;

        assert_eq!(result.provider_name, "primary");
        assert_eq!(result.accuracy, 95);
        assert_eq!(transport.calls("secondary"), 0);
    }

    #[tokio::test]
    async fn test_falls_through_in_order() {
        let (resolver, transport, sink) = resolver(
            ScriptedTransport::new()
                .with_reply("primary", StubReply::Status(500))
                .with_reply("secondary", StubReply::NoRoute)
                .with_reply("tertiary", route(3.3)),
        );

        let result = resolver.resolve(&query()).await;

        assert_eq!(result.provider_name, "tertiary");
        assert_eq!(result.accuracy, 75);
        assert_eq!(transport.call_order(), vec!["primary", "secondary", "tertiary"]);
        assert_eq!(
            sink.outcomes(),
            vec![
                AttemptOutcome::Failure,
                AttemptOutcome::NoRoute,
                AttemptOutcome::Success
            ]
        );
    }

    #[tokio::test]
    async fn test_all_failing_uses_local_estimator() {
        let (resolver, _, sink) = resolver(ScriptedTransport::failing(503));

        let result = resolver.resolve(&query()).await;

        assert!(result.is_local_estimate());
        assert_eq!(result.accuracy, 70);
        assert!(result.is_driving_distance);
        assert!(result.distance_km > 0.0);
        assert_eq!(sink.outcomes().last(), Some(&AttemptOutcome::Fallback));
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_skipped_without_call() {
        let (resolver, transport, _) = resolver(
            ScriptedTransport::new()
                .with_reply("primary", route(3.0))
                .with_reply("secondary", route(4.0)),
        );
        for _ in 0..3 {
            resolver
                .ctx
                .health
                .record_failure("primary", Instant::now());
        }

        let result = resolver.resolve(&query()).await;

        assert_eq!(result.provider_name, "secondary");
        assert_eq!(transport.calls("primary"), 0);
    }
}
