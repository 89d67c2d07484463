//! Single provider call.

use tokio::time::Instant;

use georoute_core::{RouteLeg, RouteQuery, RouteResult};

use crate::context::ResolverContext;
use crate::observability::AttemptRecord;
use crate::providers::{ProviderDescriptor, ProviderError};

/// Longest slice of an error body kept in messages.
const MAX_ERROR_BODY: usize = 200;

/// Calls one provider, records the outcome in the health cache and the
/// attempt log, and never returns an error.
#[derive(Debug, Clone)]
pub struct ProviderInvoker {
    ctx: ResolverContext,
}

impl ProviderInvoker {
    pub fn new(ctx: ResolverContext) -> Self {
        Self { ctx }
    }

    /// `Some` on success, `None` on any failure including "no route".
    pub async fn invoke(
        &self,
        provider: &ProviderDescriptor,
        query: &RouteQuery,
    ) -> Option<RouteResult> {
        let started = Instant::now();
        let outcome = self.attempt(provider, query).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(leg) => {
                self.ctx.health.record_success(provider.name(), Instant::now());
                self.ctx
                    .sink
                    .record(&AttemptRecord::success(provider.name(), leg, elapsed));
                tracing::debug!(
                    provider = %provider.name(),
                    destination = %query.display_label(),
                    distance_km = leg.distance_km,
                    "Provider resolved route"
                );
                Some(RouteResult::from_provider(
                    provider.name(),
                    provider.accuracy(),
                    leg,
                ))
            }
            Err(e) => {
                self.ctx.health.record_failure(provider.name(), Instant::now());
                self.ctx
                    .sink
                    .record(&AttemptRecord::failure(provider.name(), &e, elapsed));
                if e.is_no_route() {
                    tracing::info!(
                        provider = %provider.name(),
                        destination = %query.display_label(),
                        reason = %e,
                        "Provider found no route"
                    );
                } else {
                    tracing::warn!(
                        provider = %provider.name(),
                        destination = %query.display_label(),
                        kind = e.kind(),
                        error = %e,
                        "Provider call failed"
                    );
                }
                None
            }
        }
    }

    async fn attempt(
        &self,
        provider: &ProviderDescriptor,
        query: &RouteQuery,
    ) -> Result<RouteLeg, ProviderError> {
        let request = provider.build_request(query)?;
        let timeout = provider.timeout();

        tracing::trace!(provider = %provider.name(), request = ?request, "Dispatching");

        // Dropping the future on timeout cancels the in-flight request
        let response =
            match tokio::time::timeout(timeout, self.ctx.transport.execute(&request, timeout))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(ProviderError::Timeout(timeout)),
            };

        if response.status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after: response.retry_after,
            });
        }

        if !response.is_success() {
            return Err(ProviderError::Http {
                status: response.status,
                message: truncate(&response.body, MAX_ERROR_BODY),
            });
        }

        provider.parse_response(&response.body)
    }
}

fn truncate(body: &str, max: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
