//! Per-provider health cache and availability gate.
//!
//! Every provider gets one [`ProviderHealth`] record behind its own mutex,
//! so updates for one provider never contend with another. The set of
//! records is fixed when the cache is built from the registry.
//!
//! Availability combines two gates:
//! - a circuit breaker that opens after `failure_threshold` consecutive
//!   failures and keeps the provider out for `cooldown`
//! - a rate gate that spaces calls at least `60s / rate_limit_per_minute`
//!   apart
//!
//! Failures older than `heal_after` are forgiven on the next check.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::providers::ProviderRegistry;

/// Circuit breaker tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// How long an open circuit keeps the provider out
    #[serde(with = "crate::config::human_duration")]
    pub cooldown: Duration,

    /// Quiet period after which a partial failure streak is forgotten
    #[serde(with = "crate::config::human_duration")]
    pub heal_after: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(10 * 60),
            heal_after: Duration::from_secs(30 * 60),
        }
    }
}

/// Mutable health state of one provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderHealth {
    /// Last time a call was dispatched or succeeded
    pub last_used_at: Option<Instant>,

    /// Consecutive failures since the last success
    pub failure_count: u32,

    pub last_failure_at: Option<Instant>,

    pub is_circuit_open: bool,

    /// Successful calls over the process lifetime
    pub request_count: u64,
}

/// Outcome of an availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,

    /// Circuit open, still cooling down
    CircuitOpen { remaining: Duration },

    /// Called too recently for its rate limit
    RateLimited { wait: Duration },

    /// Name not in the cache
    Unknown,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// Short reason for skip logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::CircuitOpen { .. } => "circuit_open",
            Availability::RateLimited { .. } => "rate_limited",
            Availability::Unknown => "unknown_provider",
        }
    }
}

/// Derived circuit state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,

    /// Open and cooling down
    Open { remaining: Duration },

    /// Open flag still set but cooldown elapsed; the next call decides
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open { remaining } => write!(
                f,
                "open ({} left)",
                humantime::format_duration(Duration::from_secs(remaining.as_secs()))
            ),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Point-in-time view of one provider's health.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub request_count: u64,
    pub since_last_use: Option<Duration>,
    pub since_last_failure: Option<Duration>,
}

struct HealthEntry {
    min_interval: Duration,
    state: Mutex<ProviderHealth>,
}

/// Shared health state for every provider in a registry.
pub struct HealthCache {
    entries: HashMap<String, HealthEntry>,
    names: Vec<String>,
    policy: HealthPolicy,
}

impl HealthCache {
    /// Create one fresh record per registered provider.
    pub fn new(registry: &ProviderRegistry, policy: HealthPolicy) -> Self {
        let mut entries = HashMap::with_capacity(registry.len());
        let mut names = Vec::with_capacity(registry.len());

        for provider in registry.list() {
            names.push(provider.name().to_string());
            entries.insert(
                provider.name().to_string(),
                HealthEntry {
                    min_interval: provider.min_interval(),
                    state: Mutex::new(ProviderHealth::default()),
                },
            );
        }

        Self {
            entries,
            names,
            policy,
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// A call to `name` succeeded.
    pub fn record_success(&self, name: &str, now: Instant) {
        let Some(entry) = self.entries.get(name) else {
            tracing::debug!(provider = %name, "Success recorded for unknown provider");
            return;
        };

        let mut health = entry.state.lock();
        if health.is_circuit_open {
            tracing::info!(provider = %name, "Circuit closed after successful call");
        }
        health.last_used_at = Some(now);
        health.request_count += 1;
        health.failure_count = 0;
        health.is_circuit_open = false;
    }

    /// A call to `name` failed, for any reason including "no route".
    pub fn record_failure(&self, name: &str, now: Instant) {
        let Some(entry) = self.entries.get(name) else {
            tracing::debug!(provider = %name, "Failure recorded for unknown provider");
            return;
        };

        let mut health = entry.state.lock();
        health.last_failure_at = Some(now);
        health.failure_count = health.failure_count.saturating_add(1);

        if health.failure_count >= self.policy.failure_threshold {
            if !health.is_circuit_open {
                tracing::warn!(
                    provider = %name,
                    failures = health.failure_count,
                    cooldown = %humantime::format_duration(self.policy.cooldown),
                    "Circuit opened after repeated failures"
                );
            } else {
                tracing::warn!(provider = %name, "Circuit reopened after failed recovery call");
            }
            health.is_circuit_open = true;
        }
    }

    /// Whether `name` may be called at `now`. Read-only apart from healing.
    pub fn is_available(&self, name: &str, now: Instant) -> Availability {
        match self.entries.get(name) {
            Some(entry) => {
                let mut health = entry.state.lock();
                self.check(name, &mut health, entry.min_interval, now)
            }
            None => Availability::Unknown,
        }
    }

    /// Check availability and, if available, claim the slot by stamping
    /// `last_used_at` under the same lock.
    ///
    /// Two concurrent resolvers can never both pass the rate gate for the
    /// same provider inside one interval.
    pub fn try_acquire(&self, name: &str, now: Instant) -> Availability {
        match self.entries.get(name) {
            Some(entry) => {
                let mut health = entry.state.lock();
                let availability = self.check(name, &mut health, entry.min_interval, now);
                if availability.is_available() {
                    health.last_used_at = Some(now);
                }
                availability
            }
            None => Availability::Unknown,
        }
    }

    fn check(
        &self,
        name: &str,
        health: &mut ProviderHealth,
        min_interval: Duration,
        now: Instant,
    ) -> Availability {
        let since_failure = health
            .last_failure_at
            .map(|at| now.saturating_duration_since(at));

        if health.is_circuit_open {
            if let Some(elapsed) = since_failure {
                if elapsed < self.policy.cooldown {
                    return Availability::CircuitOpen {
                        remaining: self.policy.cooldown - elapsed,
                    };
                }
            }
        }

        if health.failure_count > 0 {
            if let Some(elapsed) = since_failure {
                if elapsed > self.policy.heal_after {
                    tracing::info!(
                        provider = %name,
                        failures = health.failure_count,
                        "Provider healed after quiet period"
                    );
                    health.failure_count = 0;
                    health.is_circuit_open = false;
                }
            }
        }

        if let Some(last_used) = health.last_used_at {
            let elapsed = now.saturating_duration_since(last_used);
            if elapsed < min_interval {
                return Availability::RateLimited {
                    wait: min_interval - elapsed,
                };
            }
        }

        Availability::Available
    }

    /// Forget all health state ("force fresh").
    pub fn reset(&self) {
        for entry in self.entries.values() {
            *entry.state.lock() = ProviderHealth::default();
        }
        tracing::info!(providers = self.entries.len(), "Health cache reset");
    }

    /// Copy of one provider's record.
    pub fn health(&self, name: &str) -> Option<ProviderHealth> {
        self.entries.get(name).map(|entry| entry.state.lock().clone())
    }

    /// Diagnostic view of every provider in registry order.
    pub fn snapshot(&self, now: Instant) -> Vec<HealthSnapshot> {
        self.names
            .iter()
            .filter_map(|name| {
                let health = self.health(name)?;
                let since_last_failure = health
                    .last_failure_at
                    .map(|at| now.saturating_duration_since(at));

                let state = match (health.is_circuit_open, since_last_failure) {
                    (false, _) => CircuitState::Closed,
                    (true, Some(elapsed)) if elapsed < self.policy.cooldown => {
                        CircuitState::Open {
                            remaining: self.policy.cooldown - elapsed,
                        }
                    }
                    (true, _) => CircuitState::HalfOpen,
                };

                Some(HealthSnapshot {
                    name: name.clone(),
                    state,
                    failure_count: health.failure_count,
                    request_count: health.request_count,
                    since_last_use: health
                        .last_used_at
                        .map(|at| now.saturating_duration_since(at)),
                    since_last_failure,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for HealthCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCache")
            .field("providers", &self.names)
            .field("policy", &self.policy)
            .finish()
    }
}
