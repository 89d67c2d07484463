//! Resilience patterns for georoute-runtime.
//!
//! This module provides:
//! - Per-provider circuit breaker with cooldown and healing
//! - Rate gating from each provider's requests-per-minute budget

mod health;

pub use health::{
    Availability, CircuitState, HealthCache, HealthPolicy, HealthSnapshot, ProviderHealth,
};
