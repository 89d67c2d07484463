//! Provider registry: the fixed, accuracy-ordered list the cascade walks.
//!
//! The registry is built once at startup and never reordered. Built-in
//! providers are described by the [`BUILTIN_PROVIDERS`] table; callers can
//! also assemble their own descriptors (tests do this with stub codecs).
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults(&config.providers)?;
//! for provider in registry.list() {
//!     println!("{} ({})", provider.name(), provider.accuracy());
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use georoute_core::{LOCAL_ESTIMATOR_ACCURACY, LOCAL_ESTIMATOR_NAME, UNRESOLVED_PROVIDER_NAME};

use super::{
    GoogleDirections, GraphHopperRouting, HereRouting, MapboxDirections, OpenRouteService,
    OsrmDemo, ProviderDescriptor, RouteCodec, TomTomRouting, GOOGLE_MAPS_API_KEY_ENV,
    GRAPHHOPPER_API_KEY_ENV, HERE_API_KEY_ENV, MAPBOX_ACCESS_TOKEN_ENV,
    OPENROUTESERVICE_API_KEY_ENV, TOMTOM_API_KEY_ENV,
};
use crate::config::ProvidersConfig;
use crate::RuntimeError;

/// Static facts about a built-in provider.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinProvider {
    pub name: &'static str,
    pub accuracy: u8,
    pub rate_limit_per_minute: u32,
    pub timeout: Duration,

    /// Environment variable holding the API key, if one is needed
    pub key_env: Option<&'static str>,

    /// Codec constructor, reading its key from `key_env`
    codec: fn() -> Arc<dyn RouteCodec>,
}

impl BuiltinProvider {
    /// Whether the provider can be called with the current environment.
    pub fn is_configured(&self) -> bool {
        self.key_env
            .map(super::ApiCredential::is_available)
            .unwrap_or(true)
    }

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor::new(self.name, self.accuracy, (self.codec)())
            .with_rate_limit(self.rate_limit_per_minute)
            .with_timeout(self.timeout)
    }
}

/// Built-in providers, most accurate first.
pub const BUILTIN_PROVIDERS: &[BuiltinProvider] = &[
    BuiltinProvider {
        name: "google",
        accuracy: 95,
        rate_limit_per_minute: 50,
        timeout: Duration::from_secs(5),
        key_env: Some(GOOGLE_MAPS_API_KEY_ENV),
        codec: google_codec,
    },
    BuiltinProvider {
        name: "here",
        accuracy: 90,
        rate_limit_per_minute: 30,
        timeout: Duration::from_secs(5),
        key_env: Some(HERE_API_KEY_ENV),
        codec: here_codec,
    },
    BuiltinProvider {
        name: "tomtom",
        accuracy: 88,
        rate_limit_per_minute: 30,
        timeout: Duration::from_secs(5),
        key_env: Some(TOMTOM_API_KEY_ENV),
        codec: tomtom_codec,
    },
    BuiltinProvider {
        name: "mapbox",
        accuracy: 85,
        rate_limit_per_minute: 60,
        timeout: Duration::from_secs(4),
        key_env: Some(MAPBOX_ACCESS_TOKEN_ENV),
        codec: mapbox_codec,
    },
    BuiltinProvider {
        name: "graphhopper",
        accuracy: 82,
        rate_limit_per_minute: 20,
        timeout: Duration::from_secs(5),
        key_env: Some(GRAPHHOPPER_API_KEY_ENV),
        codec: graphhopper_codec,
    },
    BuiltinProvider {
        name: "openrouteservice",
        accuracy: 80,
        rate_limit_per_minute: 40,
        timeout: Duration::from_secs(5),
        key_env: Some(OPENROUTESERVICE_API_KEY_ENV),
        codec: openroute_codec,
    },
    BuiltinProvider {
        name: "osrm",
        accuracy: 75,
        rate_limit_per_minute: 30,
        timeout: Duration::from_secs(4),
        key_env: None,
        codec: osrm_codec,
    },
];

fn google_codec() -> Arc<dyn RouteCodec> {
    Arc::new(GoogleDirections::from_env())
}

fn here_codec() -> Arc<dyn RouteCodec> {
    Arc::new(HereRouting::from_env())
}

fn tomtom_codec() -> Arc<dyn RouteCodec> {
    Arc::new(TomTomRouting::from_env())
}

fn mapbox_codec() -> Arc<dyn RouteCodec> {
    Arc::new(MapboxDirections::from_env())
}

fn graphhopper_codec() -> Arc<dyn RouteCodec> {
    Arc::new(GraphHopperRouting::from_env())
}

fn openroute_codec() -> Arc<dyn RouteCodec> {
    Arc::new(OpenRouteService::from_env())
}

fn osrm_codec() -> Arc<dyn RouteCodec> {
    Arc::new(OsrmDemo::new())
}

/// The always-successful pseudo-provider at the end of every cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalProvider {
    pub name: &'static str,
    pub accuracy: u8,
}

/// Immutable, accuracy-ordered set of routing providers.
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Validate and order a set of descriptors.
    ///
    /// Sorting is stable, so providers with equal accuracy keep the order
    /// they were given in.
    pub fn new(mut providers: Vec<ProviderDescriptor>) -> Result<Self, RuntimeError> {
        if providers.is_empty() {
            return Err(RuntimeError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.name()) {
                return Err(RuntimeError::DuplicateProvider(provider.name().to_string()));
            }
            Self::validate_descriptor(provider)?;
        }

        providers.sort_by(|a, b| b.accuracy().cmp(&a.accuracy()));
        Ok(Self { providers })
    }

    fn validate_descriptor(provider: &ProviderDescriptor) -> Result<(), RuntimeError> {
        let invalid = |reason: String| RuntimeError::InvalidProvider {
            name: provider.name().to_string(),
            reason,
        };

        if provider.name().trim().is_empty() {
            return Err(invalid("name must not be blank".to_string()));
        }
        // Results are told apart from estimates and sentinels by name
        if provider.name() == LOCAL_ESTIMATOR_NAME || provider.name() == UNRESOLVED_PROVIDER_NAME {
            return Err(invalid("name is reserved".to_string()));
        }
        if provider.accuracy() > 100 {
            return Err(invalid(format!("accuracy {} exceeds 100", provider.accuracy())));
        }
        if provider.accuracy() <= LOCAL_ESTIMATOR_ACCURACY {
            return Err(invalid(format!(
                "accuracy {} must rank above the local estimator ({})",
                provider.accuracy(),
                LOCAL_ESTIMATOR_ACCURACY
            )));
        }
        if provider.rate_limit_per_minute() == 0 {
            return Err(invalid("rate limit must be at least 1/min".to_string()));
        }
        if provider.timeout().is_zero() {
            return Err(invalid("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Built-in providers with keys from the environment, filtered and
    /// tuned by configuration.
    pub fn with_defaults(config: &ProvidersConfig) -> Result<Self, RuntimeError> {
        let known = |name: &str| BUILTIN_PROVIDERS.iter().any(|b| b.name == name);

        for name in config.disabled.iter().chain(config.overrides.keys()) {
            if !known(name) {
                return Err(RuntimeError::UnknownProvider(name.clone()));
            }
        }

        let providers = BUILTIN_PROVIDERS
            .iter()
            .filter(|builtin| !config.disabled.iter().any(|d| d == builtin.name))
            .map(|builtin| {
                let mut descriptor = builtin.descriptor();
                if let Some(over) = config.overrides.get(builtin.name) {
                    if let Some(rate) = over.rate_limit_per_minute {
                        descriptor = descriptor.with_rate_limit(rate);
                    }
                    if let Some(timeout) = over.timeout {
                        descriptor = descriptor.with_timeout(timeout);
                    }
                }
                if !builtin.is_configured() {
                    tracing::debug!(
                        provider = builtin.name,
                        "No API key in environment, provider will fail fast"
                    );
                }
                descriptor
            })
            .collect();

        Self::new(providers)
    }

    /// Providers in cascade order (descending accuracy).
    pub fn list(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always false; an empty registry is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The local estimator, ranked below every real provider.
    pub fn terminal(&self) -> TerminalProvider {
        TerminalProvider {
            name: LOCAL_ESTIMATOR_NAME,
            accuracy: LOCAL_ESTIMATOR_ACCURACY,
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderOverride;
    use crate::test_support::stub_descriptor;

    #[test]
    fn test_sorted_by_descending_accuracy() {
        let registry = ProviderRegistry::new(vec![
            stub_descriptor("c", 80),
            stub_descriptor("a", 95),
            stub_descriptor("b", 90),
        ])
        .unwrap();

        assert_eq!(registry.names(), vec!["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_equal_accuracy_keeps_insertion_order() {
        let registry = ProviderRegistry::new(vec![
            stub_descriptor("first", 85),
            stub_descriptor("second", 85),
        ])
        .unwrap();
        assert_eq!(registry.names(), vec!["first", "second"]);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            ProviderRegistry::new(vec![]),
            Err(RuntimeError::EmptyRegistry)
        ));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result =
            ProviderRegistry::new(vec![stub_descriptor("x", 90), stub_descriptor("x", 80)]);
        assert!(matches!(result, Err(RuntimeError::DuplicateProvider(name)) if name == "x"));
    }

    #[test]
    fn test_rejects_accuracy_at_or_below_estimator() {
        let result = ProviderRegistry::new(vec![stub_descriptor("low", 70)]);
        assert!(matches!(result, Err(RuntimeError::InvalidProvider { .. })));

        let result = ProviderRegistry::new(vec![stub_descriptor("high", 101)]);
        assert!(matches!(result, Err(RuntimeError::InvalidProvider { .. })));
    }

    #[test]
    fn test_rejects_reserved_names() {
        for reserved in [LOCAL_ESTIMATOR_NAME, UNRESOLVED_PROVIDER_NAME] {
            let result = ProviderRegistry::new(vec![
                stub_descriptor("ok", 90),
                stub_descriptor(reserved, 85),
            ]);
            assert!(
                matches!(&result, Err(RuntimeError::InvalidProvider { name, .. }) if name == reserved),
                "{reserved} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_zero_limits() {
        let result = ProviderRegistry::new(vec![stub_descriptor("x", 90).with_rate_limit(0)]);
        assert!(result.is_err());

        let result = ProviderRegistry::new(vec![
            stub_descriptor("x", 90).with_timeout(Duration::ZERO)
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_terminal_is_local_estimator() {
        let registry = ProviderRegistry::new(vec![stub_descriptor("x", 90)]).unwrap();
        let terminal = registry.terminal();
        assert_eq!(terminal.name, "Local Estimator");
        assert_eq!(terminal.accuracy, 70);
        assert!(registry.list().iter().all(|p| p.accuracy() > terminal.accuracy));
    }

    #[test]
    fn test_builtin_table_is_ordered_and_valid() {
        let accuracies: Vec<u8> = BUILTIN_PROVIDERS.iter().map(|b| b.accuracy).collect();
        let mut sorted = accuracies.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(accuracies, sorted);

        let keyless: Vec<_> = BUILTIN_PROVIDERS
            .iter()
            .filter(|b| b.key_env.is_none())
            .map(|b| b.name)
            .collect();
        assert_eq!(keyless, vec!["osrm"]);
    }

    #[test]
    fn test_with_defaults_builds_all_builtins() {
        let registry = ProviderRegistry::with_defaults(&ProvidersConfig::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "google",
                "here",
                "tomtom",
                "mapbox",
                "graphhopper",
                "openrouteservice",
                "osrm"
            ]
        );
        assert_eq!(
            registry.get("graphhopper").unwrap().min_interval(),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_with_defaults_applies_disabled_and_overrides() {
        let mut config = ProvidersConfig {
            disabled: vec!["google".to_string(), "here".to_string()],
            ..Default::default()
        };
        config.overrides.insert(
            "osrm".to_string(),
            ProviderOverride {
                timeout: Some(Duration::from_secs(2)),
                rate_limit_per_minute: Some(6),
            },
        );

        let registry = ProviderRegistry::with_defaults(&config).unwrap();
        assert!(registry.get("google").is_none());
        assert_eq!(registry.names()[0], "tomtom");

        let osrm = registry.get("osrm").unwrap();
        assert_eq!(osrm.timeout(), Duration::from_secs(2));
        assert_eq!(osrm.min_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_with_defaults_rejects_unknown_names() {
        let config = ProvidersConfig {
            disabled: vec!["bing".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ProviderRegistry::with_defaults(&config),
            Err(RuntimeError::UnknownProvider(name)) if name == "bing"
        ));
    }

    #[test]
    fn test_with_defaults_all_disabled_is_empty() {
        let config = ProvidersConfig {
            disabled: BUILTIN_PROVIDERS.iter().map(|b| b.name.to_string()).collect(),
            ..Default::default()
        };
        assert!(matches!(
            ProviderRegistry::with_defaults(&config),
            Err(RuntimeError::EmptyRegistry)
        ));
    }
}
