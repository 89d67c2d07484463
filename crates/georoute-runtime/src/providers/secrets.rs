//! Secure credential handling for routing providers.
//!
//! Every provider API key passes through [`ApiCredential`], which ensures:
//!
//! - **No accidental logging**: keys cannot appear in Debug/Display output
//! - **Memory safety**: keys are zeroed on drop
//! - **Explicit exposure**: the raw value is only reachable via `.expose()`
//!
//! A missing key is not an error at load time. Providers hold an
//! `Option<ApiCredential>` and fail their own requests fast when it is
//! absent, which the health cache then counts like any other failure.
//!
//! ## Usage
//!
//! ```ignore
//! use georoute_runtime::providers::ApiCredential;
//!
//! let key = ApiCredential::from_env_optional("TOMTOM_API_KEY", "TomTom API key");
//! if let Some(key) = &key {
//!     url.query_pairs_mut().append_pair("key", key.expose());
//! }
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// # Example
///
/// ```ignore
/// let cred = ApiCredential::new("sk-secret-key", CredentialSource::Programmatic, "HERE API key");
///
/// // Safe to log - shows [REDACTED]
/// tracing::debug!(credential = %cred, "loaded");
/// ```
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential from an environment variable.
    ///
    /// An unset or blank variable is reported as
    /// [`ProviderError::NotConfigured`].
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        match std::env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => Ok(Self::new(v, CredentialSource::Environment, name)),
            _ => Err(ProviderError::NotConfigured(format!(
                "{} not set: configure '{}' environment variable",
                name, env_var
            ))),
        }
    }

    /// Load a credential from an environment variable, treating absence as
    /// `None`.
    pub fn from_env_optional(env_var: &str, name: &'static str) -> Option<Self> {
        Self::from_env(env_var, name).ok()
    }

    /// Whether the variable is set, without loading it.
    pub fn is_available(env_var: &str) -> bool {
        std::env::var(env_var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    /// Expose the credential value for use in a request.
    ///
    /// Only call this where the key is actually needed (building the URL or
    /// header). Never store the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Get the human-readable name of this credential.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Clone for ApiCredential {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.source, self.name)
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
