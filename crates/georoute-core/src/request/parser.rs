//! Batch request parsing from JSON/YAML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_request_schema;
use crate::coordinates::{CoordinateError, Coordinates};
use crate::types::{Destination, RouteQuery};

/// Errors that can occur when parsing batch requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to read request file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Request validation failed: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Invalid origin: {0}")]
    InvalidOrigin(#[from] CoordinateError),
}

/// A request to rank destinations by driving distance from an origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub origin: Coordinates,

    #[serde(default)]
    pub destinations: Vec<Destination>,

    /// Upper bound on destinations resolved at the same time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_cap: Option<usize>,

    /// Reset all provider health state before resolving
    #[serde(default)]
    pub force_fresh_cache: bool,
}

impl BatchRequest {
    /// Create a request with default options.
    pub fn new(origin: Coordinates, destinations: Vec<Destination>) -> Self {
        Self {
            origin,
            destinations,
            concurrency_cap: None,
            force_fresh_cache: false,
        }
    }

    /// Set the concurrency cap.
    pub fn with_concurrency_cap(mut self, cap: usize) -> Self {
        self.concurrency_cap = Some(cap);
        self
    }

    /// Request a health cache reset before resolving.
    pub fn force_fresh(mut self) -> Self {
        self.force_fresh_cache = true;
        self
    }

    /// Parse and validate a request from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse and validate a request from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RequestError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse and validate a request from a file, choosing the format by
    /// extension (`.yaml`/`.yml`, anything else is read as JSON).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Validate an already-decoded document and convert it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RequestError> {
        validate_request_schema(&value).map_err(RequestError::SchemaViolation)?;

        let request: BatchRequest = serde_json::from_value(value)?;
        request.origin.validate()?;

        let unlocated = request
            .destinations
            .iter()
            .filter(|d| d.coordinates().is_none())
            .count();
        if unlocated > 0 {
            tracing::debug!(
                destinations = request.destinations.len(),
                unlocated,
                "Request has destinations without usable coordinates"
            );
        }
        Ok(request)
    }

    /// Queries for every destination with usable coordinates, keyed by
    /// position in `destinations`.
    pub fn located_queries(&self) -> Vec<(usize, RouteQuery)> {
        self.destinations
            .iter()
            .enumerate()
            .filter_map(|(idx, dest)| dest.query_from(self.origin).map(|q| (idx, q)))
            .collect()
    }
}
