//! Batch request parsing and validation.
//!
//! Batch requests are structured data validated against JSON Schema.
//! This module parses JSON or YAML documents and checks them before any
//! routing work starts.

mod parser;
mod schema;

pub use parser::{BatchRequest, RequestError};
pub use schema::validate_request_schema;
