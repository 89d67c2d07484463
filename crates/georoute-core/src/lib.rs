//! # georoute-core
//!
//! Deterministic building blocks for the georoute distance resolver.
//!
//! This crate never touches the network. It answers:
//! - What is a route query and what does a resolved route look like?
//! - How far apart are two coordinates when no routing service answers?
//! - In which order should a set of destinations be presented?
//!
//! ## Key Guarantees
//!
//! 1. **Total**: the [`LocalEstimator`] produces a result for every valid pair
//! 2. **Deterministic**: same coordinates always yield the same estimate
//! 3. **Stable ranking**: equal distances keep their input order
//! 4. **Validated input**: batch requests are checked against a JSON Schema
//!
//! ## Example
//!
//! ```rust
//! use georoute_core::{Coordinates, LocalEstimator, RouteQuery};
//!
//! let origin: Coordinates = "-23.5505,-46.6333".parse()?;
//! let market: Coordinates = "-23.5618,-46.6565".parse()?;
//!
//! let result = LocalEstimator::resolve(&RouteQuery::new(origin, market));
//! assert_eq!(result.provider_name, "Local Estimator");
//! assert!(result.distance_km > 0.0);
//! # Ok::<(), georoute_core::CoordinateError>(())
//! ```

pub mod coordinates;
pub mod estimator;
pub mod ranking;
pub mod request;
pub mod types;

// Re-export main types at crate root
pub use coordinates::{CoordinateError, Coordinates};
pub use estimator::{
    average_speed_kmh, estimate_leg, haversine_km, road_factor, LocalEstimator, EARTH_RADIUS_KM,
};
pub use ranking::rank_by_distance;
pub use request::{validate_request_schema, BatchRequest, RequestError};
pub use types::{
    Destination, DestinationId, MarketDistanceRecord, RouteLeg, RouteQuery, RouteResult,
    LOCAL_ESTIMATOR_ACCURACY, LOCAL_ESTIMATOR_NAME, SENTINEL_DISTANCE_KM,
    ROUTE_FIELD_NAMES, SENTINEL_DURATION_MINUTES, UNRESOLVED_PROVIDER_NAME,
};
