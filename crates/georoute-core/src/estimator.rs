//! Network-free distance and duration estimation.
//!
//! The estimator is the resolver's safety net: it turns a great-circle
//! distance into an approximate driving distance and duration using fixed
//! tier tables. It has no failure mode over valid coordinates.
//!
//! Tier bounds are inclusive upper limits: a straight-line distance of
//! exactly 2.0 km uses the first tier.

use crate::coordinates::Coordinates;
use crate::types::{RouteLeg, RouteQuery, RouteResult};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// (inclusive upper bound in km, road inefficiency multiplier)
const ROAD_FACTOR_TIERS: [(f64, f64); 4] = [(2.0, 1.2), (5.0, 1.25), (10.0, 1.3), (20.0, 1.35)];
const ROAD_FACTOR_BEYOND: f64 = 1.4;

/// (inclusive upper bound in km, average speed in km/h)
const SPEED_TIERS: [(f64, f64); 4] = [(2.0, 15.0), (5.0, 20.0), (10.0, 25.0), (20.0, 35.0)];
const SPEED_BEYOND_KMH: f64 = 45.0;

/// Parking/traffic-light buffer: half a minute per km, capped at five.
const BUFFER_MINUTES_PER_KM: f64 = 0.5;
const MAX_BUFFER_MINUTES: f64 = 5.0;

fn tier_value(tiers: &[(f64, f64)], beyond: f64, distance_km: f64) -> f64 {
    tiers
        .iter()
        .find(|(upper, _)| distance_km <= *upper)
        .map_or(beyond, |(_, value)| *value)
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat_radians().cos() * b.lat_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // Clamp guards against rounding pushing h slightly above 1 for antipodes.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Road inefficiency multiplier for a straight-line distance.
pub fn road_factor(straight_km: f64) -> f64 {
    tier_value(&ROAD_FACTOR_TIERS, ROAD_FACTOR_BEYOND, straight_km)
}

/// Average urban driving speed for a driving distance.
pub fn average_speed_kmh(driving_km: f64) -> f64 {
    tier_value(&SPEED_TIERS, SPEED_BEYOND_KMH, driving_km)
}

/// Estimate the driving leg between two points.
pub fn estimate_leg(origin: Coordinates, destination: Coordinates) -> RouteLeg {
    let straight_km = haversine_km(origin, destination);
    let driving_km = straight_km * road_factor(straight_km);

    let buffer = (driving_km * BUFFER_MINUTES_PER_KM).min(MAX_BUFFER_MINUTES);
    let duration_minutes = driving_km / average_speed_kmh(driving_km) * 60.0 + buffer;

    RouteLeg {
        distance_km: driving_km,
        duration_minutes,
    }
}

/// The terminal, always-available route source.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEstimator;

impl LocalEstimator {
    /// Resolve a query without any network access.
    pub fn resolve(query: &RouteQuery) -> RouteResult {
        RouteResult::local_estimate(estimate_leg(query.origin, query.destination))
    }
}
