//! Route queries, results and the destination records they decorate.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::coordinates::Coordinates;

/// Provider name reported when the local estimator answered.
pub const LOCAL_ESTIMATOR_NAME: &str = "Local Estimator";

/// Fixed accuracy reported for local estimates.
pub const LOCAL_ESTIMATOR_ACCURACY: u8 = 70;

/// Provider name reported for destinations that could not be located.
pub const UNRESOLVED_PROVIDER_NAME: &str = "Unresolved";

/// Worst-case distance given to destinations without usable coordinates.
pub const SENTINEL_DISTANCE_KM: f64 = 999_999.0;

/// Worst-case duration paired with [`SENTINEL_DISTANCE_KM`].
pub const SENTINEL_DURATION_MINUTES: f64 = 999_999.0;

/// Keys a [`MarketDistanceRecord`] writes for its route. Destination extras
/// with these names are dropped so every key appears once.
pub const ROUTE_FIELD_NAMES: [&str; 5] = [
    "distance",
    "duration",
    "accuracy",
    "providerName",
    "isDrivingDistance",
];

/// One origin/destination pair to resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin: Coordinates,
    pub destination: Coordinates,

    /// Free-form label used in logs (e.g. the market name)
    pub label: Option<String>,
}

impl RouteQuery {
    /// Create an unlabelled query.
    pub fn new(origin: Coordinates, destination: Coordinates) -> Self {
        Self {
            origin,
            destination,
            label: None,
        }
    }

    /// Attach a label for diagnostics.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label if set, otherwise the destination coordinates.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.destination.to_string())
    }
}

/// Normalized distance/duration pair, as produced by a provider parser or
/// the local estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

impl RouteLeg {
    /// Build a leg from raw meters and seconds, the unit pair most routing
    /// APIs answer with.
    pub fn from_meters_seconds(meters: f64, seconds: f64) -> Self {
        Self {
            distance_km: meters / 1000.0,
            duration_minutes: seconds / 60.0,
        }
    }

    /// Both components finite and non-negative.
    pub fn is_plausible(&self) -> bool {
        self.distance_km.is_finite()
            && self.duration_minutes.is_finite()
            && self.distance_km >= 0.0
            && self.duration_minutes >= 0.0
    }
}

/// A resolved route. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    /// Driving distance in kilometres
    #[serde(rename = "distance")]
    pub distance_km: f64,

    /// Driving duration in minutes
    #[serde(rename = "duration")]
    pub duration_minutes: f64,

    /// Accuracy of the source that actually produced this result
    pub accuracy: u8,

    /// Name of that source
    pub provider_name: String,

    pub is_driving_distance: bool,
}

impl RouteResult {
    /// Result attributed to a routing provider.
    pub fn from_provider(provider_name: impl Into<String>, accuracy: u8, leg: RouteLeg) -> Self {
        Self {
            distance_km: leg.distance_km,
            duration_minutes: leg.duration_minutes,
            accuracy,
            provider_name: provider_name.into(),
            is_driving_distance: true,
        }
    }

    /// Result attributed to the local estimator.
    pub fn local_estimate(leg: RouteLeg) -> Self {
        Self::from_provider(LOCAL_ESTIMATOR_NAME, LOCAL_ESTIMATOR_ACCURACY, leg)
    }

    /// Worst-case placeholder for destinations that cannot be located.
    pub fn unresolved() -> Self {
        Self {
            distance_km: SENTINEL_DISTANCE_KM,
            duration_minutes: SENTINEL_DURATION_MINUTES,
            accuracy: 0,
            provider_name: UNRESOLVED_PROVIDER_NAME.to_string(),
            is_driving_distance: false,
        }
    }

    /// Whether this is the sentinel placeholder.
    pub fn is_unresolved(&self) -> bool {
        self.provider_name == UNRESOLVED_PROVIDER_NAME
    }

    /// Whether the local estimator produced this result.
    pub fn is_local_estimate(&self) -> bool {
        self.provider_name == LOCAL_ESTIMATOR_NAME
    }
}

/// Destination identifier as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DestinationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationId::Number(n) => write!(f, "{}", n),
            DestinationId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for DestinationId {
    fn from(value: &str) -> Self {
        DestinationId::Text(value.to_string())
    }
}

impl From<i64> for DestinationId {
    fn from(value: i64) -> Self {
        DestinationId::Number(value)
    }
}

/// A destination to rank, typically a market.
///
/// Coordinates are optional: destinations without them are still returned,
/// ranked last with the sentinel distance. Unknown fields are preserved and
/// echoed back in the output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub lat: Option<f64>,

    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub lng: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Anything other than a JSON number reads as a missing component.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

impl Destination {
    /// Destination with coordinates.
    pub fn new(id: impl Into<DestinationId>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            lat: Some(lat),
            lng: Some(lng),
            extra: Map::new(),
        }
    }

    /// Destination without coordinates.
    pub fn unlocated(id: impl Into<DestinationId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            lat: None,
            lng: None,
            extra: Map::new(),
        }
    }

    /// Set a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Usable coordinates, if both components are present and valid.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coords = Coordinates {
            lat: self.lat?,
            lng: self.lng?,
        };
        coords.is_valid().then_some(coords)
    }

    /// Build the route query from `origin` to this destination.
    pub fn query_from(&self, origin: Coordinates) -> Option<RouteQuery> {
        let destination = self.coordinates()?;
        let label = self
            .name
            .clone()
            .unwrap_or_else(|| self.id.to_string());
        Some(RouteQuery::new(origin, destination).with_label(label))
    }
}

/// A destination decorated with its resolved route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketDistanceRecord {
    #[serde(flatten)]
    pub destination: Destination,

    #[serde(flatten)]
    pub route: RouteResult,
}

impl MarketDistanceRecord {
    pub fn new(mut destination: Destination, route: RouteResult) -> Self {
        destination
            .extra
            .retain(|key, _| !ROUTE_FIELD_NAMES.contains(&key.as_str()));
        Self { destination, route }
    }

    /// Record for a destination that could not be located.
    pub fn unresolved(destination: Destination) -> Self {
        Self::new(destination, RouteResult::unresolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_leg_from_meters_seconds() {
        let leg = RouteLeg::from_meters_seconds(12_500.0, 900.0);
        assert_eq!(leg.distance_km, 12.5);
        assert_eq!(leg.duration_minutes, 15.0);
        assert!(leg.is_plausible());
    }

    #[test]
    fn test_route_leg_rejects_negative() {
        let leg = RouteLeg {
            distance_km: -1.0,
            duration_minutes: 3.0,
        };
        assert!(!leg.is_plausible());
    }

    #[test]
    fn test_result_serializes_with_wire_names() {
        let result = RouteResult::from_provider(
            "google",
            95,
            RouteLeg {
                distance_km: 3.2,
                duration_minutes: 9.0,
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["distance"], 3.2);
        assert_eq!(json["duration"], 9.0);
        assert_eq!(json["providerName"], "google");
        assert_eq!(json["isDrivingDistance"], true);
    }

    #[test]
    fn test_unresolved_is_sentinel() {
        let result = RouteResult::unresolved();
        assert!(result.is_unresolved());
        assert!(!result.is_driving_distance);
        assert_eq!(result.distance_km, SENTINEL_DISTANCE_KM);
    }

    #[test]
    fn test_destination_preserves_extra_fields() {
        let json = serde_json::json!({
            "id": 7,
            "name": "Mercado Central",
            "lat": -23.54,
            "lng": -46.63,
            "openOnSunday": true
        });
        let dest: Destination = serde_json::from_value(json).unwrap();
        assert_eq!(dest.id, DestinationId::Number(7));
        assert_eq!(dest.extra["openOnSunday"], true);

        let record = MarketDistanceRecord::new(dest, RouteResult::unresolved());
        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["openOnSunday"], true);
        assert_eq!(out["name"], "Mercado Central");
        assert_eq!(out["providerName"], UNRESOLVED_PROVIDER_NAME);
    }

    #[test]
    fn test_record_drops_extras_that_shadow_route_fields() {
        let json = serde_json::json!({
            "id": 1,
            "lat": -23.56,
            "lng": -46.65,
            "distance": 0.1,
            "providerName": "caller",
            "isDrivingDistance": false,
            "stall": 12
        });
        let dest: Destination = serde_json::from_value(json).unwrap();
        let route = RouteResult::from_provider(
            "here",
            90,
            RouteLeg {
                distance_km: 3.3,
                duration_minutes: 9.0,
            },
        );

        let record = MarketDistanceRecord::new(dest, route);
        let text = serde_json::to_string(&record).unwrap();

        assert_eq!(text.matches("\"distance\"").count(), 1);
        assert_eq!(text.matches("\"providerName\"").count(), 1);
        assert_eq!(text.matches("\"isDrivingDistance\"").count(), 1);

        let out: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(out["distance"], 3.3);
        assert_eq!(out["providerName"], "here");
        assert_eq!(out["stall"], 12);
    }

    #[test]
    fn test_non_numeric_coordinates_read_as_missing() {
        let json = serde_json::json!({"id": "x", "lat": "-23.56", "lng": -46.65});
        let dest: Destination = serde_json::from_value(json).unwrap();
        assert_eq!(dest.lat, None);
        assert_eq!(dest.lng, Some(-46.65));
        assert!(dest.coordinates().is_none());

        let json = serde_json::json!({"id": "y", "lat": true, "lng": {"deg": 3}});
        let dest: Destination = serde_json::from_value(json).unwrap();
        assert!(dest.lat.is_none() && dest.lng.is_none());
    }

    #[test]
    fn test_destination_coordinates_require_both_valid() {
        assert!(Destination::unlocated("a").coordinates().is_none());

        let mut half = Destination::unlocated("b");
        half.lat = Some(10.0);
        assert!(half.coordinates().is_none());

        let bad = Destination::new("c", 120.0, 10.0);
        assert!(bad.coordinates().is_none());

        let good = Destination::new("d", -23.56, -46.65);
        assert!(good.coordinates().is_some());
    }

    #[test]
    fn test_query_label_prefers_name() {
        let origin = Coordinates { lat: 0.0, lng: 0.0 };
        let named = Destination::new(1, 0.1, 0.1).with_name("Feira Livre");
        assert_eq!(
            named.query_from(origin).unwrap().label.as_deref(),
            Some("Feira Livre")
        );

        let anonymous = Destination::new("m-42", 0.1, 0.1);
        assert_eq!(
            anonymous.query_from(origin).unwrap().label.as_deref(),
            Some("m-42")
        );
    }
}
