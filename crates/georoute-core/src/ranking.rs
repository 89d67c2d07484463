//! Ordering of resolved destinations.

use std::cmp::Ordering;

use crate::types::MarketDistanceRecord;

/// Sort records by ascending distance.
///
/// The sort is stable, so equal distances keep their input order.
/// Unresolved records always sort after resolved ones, whatever distance a
/// provider reported.
pub fn rank_by_distance(records: &mut [MarketDistanceRecord]) {
    records.sort_by(compare_records);
}

fn compare_records(a: &MarketDistanceRecord, b: &MarketDistanceRecord) -> Ordering {
    a.route
        .is_unresolved()
        .cmp(&b.route.is_unresolved())
        .then_with(|| a.route.distance_km.total_cmp(&b.route.distance_km))
}
