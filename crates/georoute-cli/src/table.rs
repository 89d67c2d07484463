//! Plain-text tables for terminal output.

use std::fmt::Write;

use georoute_core::RouteResult;
use georoute_runtime::{BatchResponse, HealthSnapshot};

use crate::ProviderRow;

fn distance(route: &RouteResult) -> String {
    if route.is_unresolved() {
        "-".to_string()
    } else {
        format!("{:.2}", route.distance_km)
    }
}

fn duration(route: &RouteResult) -> String {
    if route.is_unresolved() {
        "-".to_string()
    } else {
        format!("{:.1}", route.duration_minutes)
    }
}

pub fn batch(response: &BatchResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<12} {:<28} {:>10} {:>9}  {:<18} {:>4}",
        "#", "ID", "NAME", "KM", "MIN", "SOURCE", "ACC"
    );
    for (rank, record) in response.results.iter().enumerate() {
        let route = &record.route;
        let _ = writeln!(
            out,
            "{:>3}  {:<12} {:<28} {:>10} {:>9}  {:<18} {:>4}",
            rank + 1,
            record.destination.id.to_string(),
            record.destination.name.as_deref().unwrap_or(""),
            distance(route),
            duration(route),
            route.provider_name,
            route.accuracy
        );
    }

    let summary = &response.summary;
    let sources: Vec<String> = summary
        .by_provider
        .iter()
        .map(|(name, count)| format!("{}={}", name, count))
        .collect();
    let _ = writeln!(
        out,
        "\n{} destinations in {} ms; unresolved {}; sources: {}",
        summary.total,
        summary.elapsed_ms,
        summary.unresolved,
        if sources.is_empty() {
            "none".to_string()
        } else {
            sources.join(", ")
        }
    );
    out
}

pub fn route(result: &RouteResult) -> String {
    format!(
        "{} km, {} min via {} (accuracy {})\n",
        distance(result),
        duration(result),
        result.provider_name,
        result.accuracy
    )
}

pub fn providers(rows: &[ProviderRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<18} {:>4} {:>8} {:>8}  {:<28} {}",
        "PROVIDER", "ACC", "RATE/MIN", "TIMEOUT", "KEY", "STATUS"
    );
    for row in rows {
        let status = match (row.enabled, row.configured) {
            (false, _) => "disabled",
            (true, true) => "ready",
            (true, false) => "missing key",
        };
        let _ = writeln!(
            out,
            "{:<18} {:>4} {:>8} {:>7}s  {:<28} {}",
            row.name,
            row.accuracy,
            row.rate_limit_per_minute,
            row.timeout_ms as f64 / 1000.0,
            row.key_env.unwrap_or("(none)"),
            status
        );
    }
    out
}

pub fn health(snapshot: &[HealthSnapshot]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<18} {:<22} {:>8} {:>8}",
        "PROVIDER", "CIRCUIT", "FAILURES", "CALLS"
    );
    for entry in snapshot {
        let _ = writeln!(
            out,
            "{:<18} {:<22} {:>8} {:>8}",
            entry.name,
            entry.state.to_string(),
            entry.failure_count,
            entry.request_count
        );
    }
    out
}
