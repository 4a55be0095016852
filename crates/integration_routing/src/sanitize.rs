//! Lenient readers for untrusted provider payloads
//!
//! Providers occasionally send numbers as strings, `null` where a value is
//! expected, or negative durations. Everything numeric is read through these
//! helpers and then sanitized into [`RouteMetrics`](domain::RouteMetrics).

use domain::Coordinate;
use serde_json::Value;

/// Read a number that may be encoded as a JSON number or a numeric string
pub fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// A non-negative finite quantity, or `None`
pub fn quantity(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Sum of quantities, `None` if the slice is empty or any part is invalid
pub fn sum_quantities(parts: &[Option<f64>]) -> Option<f64> {
    if parts.is_empty() {
        return None;
    }
    parts
        .iter()
        .try_fold(0.0, |acc, part| quantity(*part).map(|v| acc + v))
}

/// Waypoint from untrusted components, dropped when not a valid coordinate
pub fn waypoint(latitude: Option<&Value>, longitude: Option<&Value>) -> Option<Coordinate> {
    Coordinate::new(lenient_f64(latitude)?, lenient_f64(longitude)?).ok()
}

/// Number of transfers given the number of vehicle segments
pub fn transfers_from_segments(vehicle_segments: usize) -> u32 {
    u32::try_from(vehicle_segments.saturating_sub(1)).unwrap_or(u32::MAX)
}
