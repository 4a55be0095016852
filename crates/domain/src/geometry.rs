//! Spherical geometry used to place meeting-point candidates
//!
//! All functions are pure and operate on a sphere of radius
//! [`EARTH_RADIUS_METERS`]. Angles are taken in degrees at the boundary and
//! converted to radians internally.

use crate::entities::Candidate;
use crate::value_objects::{Coordinate, EARTH_RADIUS_METERS};

/// Great-circle midpoint of two coordinates
///
/// Identical inputs return the input unchanged. Near-antipodal pairs have no
/// well-defined midpoint; the result is whatever the formula yields, clamped
/// into the valid coordinate range.
#[must_use]
pub fn spherical_midpoint(a: Coordinate, b: Coordinate) -> Coordinate {
    if a == b {
        return a;
    }

    let lat1 = a.latitude().to_radians();
    let lon1 = a.longitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let delta_lon = (b.longitude() - a.longitude()).to_radians();

    let bx = lat2.cos() * delta_lon.cos();
    let by = lat2.cos() * delta_lon.sin();

    let lat_m = (lat1.sin() + lat2.sin()).atan2((lat1.cos() + bx).hypot(by));
    let lon_m = lon1 + by.atan2(lat1.cos() + bx);

    to_coordinate(lat_m.to_degrees(), lon_m.to_degrees())
}

/// Point reached by travelling `distance_m` from `origin` on initial `bearing_deg`
///
/// Bearing is measured clockwise from true north.
#[must_use]
pub fn destination_point(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let lat1 = origin.latitude().to_radians();
    let lon1 = origin.longitude().to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_METERS;

    let sin_lat2 = lat1
        .sin()
        .mul_add(delta.cos(), lat1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(lat1.sin().mul_add(-sin_lat2, delta.cos()));

    to_coordinate(lat2.to_degrees(), lon2.to_degrees())
}

/// Evenly spaced candidates on a circle around `center`
///
/// The first candidate lies due north; the rest follow clockwise. Returns an
/// empty list when `count` is zero or the radius is not a finite,
/// non-negative number.
#[must_use]
pub fn generate_ring_candidates(center: Coordinate, radius_m: f64, count: usize) -> Vec<Candidate> {
    if count == 0 || !radius_m.is_finite() || radius_m < 0.0 {
        return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let step = 360.0 / count as f64;

    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let bearing = step * i as f64;
            Candidate::generated(
                destination_point(center, bearing, radius_m),
                format!("Ring {}/{count} ({bearing:.0}°)", i + 1),
            )
        })
        .collect()
}

/// Wrap a longitude in degrees into [-180, 180)
#[must_use]
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

fn to_coordinate(latitude: f64, longitude: f64) -> Coordinate {
    // Inputs are valid coordinates, so both components are finite here.
    Coordinate::new_unchecked(latitude.clamp(-90.0, 90.0), normalize_longitude(longitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ImportanceTier;

    const TOLERANCE_M: f64 = 0.5;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn midpoint_of_same_point_is_identity() {
        let a = coord(40.758, -73.9855);
        assert_eq!(spherical_midpoint(a, a), a);
    }

    #[test]
    fn midpoint_is_equidistant() {
        let a = coord(40.758, -73.9855);
        let b = coord(40.7359, -73.9906);
        let m = spherical_midpoint(a, b);
        let da = a.distance_meters(&m);
        let db = b.distance_meters(&m);
        assert!((da - db).abs() < TOLERANCE_M, "{da} vs {db}");
        assert!((da + db - a.distance_meters(&b)).abs() < TOLERANCE_M);
    }

    #[test]
    fn midpoint_on_equator() {
        let m = spherical_midpoint(coord(0.0, 0.0), coord(0.0, 90.0));
        assert!(m.latitude().abs() < 1e-9);
        assert!((m.longitude() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn midpoint_across_antimeridian() {
        let m = spherical_midpoint(coord(0.0, 179.0), coord(0.0, -179.0));
        assert!(m.longitude().abs() > 179.9, "{}", m.longitude());
        assert!(m.latitude().abs() < 1e-9);
    }

    #[test]
    fn midpoint_is_symmetric() {
        let a = coord(52.52, 13.405);
        let b = coord(51.5074, -0.1278);
        let m1 = spherical_midpoint(a, b);
        let m2 = spherical_midpoint(b, a);
        assert!(m1.distance_meters(&m2) < TOLERANCE_M);
    }

    #[test]
    fn destination_point_travels_requested_distance() {
        let origin = coord(52.52, 13.405);
        for bearing in [0.0, 45.0, 90.0, 200.0, 315.0] {
            let p = destination_point(origin, bearing, 1500.0);
            assert!((origin.distance_meters(&p) - 1500.0).abs() < TOLERANCE_M);
        }
    }

    #[test]
    fn destination_point_north_increases_latitude() {
        let origin = coord(10.0, 20.0);
        let p = destination_point(origin, 0.0, 10_000.0);
        assert!(p.latitude() > origin.latitude());
        assert!((p.longitude() - origin.longitude()).abs() < 1e-9);
    }

    #[test]
    fn ring_candidates_are_evenly_placed() {
        let center = coord(40.7469, -73.9881);
        let ring = generate_ring_candidates(center, 600.0, 6);
        assert_eq!(ring.len(), 6);
        for c in &ring {
            assert_eq!(c.tier, ImportanceTier::Generated);
            assert!((center.distance_meters(&c.coordinate) - 600.0).abs() < TOLERANCE_M);
        }
        assert!(ring[0].coordinate.latitude() > center.latitude());
        assert_eq!(ring[0].label, "Ring 1/6 (0°)");
        assert_eq!(ring[3].label, "Ring 4/6 (180°)");
    }

    #[test]
    fn ring_candidates_degenerate_inputs() {
        let center = coord(0.0, 0.0);
        assert!(generate_ring_candidates(center, 500.0, 0).is_empty());
        assert!(generate_ring_candidates(center, f64::NAN, 4).is_empty());
        assert!(generate_ring_candidates(center, -1.0, 4).is_empty());
        let zero = generate_ring_candidates(center, 0.0, 2);
        assert!(zero.iter().all(|c| c.coordinate.distance_meters(&center) < 1e-6));
    }

    #[test]
    fn normalize_longitude_wraps() {
        assert!((normalize_longitude(190.0) + 170.0).abs() < 1e-9);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_longitude(45.0) - 45.0).abs() < 1e-9);
    }
}
