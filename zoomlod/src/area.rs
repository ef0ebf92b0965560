//! On-screen pixel area estimation.
//!
//! Converts a geometry's planar area into an approximate pixel footprint at a
//! given zoom level using a spherical-earth approximation:
//!
//! ```text
//! meters_per_pixel = R * cos(lat) / 2^(zoom + 8)
//! pixels²          = (sqrt(area) / meters_per_pixel)²
//! ```
//!
//! where `R` is [`EARTH_RADIUS_M`] and `lat` is the centroid y-coordinate.
//! The latitude is consumed as stored; callers keep their units consistent.

use geo::{Area, Centroid, Geometry};

/// Radius of the earth in meters.
pub const EARTH_RADIUS_M: f64 = 6372798.2;

/// `log2` of the tile size in pixels (256 px tiles).
const TILE_SIZE_SHIFT: i32 = 8;

/// Ground meters covered by one pixel at `lat` and `zoom`.
#[inline]
pub fn meters_per_pixel(lat: f64, zoom: u8) -> f64 {
    EARTH_RADIUS_M * lat.cos() / 2.0_f64.powi(zoom as i32 + TILE_SIZE_SHIFT)
}

/// Approximate on-screen area of `geometry` in pixels² at `zoom`.
///
/// Returns `None` for degenerate geometries (points, lines, empty
/// collections) and for any result that is not a positive finite number.
/// Callers must exclude `None` from aggregates instead of counting it as zero.
pub fn estimate_pixel_area(geometry: &Geometry<f64>, zoom: u8) -> Option<f64> {
    let centroid = geometry.centroid()?;

    let area = geometry.unsigned_area();
    if !(area.is_finite() && area > 0.0) {
        return None;
    }

    let length = area.sqrt() / meters_per_pixel(centroid.y(), zoom);
    let pixels = length * length;

    if pixels.is_finite() && pixels > 0.0 {
        Some(pixels)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Polygon};

    fn square(side: f64, y: f64) -> Geometry<f64> {
        let p: Polygon<f64> = polygon![
            (x: 0.0, y: y),
            (x: side, y: y),
            (x: side, y: y + side),
            (x: 0.0, y: y + side)
        ];
        Geometry::Polygon(p)
    }

    #[test]
    fn test_meters_per_pixel_at_equator_zoom_0() {
        let mpp = meters_per_pixel(0.0, 0);
        assert!((mpp - EARTH_RADIUS_M / 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_meters_per_pixel_halves_per_zoom() {
        let z5 = meters_per_pixel(0.3, 5);
        let z6 = meters_per_pixel(0.3, 6);
        assert!((z5 / z6 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_polygon_has_positive_area() {
        for zoom in [0, 4, 10, 18] {
            let pixels = estimate_pixel_area(&square(1000.0, 0.0), zoom).unwrap();
            assert!(pixels > 0.0, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_area_matches_formula() {
        // Square centred on y = 5 (side 10 from y = 0); latitude read as radians.
        let geometry = square(10.0, 0.0);
        let zoom = 12;
        let mpp = EARTH_RADIUS_M * 5.0_f64.cos() / 2.0_f64.powi(zoom + 8);
        let expected = (100.0_f64.sqrt() / mpp).powi(2);

        let actual = estimate_pixel_area(&geometry, zoom as u8).unwrap();
        assert!((actual - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn test_area_quadruples_per_zoom_level() {
        let geometry = square(500.0, 0.0);
        let a = estimate_pixel_area(&geometry, 7).unwrap();
        let b = estimate_pixel_area(&geometry, 8).unwrap();
        assert!((b / a - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_has_no_estimate() {
        let geometry = Geometry::Point(point!(x: 1.0, y: 0.5));
        for zoom in [0, 9, 18] {
            assert_eq!(estimate_pixel_area(&geometry, zoom), None);
        }
    }

    #[test]
    fn test_line_has_no_estimate() {
        let geometry = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        assert_eq!(estimate_pixel_area(&geometry, 10), None);
    }

    #[test]
    fn test_empty_polygon_has_no_estimate() {
        let geometry = Geometry::Polygon(Polygon::new(geo::LineString::new(vec![]), vec![]));
        assert_eq!(estimate_pixel_area(&geometry, 10), None);
    }
}
