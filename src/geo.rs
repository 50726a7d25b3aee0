//! Planar geometry primitives and the projection seam.
//!
//! The graph stores positions in a projected planar coordinate system
//! (east/north meters). Conversion to and from geographic longitude/latitude
//! is the job of an external [`Projection`] implementation; the routing core
//! only ever does planar arithmetic.

use serde::{Deserialize, Serialize};

/// A point in the network's projected coordinate system, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// East coordinate (meters).
    pub e: f64,
    /// North coordinate (meters).
    pub n: f64,
}

impl Point {
    pub fn new(e: f64, n: f64) -> Self {
        Self { e, n }
    }

    /// Squared planar distance to `other`. Cheaper than [`Self::distance_to`]
    /// when only comparing.
    #[inline]
    pub fn squared_distance_to(&self, other: Point) -> f64 {
        let de = self.e - other.e;
        let dn = self.n - other.n;
        de * de + dn * dn
    }

    /// Planar distance to `other` in meters.
    #[inline]
    pub fn distance_to(&self, other: Point) -> f64 {
        self.squared_distance_to(other).sqrt()
    }

    /// The point `self + ratio * (other - self)`.
    ///
    /// `ratio` 0 yields `self`, 1 yields `other`; values outside [0, 1]
    /// extrapolate along the same line.
    #[inline]
    pub fn interpolated_towards(&self, other: Point, ratio: f64) -> Point {
        Point {
            e: self.e + (other.e - self.e) * ratio,
            n: self.n + (other.n - self.n) * ratio,
        }
    }

    /// Scalar projection of `p` onto the segment `self -> other`, as a length
    /// in meters along the segment direction. Not clamped to the segment
    /// extent; a zero-length segment projects everything to 0.
    pub fn projection_length(&self, other: Point, p: Point) -> f64 {
        let vx = other.e - self.e;
        let vy = other.n - self.n;
        let norm = (vx * vx + vy * vy).sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        ((p.e - self.e) * vx + (p.n - self.n) * vy) / norm
    }
}

/// A geographic position, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude (degrees, east positive).
    pub lon: f64,
    /// Latitude (degrees, north positive).
    pub lat: f64,
}

/// Forward/inverse transform between the network's projected plane and
/// geographic coordinates.
///
/// Supplied by the embedding application (the graph data fixes which
/// projection is meaningful); the routing core treats it as opaque.
pub trait Projection {
    /// Projected planar position of a geographic point.
    fn project(&self, geo: GeoPoint) -> Point;

    /// Geographic position of a projected planar point.
    fn unproject(&self, point: Point) -> GeoPoint;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(a.squared_distance_to(b), 25.0);
    }

    #[test]
    fn test_interpolation() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 20.0);
        let mid = a.interpolated_towards(b, 0.5);
        assert_eq!(mid, Point::new(5.0, 10.0));
        assert_eq!(a.interpolated_towards(b, 0.0), a);
        assert_eq!(a.interpolated_towards(b, 1.0), b);
    }

    #[test]
    fn test_projection_length() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        // Perpendicular offset does not change the along-segment position
        assert_eq!(a.projection_length(b, Point::new(5.0, 3.0)), 5.0);
        // Before the segment start: negative
        assert_eq!(a.projection_length(b, Point::new(-5.0, 0.0)), -5.0);
        // Degenerate segment
        assert_eq!(a.projection_length(a, Point::new(7.0, 7.0)), 0.0);
    }
}
