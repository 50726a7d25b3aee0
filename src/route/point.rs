//! Nearest-point query results.

use serde::Serialize;

use crate::geo::Point;

/// The projection of a reference point onto a route: the projected point,
/// its position along the route in meters from the start, and its planar
/// distance to the reference.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoutePoint {
    pub point: Point,
    pub position: f64,
    pub distance_to_reference: f64,
}

impl RoutePoint {
    /// The absent result: infinitely far away, point and position undefined.
    pub const NONE: RoutePoint = RoutePoint {
        point: Point {
            e: f64::NAN,
            n: f64::NAN,
        },
        position: f64::NAN,
        distance_to_reference: f64::INFINITY,
    };

    /// Whether this is the absent result.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.distance_to_reference == f64::INFINITY
    }

    /// The same point with its route position shifted by `delta` meters
    /// (segment-local to route-global translation). Shifting by 0, or
    /// shifting the absent result, is the identity.
    pub fn with_position_shifted_by(self, delta: f64) -> RoutePoint {
        if delta == 0.0 || self.is_none() {
            return self;
        }
        RoutePoint {
            position: self.position + delta,
            ..self
        }
    }

    /// The closer of the two results; `self` wins ties, so folding a
    /// sequence keeps its first minimum.
    pub fn min(self, that: RoutePoint) -> RoutePoint {
        if self.distance_to_reference <= that.distance_to_reference {
            self
        } else {
            that
        }
    }
}
