//! The per-edge view a route is made of.

use crate::geo::Point;
use crate::graph::{ElevationFunction, Graph};

/// One traversed edge of a route: endpoint ids and positions, length, and
/// the elevation function over the edge-local position. Carries no reference
/// into the graph beyond the ids.
#[derive(Debug, Clone)]
pub struct RouteEdge {
    from_node: u32,
    to_node: u32,
    from_point: Point,
    to_point: Point,
    length: f64,
    profile: ElevationFunction,
}

impl RouteEdge {
    pub fn new(
        from_node: u32,
        to_node: u32,
        from_point: Point,
        to_point: Point,
        length: f64,
        profile: ElevationFunction,
    ) -> Self {
        Self {
            from_node,
            to_node,
            from_point,
            to_point,
            length,
            profile,
        }
    }

    /// The view of graph edge `edge_id` as traversed from `from_node`.
    pub fn of(graph: &Graph, edge_id: u32, from_node: u32, to_node: u32) -> Self {
        Self::new(
            from_node,
            to_node,
            graph.node_point(from_node),
            graph.node_point(to_node),
            graph.edge_length(edge_id),
            graph.edge_profile(edge_id),
        )
    }

    #[inline]
    pub fn from_node(&self) -> u32 {
        self.from_node
    }

    #[inline]
    pub fn to_node(&self) -> u32 {
        self.to_node
    }

    #[inline]
    pub fn from_point(&self) -> Point {
        self.from_point
    }

    #[inline]
    pub fn to_point(&self) -> Point {
        self.to_point
    }

    /// Way length in meters (at least the chord length for real data).
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Position along the edge closest to `point`: the scalar projection of
    /// `point` onto the chord, unclamped (may fall outside `[0, length]`).
    pub fn position_closest_to(&self, point: Point) -> f64 {
        self.from_point.projection_length(self.to_point, point)
    }

    /// Point at `position` meters from the edge start, by linear
    /// interpolation between the endpoints.
    pub fn point_at(&self, position: f64) -> Point {
        if self.length == 0.0 {
            return self.from_point;
        }
        self.from_point
            .interpolated_towards(self.to_point, position / self.length)
    }

    /// Elevation at `position` meters from the edge start; NaN when the edge
    /// carries no elevation data.
    pub fn elevation_at(&self, position: f64) -> f64 {
        self.profile.elevation_at(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_edge() -> RouteEdge {
        RouteEdge::new(
            0,
            1,
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            10.0,
            ElevationFunction::Sampled {
                samples: vec![100.0, 104.0],
                length: 10.0,
            },
        )
    }

    #[test]
    fn test_point_at_interpolates() {
        let e = flat_edge();
        assert_eq!(e.point_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(e.point_at(5.0), Point::new(5.0, 0.0));
        assert_eq!(e.point_at(10.0), Point::new(10.0, 0.0));
    }

    #[test]
    fn test_position_closest_to_is_unclamped() {
        let e = flat_edge();
        assert_eq!(e.position_closest_to(Point::new(5.0, 3.0)), 5.0);
        assert_eq!(e.position_closest_to(Point::new(-5.0, 0.0)), -5.0);
        assert_eq!(e.position_closest_to(Point::new(17.0, -2.0)), 17.0);
    }

    #[test]
    fn test_elevation_at() {
        let e = flat_edge();
        assert_eq!(e.elevation_at(0.0), 100.0);
        assert_eq!(e.elevation_at(5.0), 102.0);
        assert_eq!(e.elevation_at(10.0), 104.0);
    }

    #[test]
    fn test_zero_length_edge() {
        let p = Point::new(3.0, 4.0);
        let e = RouteEdge::new(0, 1, p, p, 0.0, ElevationFunction::unknown());
        assert_eq!(e.point_at(0.0), p);
        assert_eq!(e.point_at(5.0), p);
        assert_eq!(e.position_closest_to(Point::new(9.0, 9.0)), 0.0);
    }
}
