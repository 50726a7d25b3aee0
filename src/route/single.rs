//! A route made of a single connected chain of edges.

use crate::geo::Point;
use crate::route::edge::RouteEdge;
use crate::route::point::RoutePoint;

/// A non-empty chain of edges; the end point of each edge is the start point
/// of the next. Positions are meters from the route start.
#[derive(Debug, Clone)]
pub struct SingleRoute {
    edges: Vec<RouteEdge>,
    /// Cumulative positions of the edge boundaries; `edges.len() + 1` long,
    /// starting at 0 and ending at the route length.
    positions: Vec<f64>,
}

impl SingleRoute {
    /// Panics on an empty edge list; a route has at least one edge.
    pub fn new(edges: Vec<RouteEdge>) -> Self {
        assert!(!edges.is_empty(), "a route needs at least one edge");
        let mut positions = Vec::with_capacity(edges.len() + 1);
        positions.push(0.0);
        let mut total = 0.0;
        for e in &edges {
            total += e.length();
            positions.push(total);
        }
        Self { edges, positions }
    }

    /// Total length in meters.
    #[inline]
    pub fn length(&self) -> f64 {
        *self.positions.last().unwrap()
    }

    /// The edges of the chain, in order.
    #[inline]
    pub fn edges(&self) -> &[RouteEdge] {
        &self.edges
    }

    /// Every point of the chain: each edge's start, then the final end.
    pub fn points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self.edges.iter().map(|e| e.from_point()).collect();
        points.push(self.edges.last().unwrap().to_point());
        points
    }

    /// Owning edge index and edge-local position for a (clamped) route
    /// position. Boundary positions belong to the later edge, except the
    /// route end which stays on the last edge.
    fn locate(&self, position: f64) -> (usize, f64) {
        let pos = position.clamp(0.0, self.length());
        let i = (self.positions.partition_point(|&p| p <= pos) - 1).min(self.edges.len() - 1);
        (i, pos - self.positions[i])
    }

    /// A SingleRoute is one segment: always 0.
    pub fn index_of_segment_at(&self, _position: f64) -> usize {
        0
    }

    /// Point at a position along the route (clamped to its extent).
    pub fn point_at(&self, position: f64) -> Point {
        let (i, local) = self.locate(position);
        self.edges[i].point_at(local)
    }

    /// Elevation at a position along the route (clamped); NaN over
    /// profile-less edges.
    pub fn elevation_at(&self, position: f64) -> f64 {
        let (i, local) = self.locate(position);
        self.edges[i].elevation_at(local)
    }

    /// Of the owning edge's endpoints, the one closer in arc-length to the
    /// position.
    pub fn node_closest_to(&self, position: f64) -> u32 {
        let (i, local) = self.locate(position);
        let edge = &self.edges[i];
        if local <= edge.length() / 2.0 {
            edge.from_node()
        } else {
            edge.to_node()
        }
    }

    /// Projection of `point` onto the route: the closest of the per-edge
    /// clamped chord projections, first minimum winning ties.
    pub fn point_closest_to(&self, point: Point) -> RoutePoint {
        let mut best = RoutePoint::NONE;
        for (i, edge) in self.edges.iter().enumerate() {
            let proj = edge.position_closest_to(point).clamp(0.0, edge.length());
            let candidate = edge.point_at(proj);
            let distance = candidate.distance_to(point);
            if distance < best.distance_to_reference {
                best = RoutePoint {
                    point: candidate,
                    position: self.positions[i] + proj,
                    distance_to_reference: distance,
                };
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ElevationFunction;

    fn edge(from: u32, to: u32, a: Point, b: Point, length: f64) -> RouteEdge {
        RouteEdge::new(from, to, a, b, length, ElevationFunction::unknown())
    }

    fn l_shaped() -> SingleRoute {
        // (0,0) -> (10,0) -> (10,5)
        SingleRoute::new(vec![
            edge(0, 1, Point::new(0.0, 0.0), Point::new(10.0, 0.0), 10.0),
            edge(1, 2, Point::new(10.0, 0.0), Point::new(10.0, 5.0), 5.0),
        ])
    }

    #[test]
    fn test_length_and_points() {
        let r = l_shaped();
        assert_eq!(r.length(), 15.0);
        assert_eq!(
            r.points(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 5.0)
            ]
        );
    }

    #[test]
    fn test_point_at_clamps() {
        let r = l_shaped();
        assert_eq!(r.point_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(r.point_at(5.0), Point::new(5.0, 0.0));
        assert_eq!(r.point_at(12.0), Point::new(10.0, 2.0));
        assert_eq!(r.point_at(-3.0), Point::new(0.0, 0.0));
        assert_eq!(r.point_at(99.0), Point::new(10.0, 5.0));
        // Boundary position belongs to the later edge but maps to the shared
        // point either way
        assert_eq!(r.point_at(10.0), Point::new(10.0, 0.0));
    }

    #[test]
    fn test_node_closest_to() {
        let r = l_shaped();
        assert_eq!(r.node_closest_to(2.0), 0);
        assert_eq!(r.node_closest_to(8.0), 1);
        assert_eq!(r.node_closest_to(11.0), 1);
        assert_eq!(r.node_closest_to(14.0), 2);
        // Midpoint of an edge goes to its start node
        assert_eq!(r.node_closest_to(5.0), 0);
    }

    #[test]
    fn test_point_closest_to_straight_edge() {
        let r = SingleRoute::new(vec![edge(
            0,
            1,
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            10.0,
        )]);
        let p = r.point_closest_to(Point::new(5.0, 3.0));
        assert_eq!(p.point, Point::new(5.0, 0.0));
        assert_eq!(p.position, 5.0);
        assert_eq!(p.distance_to_reference, 3.0);

        // Beyond the start: clamped to the edge extent
        let q = r.point_closest_to(Point::new(-5.0, 0.0));
        assert_eq!(q.point, Point::new(0.0, 0.0));
        assert_eq!(q.position, 0.0);
        assert_eq!(q.distance_to_reference, 5.0);
    }

    #[test]
    fn test_point_closest_to_prefers_first_minimum() {
        // Two parallel passes at the same distance from the reference
        let r = SingleRoute::new(vec![
            edge(0, 1, Point::new(0.0, 0.0), Point::new(10.0, 0.0), 10.0),
            edge(1, 2, Point::new(10.0, 0.0), Point::new(10.0, 2.0), 2.0),
            edge(2, 3, Point::new(10.0, 2.0), Point::new(0.0, 2.0), 10.0),
        ]);
        let p = r.point_closest_to(Point::new(5.0, 1.0));
        assert_eq!(p.distance_to_reference, 1.0);
        assert_eq!(p.position, 5.0, "the first of the equal minima wins");
    }

    #[test]
    #[should_panic]
    fn test_empty_route_panics() {
        SingleRoute::new(Vec::new());
    }
}
