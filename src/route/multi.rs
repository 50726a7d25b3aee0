//! A route composed of sub-routes.

use crate::geo::Point;
use crate::route::point::RoutePoint;
use crate::route::Route;

/// An ordered, non-empty sequence of sub-routes (themselves single or
/// composite; the nesting is fixed and finite by construction). Global
/// positions decompose into (segment, local position) by cumulative length.
#[derive(Debug, Clone)]
pub struct MultiRoute {
    segments: Vec<Route>,
    /// Cumulative positions of the segment boundaries; `segments.len() + 1`
    /// long.
    positions: Vec<f64>,
}

impl MultiRoute {
    /// Panics on an empty segment list.
    pub fn new(segments: Vec<Route>) -> Self {
        assert!(!segments.is_empty(), "a composite route needs at least one segment");
        let mut positions = Vec::with_capacity(segments.len() + 1);
        positions.push(0.0);
        let mut total = 0.0;
        for s in &segments {
            total += s.length();
            positions.push(total);
        }
        Self { segments, positions }
    }

    /// Total length in meters.
    #[inline]
    pub fn length(&self) -> f64 {
        *self.positions.last().unwrap()
    }

    /// The direct sub-routes.
    #[inline]
    pub fn segments(&self) -> &[Route] {
        &self.segments
    }

    /// Number of leaf segments, counting through nested composites.
    pub(crate) fn segment_count(&self) -> usize {
        self.segments.iter().map(Route::segment_count).sum()
    }

    /// Owning sub-route index and sub-route-local position for a (clamped)
    /// global position.
    fn locate(&self, position: f64) -> (usize, f64) {
        let pos = position.clamp(0.0, self.length());
        let i = (self.positions.partition_point(|&p| p <= pos) - 1).min(self.segments.len() - 1);
        (i, pos - self.positions[i])
    }

    /// Global index of the leaf segment containing the position: the leaf
    /// count of the preceding sub-routes plus the owning sub-route's own
    /// answer.
    pub fn index_of_segment_at(&self, position: f64) -> usize {
        let (i, local) = self.locate(position);
        let preceding: usize = self.segments[..i].iter().map(Route::segment_count).sum();
        preceding + self.segments[i].index_of_segment_at(local)
    }

    pub fn point_at(&self, position: f64) -> Point {
        let (i, local) = self.locate(position);
        self.segments[i].point_at(local)
    }

    pub fn elevation_at(&self, position: f64) -> f64 {
        let (i, local) = self.locate(position);
        self.segments[i].elevation_at(local)
    }

    pub fn node_closest_to(&self, position: f64) -> u32 {
        let (i, local) = self.locate(position);
        self.segments[i].node_closest_to(local)
    }

    /// Closest projection over all sub-routes, with sub-route-local
    /// positions shifted back to global ones. Earlier segments win ties.
    pub fn point_closest_to(&self, point: Point) -> RoutePoint {
        let mut best = RoutePoint::NONE;
        for (i, segment) in self.segments.iter().enumerate() {
            best = best.min(
                segment
                    .point_closest_to(point)
                    .with_position_shifted_by(self.positions[i]),
            );
        }
        best
    }
}
