//! Edge cost functions.
//!
//! The route computer multiplies each edge's physical length by a caller
//! supplied factor, biasing the search away from undesirable ways without
//! touching the graph itself.

use crate::attributes::Attribute;
use crate::graph::Graph;

/// A pure per-edge cost multiplier.
///
/// The factor must be at least 1 (an edge can be made less attractive, never
/// shorter than it is); `f64::INFINITY` marks an edge as impassable.
pub trait CostFunction {
    fn cost_factor(&self, node_id: u32, edge_id: u32) -> f64;
}

/// Factor 1 everywhere: plain shortest-distance routing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformCost;

impl CostFunction for UniformCost {
    fn cost_factor(&self, _node_id: u32, _edge_id: u32) -> f64 {
        1.0
    }
}

/// Bike-friendliness policy over the edge attribute sets.
///
/// Dedicated cycle infrastructure costs its plain length; ordinary streets a
/// little more; big roads considerably more; ways a city bike cannot or must
/// not use are impassable. Tag semantics follow the usual bicycle routing
/// conventions (explicit `bicycle=*` beats the highway-class default).
pub struct CityBikeCost<'a> {
    graph: &'a Graph,
}

impl<'a> CityBikeCost<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }
}

impl CostFunction for CityBikeCost<'_> {
    fn cost_factor(&self, _node_id: u32, edge_id: u32) -> f64 {
        let attrs = self.graph.edge_attributes(edge_id);

        // Hard exclusions first
        if attrs.contains(Attribute::HighwayMotorway)
            || attrs.contains(Attribute::HighwayTrunk)
            || attrs.contains(Attribute::MotorroadYes)
            || attrs.contains(Attribute::BicycleNo)
            || attrs.contains(Attribute::BicycleUseSidepath)
            || attrs.contains(Attribute::AccessNo)
            || attrs.contains(Attribute::AccessPrivate)
            || attrs.contains(Attribute::VehicleNo)
            || attrs.contains(Attribute::RouteFerry)
        {
            return f64::INFINITY;
        }

        // Explicit bicycle designation wins over the class default
        if attrs.contains(Attribute::BicycleDesignated)
            || attrs.contains(Attribute::HighwayCycleway)
        {
            return 1.0;
        }
        if attrs.contains(Attribute::BicycleDismount) {
            return 5.0;
        }

        let class = if attrs.contains(Attribute::HighwayPrimary) {
            1.6
        } else if attrs.contains(Attribute::HighwaySecondary) {
            1.4
        } else if attrs.contains(Attribute::HighwayTertiary) {
            1.2
        } else if attrs.contains(Attribute::HighwayResidential)
            || attrs.contains(Attribute::HighwayUnclassified)
            || attrs.contains(Attribute::HighwayLivingStreet)
            || attrs.contains(Attribute::HighwayService)
            || attrs.contains(Attribute::HighwayRoad)
        {
            1.1
        } else if attrs.contains(Attribute::HighwayPath)
            || attrs.contains(Attribute::HighwayFootway)
        {
            1.5
        } else if attrs.contains(Attribute::HighwayTrack) {
            if attrs.contains(Attribute::TracktypeGrade1) {
                1.3
            } else {
                2.0
            }
        } else {
            2.0
        };

        // A marked on-road cycle lane or cycle-network membership softens
        // the class penalty
        let cycle_bonus = attrs.contains(Attribute::CyclewayLane)
            || attrs.contains(Attribute::CyclewayTrack)
            || attrs.contains(Attribute::IcnYes)
            || attrs.contains(Attribute::NcnYes)
            || attrs.contains(Attribute::RcnYes)
            || attrs.contains(Attribute::LcnYes);
        let class = if cycle_bonus {
            1.0 + (class - 1.0) * 0.5
        } else {
            class
        };

        // Rough surfaces penalize on top of the class
        let surface = if attrs.contains(Attribute::SurfaceSand)
            || attrs.contains(Attribute::SurfaceGrass)
        {
            2.0
        } else if attrs.contains(Attribute::SurfaceCobblestone)
            || attrs.contains(Attribute::SurfaceSett)
            || attrs.contains(Attribute::SurfaceDirt)
            || attrs.contains(Attribute::SurfaceGround)
            || attrs.contains(Attribute::SurfaceUnpaved)
        {
            1.4
        } else if attrs.contains(Attribute::SurfaceGravel)
            || attrs.contains(Attribute::SurfaceFineGravel)
            || attrs.contains(Attribute::SurfaceCompacted)
        {
            1.2
        } else {
            1.0
        };

        class * surface
    }
}
