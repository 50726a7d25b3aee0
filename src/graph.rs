//! The road graph facade.
//!
//! Composes the packed tables into one query API. A graph is loaded once
//! from a directory of fixed-name files, cross-validated, and never mutated
//! afterwards; every query below is a direct read over the in-memory buffers
//! and is safe to run from any number of threads concurrently.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::attributes::AttributeSet;
use crate::error::LoadError;
use crate::formats::attr_sets::AttributeTable;
use crate::formats::edges::EdgeTable;
use crate::formats::nodes::NodeTable;
use crate::formats::sectors::SectorIndex;
use crate::geo::Point;

/// An edge's elevation as a function of position along the edge, in meters
/// from its start.
///
/// Outside `[0, length]` the boundary samples extend as constants. Edges
/// without elevation data are a constant NaN.
#[derive(Debug, Clone)]
pub enum ElevationFunction {
    Constant(f64),
    Sampled { samples: Vec<f32>, length: f64 },
}

impl ElevationFunction {
    /// The all-NaN function of profile-less edges.
    pub fn unknown() -> Self {
        ElevationFunction::Constant(f64::NAN)
    }

    /// Elevation at `position` meters from the edge start.
    pub fn elevation_at(&self, position: f64) -> f64 {
        match self {
            ElevationFunction::Constant(v) => *v,
            ElevationFunction::Sampled { samples, length } => {
                if position <= 0.0 {
                    return f64::from(samples[0]);
                }
                if position >= *length {
                    return f64::from(*samples.last().unwrap());
                }
                let x = position / length * (samples.len() - 1) as f64;
                let i = (x.floor() as usize).min(samples.len() - 2);
                let frac = x - i as f64;
                f64::from(samples[i]) * (1.0 - frac) + f64::from(samples[i + 1]) * frac
            }
        }
    }
}

/// The immutable road graph.
#[derive(Debug)]
pub struct Graph {
    nodes: NodeTable,
    edges: EdgeTable,
    sectors: SectorIndex,
    attribute_sets: AttributeTable,
}

impl Graph {
    /// Assemble a graph from its tables, validating every cross-table
    /// reference so queries never have to.
    pub fn new(
        nodes: NodeTable,
        edges: EdgeTable,
        sectors: SectorIndex,
        attribute_sets: AttributeTable,
    ) -> Result<Self, LoadError> {
        let node_count = nodes.count() as u64;
        let edge_count = edges.count() as u64;

        for node_id in 0..nodes.count() as u32 {
            let first = u64::from(nodes.first_edge_id(node_id));
            let degree = u64::from(nodes.out_degree(node_id));
            if first + degree > edge_count {
                return Err(LoadError::Corrupt(format!(
                    "node {node_id} references edges [{first}, {}) but the graph has {edge_count}",
                    first + degree
                )));
            }
        }
        for edge_id in 0..edges.count() as u32 {
            let target = u64::from(edges.target_node_id(edge_id));
            if target >= node_count {
                return Err(LoadError::Corrupt(format!(
                    "edge {edge_id} targets node {target} but the graph has {node_count}"
                )));
            }
            let attrs = edges.attributes_index(edge_id);
            if attrs >= attribute_sets.len() {
                return Err(LoadError::Corrupt(format!(
                    "edge {edge_id} references attribute set {attrs} of {}",
                    attribute_sets.len()
                )));
            }
        }
        sectors.validate_node_ranges(nodes.count() as u32)?;

        Ok(Self {
            nodes,
            edges,
            sectors,
            attribute_sets,
        })
    }

    /// Load a graph from a directory containing the fixed-name table files
    /// (nodes.bin, edges.bin, profiles.bin, elevations.bin, sectors.bin,
    /// attributes.bin).
    ///
    /// Any absent, truncated, or malformed file fails the whole load; there
    /// is no partial graph.
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let started = Instant::now();
        let nodes = NodeTable::read(dir)?;
        let edges = EdgeTable::read(dir)?;
        let sectors = SectorIndex::read(dir)?;
        let attribute_sets = AttributeTable::read(dir)?;
        let graph = Self::new(nodes, edges, sectors, attribute_sets)?;
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            attribute_sets = graph.attribute_sets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded road graph from {}",
            dir.display()
        );
        Ok(graph)
    }

    /// Write the graph's table files into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(), LoadError> {
        self.nodes.write(dir).map_err(|e| LoadError::io(dir, e))?;
        self.edges.write(dir).map_err(|e| LoadError::io(dir, e))?;
        self.sectors.write(dir).map_err(|e| LoadError::io(dir, e))?;
        self.attribute_sets
            .write(dir)
            .map_err(|e| LoadError::io(dir, e))
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.count()
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.count()
    }

    /// Projected position of a node.
    #[inline]
    pub fn node_point(&self, node_id: u32) -> Point {
        self.nodes.point_of(node_id)
    }

    /// Number of outgoing edges of a node.
    #[inline]
    pub fn node_out_degree(&self, node_id: u32) -> u32 {
        self.nodes.out_degree(node_id)
    }

    /// Id of the `i`-th outgoing edge of a node; `i < node_out_degree`.
    #[inline]
    pub fn node_out_edge_id(&self, node_id: u32, i: u32) -> u32 {
        self.nodes.edge_id_at(node_id, i)
    }

    /// The node nearest to `point` within `search_radius` meters, or `None`
    /// when no node is that close. Candidates come from the sector grid;
    /// only nodes in cells intersecting the search square are examined.
    pub fn node_closest_to(&self, point: Point, search_radius: f64) -> Option<u32> {
        let mut best = None;
        let mut best_sq = search_radius * search_radius;
        for sector in self.sectors.sectors_in_area(point, search_radius) {
            for node_id in sector.node_ids() {
                let sq = point.squared_distance_to(self.node_point(node_id));
                if sq <= best_sq {
                    best = Some(node_id);
                    best_sq = sq;
                }
            }
        }
        best
    }

    /// Target node id of an edge.
    #[inline]
    pub fn edge_target_node_id(&self, edge_id: u32) -> u32 {
        self.edges.target_node_id(edge_id)
    }

    /// Length of an edge in meters.
    #[inline]
    pub fn edge_length(&self, edge_id: u32) -> f64 {
        self.edges.length(edge_id)
    }

    /// Total elevation gain of an edge in meters.
    #[inline]
    pub fn edge_elevation_gain(&self, edge_id: u32) -> f64 {
        self.edges.elevation_gain(edge_id)
    }

    /// OSM attribute set of an edge.
    #[inline]
    pub fn edge_attributes(&self, edge_id: u32) -> AttributeSet {
        self.attribute_sets.get(self.edges.attributes_index(edge_id))
    }

    /// Elevation profile of an edge as a position -> elevation function;
    /// constant NaN when the edge carries no samples.
    pub fn edge_profile(&self, edge_id: u32) -> ElevationFunction {
        if !self.edges.has_profile(edge_id) {
            return ElevationFunction::unknown();
        }
        ElevationFunction::Sampled {
            samples: self.edges.profile_samples(edge_id),
            length: self.edges.length(edge_id),
        }
    }
}
