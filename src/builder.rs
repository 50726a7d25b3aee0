//! Graph assembly.
//!
//! `GraphBuilder` collects nodes and edges in any order, then packs them into
//! the binary table layouts: node ids are renumbered so that each sector grid
//! cell covers a contiguous id range, edges are grouped by source node, and
//! attribute sets and elevation runs are deduplicated/encoded. The result can
//! be materialized in memory or written as a loadable graph directory.
//!
//! Structural limits of the format (out-degree 15, edge length under 4096 m,
//! 16-bit sector populations) are enforced with panics: they are build-input
//! bugs, not runtime conditions.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::attributes::AttributeSet;
use crate::error::LoadError;
use crate::formats::attr_sets::AttributeTable;
use crate::formats::edges::{pack_edge, pack_profile, EdgeTable, ProfileKind};
use crate::formats::nodes::{pack_out_edges, NodeTable};
use crate::formats::sectors::{SectorIndex, GRID_SIDE};
use crate::geo::Point;
use crate::graph::Graph;

struct EdgeSpec {
    from: u32,
    to: u32,
    inverted: bool,
    length_q: u16,
    attributes: AttributeSet,
    /// Sample words already encoded, or a reference to another edge's run.
    profile: Profile,
}

enum Profile {
    None,
    Own { kind: ProfileKind, words: Vec<u16>, gain_q: u16 },
    /// Share the run of the edge at this index (used by the inverted
    /// direction of a two-way edge).
    SharedWith { edge: usize, gain_q: u16 },
}

/// A built graph plus the mapping from builder node ids to final node ids.
pub struct BuiltGraph {
    pub graph: Graph,
    /// `node_ids[builder_id]` is the id the node got after sector ordering.
    pub node_ids: Vec<u32>,
}

/// Assembles a routable graph from nodes and edges.
#[derive(Default)]
pub struct GraphBuilder {
    points: Vec<(i32, i32)>, // Q28.4 coordinates
    edges: Vec<EdgeSpec>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns its builder id. Coordinates are quantized to
    /// Q28.4 immediately, so positions read back from the graph may differ
    /// from the input by up to 1/32 m.
    pub fn add_node(&mut self, point: Point) -> u32 {
        let id = self.points.len() as u32;
        self.points
            .push(((point.e * 16.0).round() as i32, (point.n * 16.0).round() as i32));
        id
    }

    /// Add a directed edge without elevation data. `length` is the way
    /// length in meters (at least the straight-line distance for real data;
    /// not enforced).
    pub fn add_edge(&mut self, from: u32, to: u32, length: f64, attributes: AttributeSet) {
        self.push_edge(from, to, false, quantize_length(length), attributes, Profile::None);
    }

    /// Add a directed edge with an elevation profile, compressed as `kind`.
    ///
    /// `samples` are in traversal order and their number must match the
    /// format's sampling rule (one sample every <= 2 m, endpoints included).
    /// Delta kinds panic when a step exceeds the delta range.
    pub fn add_edge_with_profile(
        &mut self,
        from: u32,
        to: u32,
        length: f64,
        attributes: AttributeSet,
        kind: ProfileKind,
        samples: &[f32],
    ) {
        let length_q = quantize_length(length);
        let expected = 1 + (u32::from(length_q)).div_ceil(32) as usize;
        assert_eq!(
            samples.len(),
            expected,
            "edge of length {length} m needs {expected} samples, got {}",
            samples.len()
        );
        let words = encode_profile(kind, samples);
        let gain_q = quantize_gain(ascent_of(samples));
        self.push_edge(
            from,
            to,
            false,
            length_q,
            attributes,
            Profile::Own { kind, words, gain_q },
        );
    }

    /// Add both directions of a two-way way. The reverse direction is stored
    /// inverted and, when a profile is given, shares the forward run (the
    /// decoder reverses it on read).
    pub fn add_two_way_edge(
        &mut self,
        a: u32,
        b: u32,
        length: f64,
        attributes: AttributeSet,
        profile: Option<(ProfileKind, &[f32])>,
    ) {
        match profile {
            None => {
                self.add_edge(a, b, length, attributes);
                self.push_edge(b, a, true, quantize_length(length), attributes, Profile::None);
            }
            Some((kind, samples)) => {
                self.add_edge_with_profile(a, b, length, attributes, kind, samples);
                let forward = self.edges.len() - 1;
                let gain_q = quantize_gain(descent_of(samples));
                self.push_edge(
                    b,
                    a,
                    true,
                    quantize_length(length),
                    attributes,
                    Profile::SharedWith { edge: forward, gain_q },
                );
            }
        }
    }

    fn push_edge(
        &mut self,
        from: u32,
        to: u32,
        inverted: bool,
        length_q: u16,
        attributes: AttributeSet,
        profile: Profile,
    ) {
        let n = self.points.len() as u32;
        assert!(from < n && to < n, "edge endpoints must be added first");
        self.edges.push(EdgeSpec {
            from,
            to,
            inverted,
            length_q,
            attributes,
            profile,
        });
    }

    /// Pack everything and return the in-memory graph plus the node id
    /// mapping.
    pub fn build(&self) -> Result<BuiltGraph, LoadError> {
        assert!(!self.points.is_empty(), "a graph needs at least one node");

        // Bounding box over the quantized coordinates, padded when flat so
        // the grid keeps a positive cell size.
        let min_e = q_to_f(self.points.iter().map(|p| p.0).min().unwrap());
        let min_n = q_to_f(self.points.iter().map(|p| p.1).min().unwrap());
        let mut max_e = q_to_f(self.points.iter().map(|p| p.0).max().unwrap());
        let mut max_n = q_to_f(self.points.iter().map(|p| p.1).max().unwrap());
        if max_e <= min_e {
            max_e = min_e + 1.0;
        }
        if max_n <= min_n {
            max_n = min_n + 1.0;
        }
        let cell_w = (max_e - min_e) / f64::from(GRID_SIDE);
        let cell_h = (max_n - min_n) / f64::from(GRID_SIDE);

        let cell_of = |&(e_q, n_q): &(i32, i32)| -> u32 {
            let x = (((q_to_f(e_q) - min_e) / cell_w).floor() as u32).min(GRID_SIDE - 1);
            let y = (((q_to_f(n_q) - min_n) / cell_h).floor() as u32).min(GRID_SIDE - 1);
            y * GRID_SIDE + x
        };

        // Renumber nodes into sector order (cell-major, insertion order
        // within a cell).
        let mut order: Vec<u32> = (0..self.points.len() as u32).collect();
        order.sort_by_key(|&id| cell_of(&self.points[id as usize]));
        let mut node_ids = vec![0u32; self.points.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            node_ids[old_id as usize] = new_id as u32;
        }

        // Sector grid records.
        let mut sector_data = vec![0u8; (GRID_SIDE * GRID_SIDE) as usize * 6];
        {
            let mut next = 0usize;
            for cell in 0..GRID_SIDE * GRID_SIDE {
                let start = next;
                while next < order.len() && cell_of(&self.points[order[next] as usize]) == cell {
                    next += 1;
                }
                let count = next - start;
                assert!(count <= u16::MAX as usize, "sector cell {cell} overflows");
                let base = cell as usize * 6;
                sector_data[base..base + 4].copy_from_slice(&(start as u32).to_le_bytes());
                sector_data[base + 4..base + 6].copy_from_slice(&(count as u16).to_le_bytes());
            }
        }

        // Group edges by (renumbered) source node, stable within a node.
        let mut edge_order: Vec<usize> = (0..self.edges.len()).collect();
        edge_order.sort_by_key(|&i| node_ids[self.edges[i].from as usize]);

        // Deduplicate attribute sets.
        let mut attr_index: HashMap<u64, u16> = HashMap::new();
        let mut attr_sets: Vec<AttributeSet> = Vec::new();

        // Encode elevation runs; shared runs resolve to the owner's offset.
        let mut elevations: Vec<u16> = Vec::new();
        let mut run_start: HashMap<usize, u32> = HashMap::new();
        for (spec_idx, spec) in self.edges.iter().enumerate() {
            if let Profile::Own { words, .. } = &spec.profile {
                run_start.insert(spec_idx, elevations.len() as u32);
                elevations.extend_from_slice(words);
            }
        }

        let mut edge_bytes = Vec::with_capacity(self.edges.len() * 10);
        let mut profile_ids = Vec::with_capacity(self.edges.len());
        for &spec_idx in &edge_order {
            let spec = &self.edges[spec_idx];
            let attrs = *attr_index.entry(spec.attributes.bits()).or_insert_with(|| {
                let idx = attr_sets.len();
                assert!(idx <= u16::MAX as usize, "too many distinct attribute sets");
                attr_sets.push(spec.attributes);
                idx as u16
            });
            let gain_q = match &spec.profile {
                Profile::None => 0,
                Profile::Own { gain_q, .. } | Profile::SharedWith { gain_q, .. } => *gain_q,
            };
            edge_bytes.extend_from_slice(&pack_edge(
                node_ids[spec.to as usize],
                spec.inverted,
                spec.length_q,
                gain_q,
                attrs,
            ));
            profile_ids.push(match &spec.profile {
                Profile::None => pack_profile(ProfileKind::None, 0),
                Profile::Own { kind, .. } => pack_profile(*kind, run_start[&spec_idx]),
                Profile::SharedWith { edge, .. } => {
                    let Profile::Own { kind, .. } = &self.edges[*edge].profile else {
                        panic!("shared profile must reference an owning edge");
                    };
                    pack_profile(*kind, run_start[edge])
                }
            });
        }
        if attr_sets.is_empty() {
            attr_sets.push(AttributeSet::EMPTY);
        }

        // Node words, with per-node contiguous out-edge ranges.
        let mut node_words = Vec::with_capacity(self.points.len() * 3);
        let mut edge_cursor = 0u32;
        for &old_id in &order {
            let (e_q, n_q) = self.points[old_id as usize];
            let degree = edge_order
                .iter()
                .skip(edge_cursor as usize)
                .take_while(|&&i| self.edges[i].from == old_id)
                .count() as u32;
            assert!(degree < 16, "node out-degree {degree} exceeds the format limit");
            node_words.push(e_q as u32);
            node_words.push(n_q as u32);
            node_words.push(pack_out_edges(degree, edge_cursor));
            edge_cursor += degree;
        }

        let nodes = NodeTable::from_words(node_words)?;
        let edges = EdgeTable::from_parts(edge_bytes, profile_ids, elevations)?;
        let sectors = SectorIndex::from_parts(
            sector_data,
            Point::new(min_e, min_n),
            Point::new(max_e, max_n),
        )?;
        let attribute_sets = AttributeTable::from_sets(attr_sets);

        debug!(
            nodes = self.points.len(),
            edges = self.edges.len(),
            "assembled graph tables"
        );
        let graph = Graph::new(nodes, edges, sectors, attribute_sets)?;
        Ok(BuiltGraph { graph, node_ids })
    }

    /// Pack everything and write the graph directory; returns the node id
    /// mapping.
    pub fn write(&self, dir: &Path) -> Result<Vec<u32>, LoadError> {
        let built = self.build()?;
        built.graph.write(dir)?;
        Ok(built.node_ids)
    }
}

fn q_to_f(q: i32) -> f64 {
    f64::from(q) / 16.0
}

fn quantize_length(length: f64) -> u16 {
    assert!(
        (0.0..4096.0).contains(&length),
        "edge length {length} m outside the storable range"
    );
    (length * 16.0).round() as u16
}

fn quantize_gain(gain: f64) -> u16 {
    ((gain * 16.0).round().max(0.0) as u32).min(u32::from(u16::MAX)) as u16
}

fn ascent_of(samples: &[f32]) -> f64 {
    samples
        .windows(2)
        .map(|w| f64::from(w[1] - w[0]).max(0.0))
        .sum()
}

fn descent_of(samples: &[f32]) -> f64 {
    samples
        .windows(2)
        .map(|w| f64::from(w[0] - w[1]).max(0.0))
        .sum()
}

/// Encode samples as the given compression kind.
///
/// Raw: each sample rounded to unsigned Q28.4. Delta kinds: the first sample
/// raw, then signed deltas against the running decoded value, packed from the
/// most significant end of each word; panics when a delta overflows its
/// width.
fn encode_profile(kind: ProfileKind, samples: &[f32]) -> Vec<u16> {
    assert!(!samples.is_empty());
    match kind {
        ProfileKind::None => Vec::new(),
        ProfileKind::Raw => samples.iter().map(|&s| quantize_sample(s)).collect(),
        ProfileKind::Delta8 | ProfileKind::Delta4 => {
            let (per_word, bits) = if kind == ProfileKind::Delta8 { (2, 8) } else { (4, 4) };
            let word_count = 1 + (samples.len() - 1).div_ceil(per_word);
            let mut words = vec![0u16; word_count];
            words[0] = quantize_sample(samples[0]);
            let mut current = i32::from(words[0]);
            for (j, &s) in samples.iter().enumerate().skip(1) {
                let target = (f64::from(s) * 16.0).round() as i32;
                let delta = target - current;
                let limit = 1i32 << (bits - 1);
                assert!(
                    (-limit..limit).contains(&delta),
                    "elevation step of {delta} sixteenths does not fit {bits}-bit deltas"
                );
                current += delta;
                let slot = (j - 1) % per_word;
                let shift = bits * (per_word - 1 - slot);
                let mask = ((1u32 << bits) - 1) as u16;
                words[1 + (j - 1) / per_word] |= ((delta as u16) & mask) << shift;
            }
            words
        }
    }
}

fn quantize_sample(s: f32) -> u16 {
    let q = (f64::from(s) * 16.0).round();
    assert!(
        (0.0..=f64::from(u16::MAX)).contains(&q),
        "elevation sample {s} m outside the storable range"
    );
    q as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attribute;

    fn road() -> AttributeSet {
        AttributeSet::of(&[Attribute::HighwayResidential, Attribute::SurfaceAsphalt])
    }

    #[test]
    fn test_build_minimal_graph() {
        let mut b = GraphBuilder::new();
        let a = b.add_node(Point::new(0.0, 0.0));
        let c = b.add_node(Point::new(10.0, 0.0));
        b.add_edge(a, c, 10.0, road());
        let built = b.build().unwrap();
        let g = &built.graph;
        let (a, c) = (built.node_ids[a as usize], built.node_ids[c as usize]);

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_out_degree(a), 1);
        assert_eq!(g.node_out_degree(c), 0);
        let e = g.node_out_edge_id(a, 0);
        assert_eq!(g.edge_target_node_id(e), c);
        assert_eq!(g.edge_length(e), 10.0);
        assert!(g.edge_attributes(e).contains(Attribute::SurfaceAsphalt));
    }

    #[test]
    fn test_nearest_node_uses_sectors() {
        let mut b = GraphBuilder::new();
        for i in 0..50 {
            b.add_node(Point::new(f64::from(i) * 10.0, f64::from(i % 7) * 10.0));
        }
        let built = b.build().unwrap();
        let g = &built.graph;

        let hit = g.node_closest_to(Point::new(101.0, 31.0), 5.0);
        let expected = (0..50u32)
            .min_by(|&x, &y| {
                let d = |id: u32| g.node_point(id).squared_distance_to(Point::new(101.0, 31.0));
                d(x).total_cmp(&d(y))
            })
            .unwrap();
        assert_eq!(hit, Some(expected));
        assert_eq!(g.node_closest_to(Point::new(-900.0, -900.0), 50.0), None);
    }

    #[test]
    fn test_two_way_profile_shares_run() {
        let mut b = GraphBuilder::new();
        let a = b.add_node(Point::new(0.0, 0.0));
        let c = b.add_node(Point::new(5.0, 0.0));
        let samples = [100.0, 101.0, 100.5, 102.0];
        b.add_two_way_edge(a, c, 5.0, road(), Some((ProfileKind::Raw, &samples)));
        let built = b.build().unwrap();
        let g = &built.graph;
        let (a, c) = (built.node_ids[a as usize], built.node_ids[c as usize]);

        let fwd = g.node_out_edge_id(a, 0);
        let rev = g.node_out_edge_id(c, 0);
        let f = g.edge_profile(fwd);
        let r = g.edge_profile(rev);
        assert_eq!(f.elevation_at(0.0), 100.0);
        assert_eq!(r.elevation_at(0.0), 102.0);
        assert_eq!(f.elevation_at(5.0), r.elevation_at(0.0));
        // Forward climbs 2.5 m in total, reverse 0.5 m
        assert_eq!(g.edge_elevation_gain(fwd), 2.5);
        assert_eq!(g.edge_elevation_gain(rev), 0.5);
    }

    #[test]
    fn test_delta_encoding_round_trip() {
        let mut b = GraphBuilder::new();
        let a = b.add_node(Point::new(0.0, 0.0));
        let c = b.add_node(Point::new(5.0, 0.0));
        let samples = [200.0f32, 200.25, 199.9375, 200.0];
        b.add_edge_with_profile(a, c, 5.0, road(), ProfileKind::Delta4, &samples);
        b.add_edge_with_profile(a, c, 5.0, road(), ProfileKind::Delta8, &samples);
        b.add_edge_with_profile(a, c, 5.0, road(), ProfileKind::Raw, &samples);
        let built = b.build().unwrap();
        let g = &built.graph;
        let a = built.node_ids[a as usize];

        // All three encodings agree within one Q28.4 unit at every sample
        for i in 0..3 {
            let f = g.edge_profile(g.node_out_edge_id(a, i));
            for (k, &s) in samples.iter().enumerate() {
                let x = 5.0 * k as f64 / (samples.len() - 1) as f64;
                assert!(
                    (f.elevation_at(x) - f64::from(s)).abs() <= 1.0 / 16.0,
                    "sample {k} of encoding {i}"
                );
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_degree_limit_enforced() {
        let mut b = GraphBuilder::new();
        let hub = b.add_node(Point::new(0.0, 0.0));
        for i in 0..16 {
            let n = b.add_node(Point::new(f64::from(i) + 1.0, 0.0));
            b.add_edge(hub, n, 1.0, AttributeSet::EMPTY);
        }
        let _ = b.build();
    }

    #[test]
    #[should_panic]
    fn test_sample_count_mismatch_panics() {
        let mut b = GraphBuilder::new();
        let a = b.add_node(Point::new(0.0, 0.0));
        let c = b.add_node(Point::new(5.0, 0.0));
        // 5 m needs 4 samples
        b.add_edge_with_profile(a, c, 5.0, AttributeSet::EMPTY, ProfileKind::Raw, &[1.0, 2.0]);
    }
}
