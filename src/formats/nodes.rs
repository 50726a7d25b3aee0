//! nodes.bin - packed node table.
//!
//! Payload: `count: u32`, then `count` records of three u32 words:
//!
//!   word 0: e coordinate, Q28.4 (i32)
//!   word 1: n coordinate, Q28.4 (i32)
//!   word 2: bits 28..32 out-degree, bits 0..28 first outgoing edge id
//!
//! Outgoing edges of a node are stored contiguously in the edge table,
//! addressed as `first_edge_id + offset` for `offset < out_degree`.

use std::path::Path;

use crate::error::LoadError;
use crate::fixed::{extract_unsigned, q28_4};
use crate::formats::{read_framed, read_u32, write_framed};
use crate::geo::Point;

const MAGIC: u32 = 0x564C_4E44; // "VLND"

pub const NODES_FILE: &str = "nodes.bin";

const WORDS_PER_NODE: usize = 3;
const OFFSET_E: usize = 0;
const OFFSET_N: usize = 1;
const OFFSET_OUT_EDGES: usize = 2;

const OUT_DEGREE_START: u32 = 28;
const OUT_DEGREE_BITS: u32 = 4;
const FIRST_EDGE_BITS: u32 = 28;

/// Pack an out-degree and first-edge id into the node's third word.
///
/// Panics when either field overflows its width; the builder rejects such
/// graphs before they reach disk.
pub fn pack_out_edges(out_degree: u32, first_edge_id: u32) -> u32 {
    assert!(
        out_degree < (1 << OUT_DEGREE_BITS),
        "out-degree {out_degree} does not fit in {OUT_DEGREE_BITS} bits"
    );
    assert!(
        first_edge_id < (1 << FIRST_EDGE_BITS),
        "first edge id {first_edge_id} does not fit in {FIRST_EDGE_BITS} bits"
    );
    (out_degree << OUT_DEGREE_START) | first_edge_id
}

/// Read-only decoder over the packed node array.
#[derive(Debug)]
pub struct NodeTable {
    words: Vec<u32>,
}

impl NodeTable {
    /// Wrap a packed word array. The length must be a whole number of
    /// three-word records.
    pub fn from_words(words: Vec<u32>) -> Result<Self, LoadError> {
        if words.len() % WORDS_PER_NODE != 0 {
            return Err(LoadError::Corrupt(format!(
                "node table length {} is not a multiple of {WORDS_PER_NODE}",
                words.len()
            )));
        }
        Ok(Self { words })
    }

    /// Number of nodes.
    #[inline]
    pub fn count(&self) -> usize {
        self.words.len() / WORDS_PER_NODE
    }

    #[inline]
    fn word(&self, node_id: u32, offset: usize) -> u32 {
        self.words[node_id as usize * WORDS_PER_NODE + offset]
    }

    /// Projected position of a node.
    #[inline]
    pub fn point_of(&self, node_id: u32) -> Point {
        Point {
            e: q28_4::as_double(self.word(node_id, OFFSET_E) as i32),
            n: q28_4::as_double(self.word(node_id, OFFSET_N) as i32),
        }
    }

    /// Number of outgoing edges of a node (0..=15).
    #[inline]
    pub fn out_degree(&self, node_id: u32) -> u32 {
        extract_unsigned(
            self.word(node_id, OFFSET_OUT_EDGES),
            OUT_DEGREE_START,
            OUT_DEGREE_BITS,
        )
    }

    /// Id of the first outgoing edge of a node.
    #[inline]
    pub fn first_edge_id(&self, node_id: u32) -> u32 {
        extract_unsigned(self.word(node_id, OFFSET_OUT_EDGES), 0, FIRST_EDGE_BITS)
    }

    /// Id of the `offset`-th outgoing edge of a node.
    ///
    /// Panics unless `offset < out_degree(node_id)`; callers check the degree
    /// first.
    #[inline]
    pub fn edge_id_at(&self, node_id: u32, offset: u32) -> u32 {
        assert!(
            offset < self.out_degree(node_id),
            "edge offset {offset} out of range for node {node_id}"
        );
        self.first_edge_id(node_id) + offset
    }

    /// Write the table to `dir` as nodes.bin.
    pub fn write(&self, dir: &Path) -> std::io::Result<()> {
        let mut payload = Vec::with_capacity(4 + self.words.len() * 4);
        payload.extend_from_slice(&(self.count() as u32).to_le_bytes());
        for w in &self.words {
            payload.extend_from_slice(&w.to_le_bytes());
        }
        write_framed(&dir.join(NODES_FILE), MAGIC, &payload)
    }

    /// Read nodes.bin from `dir`.
    pub fn read(dir: &Path) -> Result<Self, LoadError> {
        let path = dir.join(NODES_FILE);
        let payload = read_framed(&path, MAGIC)?;
        if payload.len() < 4 {
            return Err(LoadError::Corrupt(format!(
                "{}: payload too short for the record count",
                path.display()
            )));
        }
        let count = read_u32(&payload, 0) as usize;
        let expected = 4 + count * WORDS_PER_NODE * 4;
        if payload.len() != expected {
            return Err(LoadError::Corrupt(format!(
                "{}: {} payload bytes for {count} nodes (expected {expected})",
                path.display(),
                payload.len()
            )));
        }
        let words = payload[4..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Self::from_words(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> NodeTable {
        // Two nodes: (1.5, 2.0) with 2 out-edges starting at 5,
        // (-3.25, 0.0625) with none.
        let words = vec![
            q28_4::of_int(1) as u32 + 8, // 1.5 in Q28.4
            q28_4::of_int(2) as u32,
            pack_out_edges(2, 5),
            (-52i32) as u32, // -3.25
            1,               // 0.0625
            pack_out_edges(0, 0),
        ];
        NodeTable::from_words(words).unwrap()
    }

    #[test]
    fn test_decoding() {
        let t = table();
        assert_eq!(t.count(), 2);
        assert_eq!(t.point_of(0), Point::new(1.5, 2.0));
        assert_eq!(t.point_of(1), Point::new(-3.25, 0.0625));
        assert_eq!(t.out_degree(0), 2);
        assert_eq!(t.first_edge_id(0), 5);
        assert_eq!(t.edge_id_at(0, 0), 5);
        assert_eq!(t.edge_id_at(0, 1), 6);
        assert_eq!(t.out_degree(1), 0);
    }

    #[test]
    #[should_panic]
    fn test_edge_offset_out_of_range_panics() {
        table().edge_id_at(0, 2);
    }

    #[test]
    fn test_pack_limits() {
        assert_eq!(pack_out_edges(15, (1 << 28) - 1), u32::MAX);
        assert_eq!(pack_out_edges(0, 0), 0);
    }

    #[test]
    #[should_panic]
    fn test_pack_rejects_wide_degree() {
        pack_out_edges(16, 0);
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let t = table();
        t.write(dir.path()).unwrap();
        let back = NodeTable::read(dir.path()).unwrap();
        assert_eq!(back.count(), t.count());
        assert_eq!(back.point_of(0), t.point_of(0));
        assert_eq!(back.point_of(1), t.point_of(1));
        assert_eq!(back.first_edge_id(0), 5);
    }

    #[test]
    fn test_read_rejects_bad_count() {
        let dir = TempDir::new().unwrap();
        table().write(dir.path()).unwrap();

        // Rewrite with a lying record count but a valid frame
        let payload_count_lie = {
            let mut payload = Vec::new();
            payload.extend_from_slice(&9u32.to_le_bytes());
            payload.extend_from_slice(&[0u8; 12]);
            payload
        };
        crate::formats::write_framed(&dir.path().join(NODES_FILE), MAGIC, &payload_count_lie)
            .unwrap();
        assert!(matches!(
            NodeTable::read(dir.path()),
            Err(LoadError::Corrupt(_))
        ));
    }
}
