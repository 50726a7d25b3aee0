//! edges.bin / profiles.bin / elevations.bin - packed edge table.
//!
//! edges.bin payload: `count: u32`, then `count` 10-byte records:
//!
//!   bytes 0..4:  i32, target node id; negative means the edge is stored
//!                inverted and the id is the bit complement of the value
//!   bytes 4..6:  u16, length, Q28.4 (unsigned-widened before decode)
//!   bytes 6..8:  u16, elevation gain, Q28.4
//!   bytes 8..10: u16, attribute-set index
//!
//! profiles.bin payload: `count: u32` (equal to the edge count), then one u32
//! descriptor per edge: bits 30..32 profile kind, bits 0..30 index of the
//! first elevation sample.
//!
//! elevations.bin payload: `count: u32`, then `count` u16 sample words.
//! Uncompressed samples are unsigned Q28.4 meters. Delta-compressed runs
//! start with one uncompressed sample word followed by words holding two
//! 8-bit (Q4.4) or four 4-bit (Q0.4) signed deltas, packed from the most
//! significant end; deltas accumulate onto the first sample. An edge with a
//! profile carries `1 + ceil(length / 2m)` samples, and a decoded run is
//! reversed when the edge is inverted.

use std::path::Path;

use crate::error::LoadError;
use crate::fixed::{extract_signed, extract_unsigned, q28_4};
use crate::formats::{read_framed, read_i32, read_u16, read_u32, write_framed};

const EDGES_MAGIC: u32 = 0x564C_4544; // "VLED"
const PROFILES_MAGIC: u32 = 0x564C_5046; // "VLPF"
const ELEVATIONS_MAGIC: u32 = 0x564C_4556; // "VLEV"

pub const EDGES_FILE: &str = "edges.bin";
pub const PROFILES_FILE: &str = "profiles.bin";
pub const ELEVATIONS_FILE: &str = "elevations.bin";

/// Bytes per edge record.
pub const EDGE_BYTES: usize = 10;

const OFFSET_TARGET: usize = 0;
const OFFSET_LENGTH: usize = 4;
const OFFSET_ELEVATION_GAIN: usize = 6;
const OFFSET_ATTRIBUTES: usize = 8;

const PROFILE_KIND_START: u32 = 30;
const PROFILE_KIND_BITS: u32 = 2;
const FIRST_SAMPLE_BITS: u32 = 30;

/// Compression scheme of an edge's elevation samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// No elevation data.
    None,
    /// Uncompressed u16 samples.
    Raw,
    /// 8-bit signed Q4.4 deltas, two per word.
    Delta8,
    /// 4-bit signed Q0.4 deltas, four per word.
    Delta4,
}

impl ProfileKind {
    fn from_bits(bits: u32) -> ProfileKind {
        match bits {
            0 => ProfileKind::None,
            1 => ProfileKind::Raw,
            2 => ProfileKind::Delta8,
            _ => ProfileKind::Delta4,
        }
    }

    fn to_bits(self) -> u32 {
        match self {
            ProfileKind::None => 0,
            ProfileKind::Raw => 1,
            ProfileKind::Delta8 => 2,
            ProfileKind::Delta4 => 3,
        }
    }

    /// Deltas carried per sample word; 0 for kinds without deltas.
    fn deltas_per_word(self) -> usize {
        match self {
            ProfileKind::Delta8 => 2,
            ProfileKind::Delta4 => 4,
            _ => 0,
        }
    }

    fn delta_bits(self) -> u32 {
        match self {
            ProfileKind::Delta8 => 8,
            ProfileKind::Delta4 => 4,
            _ => 0,
        }
    }

    /// Number of u16 words a run of `sample_count` samples occupies.
    pub fn word_count(self, sample_count: usize) -> usize {
        match self {
            ProfileKind::None => 0,
            ProfileKind::Raw => sample_count,
            _ => 1 + (sample_count - 1).div_ceil(self.deltas_per_word()),
        }
    }
}

/// Pack an edge record.
///
/// `target_node_id` must fit in 31 bits; when `inverted` the stored word is
/// the bit complement, which is what flags the inversion on read.
pub fn pack_edge(
    target_node_id: u32,
    inverted: bool,
    length_q: u16,
    elevation_gain_q: u16,
    attributes_index: u16,
) -> [u8; EDGE_BYTES] {
    assert!(
        target_node_id < (1 << 31),
        "target node id {target_node_id} does not fit in 31 bits"
    );
    let word: i32 = if inverted {
        !(target_node_id as i32)
    } else {
        target_node_id as i32
    };
    let mut record = [0u8; EDGE_BYTES];
    record[OFFSET_TARGET..OFFSET_TARGET + 4].copy_from_slice(&word.to_le_bytes());
    record[OFFSET_LENGTH..OFFSET_LENGTH + 2].copy_from_slice(&length_q.to_le_bytes());
    record[OFFSET_ELEVATION_GAIN..OFFSET_ELEVATION_GAIN + 2]
        .copy_from_slice(&elevation_gain_q.to_le_bytes());
    record[OFFSET_ATTRIBUTES..OFFSET_ATTRIBUTES + 2]
        .copy_from_slice(&attributes_index.to_le_bytes());
    record
}

/// Pack a profile descriptor word.
pub fn pack_profile(kind: ProfileKind, first_sample_index: u32) -> u32 {
    assert!(
        first_sample_index < (1 << FIRST_SAMPLE_BITS),
        "first sample index {first_sample_index} does not fit in {FIRST_SAMPLE_BITS} bits"
    );
    (kind.to_bits() << PROFILE_KIND_START) | first_sample_index
}

/// Read-only decoder over the packed edge arrays.
#[derive(Debug)]
pub struct EdgeTable {
    edges: Vec<u8>,
    profile_ids: Vec<u32>,
    elevations: Vec<u16>,
}

impl EdgeTable {
    /// Wrap the three packed arrays, validating their internal consistency:
    /// whole records, one descriptor per edge, every profile run in bounds
    /// with at least two samples.
    pub fn from_parts(
        edges: Vec<u8>,
        profile_ids: Vec<u32>,
        elevations: Vec<u16>,
    ) -> Result<Self, LoadError> {
        if edges.len() % EDGE_BYTES != 0 {
            return Err(LoadError::Corrupt(format!(
                "edge array length {} is not a multiple of {EDGE_BYTES}",
                edges.len()
            )));
        }
        let table = Self {
            edges,
            profile_ids,
            elevations,
        };
        let count = table.count();
        if table.profile_ids.len() != count {
            return Err(LoadError::Corrupt(format!(
                "{} profile descriptors for {count} edges",
                table.profile_ids.len()
            )));
        }
        for edge_id in 0..count as u32 {
            let kind = table.profile_kind(edge_id);
            if kind == ProfileKind::None {
                continue;
            }
            let samples = table.sample_count(edge_id);
            if samples < 2 {
                return Err(LoadError::Corrupt(format!(
                    "edge {edge_id} has a profile but only {samples} sample(s)"
                )));
            }
            let first = table.first_sample_index(edge_id) as usize;
            let words = kind.word_count(samples);
            if first + words > table.elevations.len() {
                return Err(LoadError::Corrupt(format!(
                    "edge {edge_id} profile run [{first}, {}) exceeds {} elevation words",
                    first + words,
                    table.elevations.len()
                )));
            }
        }
        Ok(table)
    }

    /// Number of edges.
    #[inline]
    pub fn count(&self) -> usize {
        self.edges.len() / EDGE_BYTES
    }

    #[inline]
    fn record(&self, edge_id: u32) -> &[u8] {
        let base = edge_id as usize * EDGE_BYTES;
        &self.edges[base..base + EDGE_BYTES]
    }

    /// Whether the edge is stored in the direction opposite to traversal.
    #[inline]
    pub fn is_inverted(&self, edge_id: u32) -> bool {
        read_i32(self.record(edge_id), OFFSET_TARGET) < 0
    }

    /// Target node id, with the complement undone for inverted edges.
    #[inline]
    pub fn target_node_id(&self, edge_id: u32) -> u32 {
        let word = read_i32(self.record(edge_id), OFFSET_TARGET);
        (if word < 0 { !word } else { word }) as u32
    }

    /// Edge length in meters.
    #[inline]
    pub fn length(&self, edge_id: u32) -> f64 {
        q28_4::as_double(self.length_q(edge_id) as i32)
    }

    #[inline]
    fn length_q(&self, edge_id: u32) -> u32 {
        u32::from(read_u16(self.record(edge_id), OFFSET_LENGTH))
    }

    /// Total elevation gain along the edge, in meters.
    #[inline]
    pub fn elevation_gain(&self, edge_id: u32) -> f64 {
        let gain_q = u32::from(read_u16(self.record(edge_id), OFFSET_ELEVATION_GAIN));
        q28_4::as_double(gain_q as i32)
    }

    /// Index of the edge's attribute set in the shared attribute table.
    #[inline]
    pub fn attributes_index(&self, edge_id: u32) -> usize {
        read_u16(self.record(edge_id), OFFSET_ATTRIBUTES) as usize
    }

    #[inline]
    fn descriptor(&self, edge_id: u32) -> u32 {
        self.profile_ids[edge_id as usize]
    }

    /// Elevation profile compression kind of the edge.
    #[inline]
    pub fn profile_kind(&self, edge_id: u32) -> ProfileKind {
        ProfileKind::from_bits(extract_unsigned(
            self.descriptor(edge_id),
            PROFILE_KIND_START,
            PROFILE_KIND_BITS,
        ))
    }

    /// Whether the edge carries elevation samples.
    #[inline]
    pub fn has_profile(&self, edge_id: u32) -> bool {
        self.profile_kind(edge_id) != ProfileKind::None
    }

    /// Index of the edge's first elevation sample word.
    #[inline]
    pub fn first_sample_index(&self, edge_id: u32) -> u32 {
        extract_unsigned(self.descriptor(edge_id), 0, FIRST_SAMPLE_BITS)
    }

    /// Number of elevation samples of the edge: one sample every <= 2 m,
    /// endpoints included.
    #[inline]
    pub fn sample_count(&self, edge_id: u32) -> usize {
        1 + self.length_q(edge_id).div_ceil(q28_4::of_int(2) as u32) as usize
    }

    /// Decoded elevation samples of the edge, in traversal order; empty when
    /// the edge has no profile.
    pub fn profile_samples(&self, edge_id: u32) -> Vec<f32> {
        let kind = self.profile_kind(edge_id);
        if kind == ProfileKind::None {
            return Vec::new();
        }
        let first = self.first_sample_index(edge_id) as usize;
        let count = self.sample_count(edge_id);

        let mut samples = match kind {
            ProfileKind::Raw => (0..count)
                .map(|i| q28_4::as_float(self.elevations[first + i] as i32))
                .collect::<Vec<_>>(),
            _ => {
                let per_word = kind.deltas_per_word();
                let bits = kind.delta_bits();
                let mut out = Vec::with_capacity(count);
                let mut current = q28_4::as_float(self.elevations[first] as i32);
                out.push(current);
                for j in 1..count {
                    let word = u32::from(self.elevations[first + 1 + (j - 1) / per_word]);
                    let slot = (j - 1) % per_word;
                    let start = bits * (per_word - 1 - slot) as u32;
                    let delta = extract_signed(word, start, bits);
                    current += q28_4::as_float(delta);
                    out.push(current);
                }
                out
            }
        };

        if self.is_inverted(edge_id) {
            samples.reverse();
        }
        samples
    }

    /// Write the three edge files into `dir`.
    pub fn write(&self, dir: &Path) -> std::io::Result<()> {
        let mut edges_payload = Vec::with_capacity(4 + self.edges.len());
        edges_payload.extend_from_slice(&(self.count() as u32).to_le_bytes());
        edges_payload.extend_from_slice(&self.edges);
        write_framed(&dir.join(EDGES_FILE), EDGES_MAGIC, &edges_payload)?;

        let mut profiles_payload = Vec::with_capacity(4 + self.profile_ids.len() * 4);
        profiles_payload.extend_from_slice(&(self.profile_ids.len() as u32).to_le_bytes());
        for p in &self.profile_ids {
            profiles_payload.extend_from_slice(&p.to_le_bytes());
        }
        write_framed(&dir.join(PROFILES_FILE), PROFILES_MAGIC, &profiles_payload)?;

        let mut elevations_payload = Vec::with_capacity(4 + self.elevations.len() * 2);
        elevations_payload.extend_from_slice(&(self.elevations.len() as u32).to_le_bytes());
        for s in &self.elevations {
            elevations_payload.extend_from_slice(&s.to_le_bytes());
        }
        write_framed(
            &dir.join(ELEVATIONS_FILE),
            ELEVATIONS_MAGIC,
            &elevations_payload,
        )
    }

    /// Read the three edge files from `dir`.
    pub fn read(dir: &Path) -> Result<Self, LoadError> {
        let edges_path = dir.join(EDGES_FILE);
        let payload = read_framed(&edges_path, EDGES_MAGIC)?;
        let edges = sized_payload(&edges_path, &payload, EDGE_BYTES)?.to_vec();

        let profiles_path = dir.join(PROFILES_FILE);
        let payload = read_framed(&profiles_path, PROFILES_MAGIC)?;
        let profile_ids = sized_payload(&profiles_path, &payload, 4)?
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        let elevations_path = dir.join(ELEVATIONS_FILE);
        let payload = read_framed(&elevations_path, ELEVATIONS_MAGIC)?;
        let elevations = sized_payload(&elevations_path, &payload, 2)?
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Self::from_parts(edges, profile_ids, elevations)
    }
}

/// Check a `count`-prefixed payload against its record size and return the
/// record bytes.
fn sized_payload<'a>(
    path: &Path,
    payload: &'a [u8],
    record_bytes: usize,
) -> Result<&'a [u8], LoadError> {
    if payload.len() < 4 {
        return Err(LoadError::Corrupt(format!(
            "{}: payload too short for the record count",
            path.display()
        )));
    }
    let count = read_u32(payload, 0) as usize;
    let expected = 4 + count * record_bytes;
    if payload.len() != expected {
        return Err(LoadError::Corrupt(format!(
            "{}: {} payload bytes for {count} records of {record_bytes} bytes",
            path.display(),
            payload.len()
        )));
    }
    Ok(&payload[4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Length 5 m -> length_q 80 -> 1 + ceil(80/32) = 4 samples.
    const LEN_5M_Q: u16 = 80;

    fn raw_table() -> EdgeTable {
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(12, false, LEN_5M_Q, 16, 3));
        edges.extend_from_slice(&pack_edge(7, true, LEN_5M_Q, 0, 0));
        let profile_ids = vec![
            pack_profile(ProfileKind::Raw, 0),
            pack_profile(ProfileKind::None, 0),
        ];
        // 100.0, 100.5, 101.0, 100.25 m in Q28.4
        let elevations = vec![1600, 1608, 1616, 1604];
        EdgeTable::from_parts(edges, profile_ids, elevations).unwrap()
    }

    #[test]
    fn test_record_decoding() {
        let t = raw_table();
        assert_eq!(t.count(), 2);
        assert!(!t.is_inverted(0));
        assert_eq!(t.target_node_id(0), 12);
        assert_eq!(t.length(0), 5.0);
        assert_eq!(t.elevation_gain(0), 1.0);
        assert_eq!(t.attributes_index(0), 3);

        assert!(t.is_inverted(1));
        assert_eq!(t.target_node_id(1), 7);
    }

    #[test]
    fn test_raw_profile() {
        let t = raw_table();
        assert!(t.has_profile(0));
        assert_eq!(t.profile_kind(0), ProfileKind::Raw);
        assert_eq!(t.sample_count(0), 4);
        assert_eq!(t.profile_samples(0), vec![100.0, 100.5, 101.0, 100.25]);

        assert!(!t.has_profile(1));
        assert!(t.profile_samples(1).is_empty());
    }

    #[test]
    fn test_delta8_profile() {
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(1, false, LEN_5M_Q, 0, 0));
        let profile_ids = vec![pack_profile(ProfileKind::Delta8, 0)];
        // First sample 50.0 m (800 in Q28.4), then deltas +0.5, -1.0, +0.0625
        // = +8, -16, +1 in Q4.4. Words pack high byte first.
        let w1 = ((8i32 as u8 as u16) << 8) | (-16i32 as u8 as u16);
        let w2 = (1u16) << 8;
        let elevations = vec![800, w1, w2];
        let t = EdgeTable::from_parts(edges, profile_ids, elevations).unwrap();
        assert_eq!(t.profile_samples(0), vec![50.0, 50.5, 49.5, 49.5625]);
    }

    #[test]
    fn test_delta4_profile() {
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(1, false, LEN_5M_Q, 0, 0));
        let profile_ids = vec![pack_profile(ProfileKind::Delta4, 0)];
        // First sample 50.0 m, then deltas +1, -8, +7 sixteenths packed into
        // one word, most significant nibble first (fourth slot unused).
        let w1 = (0x1u16 << 12) | (0x8u16 << 8) | (0x7u16 << 4);
        let elevations = vec![800, w1];
        let t = EdgeTable::from_parts(edges, profile_ids, elevations).unwrap();
        assert_eq!(
            t.profile_samples(0),
            vec![50.0, 50.0625, 49.5625, 50.0]
        );
    }

    #[test]
    fn test_inverted_profile_is_reversed() {
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(1, true, LEN_5M_Q, 0, 0));
        let profile_ids = vec![pack_profile(ProfileKind::Raw, 0)];
        let elevations = vec![1600, 1608, 1616, 1604];
        let t = EdgeTable::from_parts(edges, profile_ids, elevations).unwrap();
        assert_eq!(t.profile_samples(0), vec![100.25, 101.0, 100.5, 100.0]);
    }

    #[test]
    fn test_sample_count_rule() {
        // 2 m exactly -> 1 + 1 = 2; a hair over -> 3
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(1, false, 32, 0, 0));
        edges.extend_from_slice(&pack_edge(1, false, 33, 0, 0));
        let profile_ids = vec![pack_profile(ProfileKind::None, 0); 2];
        let t = EdgeTable::from_parts(edges, profile_ids, vec![]).unwrap();
        assert_eq!(t.sample_count(0), 2);
        assert_eq!(t.sample_count(1), 3);
    }

    #[test]
    fn test_out_of_bounds_profile_rejected() {
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(1, false, LEN_5M_Q, 0, 0));
        let profile_ids = vec![pack_profile(ProfileKind::Raw, 2)];
        // 4 samples starting at 2 need 6 words; only 4 exist
        let elevations = vec![1600, 1600, 1600, 1600];
        assert!(matches!(
            EdgeTable::from_parts(edges, profile_ids, elevations),
            Err(LoadError::Corrupt(_))
        ));
    }

    #[test]
    fn test_descriptor_count_mismatch_rejected() {
        let mut edges = Vec::new();
        edges.extend_from_slice(&pack_edge(1, false, 16, 0, 0));
        assert!(matches!(
            EdgeTable::from_parts(edges, vec![], vec![]),
            Err(LoadError::Corrupt(_))
        ));
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let t = raw_table();
        t.write(dir.path()).unwrap();
        let back = EdgeTable::read(dir.path()).unwrap();
        assert_eq!(back.count(), t.count());
        for e in 0..t.count() as u32 {
            assert_eq!(back.target_node_id(e), t.target_node_id(e));
            assert_eq!(back.length(e), t.length(e));
            assert_eq!(back.profile_samples(e), t.profile_samples(e));
        }
    }
}
