//! attributes.bin - shared table of attribute sets.
//!
//! Payload: `count: u32`, then `count` u64 bit patterns, one per
//! [`AttributeSet`]. Edges reference entries by index; distinct edges with
//! identical tags share one entry.

use std::path::Path;

use crate::attributes::{Attribute, AttributeSet};
use crate::error::LoadError;
use crate::formats::{read_framed, read_u32, write_framed};

const MAGIC: u32 = 0x564C_4154; // "VLAT"

pub const ATTRIBUTES_FILE: &str = "attributes.bin";

/// Read-only table of the graph's attribute sets.
#[derive(Debug)]
pub struct AttributeTable {
    sets: Vec<AttributeSet>,
}

impl AttributeTable {
    /// Wrap raw bit patterns, rejecting bits outside the attribute
    /// enumeration.
    pub fn from_bits(bits: Vec<u64>) -> Result<Self, LoadError> {
        let mut sets = Vec::with_capacity(bits.len());
        for (i, b) in bits.iter().enumerate() {
            if b >> Attribute::COUNT != 0 {
                return Err(LoadError::Corrupt(format!(
                    "attribute set {i} has bits outside the enumeration: {b:#x}"
                )));
            }
            sets.push(AttributeSet::new(*b));
        }
        Ok(Self { sets })
    }

    pub fn from_sets(sets: Vec<AttributeSet>) -> Self {
        Self { sets }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> AttributeSet {
        self.sets[index]
    }

    /// Write the table to `dir` as attributes.bin.
    pub fn write(&self, dir: &Path) -> std::io::Result<()> {
        let mut payload = Vec::with_capacity(4 + self.sets.len() * 8);
        payload.extend_from_slice(&(self.sets.len() as u32).to_le_bytes());
        for s in &self.sets {
            payload.extend_from_slice(&s.bits().to_le_bytes());
        }
        write_framed(&dir.join(ATTRIBUTES_FILE), MAGIC, &payload)
    }

    /// Read attributes.bin from `dir`.
    pub fn read(dir: &Path) -> Result<Self, LoadError> {
        let path = dir.join(ATTRIBUTES_FILE);
        let payload = read_framed(&path, MAGIC)?;
        if payload.len() < 4 {
            return Err(LoadError::Corrupt(format!(
                "{}: payload too short for the record count",
                path.display()
            )));
        }
        let count = read_u32(&payload, 0) as usize;
        if payload.len() != 4 + count * 8 {
            return Err(LoadError::Corrupt(format!(
                "{}: {} payload bytes for {count} attribute sets",
                path.display(),
                payload.len()
            )));
        }
        let bits = payload[4..]
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Self::from_bits(bits)
    }
}
