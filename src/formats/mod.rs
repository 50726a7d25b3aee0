//! Binary table formats for the on-disk graph.
//!
//! Every file shares one frame (little-endian):
//!
//!   magic:       u32   // per-table constant
//!   version:     u16   // = 1
//!   reserved:    u16   // = 0
//!   payload_len: u64
//!   payload:     [payload_len]u8
//!   crc64:       u64   // CRC-64/GO-ISO over header + payload
//!
//! Readers verify magic, version, declared length, and checksum before any
//! decoding; a frame that fails any check is rejected as a whole.

pub mod attr_sets;
pub mod edges;
pub mod nodes;
pub mod sectors;

use std::fs;
use std::path::Path;

use crc::{Crc, CRC_64_GO_ISO};

use crate::error::LoadError;

pub(crate) const VERSION: u16 = 1;

const HEADER_SIZE: usize = 16;
const FOOTER_SIZE: usize = 8;

/// CRC-64/GO-ISO, the checksum used by every table file.
pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

/// Write `payload` to `path` inside the standard frame.
pub(crate) fn write_framed(path: &Path, magic: u32, payload: &[u8]) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
    buf.extend_from_slice(&magic.to_le_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);
    let crc = CRC64.checksum(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    fs::write(path, buf)
}

/// Read `path`, verify the frame against `magic`, and return the payload.
pub(crate) fn read_framed(path: &Path, magic: u32) -> Result<Vec<u8>, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::io(path, e))?;
    let min = (HEADER_SIZE + FOOTER_SIZE) as u64;
    if (bytes.len() as u64) < min {
        return Err(LoadError::Truncated {
            path: path.to_owned(),
            len: bytes.len() as u64,
            need: min,
        });
    }

    let found_magic = read_u32(&bytes, 0);
    if found_magic != magic {
        return Err(LoadError::BadMagic {
            path: path.to_owned(),
            found: found_magic,
            expected: magic,
        });
    }
    let version = read_u16(&bytes, 4);
    if version != VERSION {
        return Err(LoadError::UnsupportedVersion {
            path: path.to_owned(),
            found: version,
            expected: VERSION,
        });
    }
    let declared = read_u64(&bytes, 8);
    let actual = (bytes.len() - HEADER_SIZE - FOOTER_SIZE) as u64;
    if declared != actual {
        return Err(LoadError::PayloadLength {
            path: path.to_owned(),
            found: actual,
            declared,
        });
    }

    let body_end = bytes.len() - FOOTER_SIZE;
    let stored = read_u64(&bytes, body_end);
    let computed = CRC64.checksum(&bytes[..body_end]);
    if stored != computed {
        return Err(LoadError::ChecksumMismatch {
            path: path.to_owned(),
            stored,
            computed,
        });
    }

    let mut payload = bytes;
    payload.truncate(body_end);
    payload.drain(..HEADER_SIZE);
    Ok(payload)
}

// Fixed-width little-endian reads. Offsets come from validated record
// arithmetic; the slice indexing bounds-checks the rest.

#[inline(always)]
pub(crate) fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(buf[off..off + 2].try_into().unwrap())
}

#[inline(always)]
pub(crate) fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

#[inline(always)]
pub(crate) fn read_i32(buf: &[u8], off: usize) -> i32 {
    i32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

#[inline(always)]
pub(crate) fn read_u64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}
