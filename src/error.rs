//! Load-time error types.
//!
//! Everything here is fatal: the store makes no attempt to repair corrupt
//! binary data, and a failed load leaves no partially usable graph. No-result
//! query outcomes (no route, no node in range) are `Option`s, not errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate a graph directory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: file truncated ({len} bytes, need at least {need})")]
    Truncated { path: PathBuf, len: u64, need: u64 },

    #[error("{path}: bad magic {found:#010x} (expected {expected:#010x})")]
    BadMagic {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{path}: unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u16,
        expected: u16,
    },

    #[error("{path}: CRC-64 mismatch (stored {stored:#018x}, computed {computed:#018x})")]
    ChecksumMismatch {
        path: PathBuf,
        stored: u64,
        computed: u64,
    },

    #[error("{path}: payload length {found} does not match declared {declared}")]
    PayloadLength {
        path: PathBuf,
        found: u64,
        declared: u64,
    },

    #[error("corrupt graph data: {0}")]
    Corrupt(String),
}

impl LoadError {
    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        LoadError::Io {
            path: path.to_owned(),
            source,
        }
    }
}
