//! Bit-field extraction and Q28.4 fixed-point conversion.
//!
//! The packed tables store several values per 32-bit word (node out-degrees,
//! edge profile descriptors, delta-compressed elevation samples). Extraction
//! is two shifts: left-align the field, then shift back with sign- or
//! zero-extension. Coordinates, lengths and elevations use Q28.4: a signed
//! 32-bit integer whose low 4 bits are a binary fraction.

/// Extract `length` bits starting at bit `start` from `word`, zero-extended.
///
/// Bit 0 is the least significant bit. Panics unless `length >= 1` and
/// `start + length <= 32`.
#[inline(always)]
pub fn extract_unsigned(word: u32, start: u32, length: u32) -> u32 {
    assert!(
        (1..=32).contains(&length) && start <= 32 - length,
        "invalid bit range: start={start} length={length}"
    );
    (word << (32 - start - length)) >> (32 - length)
}

/// Extract `length` bits starting at bit `start` from `word`, sign-extended.
///
/// Same preconditions as [`extract_unsigned`]; the top bit of the extracted
/// field becomes the sign.
#[inline(always)]
pub fn extract_signed(word: u32, start: u32, length: u32) -> i32 {
    assert!(
        (1..=32).contains(&length) && start <= 32 - length,
        "invalid bit range: start={start} length={length}"
    );
    ((word << (32 - start - length)) as i32) >> (32 - length)
}

/// Q28.4 fixed-point conversions.
///
/// Divisions and multiplications by 16 are exact in binary floating point, so
/// round-tripping representable values loses nothing.
pub mod q28_4 {
    /// Number of fraction bits.
    pub const FRACTION_BITS: u32 = 4;

    /// The Q28.4 representation of integer `i`.
    #[inline(always)]
    pub fn of_int(i: i32) -> i32 {
        i << FRACTION_BITS
    }

    /// The real value of Q28.4 `q`, as f64.
    #[inline(always)]
    pub fn as_double(q: i32) -> f64 {
        f64::from(q) / 16.0
    }

    /// The real value of Q28.4 `q`, as f32.
    #[inline(always)]
    pub fn as_float(q: i32) -> f32 {
        q as f32 / 16.0
    }
}
