//! Key-to-position mapping for counting and membership filters.
//!
//! # Derivation
//!
//! A 64-bit key is laid out big-endian in an 8-byte buffer. Before each hash
//! (the first included) the buffer is advanced by one step:
//!
//! ```text
//! for i in 0..8:
//!     if buf[i] == 0x7F: buf[i] = 0x00, carry on
//!     else:              buf[i] = buf[i] + 1 (wrapping), stop
//! ```
//!
//! The buffer is then hashed with [`murmur2_32`], the result reinterpreted
//! as `i32` and its wrapping absolute value taken. Draws equal to `i32::MIN`,
//! or above the largest multiple of `m` that fits in `i32::MAX`, are rejected
//! and do not count; accepted draws yield `value % m`. Rejection removes the
//! modulo bias, so every position in `[0, m)` is equally likely.
//!
//! The sequence is a pure function of `(seed, key, k, m)`. Duplicate
//! positions are possible and are returned as-is.

use super::murmur::murmur2_32;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u32 = 89_478_583;

/// Largest `m` an offset can address.
const MAX_RANGE: usize = i32::MAX as usize;

/// Deterministic generator of `k` positions in `[0, m)` per key.
///
/// Cheap to copy; holds nothing but the seed.
///
/// # Examples
///
/// ```
/// use cbloom::hash::OffsetGenerator;
///
/// let generator = OffsetGenerator::new();
/// assert_eq!(generator.offsets(12123131, 3, 5), vec![2, 4, 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetGenerator {
    seed: u32,
}

impl OffsetGenerator {
    /// Generator with [`DEFAULT_SEED`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Generator with an explicit seed.
    #[must_use]
    pub const fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    /// Seed this generator hashes with.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Return exactly `k` positions in `[0, m)` for `key`.
    ///
    /// `m` must be in `1..=i32::MAX`; filters validate this at construction.
    #[must_use]
    pub fn offsets(&self, key: u64, k: usize, m: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(k);
        self.offsets_into(key, k, m, &mut out);
        out
    }

    /// Like [`offsets`](Self::offsets), writing into a reused buffer.
    ///
    /// `out` is cleared first.
    pub fn offsets_into(&self, key: u64, k: usize, m: usize, out: &mut Vec<usize>) {
        debug_assert!(m >= 1 && m <= MAX_RANGE, "m out of range: {}", m);

        out.clear();
        if k == 0 {
            return;
        }
        out.reserve(k);

        // i32::MAX fits in u32, and m <= i32::MAX.
        #[allow(clippy::cast_possible_truncation)]
        let range = m as u32;
        let limit = i32::MAX as u32 - (i32::MAX as u32 % range);

        let mut buf = key.to_be_bytes();
        while out.len() < k {
            advance(&mut buf);

            #[allow(clippy::cast_possible_wrap)]
            let draw = murmur2_32(&buf, self.seed) as i32;
            if draw == i32::MIN {
                continue;
            }
            let value = draw.unsigned_abs();
            if value > limit {
                continue;
            }
            out.push((value % range) as usize);
        }
    }
}

impl Default for OffsetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Step the key buffer once, carrying from index 0 upward through `0x7F` bytes.
#[inline]
fn advance(buf: &mut [u8; 8]) {
    for byte in buf.iter_mut() {
        if *byte == 0x7F {
            *byte = 0;
            continue;
        }
        *byte = byte.wrapping_add(1);
        break;
    }
}
