//! 32-bit multiply-xor-shift mixing hash (MurmurHash2).
//!
//! This is the hash the offset generator feeds its 8-byte key buffers
//! through. It is not cryptographic and offers no protection against
//! adversarially chosen keys.
//!
//! # Algorithm
//!
//! ```text
//! h = seed ⊕ len
//! for each 4-byte little-endian block k:
//!     k *= M; k ^= k >> 24; k *= M
//!     h *= M; h ^= k
//! tail (1-3 bytes) xored into h, then h *= M
//! h ^= h >> 13; h *= M; h ^= h >> 15
//! ```
//!
//! with `M = 0x5bd1e995`. All arithmetic wraps at 32 bits.

/// Multiplication constant.
const M: u32 = 0x5bd1e995;

/// Right-shift applied to each block.
const R: u32 = 24;

/// Hash `bytes` with the given seed.
///
/// # Examples
///
/// ```
/// use cbloom::hash::murmur2_32;
///
/// assert_eq!(murmur2_32(&[], 0), 0);
/// assert_eq!(murmur2_32(b"hello", 89478583), 0xaae2_3404);
/// ```
#[must_use]
pub fn murmur2_32(bytes: &[u8], seed: u32) -> u32 {
    // Length folds in modulo 2^32, as the block loop does.
    #[allow(clippy::cast_possible_truncation)]
    let mut h = seed ^ bytes.len() as u32;

    let mut blocks = bytes.chunks_exact(4);
    for block in &mut blocks {
        let mut k = read_u32(block);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        if tail.len() == 3 {
            h ^= u32::from(tail[2]) << 16;
        }
        if tail.len() >= 2 {
            h ^= u32::from(tail[1]) << 8;
        }
        h ^= u32::from(tail[0]);
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Read 4 bytes as little-endian u32.
#[inline(always)]
fn read_u32(block: &[u8]) -> u32 {
    u32::from_le_bytes([block[0], block[1], block[2], block[3]])
}
