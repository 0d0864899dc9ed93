//! Binary persistence for counting filters.
//!
//! Two formats are supported.
//!
//! # Raw Dump
//!
//! The bare counter bank, compatible with existing dumps of this filter:
//!
//! ```text
//!   m:      4 bytes  (i32, big-endian)
//!   words:  8 bytes each, ((m - 1) >> 4) + 1 of them (u64, big-endian)
//! ```
//!
//! It records neither `k` nor any configuration; the reader supplies both.
//!
//! # Framed Format
//!
//! Self-describing and checksummed:
//!
//! ```text
//! [Header: 32 bytes, little-endian]
//!   Magic:        4 bytes  ("CBLM")
//!   Version:      2 bytes
//!   m:            8 bytes  (counters)
//!   k:            4 bytes  (positions per key)
//!   Seed:         4 bytes
//!   Stripes:      4 bytes
//!   Max count:    1 byte
//!   Reserved:     5 bytes  (zero)
//!
//! [Data]
//!   Packed counter words (u64, little-endian)
//!
//! [Trailer: 8 bytes]
//!   xxh3-64 of header and data (u64, little-endian)
//! ```
//!
//! All parsing is explicit byte slicing; nothing depends on alignment or
//! host endianness.
//!
//! # Examples
//!
//! ```
//! use cbloom::CountingBloomFilter;
//!
//! let filter = CountingBloomFilter::new(100, 3)?;
//! filter.add(1);
//!
//! let bytes = filter.to_bytes();
//! let restored = CountingBloomFilter::from_bytes(&bytes)?;
//! assert!(restored.contains(1));
//!
//! let mut raw = Vec::new();
//! filter.write_raw(&mut raw)?;
//! let restored = CountingBloomFilter::read_raw(&mut raw.as_slice(), 3)?;
//! assert_eq!(restored.counters().words(), filter.counters().words());
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

#![allow(clippy::cast_possible_truncation)]

use crate::config::FilterConfig;
use crate::core::counters::{words_for, CounterBank};
use crate::core::params::{self, MAX_FILTER_SIZE};
use crate::error::{CodecError, Result};
use crate::filters::CountingBloomFilter;
use std::io::{Read, Write};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Magic bytes opening every framed filter.
pub const MAGIC: &[u8; 4] = b"CBLM";

/// Current framed format version.
pub const VERSION: u16 = 1;

/// Framed header size in bytes.
pub const HEADER_SIZE: usize = 32;

/// Checksum trailer size in bytes.
pub const CHECKSUM_SIZE: usize = 8;

/// Words reserved up front when reading a raw dump.
const RAW_PREALLOC_WORDS: usize = 4096;

/// Bytes [`encode`] produces for a filter with `m` counters.
#[must_use]
pub fn framed_size(m: usize) -> usize {
    HEADER_SIZE + words_for(m) * 8 + CHECKSUM_SIZE
}

/// Bytes [`write_raw`] produces for a filter with `m` counters.
#[must_use]
pub fn raw_size(m: usize) -> usize {
    4 + words_for(m) * 8
}

/// Serialize `filter` into the framed format.
#[must_use]
pub fn encode(filter: &CountingBloomFilter) -> Vec<u8> {
    let config = filter.config();
    let words = filter.counters().words();
    let mut bytes = Vec::with_capacity(framed_size(filter.m()));

    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(filter.m() as u64).to_le_bytes());
    // k <= MAX_HASH_COUNT and stripes <= MAX_STRIPE_COUNT by construction.
    bytes.extend_from_slice(&(filter.k() as u32).to_le_bytes());
    bytes.extend_from_slice(&config.seed.to_le_bytes());
    bytes.extend_from_slice(&(config.stripe_count as u32).to_le_bytes());
    bytes.push(config.max_count);
    bytes.extend_from_slice(&[0u8; 5]);
    debug_assert_eq!(bytes.len(), HEADER_SIZE);

    for word in &words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }

    let checksum = xxh3_64(&bytes);
    bytes.extend_from_slice(&checksum.to_le_bytes());
    debug_assert_eq!(bytes.len(), framed_size(filter.m()));

    debug!(m = filter.m(), k = filter.k(), bytes = bytes.len(), "encoded counting filter");
    bytes
}

/// Parsed framed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Format version.
    pub version: u16,
    /// Counters in the bank.
    pub m: usize,
    /// Positions per key.
    pub k: usize,
    /// Configuration recorded with the bank.
    pub config: FilterConfig,
}

/// Check magic, version, dimensions, length and checksum without building
/// a filter.
///
/// # Errors
///
/// The same [`CodecError`] variants as [`decode`].
pub fn validate(bytes: &[u8]) -> Result<FrameHeader> {
    let header = parse_header(bytes)?;

    let expected = framed_size(header.m);
    if bytes.len() < expected {
        return Err(CodecError::BufferTooSmall {
            expected,
            actual: bytes.len(),
        }
        .into());
    }
    if bytes.len() > expected {
        return Err(CodecError::CorruptCounters(format!(
            "{} trailing bytes after checksum",
            bytes.len() - expected
        ))
        .into());
    }

    let body = expected - CHECKSUM_SIZE;
    let stored = read_u64_le(&bytes[body..]);
    let computed = xxh3_64(&bytes[..body]);
    if stored != computed {
        return Err(CodecError::ChecksumMismatch { stored, computed }.into());
    }

    Ok(header)
}

/// Deserialize a filter from the framed format.
///
/// # Errors
///
/// - [`CodecError::BufferTooSmall`] if the input is shorter than its header promises
/// - [`CodecError::InvalidMagic`] / [`CodecError::UnsupportedVersion`] for foreign input
/// - [`CodecError::ChecksumMismatch`] if the payload was altered
/// - [`CodecError::CorruptCounters`] for impossible dimensions or counter values
pub fn decode(bytes: &[u8]) -> Result<CountingBloomFilter> {
    let header = validate(bytes)?;

    let data_end = HEADER_SIZE + words_for(header.m) * 8;
    let words = bytes[HEADER_SIZE..data_end]
        .chunks_exact(8)
        .map(read_u64_le)
        .collect();

    let counters = CounterBank::from_words(header.m, words, header.config.max_count)?;
    let filter = CountingBloomFilter::from_parts(counters, header.k, header.config)?;

    debug!(m = header.m, k = header.k, "decoded counting filter");
    Ok(filter)
}

/// Write the raw dump of `filter`.
///
/// # Errors
///
/// [`CodecError::Io`] if the writer fails.
pub fn write_raw<W: Write>(filter: &CountingBloomFilter, writer: &mut W) -> Result<()> {
    // m <= i32::MAX by construction.
    writer
        .write_all(&(filter.m() as i32).to_be_bytes())
        .map_err(CodecError::from)?;
    for word in filter.counters().words() {
        writer
            .write_all(&word.to_be_bytes())
            .map_err(CodecError::from)?;
    }

    debug!(m = filter.m(), bytes = raw_size(filter.m()), "wrote raw counter dump");
    Ok(())
}

/// Read a raw dump, supplying the `k` and config it does not record.
///
/// # Errors
///
/// - [`CodecError::Truncated`] if the stream ends early
/// - [`CodecError::CorruptCounters`] for a non-positive `m` or impossible counter values
/// - construction errors for an invalid `k` or `config`
pub fn read_raw<R: Read>(reader: &mut R, k: usize, config: FilterConfig) -> Result<CountingBloomFilter> {
    let mut field = [0u8; 4];
    reader.read_exact(&mut field).map_err(CodecError::from)?;
    let m = i32::from_be_bytes(field);
    if m <= 0 {
        return Err(CodecError::CorruptCounters(format!("invalid counter count {}", m)).into());
    }
    let m = m as usize;
    params::validate_dimensions(m, k)?;
    config.validate()?;

    // The declared m is untrusted; grow with the data actually read.
    let mut words = Vec::with_capacity(words_for(m).min(RAW_PREALLOC_WORDS));
    let mut word = [0u8; 8];
    for _ in 0..words_for(m) {
        reader.read_exact(&mut word).map_err(CodecError::from)?;
        words.push(u64::from_be_bytes(word));
    }

    let counters = CounterBank::from_words(m, words, config.max_count)?;
    let filter = CountingBloomFilter::from_parts(counters, k, config)?;

    debug!(m, k, "read raw counter dump");
    Ok(filter)
}

fn parse_header(bytes: &[u8]) -> Result<FrameHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::BufferTooSmall {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        }
        .into());
    }

    if &bytes[0..4] != MAGIC {
        return Err(CodecError::InvalidMagic.into());
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version).into());
    }

    let m = read_u64_le(&bytes[6..14]);
    let k = read_u32_le(&bytes[14..18]);
    let seed = read_u32_le(&bytes[18..22]);
    let stripe_count = read_u32_le(&bytes[22..26]);
    let max_count = bytes[26];

    if m == 0 || m > MAX_FILTER_SIZE as u64 {
        return Err(CodecError::CorruptCounters(format!("invalid counter count {}", m)).into());
    }

    let header = FrameHeader {
        version,
        m: m as usize,
        k: k as usize,
        config: FilterConfig {
            seed,
            stripe_count: stripe_count as usize,
            max_count,
        },
    };
    params::validate_dimensions(header.m, header.k)
        .and_then(|()| header.config.validate())
        .map_err(|err| CodecError::CorruptCounters(err.to_string()))?;

    Ok(header)
}

#[inline]
fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
