//! Framed, raw and serde persistence of counting filters

use cbloom::codec::{self, CHECKSUM_SIZE, HEADER_SIZE};
use cbloom::{CBloomError, CodecError, CountingBloomFilter, FilterConfig};
use std::io::Cursor;

fn populated() -> CountingBloomFilter {
    let config = FilterConfig::new()
        .with_seed(12_345)
        .with_stripe_count(32)
        .with_max_count(10);
    let filter = CountingBloomFilter::with_config(10_000, 5, config).unwrap();
    for key in 0..1_000 {
        filter.add(key);
    }
    for _ in 0..4 {
        filter.add(7);
    }
    filter
}

fn saturated() -> CountingBloomFilter {
    let filter = CountingBloomFilter::new(40, 2).unwrap();
    for key in 0..2_000 {
        filter.add(key);
    }
    assert_eq!(filter.saturated_counter_count(), 40);
    filter
}

fn assert_same(restored: &CountingBloomFilter, original: &CountingBloomFilter) {
    assert_eq!(restored.m(), original.m());
    assert_eq!(restored.k(), original.k());
    assert_eq!(restored.counters().words(), original.counters().words());
}

#[test]
fn test_framed_roundtrip_preserves_everything() {
    let filter = populated();
    let bytes = filter.to_bytes();
    assert_eq!(bytes.len(), codec::framed_size(filter.m()));

    let restored = CountingBloomFilter::from_bytes(&bytes).unwrap();
    assert_same(&restored, &filter);
    assert_eq!(restored.config(), filter.config());
    assert_eq!(restored.approximate_count(7), filter.approximate_count(7));
    for key in 0..1_000 {
        assert!(restored.contains(key));
    }
}

#[test]
fn test_framed_empty_and_saturated() {
    let empty = CountingBloomFilter::new(100, 3).unwrap();
    let restored = CountingBloomFilter::from_bytes(&empty.to_bytes()).unwrap();
    assert!(restored.is_empty());

    let full = saturated();
    let restored = CountingBloomFilter::from_bytes(&full.to_bytes()).unwrap();
    assert_same(&restored, &full);
    assert_eq!(restored.saturated_counter_count(), 40);
    // Saturation statistics are not persisted.
    assert_eq!(restored.saturation_events(), 0);
}

#[test]
fn test_framed_restored_filter_keeps_working() {
    let filter = populated();
    let restored = CountingBloomFilter::from_bytes(&filter.to_bytes()).unwrap();

    assert!(restored.remove(7));
    assert_eq!(restored.approximate_count(7), filter.approximate_count(7) - 1);
    restored.add(5_000_000);
    assert!(restored.contains(5_000_000));
}

#[test]
fn test_framed_header_validation() {
    let bytes = populated().to_bytes();
    let header = codec::validate(&bytes).unwrap();
    assert_eq!(header.m, 10_000);
    assert_eq!(header.k, 5);
    assert_eq!(header.config.seed, 12_345);
    assert_eq!(header.config.stripe_count, 32);
    assert_eq!(header.config.max_count, 10);
}

#[test]
fn test_framed_rejects_damage() {
    let bytes = populated().to_bytes();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert_eq!(
        CountingBloomFilter::from_bytes(&bad_magic).unwrap_err(),
        CBloomError::Codec(CodecError::InvalidMagic)
    );

    let mut flipped = bytes.clone();
    flipped[HEADER_SIZE + 3] ^= 0x10;
    assert!(matches!(
        CountingBloomFilter::from_bytes(&flipped),
        Err(CBloomError::Codec(CodecError::ChecksumMismatch { .. }))
    ));

    let truncated = &bytes[..bytes.len() - CHECKSUM_SIZE - 1];
    assert!(matches!(
        CountingBloomFilter::from_bytes(truncated),
        Err(CBloomError::Codec(CodecError::BufferTooSmall { .. }))
    ));

    let mut trailing = bytes;
    trailing.push(0);
    assert!(matches!(
        CountingBloomFilter::from_bytes(&trailing),
        Err(CBloomError::Codec(CodecError::CorruptCounters(_)))
    ));
}

#[test]
fn test_raw_layout() {
    let filter = CountingBloomFilter::new(5, 3).unwrap();
    filter.add(12_123_131);
    filter.add(34_123_131);
    filter.add(43_244_234);

    let mut raw = Vec::new();
    filter.write_raw(&mut raw).unwrap();

    assert_eq!(raw.len(), codec::raw_size(5));
    assert_eq!(&raw[..4], &5i32.to_be_bytes());
    // Counters 0..5 hold 1 1 1 3 3, lowest nibble first.
    assert_eq!(&raw[4..], &0x33111u64.to_be_bytes());
}

#[test]
fn test_raw_roundtrip() {
    let filter = populated();
    let mut raw = Vec::new();
    filter.write_raw(&mut raw).unwrap();

    let restored =
        CountingBloomFilter::read_raw_with_config(&mut Cursor::new(raw), 5, *filter.config()).unwrap();
    assert_same(&restored, &filter);
    assert_eq!(restored.offsets(7), filter.offsets(7));
}

#[test]
fn test_raw_saturated_roundtrip() {
    let filter = saturated();
    let mut raw = Vec::new();
    filter.write_raw(&mut raw).unwrap();

    let restored = CountingBloomFilter::read_raw(&mut raw.as_slice(), 2).unwrap();
    assert_same(&restored, &filter);
}

#[test]
fn test_raw_rejects_bad_input() {
    let filter = populated();
    let mut raw = Vec::new();
    filter.write_raw(&mut raw).unwrap();

    raw.truncate(raw.len() - 3);
    assert_eq!(
        CountingBloomFilter::read_raw(&mut raw.as_slice(), 5).unwrap_err(),
        CBloomError::Codec(CodecError::Truncated)
    );

    let negative = (-1i32).to_be_bytes();
    assert!(matches!(
        CountingBloomFilter::read_raw(&mut negative.as_slice(), 5),
        Err(CBloomError::Codec(CodecError::CorruptCounters(_)))
    ));

    // Counters above the reader's saturation limit cannot come from this config.
    let full = saturated();
    let mut raw = Vec::new();
    full.write_raw(&mut raw).unwrap();
    let strict = FilterConfig::new().with_max_count(3);
    assert!(matches!(
        CountingBloomFilter::read_raw_with_config(&mut raw.as_slice(), 2, strict),
        Err(CBloomError::Codec(CodecError::CorruptCounters(_)))
    ));
}

#[test]
fn test_raw_large_declared_size_needs_data() {
    let header_only = i32::MAX.to_be_bytes();
    assert_eq!(
        CountingBloomFilter::read_raw(&mut header_only.as_slice(), 5).unwrap_err(),
        CBloomError::Codec(CodecError::Truncated)
    );
}

#[test]
fn test_framed_rejects_oversized_header_fields() {
    let bytes = populated().to_bytes();
    let body = bytes.len() - CHECKSUM_SIZE;
    let reseal = |mut frame: Vec<u8>| {
        let checksum = xxhash_rust::xxh3::xxh3_64(&frame[..body]);
        frame[body..].copy_from_slice(&checksum.to_le_bytes());
        frame
    };

    let mut stripes = bytes.clone();
    stripes[22..26].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        CountingBloomFilter::from_bytes(&reseal(stripes)),
        Err(CBloomError::Codec(CodecError::CorruptCounters(_)))
    ));

    let mut hashes = bytes;
    hashes[14..18].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        CountingBloomFilter::from_bytes(&reseal(hashes)),
        Err(CBloomError::Codec(CodecError::CorruptCounters(_)))
    ));
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_roundtrip() {
    let filter = populated();

    let bytes = bincode::serialize(&filter).unwrap();
    let restored: CountingBloomFilter = bincode::deserialize(&bytes).unwrap();
    assert_same(&restored, &filter);

    let json = serde_json::to_string(&saturated()).unwrap();
    let restored: CountingBloomFilter = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.saturated_counter_count(), 40);
}
