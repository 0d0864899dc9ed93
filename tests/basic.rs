//! Basic tests - the filter works end to end through the public API

use cbloom::prelude::*;
use cbloom::CodecError;
use std::collections::HashSet;

#[test]
fn test_basic_add_and_find() {
    let filter = CountingBloomFilter::with_capacity(100, 0.01).unwrap();

    filter.add(1234);

    assert!(filter.contains(1234), "Should find the key we just added");
}

#[test]
fn test_batch_operations() {
    let filter = CountingBloomFilter::with_capacity(1000, 0.01).unwrap();
    let keys = [11u64, 22, 33, 44];

    filter.add_batch(&keys);
    assert!(filter.contains_batch(&keys).into_iter().all(|hit| hit));

    assert_eq!(filter.remove_batch(&keys), keys.len());
    assert!(filter.is_empty());
}

#[test]
fn test_no_false_negatives() {
    let filter = CountingBloomFilter::with_capacity(1000, 0.01).unwrap();

    for i in 0..1000 {
        filter.add(i);
    }

    // Every added key MUST be found
    for i in 0..1000 {
        assert!(filter.contains(i), "False negative for {}", i);
    }
}

#[test]
fn test_small_filter_trace() {
    let filter = CountingBloomFilter::new(5, 3).unwrap();

    filter.add(12_123_131);
    filter.add(34_123_131);
    filter.add(43_244_234);
    assert_eq!(filter.to_string(), "1 1 1 3 3");

    assert!(filter.remove(43_244_234));
    assert_eq!(filter.to_string(), "0 0 1 3 2");

    assert!(filter.contains(12_123_131));
    assert!(filter.contains(34_123_131));
}

#[test]
fn test_remove_absent_key_is_noop() {
    let filter = CountingBloomFilter::new(1000, 4).unwrap();
    filter.add(1);
    let before = filter.counters().words();

    let absent = (2..).find(|&key| !filter.contains(key)).unwrap();
    assert!(!filter.remove(absent));
    assert_eq!(filter.counters().words(), before);
}

#[test]
fn test_duplicate_adds_need_matching_removes() {
    let filter = CountingBloomFilter::new(1000, 4).unwrap();

    for _ in 0..3 {
        filter.add(77);
    }
    assert_eq!(filter.approximate_count(77), 3);

    assert!(filter.remove(77));
    assert!(filter.remove(77));
    assert!(filter.contains(77));
    assert!(filter.remove(77));
    assert!(!filter.contains(77));
    assert!(!filter.remove(77));
}

#[test]
fn test_saturation_is_counted() {
    let filter = CountingBloomFilter::new(1000, 4).unwrap();

    for _ in 0..20 {
        filter.add(5);
    }

    assert_eq!(filter.approximate_count(5), 15);
    assert!(filter.saturation_events() >= 5 * 4);

    let distinct: HashSet<usize> = filter.offsets(5).into_iter().collect();
    assert_eq!(filter.saturated_counter_count(), distinct.len());
}

#[test]
fn test_clear_resets_counters() {
    let filter = CountingBloomFilter::new(500, 3).unwrap();
    for i in 0..50 {
        filter.add(i);
    }
    assert!(!filter.is_empty());

    filter.clear();

    assert!(filter.is_empty());
    assert_eq!(filter.counter_histogram()[0], 500);
}

#[test]
fn test_builder_matches_direct_construction() {
    let built = CountingBloomFilterBuilder::new()
        .expected_items(1000)
        .false_positive_rate(0.01)
        .build()
        .unwrap();
    let direct = CountingBloomFilter::with_capacity(1000, 0.01).unwrap();

    assert_eq!((built.m(), built.k()), (direct.m(), direct.k()));
    assert_eq!(built.offsets(42), direct.offsets(42));
}

#[test]
fn test_invalid_construction() {
    assert!(matches!(
        CountingBloomFilter::new(0, 3),
        Err(CBloomError::InvalidFilterSize { .. })
    ));
    assert!(matches!(
        CountingBloomFilter::new(10, 0),
        Err(CBloomError::InvalidHashCount { .. })
    ));
    assert!(matches!(
        CountingBloomFilter::with_capacity(0, 0.01),
        Err(CBloomError::InvalidItemCount { .. })
    ));
    assert!(matches!(
        CountingBloomFilter::with_capacity(10, 1.0),
        Err(CBloomError::FalsePositiveRateOutOfBounds { .. })
    ));
}

#[test]
fn test_store_filter_on_memory_store() {
    let filter = StoreBloomFilter::with_capacity(MemoryBitStore::new(), 1000, 0.01).unwrap();

    filter.add(10).unwrap();
    filter.add_to("other", 20).unwrap();

    assert!(filter.contains(10).unwrap());
    assert!(filter.contains_in("other", 20).unwrap());
    assert!(filter.count().unwrap() > 0);
}

#[test]
fn test_errors_are_distinguishable() {
    let err = CountingBloomFilter::from_bytes(b"nope").unwrap_err();
    assert!(matches!(err, CBloomError::Codec(CodecError::BufferTooSmall { .. })));
    assert!(!err.is_construction_error());
}
