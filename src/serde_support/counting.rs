//! Serde support for [`CountingBloomFilter`].
//!
//! The filter is serialized through a versioned representation holding its
//! dimensions, configuration and packed counter words. Deserialization
//! validates all of it and rebuilds the bank bit-for-bit; stripes and
//! saturation statistics start fresh.
//!
//! # Examples
//!
//! ```
//! use cbloom::CountingBloomFilter;
//!
//! let filter = CountingBloomFilter::new(1000, 4)?;
//! filter.add(7);
//! filter.add(7);
//!
//! let json = serde_json::to_string(&filter).unwrap();
//! let restored: CountingBloomFilter = serde_json::from_str(&json).unwrap();
//!
//! assert_eq!(restored.approximate_count(7), 2);
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

use super::SERIALIZATION_VERSION;
use crate::config::FilterConfig;
use crate::core::counters::CounterBank;
use crate::core::params;
use crate::filters::counting::CountingBloomFilter;
use serde::{Deserialize, Serialize};

/// Serializable representation of a counting filter.
#[derive(Serialize, Deserialize)]
struct CountingBloomFilterSerde {
    /// Format version.
    version: u16,
    /// Counters (m).
    m: usize,
    /// Positions per key (k).
    k: usize,
    /// Seed, stripe count and saturation limit.
    config: FilterConfig,
    /// Packed counter words, 16 counters each.
    words: Vec<u64>,
}

impl CountingBloomFilterSerde {
    fn from_filter(filter: &CountingBloomFilter) -> Self {
        Self {
            version: SERIALIZATION_VERSION,
            m: filter.m(),
            k: filter.k(),
            config: *filter.config(),
            words: filter.counters().words(),
        }
    }

    fn into_filter(self) -> crate::Result<CountingBloomFilter> {
        if self.version != SERIALIZATION_VERSION {
            return Err(crate::CodecError::UnsupportedVersion(self.version).into());
        }
        params::validate_dimensions(self.m, self.k)?;
        self.config.validate()?;
        let counters = CounterBank::from_words(self.m, self.words, self.config.max_count)?;
        CountingBloomFilter::from_parts(counters, self.k, self.config)
    }
}

impl Serialize for CountingBloomFilter {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        CountingBloomFilterSerde::from_filter(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CountingBloomFilter {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        CountingBloomFilterSerde::deserialize(deserializer)?
            .into_filter()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CountingBloomFilter {
        let config = FilterConfig::new().with_seed(3).with_stripe_count(8).with_max_count(12);
        let filter = CountingBloomFilter::with_config(500, 4, config).unwrap();
        for key in 0..50 {
            filter.add(key);
        }
        filter.add(0);
        filter
    }

    #[test]
    fn test_bincode_roundtrip() {
        let filter = sample();
        let bytes = bincode::serialize(&filter).unwrap();
        let restored: CountingBloomFilter = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored.m(), filter.m());
        assert_eq!(restored.k(), filter.k());
        assert_eq!(restored.config(), filter.config());
        assert_eq!(restored.counters().words(), filter.counters().words());
        assert_eq!(restored.approximate_count(0), filter.approximate_count(0));
    }

    #[test]
    fn test_json_roundtrip() {
        let filter = sample();
        let json = serde_json::to_string(&filter).unwrap();
        assert!(json.contains("\"version\":1"));

        let restored: CountingBloomFilter = serde_json::from_str(&json).unwrap();
        for key in 0..50 {
            assert!(restored.contains(key));
        }
    }

    #[test]
    fn test_saturated_filter_roundtrip() {
        let filter = CountingBloomFilter::new(16, 1).unwrap();
        for _ in 0..16 {
            for i in 0..16 {
                filter.counters().increment(i);
            }
        }
        assert_eq!(filter.counters().words(), vec![u64::MAX]);

        let bytes = bincode::serialize(&filter).unwrap();
        let restored: CountingBloomFilter = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.counters().words(), vec![u64::MAX]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut value = serde_json::to_value(&sample()).unwrap();
        value["version"] = serde_json::json!(99);
        let result: Result<CountingBloomFilter, _> = serde_json::from_value(value);
        assert!(result.unwrap_err().to_string().contains("version"));
    }

    #[test]
    fn test_rejects_corrupt_counters() {
        let mut value = serde_json::to_value(&sample()).unwrap();
        value["words"] = serde_json::json!([0]);
        let result: Result<CountingBloomFilter, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_k() {
        let mut value = serde_json::to_value(&sample()).unwrap();
        value["k"] = serde_json::json!(0);
        let result: Result<CountingBloomFilter, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_oversized_dimensions() {
        let mut value = serde_json::to_value(&sample()).unwrap();
        value["config"]["stripe_count"] = serde_json::json!(u32::MAX);
        let result: Result<CountingBloomFilter, _> = serde_json::from_value(value);
        assert!(result.unwrap_err().to_string().contains("stripe count"));

        let mut value = serde_json::to_value(&sample()).unwrap();
        value["k"] = serde_json::json!(u64::from(u32::MAX) + 2);
        let result: Result<CountingBloomFilter, _> = serde_json::from_value(value);
        assert!(result.unwrap_err().to_string().contains("hash count"));
    }
}
