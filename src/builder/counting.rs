//! Builder for counting Bloom filters.
//!
//! # Type-State Pattern
//!
//! ```text
//! Initial ──.expected_items()──► WithItems ──.false_positive_rate()──► Complete ──.build()──► CountingBloomFilter
//!    │                                                                    ▲
//!    └──────────────────────────.dimensions(m, k)─────────────────────────┘
//! ```
//!
//! `seed`, `stripe_count` and `max_count` are optional and can be set in
//! any state.
//!
//! # Examples
//!
//! ## Sized by Capacity
//!
//! ```
//! use cbloom::builder::CountingBloomFilterBuilder;
//!
//! let filter = CountingBloomFilterBuilder::new()
//!     .expected_items(10_000)
//!     .false_positive_rate(0.01)
//!     .stripe_count(64)
//!     .build()?;
//!
//! assert_eq!(filter.stripe_count(), 64);
//! # Ok::<(), cbloom::CBloomError>(())
//! ```
//!
//! ## Explicit Dimensions
//!
//! ```
//! use cbloom::builder::CountingBloomFilterBuilder;
//!
//! let filter = CountingBloomFilterBuilder::new()
//!     .dimensions(5, 3)
//!     .seed(1234)
//!     .max_count(7)
//!     .build()?;
//!
//! assert_eq!((filter.m(), filter.k(), filter.max_count()), (5, 3, 7));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

use crate::config::FilterConfig;
use crate::core::params;
use crate::error::{CBloomError, Result};
use crate::filters::counting::CountingBloomFilter;
use std::marker::PhantomData;

/// Type-state marker: Initial state.
pub struct Initial;

/// Type-state marker: Items count is set.
pub struct WithItems;

/// Type-state marker: Dimensions are fully determined.
pub struct Complete;

/// Builder for [`CountingBloomFilter`] with type-state guarantees.
pub struct CountingBloomFilterBuilder<State> {
    expected_items: Option<usize>,
    fp_rate: Option<f64>,
    dimensions: Option<(usize, usize)>,
    config: FilterConfig,
    _state: PhantomData<State>,
}

/// Derived parameters reported by [`CountingBloomFilterBuilder::build_with_metadata`].
#[derive(Debug, Clone, PartialEq)]
pub struct CountingFilterMetadata {
    /// Counters (m).
    pub counters: usize,
    /// Positions per key (k).
    pub hash_count: usize,
    /// Packed counter bytes.
    pub counter_bytes: usize,
    /// Expected false positive rate at capacity, when sized by capacity.
    pub expected_fp_rate: Option<f64>,
}

impl CountingBloomFilterBuilder<Initial> {
    /// Create a new builder with a default [`FilterConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected_items: None,
            fp_rate: None,
            dimensions: None,
            config: FilterConfig::default(),
            _state: PhantomData,
        }
    }

    /// Set the expected number of distinct keys.
    ///
    /// Transitions to `WithItems`.
    #[must_use]
    pub fn expected_items(self, items: usize) -> CountingBloomFilterBuilder<WithItems> {
        CountingBloomFilterBuilder {
            expected_items: Some(items),
            fp_rate: None,
            dimensions: None,
            config: self.config,
            _state: PhantomData,
        }
    }

    /// Set `m` and `k` directly, skipping capacity-based sizing.
    ///
    /// Transitions to `Complete`.
    #[must_use]
    pub fn dimensions(self, m: usize, k: usize) -> CountingBloomFilterBuilder<Complete> {
        CountingBloomFilterBuilder {
            expected_items: None,
            fp_rate: None,
            dimensions: Some((m, k)),
            config: self.config,
            _state: PhantomData,
        }
    }
}

impl Default for CountingBloomFilterBuilder<Initial> {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingBloomFilterBuilder<WithItems> {
    /// Set the target false positive rate, in (0, 1).
    ///
    /// Transitions to `Complete`.
    #[must_use]
    pub fn false_positive_rate(self, fp_rate: f64) -> CountingBloomFilterBuilder<Complete> {
        CountingBloomFilterBuilder {
            expected_items: self.expected_items,
            fp_rate: Some(fp_rate),
            dimensions: None,
            config: self.config,
            _state: PhantomData,
        }
    }
}

impl<State> CountingBloomFilterBuilder<State> {
    /// Set the offset generator seed (optional).
    #[must_use]
    pub fn seed(mut self, seed: u32) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the number of lock stripes (optional, at least 1).
    #[must_use]
    pub fn stripe_count(mut self, stripe_count: usize) -> Self {
        self.config.stripe_count = stripe_count;
        self
    }

    /// Set the counter saturation limit (optional, 1 to 15).
    #[must_use]
    pub fn max_count(mut self, max_count: u8) -> Self {
        self.config.max_count = max_count;
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }
}

impl CountingBloomFilterBuilder<Complete> {
    /// Build the filter.
    ///
    /// # Errors
    ///
    /// Any sizing or configuration error [`CountingBloomFilter::with_config`]
    /// and [`CountingBloomFilter::with_capacity_and_config`] report.
    pub fn build(self) -> Result<CountingBloomFilter> {
        self.build_with_metadata().map(|(filter, _)| filter)
    }

    /// Build the filter and report its derived parameters.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub fn build_with_metadata(self) -> Result<(CountingBloomFilter, CountingFilterMetadata)> {
        let (m, k, expected_fp_rate) = match (self.dimensions, self.expected_items, self.fp_rate) {
            (Some((m, k)), _, _) => (m, k, None),
            (None, Some(items), Some(fp_rate)) => {
                let (m, k) = params::dimensions_for(items, fp_rate)?;
                (m, k, Some(params::false_positive_probability(m, k, items)))
            }
            _ => {
                return Err(CBloomError::invalid_parameters(
                    "builder reached completion without dimensions",
                ))
            }
        };

        let filter = CountingBloomFilter::with_config(m, k, self.config)?;
        let metadata = CountingFilterMetadata {
            counters: m,
            hash_count: k,
            counter_bytes: filter.counters().memory_usage(),
            expected_fp_rate,
        };
        Ok((filter, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_by_capacity() {
        let filter = CountingBloomFilterBuilder::new()
            .expected_items(1000)
            .false_positive_rate(0.01)
            .build()
            .unwrap();
        assert_eq!(filter.m(), 9586);
        assert_eq!(filter.k(), 7);
        assert_eq!(filter.config(), &FilterConfig::default());
    }

    #[test]
    fn test_builder_by_dimensions() {
        let filter = CountingBloomFilterBuilder::new()
            .dimensions(5, 3)
            .build()
            .unwrap();
        assert_eq!(filter.m(), 5);
        assert_eq!(filter.k(), 3);
    }

    #[test]
    fn test_optional_settings_any_state() {
        let filter = CountingBloomFilterBuilder::new()
            .seed(9)
            .expected_items(100)
            .stripe_count(2)
            .false_positive_rate(0.05)
            .max_count(4)
            .build()
            .unwrap();
        assert_eq!(filter.seed(), 9);
        assert_eq!(filter.stripe_count(), 2);
        assert_eq!(filter.max_count(), 4);
    }

    #[test]
    fn test_builder_validation() {
        assert!(CountingBloomFilterBuilder::new()
            .expected_items(0)
            .false_positive_rate(0.01)
            .build()
            .is_err());
        assert!(CountingBloomFilterBuilder::new()
            .expected_items(100)
            .false_positive_rate(1.5)
            .build()
            .is_err());
        assert!(matches!(
            CountingBloomFilterBuilder::new().dimensions(10, 2).stripe_count(0).build(),
            Err(CBloomError::InvalidStripeCount { .. })
        ));
        assert!(matches!(
            CountingBloomFilterBuilder::new().dimensions(10, 2).max_count(0).build(),
            Err(CBloomError::InvalidMaxCount { .. })
        ));
    }

    #[test]
    fn test_build_with_metadata() {
        let (filter, metadata) = CountingBloomFilterBuilder::new()
            .expected_items(1000)
            .false_positive_rate(0.01)
            .build_with_metadata()
            .unwrap();
        assert_eq!(metadata.counters, filter.m());
        assert_eq!(metadata.hash_count, filter.k());
        assert_eq!(metadata.counter_bytes, 600 * 8);
        let fp = metadata.expected_fp_rate.unwrap();
        assert!((fp - 0.01).abs() < 0.001);

        let (_, metadata) = CountingBloomFilterBuilder::new()
            .dimensions(100, 3)
            .build_with_metadata()
            .unwrap();
        assert_eq!(metadata.expected_fp_rate, None);
    }
}
