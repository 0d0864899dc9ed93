//! Per-filter configuration.
//!
//! Everything that tunes a filter beyond its dimensions lives in
//! [`FilterConfig`]. Filters own their config; two filters in one process
//! can use different seeds, stripe counts and saturation limits.
//!
//! | Field          | Default      | Accepted    |
//! |----------------|--------------|-------------|
//! | `seed`         | `89478583`   | any `u32`   |
//! | `stripe_count` | `16`         | `1..=65536` |
//! | `max_count`    | `15`         | `1..=15`    |
//!
//! # Examples
//!
//! ```
//! use cbloom::FilterConfig;
//!
//! let config = FilterConfig::default()
//!     .with_stripe_count(64)
//!     .with_max_count(7);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.seed, 89_478_583);
//! ```

use crate::core::counters::MAX_COUNTER_VALUE;
use crate::error::{CBloomError, Result};
use crate::hash::DEFAULT_SEED;
use crate::sync::{DEFAULT_STRIPE_COUNT, MAX_STRIPE_COUNT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning knobs for a counting filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConfig {
    /// Seed for the offset generator. Filters only agree on positions when
    /// their seeds match.
    pub seed: u32,

    /// Number of lock stripes.
    pub stripe_count: usize,

    /// Counter saturation limit.
    pub max_count: u8,
}

impl FilterConfig {
    /// Config with every field at its default.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            stripe_count: DEFAULT_STRIPE_COUNT,
            max_count: MAX_COUNTER_VALUE,
        }
    }

    /// Replace the hash seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the stripe count.
    #[must_use]
    pub const fn with_stripe_count(mut self, stripe_count: usize) -> Self {
        self.stripe_count = stripe_count;
        self
    }

    /// Replace the saturation limit.
    #[must_use]
    pub const fn with_max_count(mut self, max_count: u8) -> Self {
        self.max_count = max_count;
        self
    }

    /// Check every field against its accepted range.
    ///
    /// # Errors
    ///
    /// - [`CBloomError::InvalidStripeCount`] unless `stripe_count` is in `1..=MAX_STRIPE_COUNT`
    /// - [`CBloomError::InvalidMaxCount`] unless `max_count` is in `1..=15`
    pub fn validate(&self) -> Result<()> {
        if self.stripe_count == 0 || self.stripe_count > MAX_STRIPE_COUNT {
            return Err(CBloomError::invalid_stripe_count(
                self.stripe_count,
                MAX_STRIPE_COUNT,
            ));
        }
        if self.max_count == 0 || self.max_count > MAX_COUNTER_VALUE {
            return Err(CBloomError::invalid_max_count(self.max_count));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new()
    }
}
