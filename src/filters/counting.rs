//! Striped counting Bloom filter over 64-bit keys.
//!
//! A counting Bloom filter replaces each bit of a standard Bloom filter with
//! a small counter, so keys can be removed as well as added:
//! - Add: increment the `k` counters a key maps to
//! - Remove: decrement them
//! - Query: a key may be present iff all `k` counters are non-zero
//!
//! # Layout
//!
//! ```text
//! key ──► OffsetGenerator ──► [o₁, o₂, …, o_k]
//!                                 │
//!             stripe = o mod S ◄──┘
//!                                 ▼
//!         CounterBank: m × 4-bit counters, 16 per AtomicU64
//! ```
//!
//! # Concurrency
//!
//! All methods take `&self`; share the filter through an `Arc`.
//!
//! | Operation             | Locks                                   |
//! |-----------------------|-----------------------------------------|
//! | `add()` / `remove()`  | owning stripe of each offset, one at a time |
//! | `contains()`          | none                                    |
//! | `approximate_count()` | none                                    |
//! | `clear()`             | every stripe, ascending                 |
//!
//! The filter is weakly consistent. There is no atomicity across a key's
//! `k` counters: a `contains` running alongside an `add` of the same key may
//! see some counters raised and others not, and report the key absent.
//! Once `add` has returned, every later `contains` on any thread sees it.
//!
//! `remove` checks membership before it takes any stripe, and nothing holds
//! the key between that check and the decrements. If another thread adds the
//! same key inside that window, the removal consumes the fresh increments:
//! with one earlier copy present, `remove` and the racing `add` both return
//! and one copy is left, which is the expected net result. With no earlier
//! copy, `remove` may see the key only partly added and return `false`, or
//! see it fully added and take it back out, so the caller of `add` can later
//! find its key absent. Callers that need add-then-remove ordering for a key
//! must serialize those calls themselves.
//!
//! Another thread can also remove an overlapping key inside the same window,
//! in which case some counters may already be zero and are left there.
//! Removing a key that was never added, if it tests positive, decrements
//! counters that belong to other keys and can introduce false negatives for
//! them.
//!
//! # Saturation
//!
//! Counters stop at `max_count` (15 by default). Further increments are
//! dropped and counted by [`saturation_events`](CountingBloomFilter::saturation_events).
//! A saturated counter under-reports how many keys share it, so removing
//! those keys later can bring it to zero early.
//!
//! # Examples
//!
//! ```
//! use cbloom::CountingBloomFilter;
//!
//! let filter = CountingBloomFilter::with_capacity(10_000, 0.01)?;
//!
//! filter.add(42);
//! filter.add(42);
//! assert!(filter.contains(42));
//! assert_eq!(filter.approximate_count(42), 2);
//!
//! assert!(filter.remove(42));
//! assert!(filter.remove(42));
//! assert!(!filter.contains(42));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```
//!
//! # References
//!
//! - Fan, L., Cao, P., Almeida, J., & Broder, A. Z. (2000). "Summary cache: a scalable
//!   wide-area web cache sharing protocol". IEEE/ACM Transactions on Networking.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

use crate::codec;
use crate::config::FilterConfig;
use crate::core::counters::CounterBank;
use crate::core::params;
use crate::error::Result;
use crate::hash::OffsetGenerator;
use crate::sync::StripeLock;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Counting Bloom filter for `u64` keys with striped writers.
///
/// See the [module documentation](self) for the consistency model.
pub struct CountingBloomFilter {
    /// Packed saturating counters.
    counters: CounterBank,

    /// One lock per stripe of counter positions.
    stripes: StripeLock,

    /// Key to position mapping.
    offsets: OffsetGenerator,

    /// Positions per key.
    k: usize,

    config: FilterConfig,

    /// Increments dropped because the counter was saturated.
    saturation_events: AtomicU64,

    /// Set once the first saturation has been logged.
    saturation_logged: AtomicBool,
}

impl CountingBloomFilter {
    /// Create a filter with `m` counters and `k` positions per key, using the
    /// default [`FilterConfig`].
    ///
    /// # Errors
    ///
    /// - [`CBloomError::InvalidFilterSize`](crate::CBloomError::InvalidFilterSize) if `m` is 0 or above `i32::MAX`
    /// - [`CBloomError::InvalidHashCount`](crate::CBloomError::InvalidHashCount) if `k == 0`
    ///
    /// # Examples
    ///
    /// ```
    /// use cbloom::CountingBloomFilter;
    ///
    /// let filter = CountingBloomFilter::new(5, 3)?;
    /// assert_eq!(filter.m(), 5);
    /// assert_eq!(filter.k(), 3);
    /// # Ok::<(), cbloom::CBloomError>(())
    /// ```
    pub fn new(m: usize, k: usize) -> Result<Self> {
        Self::with_config(m, k, FilterConfig::default())
    }

    /// Create a filter sized for `expected_items` keys at `fp_rate`.
    ///
    /// `m = ⌈-n ln p / (ln 2)²⌉`, `k = ⌈ln 2 × m / n⌉`.
    ///
    /// # Errors
    ///
    /// - [`CBloomError::InvalidItemCount`](crate::CBloomError::InvalidItemCount) if `expected_items == 0`
    /// - [`CBloomError::FalsePositiveRateOutOfBounds`](crate::CBloomError::FalsePositiveRateOutOfBounds) unless `fp_rate` is in (0, 1)
    /// - [`CBloomError::InvalidFilterSize`](crate::CBloomError::InvalidFilterSize) if the computed `m` exceeds `i32::MAX`
    ///
    /// # Examples
    ///
    /// ```
    /// use cbloom::CountingBloomFilter;
    ///
    /// let filter = CountingBloomFilter::with_capacity(1000, 0.01)?;
    /// assert_eq!((filter.m(), filter.k()), (9586, 7));
    /// # Ok::<(), cbloom::CBloomError>(())
    /// ```
    pub fn with_capacity(expected_items: usize, fp_rate: f64) -> Result<Self> {
        Self::with_capacity_and_config(expected_items, fp_rate, FilterConfig::default())
    }

    /// Create a filter with explicit dimensions and config.
    ///
    /// # Errors
    ///
    /// Everything [`new`](Self::new) rejects, plus an invalid `config`
    /// (see [`FilterConfig::validate`]).
    pub fn with_config(m: usize, k: usize, config: FilterConfig) -> Result<Self> {
        params::validate_dimensions(m, k)?;
        config.validate()?;

        let counters = CounterBank::new(m, config.max_count)?;
        let filter = Self::from_parts(counters, k, config)?;

        debug!(
            m,
            k,
            stripes = config.stripe_count,
            max_count = config.max_count,
            seed = config.seed,
            "created counting filter"
        );
        Ok(filter)
    }

    /// Create a filter sized for `expected_items` at `fp_rate` with a config.
    ///
    /// # Errors
    ///
    /// Everything [`with_capacity`](Self::with_capacity) and
    /// [`with_config`](Self::with_config) reject.
    pub fn with_capacity_and_config(
        expected_items: usize,
        fp_rate: f64,
        config: FilterConfig,
    ) -> Result<Self> {
        let (m, k) = params::dimensions_for(expected_items, fp_rate)?;
        debug!(expected_items, fp_rate, m, k, "sized counting filter");
        Self::with_config(m, k, config)
    }

    /// Assemble a filter around an existing counter bank.
    pub(crate) fn from_parts(counters: CounterBank, k: usize, config: FilterConfig) -> Result<Self> {
        params::validate_dimensions(counters.len(), k)?;
        config.validate()?;
        if counters.max_count() != config.max_count {
            return Err(crate::CBloomError::invalid_parameters(format!(
                "counter limit {} does not match configured max_count {}",
                counters.max_count(),
                config.max_count
            )));
        }

        Ok(Self {
            counters,
            stripes: StripeLock::new(config.stripe_count)?,
            offsets: OffsetGenerator::with_seed(config.seed),
            k,
            config,
            saturation_events: AtomicU64::new(0),
            saturation_logged: AtomicBool::new(false),
        })
    }

    /// Number of counters (m).
    #[must_use]
    #[inline]
    pub fn m(&self) -> usize {
        self.counters.len()
    }

    /// Positions per key (k).
    #[must_use]
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Configuration this filter was built with.
    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Number of lock stripes.
    #[must_use]
    pub fn stripe_count(&self) -> usize {
        self.stripes.stripe_count()
    }

    /// Counter saturation limit.
    #[must_use]
    pub fn max_count(&self) -> u8 {
        self.config.max_count
    }

    /// Offset generator seed.
    #[must_use]
    pub fn seed(&self) -> u32 {
        self.config.seed
    }

    /// Positions `key` maps to, in generation order.
    #[must_use]
    pub fn offsets(&self, key: u64) -> Vec<usize> {
        self.offsets.offsets(key, self.k, self.m())
    }

    /// Add `key`.
    ///
    /// Increments each of the key's counters under its stripe. Never fails;
    /// increments of saturated counters are dropped and counted.
    pub fn add(&self, key: u64) {
        let offsets = self.offsets(key);
        let mut dropped = 0u64;

        {
            let mut cursor = self.stripes.cursor();
            for &offset in &offsets {
                cursor.enter(offset);
                if !self.counters.increment(offset) {
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            self.record_saturation(key, dropped);
        }
        trace!(key, "add");
    }

    /// Remove one occurrence of `key`.
    ///
    /// Returns false, changing nothing, if `key` does not test present.
    /// Otherwise decrements each of its counters under its stripe and
    /// returns true. See the module documentation for the window between
    /// the membership check and the decrements.
    pub fn remove(&self, key: u64) -> bool {
        let offsets = self.offsets(key);
        if !self.all_set(&offsets) {
            trace!(key, "remove skipped, key absent");
            return false;
        }

        let mut cursor = self.stripes.cursor();
        for &offset in &offsets {
            cursor.enter(offset);
            self.counters.decrement(offset);
        }
        drop(cursor);

        trace!(key, "remove");
        true
    }

    /// Test whether `key` may have been added.
    ///
    /// Never a false negative for keys added and not removed; false
    /// positives occur at roughly the configured rate. Takes no locks.
    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.all_set(&self.offsets(key))
    }

    /// Upper estimate of how many times `key` was added: the smallest of
    /// its counters. Takes no locks.
    ///
    /// # Examples
    ///
    /// ```
    /// use cbloom::CountingBloomFilter;
    ///
    /// let filter = CountingBloomFilter::new(1000, 5)?;
    /// for _ in 0..20 {
    ///     filter.add(7);
    /// }
    /// assert_eq!(filter.approximate_count(7), 15);
    /// # Ok::<(), cbloom::CBloomError>(())
    /// ```
    #[must_use]
    pub fn approximate_count(&self, key: u64) -> u32 {
        self.offsets(key)
            .into_iter()
            .map(|offset| u32::from(self.counters.get(offset)))
            .min()
            .unwrap_or(0)
    }

    /// Zero every counter.
    ///
    /// Waits for all in-flight mutations to leave their stripes and blocks
    /// new ones until the bank is cleared.
    pub fn clear(&self) {
        let _all = self.stripes.lock_all();
        self.counters.clear();
        debug!(m = self.m(), "cleared counting filter");
    }

    /// Add every key in `keys`.
    pub fn add_batch(&self, keys: &[u64]) {
        for &key in keys {
            self.add(key);
        }
    }

    /// Remove every key in `keys`, returning how many removals took effect.
    pub fn remove_batch(&self, keys: &[u64]) -> usize {
        keys.iter().filter(|&&key| self.remove(key)).count()
    }

    /// Membership test for each key in `keys`.
    #[must_use]
    pub fn contains_batch(&self, keys: &[u64]) -> Vec<bool> {
        keys.iter().map(|&key| self.contains(key)).collect()
    }

    /// True if every counter is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.count_nonzero() == 0
    }

    /// Number of non-zero counters.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.counters.count_nonzero()
    }

    /// Fraction of non-zero counters.
    #[must_use]
    pub fn fill_rate(&self) -> f64 {
        self.count_nonzero() as f64 / self.m() as f64
    }

    /// Estimate the current false positive rate from the fill rate.
    ///
    /// Infers the number of distinct keys as `n ≈ -(m/k) ln(1 - fill)` and
    /// applies `(1 - e^(-kn/m))^k`.
    #[must_use]
    pub fn estimate_fpr(&self) -> f64 {
        let fill = self.fill_rate();
        if fill == 0.0 {
            return 0.0;
        }
        if fill >= 1.0 {
            return 1.0;
        }

        let m = self.m() as f64;
        let k = self.k as f64;
        let estimated_n = -(m / k) * (1.0 - fill).ln();
        let exponent = -k * estimated_n / m;
        (1.0 - exponent.exp()).powf(k)
    }

    /// Theoretical false positive probability after `n` distinct keys.
    #[must_use]
    pub fn false_positive_probability(&self, n: usize) -> f64 {
        params::false_positive_probability(self.m(), self.k, n)
    }

    /// Counters per key when `n` keys are stored.
    #[must_use]
    pub fn bits_per_element(&self, n: usize) -> f64 {
        params::bits_per_element(self.m(), n)
    }

    /// Probability that a given counter is still zero after `n` distinct keys.
    #[must_use]
    pub fn bit_zero_probability(&self, n: usize) -> f64 {
        params::bit_zero_probability(self.m(), self.k, n)
    }

    /// Increments dropped so far because their counter was saturated.
    #[must_use]
    pub fn saturation_events(&self) -> u64 {
        self.saturation_events.load(Ordering::Relaxed)
    }

    /// Number of counters currently at `max_count`.
    #[must_use]
    pub fn saturated_counter_count(&self) -> usize {
        self.counters.count_saturated()
    }

    /// `histogram[v]` counts counters holding value `v`, for `v` in `0..=max_count`.
    #[must_use]
    pub fn counter_histogram(&self) -> Vec<usize> {
        self.counters.histogram()
    }

    /// Approximate bytes used by the filter, counters and stripes included.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.counters.memory_usage()
            + self.stripes.memory_usage()
    }

    /// Read-only view of the counter bank.
    #[must_use]
    pub fn counters(&self) -> &CounterBank {
        &self.counters
    }

    /// Write the raw dump: `m` as big-endian `i32`, then every packed word as
    /// big-endian `u64`.
    ///
    /// The dump carries neither `k` nor the config.
    ///
    /// # Errors
    ///
    /// [`CodecError::Io`](crate::CodecError::Io) if the writer fails.
    pub fn write_raw<W: Write>(&self, writer: &mut W) -> Result<()> {
        codec::write_raw(self, writer)
    }

    /// Read a raw dump written by [`write_raw`](Self::write_raw), supplying
    /// `k` and using the default config.
    ///
    /// # Errors
    ///
    /// Codec errors for truncated or corrupt input, construction errors for
    /// an invalid `k`.
    pub fn read_raw<R: Read>(reader: &mut R, k: usize) -> Result<Self> {
        codec::read_raw(reader, k, FilterConfig::default())
    }

    /// Like [`read_raw`](Self::read_raw) with an explicit config.
    ///
    /// # Errors
    ///
    /// See [`read_raw`](Self::read_raw).
    pub fn read_raw_with_config<R: Read>(reader: &mut R, k: usize, config: FilterConfig) -> Result<Self> {
        codec::read_raw(reader, k, config)
    }

    /// Serialize into the framed, checksummed format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(self)
    }

    /// Deserialize from the framed format written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// [`CodecError`](crate::CodecError) variants for bad magic, unknown
    /// version, short input, checksum mismatch or corrupt counters.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    fn all_set(&self, offsets: &[usize]) -> bool {
        offsets.iter().all(|&offset| self.counters.is_set(offset))
    }

    fn record_saturation(&self, key: u64, dropped: u64) {
        let total = self.saturation_events.fetch_add(dropped, Ordering::Relaxed) + dropped;
        if !self.saturation_logged.swap(true, Ordering::Relaxed) {
            warn!(
                key,
                max_count = self.config.max_count,
                "counter saturated; further increments at this limit are dropped"
            );
        }
        trace!(key, dropped, total, "saturated increments");
    }
}

impl Clone for CountingBloomFilter {
    /// Deep copy of the counters with a fresh set of stripes.
    fn clone(&self) -> Self {
        Self {
            counters: self.counters.clone(),
            stripes: self.stripes.clone(),
            offsets: self.offsets,
            k: self.k,
            config: self.config,
            saturation_events: AtomicU64::new(self.saturation_events()),
            saturation_logged: AtomicBool::new(self.saturation_logged.load(Ordering::Relaxed)),
        }
    }
}

impl std::fmt::Debug for CountingBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingBloomFilter")
            .field("m", &self.m())
            .field("k", &self.k)
            .field("stripes", &self.stripe_count())
            .field("max_count", &self.config.max_count)
            .field("seed", &self.config.seed)
            .field("nonzero", &self.count_nonzero())
            .finish()
    }
}

/// Every counter value in index order, separated by single spaces.
impl std::fmt::Display for CountingBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.counters.values().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
