//! Membership-only Bloom filter over an external bit store.
//!
//! [`StoreBloomFilter`] keeps no bits of its own. Every bit it sets or
//! reads lives in a [`BitStore`]: a bit-addressable, named storage backend
//! such as a shared key-value server. Several processes pointing at the
//! same store and key see one filter.
//!
//! The filter shares nothing with [`CountingBloomFilter`](super::CountingBloomFilter)
//! except the [`OffsetGenerator`], so a key maps to the same positions in
//! both when `m`, `k` and the seed agree.
//!
//! Store failures surface as [`CBloomError::Store`](crate::CBloomError::Store)
//! and never panic.
//!
//! # Examples
//!
//! ```
//! use cbloom::filters::store::{MemoryBitStore, StoreBloomFilter};
//!
//! let filter = StoreBloomFilter::with_capacity(MemoryBitStore::new(), 10_000, 0.01)?;
//!
//! filter.add(42)?;
//! assert!(filter.contains(42)?);
//! assert!(filter.count()? > 0);
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

use crate::core::params;
use crate::error::{Result, StoreError};
use crate::hash::OffsetGenerator;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Store key used when none is given.
pub const DEFAULT_STORE_KEY: &str = "cbloom:filter";

/// Bit-addressable storage for [`StoreBloomFilter`].
///
/// Each named key holds an independent bit string that grows on demand;
/// unset bits read as false.
pub trait BitStore: Send + Sync {
    /// Set bit `offset` of `key` to `value`, returning its previous value.
    ///
    /// # Errors
    ///
    /// [`StoreError`] if the store cannot be reached or rejects the request.
    fn set_bit(&self, key: &str, offset: usize, value: bool) -> Result<bool>;

    /// Read bit `offset` of `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] if the store cannot be reached or rejects the request.
    fn get_bit(&self, key: &str, offset: usize) -> Result<bool>;

    /// Number of set bits under `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] if the store cannot be reached or rejects the request.
    fn bit_count(&self, key: &str) -> Result<u64>;

    /// Set every bit in `offsets` to true.
    ///
    /// Networked stores should override this to send the writes in one
    /// round trip.
    ///
    /// # Errors
    ///
    /// The first error any single write reports.
    fn set_bits(&self, key: &str, offsets: &[usize]) -> Result<()> {
        for &offset in offsets {
            self.set_bit(key, offset, true)?;
        }
        Ok(())
    }

    /// True if every bit in `offsets` is set.
    ///
    /// # Errors
    ///
    /// The first error any single read reports.
    fn all_bits_set(&self, key: &str, offsets: &[usize]) -> Result<bool> {
        for &offset in offsets {
            if !self.get_bit(key, offset)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<S: BitStore + ?Sized> BitStore for std::sync::Arc<S> {
    fn set_bit(&self, key: &str, offset: usize, value: bool) -> Result<bool> {
        (**self).set_bit(key, offset, value)
    }

    fn get_bit(&self, key: &str, offset: usize) -> Result<bool> {
        (**self).get_bit(key, offset)
    }

    fn bit_count(&self, key: &str) -> Result<u64> {
        (**self).bit_count(key)
    }

    fn set_bits(&self, key: &str, offsets: &[usize]) -> Result<()> {
        (**self).set_bits(key, offsets)
    }

    fn all_bits_set(&self, key: &str, offsets: &[usize]) -> Result<bool> {
        (**self).all_bits_set(key, offsets)
    }
}

/// In-process [`BitStore`] backed by a map of byte strings.
///
/// Bits are addressed most-significant first within each byte, so bit 0 is
/// the high bit of byte 0.
#[derive(Debug)]
pub struct MemoryBitStore {
    keys: RwLock<HashMap<String, Vec<u8>>>,
    max_offset: usize,
}

impl MemoryBitStore {
    /// Largest bit offset accepted by default (2³² - 1).
    pub const DEFAULT_MAX_OFFSET: usize = u32::MAX as usize;

    /// Empty store accepting offsets up to [`DEFAULT_MAX_OFFSET`](Self::DEFAULT_MAX_OFFSET).
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_offset(Self::DEFAULT_MAX_OFFSET)
    }

    /// Empty store rejecting offsets above `max_offset`.
    #[must_use]
    pub fn with_max_offset(max_offset: usize) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            max_offset,
        }
    }

    /// Number of keys holding a bit string.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }

    /// Drop `key` and its bits, returning whether it existed.
    pub fn remove_key(&self, key: &str) -> bool {
        self.keys.write().remove(key).is_some()
    }

    fn check_offset(&self, key: &str, offset: usize) -> Result<()> {
        if offset > self.max_offset {
            return Err(StoreError::OffsetOutOfRange {
                key: key.to_owned(),
                offset,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for MemoryBitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BitStore for MemoryBitStore {
    fn set_bit(&self, key: &str, offset: usize, value: bool) -> Result<bool> {
        self.check_offset(key, offset)?;
        let (byte, mask) = (offset / 8, 0x80u8 >> (offset % 8));

        let mut keys = self.keys.write();
        let bits = keys.entry(key.to_owned()).or_default();
        if bits.len() <= byte {
            bits.resize(byte + 1, 0);
        }

        let previous = bits[byte] & mask != 0;
        if value {
            bits[byte] |= mask;
        } else {
            bits[byte] &= !mask;
        }
        Ok(previous)
    }

    fn get_bit(&self, key: &str, offset: usize) -> Result<bool> {
        self.check_offset(key, offset)?;
        let (byte, mask) = (offset / 8, 0x80u8 >> (offset % 8));

        let keys = self.keys.read();
        Ok(keys
            .get(key)
            .and_then(|bits| bits.get(byte))
            .map_or(false, |b| b & mask != 0))
    }

    fn bit_count(&self, key: &str) -> Result<u64> {
        let keys = self.keys.read();
        Ok(keys
            .get(key)
            .map_or(0, |bits| bits.iter().map(|b| u64::from(b.count_ones())).sum()))
    }
}

/// Bloom filter whose bits live in a [`BitStore`].
pub struct StoreBloomFilter<S: BitStore> {
    store: S,
    default_key: String,
    m: usize,
    k: usize,
    offsets: OffsetGenerator,
}

impl<S: BitStore> StoreBloomFilter<S> {
    /// Filter with `m` bits and `k` positions per key, stored under
    /// [`DEFAULT_STORE_KEY`].
    ///
    /// # Errors
    ///
    /// [`CBloomError::InvalidFilterSize`](crate::CBloomError::InvalidFilterSize) or
    /// [`CBloomError::InvalidHashCount`](crate::CBloomError::InvalidHashCount) for bad dimensions.
    pub fn new(store: S, m: usize, k: usize) -> Result<Self> {
        params::validate_dimensions(m, k)?;
        Ok(Self {
            store,
            default_key: DEFAULT_STORE_KEY.to_owned(),
            m,
            k,
            offsets: OffsetGenerator::new(),
        })
    }

    /// Filter sized for `expected_items` at `fp_rate`.
    ///
    /// # Errors
    ///
    /// Sizing errors from [`params::dimensions_for`].
    pub fn with_capacity(store: S, expected_items: usize, fp_rate: f64) -> Result<Self> {
        let (m, k) = params::dimensions_for(expected_items, fp_rate)?;
        Self::new(store, m, k)
    }

    /// Use `key` instead of [`DEFAULT_STORE_KEY`] for the key-less methods.
    #[must_use]
    pub fn with_default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }

    /// Use a different offset generator seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.offsets = OffsetGenerator::with_seed(seed);
        self
    }

    /// Number of bits (m).
    #[must_use]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Positions per key (k).
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Store key used by [`add`](Self::add), [`contains`](Self::contains) and [`count`](Self::count).
    #[must_use]
    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add `item` under the default store key.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] the store reports.
    pub fn add(&self, item: u64) -> Result<()> {
        self.add_to(&self.default_key, item)
    }

    /// Add `item` under `store_key`.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] the store reports.
    pub fn add_to(&self, store_key: &str, item: u64) -> Result<()> {
        let offsets = self.offsets.offsets(item, self.k, self.m);
        self.store.set_bits(store_key, &offsets)?;
        trace!(store_key, item, "store add");
        Ok(())
    }

    /// Test `item` under the default store key.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] the store reports.
    pub fn contains(&self, item: u64) -> Result<bool> {
        self.contains_in(&self.default_key, item)
    }

    /// Test `item` under `store_key`.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] the store reports.
    pub fn contains_in(&self, store_key: &str, item: u64) -> Result<bool> {
        let offsets = self.offsets.offsets(item, self.k, self.m);
        self.store.all_bits_set(store_key, &offsets)
    }

    /// Set bits under the default store key.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] the store reports.
    pub fn count(&self) -> Result<u64> {
        self.count_in(&self.default_key)
    }

    /// Set bits under `store_key`.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] the store reports.
    pub fn count_in(&self, store_key: &str) -> Result<u64> {
        self.store.bit_count(store_key)
    }

    /// Theoretical false positive probability after `n` distinct keys.
    #[must_use]
    pub fn false_positive_probability(&self, n: usize) -> f64 {
        params::false_positive_probability(self.m, self.k, n)
    }
}

impl<S: BitStore> std::fmt::Debug for StoreBloomFilter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBloomFilter")
            .field("default_key", &self.default_key)
            .field("m", &self.m)
            .field("k", &self.k)
            .field("seed", &self.offsets.seed())
            .finish()
    }
}
