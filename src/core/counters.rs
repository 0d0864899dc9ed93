//! Packed 4-bit saturating counters.
//!
//! Sixteen counters share one `AtomicU64`. Counter `i` lives in word
//! `i >> 4` at bit shift `(i & 15) * 4`:
//!
//! ```text
//! word 0: │ c15 │ c14 │ ... │ c1 │ c0 │
//!         63                       3  0
//! ```
//!
//! Every mutation is a compare-and-swap of the whole containing word, so
//! readers never see a torn nibble and two writers touching neighbouring
//! counters in the same word (which belong to different stripes) never lose
//! an update. The bank itself takes no locks; the filter routes mutations
//! through its stripes.
//!
//! Padding nibbles past `len` in the last word are always zero.

#![allow(clippy::cast_possible_truncation)]

use crate::error::{CBloomError, CodecError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Width of one counter in bits.
pub const COUNTER_BITS: usize = 4;

/// Counters packed into one word.
pub const COUNTERS_PER_WORD: usize = 64 / COUNTER_BITS;

/// Largest value a 4-bit counter can represent.
pub const MAX_COUNTER_VALUE: u8 = 15;

const NIBBLE_MASK: u64 = 0xF;

/// Number of words needed for `len` counters.
#[inline]
#[must_use]
pub const fn words_for(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        ((len - 1) >> 4) + 1
    }
}

#[inline]
const fn locate(index: usize) -> (usize, u32) {
    (index >> 4, ((index & 15) * COUNTER_BITS) as u32)
}

/// Fixed-size bank of `len` saturating counters in `[0, max_count]`.
pub struct CounterBank {
    words: Box<[AtomicU64]>,
    len: usize,
    max_count: u8,
}

impl CounterBank {
    /// Create a bank of `len` zeroed counters saturating at `max_count`.
    ///
    /// # Errors
    ///
    /// - [`CBloomError::InvalidFilterSize`] if `len == 0`
    /// - [`CBloomError::InvalidMaxCount`] unless `max_count` is in `1..=15`
    pub fn new(len: usize, max_count: u8) -> Result<Self> {
        if len == 0 {
            return Err(CBloomError::invalid_filter_size(len, usize::MAX));
        }
        validate_max_count(max_count)?;

        let words = (0..words_for(len)).map(|_| AtomicU64::new(0)).collect();
        Ok(Self {
            words,
            len,
            max_count,
        })
    }

    /// Rebuild a bank from packed words.
    ///
    /// # Errors
    ///
    /// [`CodecError::CorruptCounters`] if the word count does not match `len`,
    /// a nibble exceeds `max_count`, or a padding nibble is non-zero. Also
    /// rejects the same parameters as [`new`](Self::new).
    pub fn from_words(len: usize, words: Vec<u64>, max_count: u8) -> Result<Self> {
        if len == 0 {
            return Err(CBloomError::invalid_filter_size(len, usize::MAX));
        }
        validate_max_count(max_count)?;

        let expected = words_for(len);
        if words.len() != expected {
            return Err(CodecError::CorruptCounters(format!(
                "expected {} words for {} counters, found {}",
                expected,
                len,
                words.len()
            ))
            .into());
        }

        for (w, &word) in words.iter().enumerate() {
            for slot in 0..COUNTERS_PER_WORD {
                let value = ((word >> (slot * COUNTER_BITS)) & NIBBLE_MASK) as u8;
                let index = w * COUNTERS_PER_WORD + slot;
                if index >= len && value != 0 {
                    return Err(CodecError::CorruptCounters(format!(
                        "padding counter {} is non-zero",
                        index
                    ))
                    .into());
                }
                if value > max_count {
                    return Err(CodecError::CorruptCounters(format!(
                        "counter {} holds {} above limit {}",
                        index, value, max_count
                    ))
                    .into());
                }
            }
        }

        Ok(Self {
            words: words.into_iter().map(AtomicU64::new).collect(),
            len,
            max_count,
        })
    }

    /// Number of counters (m).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a bank holds at least one counter.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Saturation limit.
    #[inline]
    #[must_use]
    pub fn max_count(&self) -> u8 {
        self.max_count
    }

    /// Number of packed words.
    #[inline]
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Current value of counter `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> u8 {
        assert!(index < self.len, "counter index {} out of range {}", index, self.len);
        let (w, shift) = locate(index);
        ((self.words[w].load(Ordering::Acquire) >> shift) & NIBBLE_MASK) as u8
    }

    /// True if counter `index` is non-zero.
    #[inline]
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        self.get(index) != 0
    }

    /// Add one to counter `index` unless it is saturated.
    ///
    /// Returns false, leaving the counter unchanged, when it already holds
    /// `max_count`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    pub fn increment(&self, index: usize) -> bool {
        assert!(index < self.len, "counter index {} out of range {}", index, self.len);
        let (w, shift) = locate(index);
        let word = &self.words[w];
        let max = u64::from(self.max_count);
        let mut current = word.load(Ordering::Acquire);

        loop {
            let value = (current >> shift) & NIBBLE_MASK;
            if value >= max {
                return false;
            }

            let next = current + (1 << shift);
            match word.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Subtract one from counter `index` unless it is zero.
    ///
    /// Returns false, leaving the counter unchanged, when it already holds 0.
    /// Saturated counters are decremented like any other.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    pub fn decrement(&self, index: usize) -> bool {
        assert!(index < self.len, "counter index {} out of range {}", index, self.len);
        let (w, shift) = locate(index);
        let word = &self.words[w];
        let mut current = word.load(Ordering::Acquire);

        loop {
            if (current >> shift) & NIBBLE_MASK == 0 {
                return false;
            }

            let next = current - (1 << shift);
            match word.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Reset every counter to zero.
    ///
    /// Not atomic across words; callers wanting a consistent reset must
    /// exclude writers first.
    pub fn clear(&self) {
        for word in self.words.iter() {
            word.store(0, Ordering::Release);
        }
    }

    /// Snapshot of the packed words, ascending.
    #[must_use]
    pub fn words(&self) -> Vec<u64> {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire))
            .collect()
    }

    /// Iterate over counter values in index order.
    pub fn values(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Number of non-zero counters.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.words
            .iter()
            .map(|w| {
                let word = w.load(Ordering::Acquire);
                (0..COUNTERS_PER_WORD)
                    .filter(|slot| (word >> (slot * COUNTER_BITS)) & NIBBLE_MASK != 0)
                    .count()
            })
            .sum()
    }

    /// Number of counters holding `max_count`.
    #[must_use]
    pub fn count_saturated(&self) -> usize {
        self.values().filter(|&v| v >= self.max_count).count()
    }

    /// `histogram[v]` is the number of counters holding `v`, for `v` in `0..=max_count`.
    #[must_use]
    pub fn histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; usize::from(self.max_count) + 1];
        for value in self.values() {
            histogram[usize::from(value)] += 1;
        }
        histogram
    }

    /// Largest counter value currently held.
    #[must_use]
    pub fn max_value(&self) -> u8 {
        self.values().max().unwrap_or(0)
    }

    /// Heap bytes held by the packed words.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.words.len() * std::mem::size_of::<AtomicU64>()
    }
}

impl Clone for CounterBank {
    fn clone(&self) -> Self {
        Self {
            words: self.words().into_iter().map(AtomicU64::new).collect(),
            len: self.len,
            max_count: self.max_count,
        }
    }
}

impl PartialEq for CounterBank {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.max_count == other.max_count && self.words() == other.words()
    }
}

impl std::fmt::Debug for CounterBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterBank")
            .field("len", &self.len)
            .field("words", &self.words.len())
            .field("max_count", &self.max_count)
            .field("nonzero", &self.count_nonzero())
            .finish()
    }
}

fn validate_max_count(max_count: u8) -> Result<()> {
    if max_count == 0 || max_count > MAX_COUNTER_VALUE {
        return Err(CBloomError::invalid_max_count(max_count));
    }
    Ok(())
}
