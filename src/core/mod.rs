//! Core building blocks shared by the filters.
//!
//! # Module Organization
//!
//! ```text
//! core/
//! ├── counters.rs  - CounterBank: packed 4-bit saturating counters
//! ├── params.rs    - Sizing formulas and theoretical statistics
//! └── mod.rs       - This file (public API)
//! ```
//!
//! Nothing here locks. [`CounterBank`] is safe to share between threads on
//! its own (every mutation is a word-level compare-and-swap); the counting
//! filter layers its stripe protocol on top.

#![allow(clippy::module_name_repetitions)]

pub mod counters;
pub mod params;

pub use counters::{CounterBank, COUNTERS_PER_WORD, COUNTER_BITS, MAX_COUNTER_VALUE};
pub use params::{
    bit_zero_probability, bits_per_element, dimensions_for, false_positive_probability,
    hash_count_for, size_for_capacity, MAX_FILTER_SIZE, MAX_HASH_COUNT,
};
