//! cbloom: a striped counting Bloom filter for 64-bit keys.
//!
//! A counting Bloom filter answers "have I seen this key before?" in fixed
//! memory, with no false negatives for keys that were added and not removed,
//! a tunable false positive rate, and support for removal.
//!
//! # Quick Start
//!
//! ```
//! use cbloom::CountingBloomFilter;
//!
//! // 10,000 keys at a 1% false positive rate.
//! let filter = CountingBloomFilter::with_capacity(10_000, 0.01)?;
//!
//! filter.add(1001);
//! filter.add(2002);
//! assert!(filter.contains(1001));
//!
//! assert!(filter.remove(1001));
//! assert!(!filter.contains(1001));
//! assert!(filter.contains(2002));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────── CountingBloomFilter ──────────────────────────┐
//! │                                                                         │
//! │  OffsetGenerator          StripeLock (S stripes)     CounterBank        │
//! │  key ─► k positions ─►    stripe = pos mod S    ─►   m × 4-bit counters │
//! │  (murmur2 + rejection)    (padded mutexes)           (16 per AtomicU64) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`hash`]: the murmur2-based [`OffsetGenerator`](hash::OffsetGenerator)
//! - [`core`]: the packed [`CounterBank`](core::CounterBank) and sizing math
//! - [`sync`]: the [`StripeLock`](sync::StripeLock) protocol
//! - [`filters`]: [`CountingBloomFilter`] and the store-backed [`StoreBloomFilter`](filters::StoreBloomFilter)
//! - [`codec`]: raw and framed persistence
//! - [`builder`]: type-state [`CountingBloomFilterBuilder`]
//!
//! # Concurrency
//!
//! Every operation takes `&self`. Writers lock one stripe at a time; readers
//! take no locks. Share a filter with `Arc`:
//!
//! ```
//! use cbloom::CountingBloomFilter;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let filter = Arc::new(CountingBloomFilter::with_capacity(100_000, 0.01)?);
//!
//! let handles: Vec<_> = (0..4u64).map(|t| {
//!     let filter = Arc::clone(&filter);
//!     thread::spawn(move || {
//!         for i in 0..1000 {
//!             filter.add(t * 1000 + i);
//!         }
//!     })
//! }).collect();
//!
//! for h in handles { h.join().unwrap(); }
//! assert!((0..4000).all(|key| filter.contains(key)));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```
//!
//! The filter is weakly consistent across a key's `k` counters; see
//! [`filters::counting`] for the exact guarantees.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: `debug` for construction, clearing
//! and persistence, `trace` per operation, and one `warn` when a counter
//! first saturates. It installs no subscriber.
//!
//! # Feature Flags
//!
//! | Feature   | Enables                                         |
//! |-----------|-------------------------------------------------|
//! | `serde`   | `Serialize`/`Deserialize` for filters and config |
//! | `metrics` | per-stripe acquisition and wait statistics      |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Packed counters and sizing math
pub mod core;

/// Error types and result aliases
pub mod error;

/// Filter implementations
pub mod filters;

/// Hashing and offset generation
pub mod hash;

/// Stripe locking
pub mod sync;

/// Per-filter configuration
pub mod config;

/// Raw and framed binary persistence
pub mod codec;

/// Type-safe builders
pub mod builder;

/// Serialization support (requires `serde` feature)
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod serde_support;

pub use builder::CountingBloomFilterBuilder;
pub use config::FilterConfig;
pub use error::{CBloomError, CodecError, Result, StoreError};
pub use filters::{BitStore, CountingBloomFilter, MemoryBitStore, StoreBloomFilter};
pub use hash::OffsetGenerator;

/// Prelude module for convenient imports.
///
/// ```
/// use cbloom::prelude::*;
///
/// let filter = CountingBloomFilter::new(1000, 4)?;
/// filter.add(1);
/// assert!(filter.contains(1));
/// # Ok::<(), CBloomError>(())
/// ```
pub mod prelude {
    pub use crate::builder::CountingBloomFilterBuilder;
    pub use crate::config::FilterConfig;
    pub use crate::error::{CBloomError, Result};
    pub use crate::filters::{BitStore, CountingBloomFilter, MemoryBitStore, StoreBloomFilter};
    pub use crate::hash::OffsetGenerator;
}
