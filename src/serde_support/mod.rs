//! Serde support (feature `serde`).
//!
//! ```toml
//! [dependencies]
//! cbloom = { version = "0.1", features = ["serde"] }
//! ```
//!
//! [`CountingBloomFilter`](crate::CountingBloomFilter) and
//! [`FilterConfig`](crate::FilterConfig) implement `Serialize` and
//! `Deserialize`, so any serde format works. For a compact, checksummed
//! binary form without serde, see [`codec`](crate::codec).
//!
//! # Examples
//!
//! ```
//! use cbloom::CountingBloomFilter;
//!
//! let filter = CountingBloomFilter::with_capacity(1000, 0.01)?;
//! filter.add(42);
//!
//! let bytes = bincode::serialize(&filter).unwrap();
//! let restored: CountingBloomFilter = bincode::deserialize(&bytes).unwrap();
//! assert!(restored.contains(42));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

pub mod counting;

/// Version written into every serde representation.
pub const SERIALIZATION_VERSION: u16 = 1;
