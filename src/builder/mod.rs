//! Builder pattern for filter construction.
//!
//! Builders use the type-state pattern so a filter cannot be built before
//! its dimensions are known; missing required parameters are compile-time
//! errors, out-of-range values are runtime errors from `build()`.
//!
//! # Examples
//!
//! ```
//! use cbloom::builder::CountingBloomFilterBuilder;
//!
//! let filter = CountingBloomFilterBuilder::new()
//!     .expected_items(10_000)
//!     .false_positive_rate(0.01)
//!     .build()?;
//!
//! filter.add(1);
//! assert!(filter.contains(1));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```
//!
//! ```compile_fail
//! use cbloom::builder::CountingBloomFilterBuilder;
//!
//! // No false positive rate: `build` is not available yet.
//! let filter = CountingBloomFilterBuilder::new()
//!     .expected_items(10_000)
//!     .build();
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod counting;

pub use counting::{CountingBloomFilterBuilder, CountingFilterMetadata};
