//! Hashing and offset generation.
//!
//! # Module Structure
//!
//! ```text
//! hash/
//! ├── murmur.rs   - 32-bit multiply-xor-shift mixing hash
//! ├── offsets.rs  - OffsetGenerator: key -> k positions in [0, m)
//! └── mod.rs      - This file (public API)
//! ```
//!
//! Both filter types in this crate draw their positions from
//! [`OffsetGenerator`]; it is the only thing they share.
//!
//! # Examples
//!
//! ```
//! use cbloom::hash::OffsetGenerator;
//!
//! let generator = OffsetGenerator::with_seed(42);
//! let positions = generator.offsets(0xDEAD_BEEF, 7, 1000);
//!
//! assert_eq!(positions.len(), 7);
//! assert!(positions.iter().all(|&p| p < 1000));
//! ```

pub mod murmur;
pub mod offsets;

pub use murmur::murmur2_32;
pub use offsets::{OffsetGenerator, DEFAULT_SEED};
