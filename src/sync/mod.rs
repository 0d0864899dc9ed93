//! Synchronization primitives for the counting filter.
//!
//! # Module Organization
//!
//! - [`StripeLock`] - `S` cache-line padded locks; position `o` is guarded by stripe `o mod S`
//! - [`StripeCursor`] - walks one operation's positions, reusing the held stripe when it can
//!
//! # Concurrency Model
//!
//! Mutations of a counter happen while its stripe is held, so two operations
//! never interleave changes on the same stripe. Reads do not lock: the
//! counter bank is made of atomic words and readers see either the old or
//! the new value of any counter.
//!
//! There is no atomicity across the `k` positions of one key. A reader
//! running alongside `add` may observe the key partially inserted.
//!
//! # Examples
//!
//! ```
//! use cbloom::sync::StripeLock;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let stripes = Arc::new(StripeLock::new(16)?);
//!
//! let handles: Vec<_> = (0..4).map(|t| {
//!     let stripes = Arc::clone(&stripes);
//!     thread::spawn(move || {
//!         for offset in 0..100 {
//!             stripes.with_stripe(offset * 4 + t, || {});
//!         }
//!     })
//! }).collect();
//!
//! for h in handles { h.join().unwrap(); }
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

pub mod stripe;

#[cfg(feature = "metrics")]
pub use stripe::StripeStats;
pub use stripe::{
    AllStripesGuard, StripeCursor, StripeGuard, StripeLock, DEFAULT_STRIPE_COUNT, MAX_STRIPE_COUNT,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safety_markers() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StripeLock>();
    }
}
