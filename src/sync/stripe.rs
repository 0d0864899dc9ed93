//! Striped mutual exclusion over counter positions.
//!
//! # Design
//!
//! A [`StripeLock`] holds `S` independent locks. Counter position `o` belongs
//! to stripe `o mod S`; any mutation of that counter happens while its stripe
//! is held. Operations on positions in different stripes proceed in
//! parallel, and `S = 1` degenerates into a single global lock.
//!
//! ## Locking Protocol
//!
//! | Entry point      | Stripes held at once | Order     |
//! |------------------|----------------------|-----------|
//! | `with_stripe()`  | one                  | n/a       |
//! | `StripeCursor`   | at most one          | n/a       |
//! | `lock_all()`     | all                  | ascending |
//!
//! Since every multi-stripe acquisition goes through `lock_all()` in
//! ascending order and every other path holds at most one stripe, no cycle
//! of waiters can form.
//!
//! ## Reuse Elision
//!
//! An operation touching `k` positions walks them with a [`StripeCursor`].
//! When the next position falls in the stripe the cursor already holds, the
//! held guard is kept instead of being released and re-acquired. A different
//! stripe is only acquired after the current one has been released.
//!
//! ## Metrics
//!
//! With the `metrics` feature each stripe counts acquisitions, elided
//! re-acquisitions, and nanoseconds spent waiting; see
//! [`StripeLock::stripe_stats`].
//!
//! # Examples
//!
//! ```
//! use cbloom::sync::StripeLock;
//!
//! let stripes = StripeLock::new(4)?;
//! assert_eq!(stripes.stripe_of(10), 2);
//!
//! let value = stripes.with_stripe(10, || 7 * 6);
//! assert_eq!(value, 42);
//!
//! let mut cursor = stripes.cursor();
//! cursor.enter(2);
//! cursor.enter(6); // same stripe, guard reused
//! assert_eq!(cursor.held_stripe(), Some(2));
//! # Ok::<(), cbloom::CBloomError>(())
//! ```

use crate::error::{CBloomError, Result};
use parking_lot::{Mutex, MutexGuard};

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Default number of lock stripes.
pub const DEFAULT_STRIPE_COUNT: usize = 16;

/// Largest accepted number of stripes (4 MiB of padded locks).
pub const MAX_STRIPE_COUNT: usize = 1 << 16;

/// Cache-line size for false sharing prevention.
///
/// 64 bytes on x86_64 and most ARM64 parts.
const CACHE_LINE_SIZE: usize = 64;

/// Cache-line aligned mutex, one per stripe.
///
/// ```text
/// Without metrics feature:
/// ┌──────────────────┬──────────────────────────┐
/// │ Mutex (1 byte)   │ Padding (63 bytes)       │ = 64 bytes
/// └──────────────────┴──────────────────────────┘
///
/// With metrics feature:
/// ┌──────────────────┬────────────────────┬────────────────┐
/// │ AtomicU64 × 3    │ Mutex (1 byte)     │ Padding (39)   │ = 64 bytes
/// └──────────────────┴────────────────────┴────────────────┘
/// ```
#[repr(align(64))]
struct PaddedMutex {
    lock: Mutex<()>,

    /// Lock acquisitions (requires `metrics` feature).
    #[cfg(feature = "metrics")]
    acquisitions: AtomicU64,

    /// Acquisitions skipped because the cursor already held this stripe.
    #[cfg(feature = "metrics")]
    elided: AtomicU64,

    /// Nanoseconds spent waiting to acquire (requires `metrics` feature).
    #[cfg(feature = "metrics")]
    wait_ns: AtomicU64,
}

impl PaddedMutex {
    fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            #[cfg(feature = "metrics")]
            acquisitions: AtomicU64::new(0),
            #[cfg(feature = "metrics")]
            elided: AtomicU64::new(0),
            #[cfg(feature = "metrics")]
            wait_ns: AtomicU64::new(0),
        }
    }

    #[inline]
    fn acquire(&self) -> MutexGuard<'_, ()> {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let guard = self.lock.lock();

        #[cfg(feature = "metrics")]
        {
            self.acquisitions.fetch_add(1, AtomicOrdering::Relaxed);
            #[allow(clippy::cast_possible_truncation)]
            self.wait_ns
                .fetch_add(start.elapsed().as_nanos() as u64, AtomicOrdering::Relaxed);
        }

        guard
    }

    #[cfg(feature = "metrics")]
    #[inline]
    fn record_elided(&self) {
        self.elided.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// Per-stripe statistics (requires `metrics` feature).
#[cfg(feature = "metrics")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeStats {
    /// Stripe index in range [0, stripe_count).
    pub stripe_idx: usize,

    /// Times the stripe's lock was actually taken.
    pub acquisitions: u64,

    /// Times a cursor reused its held guard for this stripe.
    pub elided: u64,

    /// Total nanoseconds spent waiting to acquire this stripe.
    pub wait_ns: u64,
}

/// Fixed array of `S` cache-line padded locks guarding positions `o mod S`.
pub struct StripeLock {
    stripes: Box<[PaddedMutex]>,
}

impl StripeLock {
    /// Create `count` stripes.
    ///
    /// # Errors
    ///
    /// [`CBloomError::InvalidStripeCount`] if `count` is 0 or above
    /// [`MAX_STRIPE_COUNT`].
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 || count > MAX_STRIPE_COUNT {
            return Err(CBloomError::invalid_stripe_count(count, MAX_STRIPE_COUNT));
        }
        Ok(Self {
            stripes: (0..count).map(|_| PaddedMutex::new()).collect(),
        })
    }

    /// Number of stripes (S).
    #[inline]
    #[must_use]
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Stripe owning counter position `offset`.
    #[inline]
    #[must_use]
    pub fn stripe_of(&self, offset: usize) -> usize {
        offset % self.stripes.len()
    }

    /// Acquire stripe `stripe` directly.
    ///
    /// # Panics
    ///
    /// Panics if `stripe >= stripe_count()`.
    #[must_use]
    pub fn lock(&self, stripe: usize) -> StripeGuard<'_> {
        StripeGuard {
            stripe,
            _guard: self.stripes[stripe].acquire(),
        }
    }

    /// Run `body` while holding the stripe that owns `offset`.
    ///
    /// The stripe is released when `body` returns or unwinds.
    pub fn with_stripe<R>(&self, offset: usize, body: impl FnOnce() -> R) -> R {
        let _guard = self.lock(self.stripe_of(offset));
        body()
    }

    /// Acquire every stripe in ascending index order.
    ///
    /// Blocks until all in-flight mutations have left their stripes.
    #[must_use]
    pub fn lock_all(&self) -> AllStripesGuard<'_> {
        AllStripesGuard {
            _guards: self.stripes.iter().map(PaddedMutex::acquire).collect(),
        }
    }

    /// Start walking an operation's offsets.
    #[must_use]
    pub fn cursor(&self) -> StripeCursor<'_> {
        StripeCursor {
            stripes: self,
            held: None,
        }
    }

    /// Heap bytes held by the padded stripes.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of_val(&*self.stripes)
    }

    /// True if `stripe` is currently held by anyone.
    ///
    /// A snapshot; the answer may be stale by the time it is read.
    #[must_use]
    pub fn is_locked(&self, stripe: usize) -> bool {
        self.stripes[stripe].lock.is_locked()
    }

    /// Statistics for every stripe (requires `metrics` feature).
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn stripe_stats(&self) -> Vec<StripeStats> {
        self.stripes
            .iter()
            .enumerate()
            .map(|(idx, stripe)| StripeStats {
                stripe_idx: idx,
                acquisitions: stripe.acquisitions.load(AtomicOrdering::Relaxed),
                elided: stripe.elided.load(AtomicOrdering::Relaxed),
                wait_ns: stripe.wait_ns.load(AtomicOrdering::Relaxed),
            })
            .collect()
    }

    /// Up to `top_n` stripe indices ordered by wait time, longest first
    /// (requires `metrics` feature).
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn most_contended_stripes(&self, top_n: usize) -> Vec<usize> {
        let mut stats = self.stripe_stats();
        stats.sort_by_key(|s| std::cmp::Reverse(s.wait_ns));
        stats
            .into_iter()
            .take(top_n)
            .map(|s| s.stripe_idx)
            .collect()
    }
}

impl Clone for StripeLock {
    /// Same stripe count, all stripes released, metrics reset.
    fn clone(&self) -> Self {
        Self {
            stripes: (0..self.stripes.len()).map(|_| PaddedMutex::new()).collect(),
        }
    }
}

impl std::fmt::Debug for StripeLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeLock")
            .field("stripe_count", &self.stripes.len())
            .finish()
    }
}

/// Exclusive hold on one stripe; released on drop.
#[must_use = "the stripe is released as soon as the guard is dropped"]
pub struct StripeGuard<'a> {
    stripe: usize,
    _guard: MutexGuard<'a, ()>,
}

impl StripeGuard<'_> {
    /// Index of the held stripe.
    #[must_use]
    pub fn stripe(&self) -> usize {
        self.stripe
    }
}

/// Hold on every stripe, taken by [`StripeLock::lock_all`].
#[must_use = "the stripes are released as soon as the guard is dropped"]
pub struct AllStripesGuard<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
}

/// Walks one operation's offsets holding at most one stripe at a time.
///
/// Dropping the cursor releases whatever it still holds.
pub struct StripeCursor<'a> {
    stripes: &'a StripeLock,
    held: Option<StripeGuard<'a>>,
}

impl StripeCursor<'_> {
    /// Make sure the stripe owning `offset` is held, returning its index.
    ///
    /// Reuses the current guard when it already covers `offset`; otherwise
    /// releases it before acquiring the new stripe.
    pub fn enter(&mut self, offset: usize) -> usize {
        let target = self.stripes.stripe_of(offset);

        if let Some(guard) = &self.held {
            if guard.stripe == target {
                #[cfg(feature = "metrics")]
                self.stripes.stripes[target].record_elided();
                return target;
            }
        }

        // Drop the old guard first; two stripes are never held together.
        self.held = None;
        self.held = Some(self.stripes.lock(target));
        target
    }

    /// Stripe currently held, if any.
    #[must_use]
    pub fn held_stripe(&self) -> Option<usize> {
        self.held.as_ref().map(StripeGuard::stripe)
    }

    /// Release the held stripe early.
    pub fn release(&mut self) {
        self.held = None;
    }
}
