//! Sizing formulas and theoretical statistics for counting Bloom filters.
//!
//! Given:
//! - `n`: expected number of distinct keys
//! - `ε`: target false positive rate
//!
//! The filter is dimensioned as:
//! - `m = ⌈-n × ln(ε) / (ln 2)²⌉` (counters in the bank)
//! - `k = ⌈ln 2 × m / n⌉` (offsets per key)
//!
//! Both are rounded up, never to nearest: a filter one counter or one offset
//! larger than optimal stays at or below the target rate, one smaller does
//! not.
//!
//! Expected false positive rate after `n` insertions:
//! - `p = (1 - e^(-kn/m))^k`
//!
//! # References
//!
//! - Bloom, Burton H. (1970). "Space/Time Trade-offs in Hash Coding with Allowable Errors"
//! - Fan, Cao, Almeida & Broder (2000). "Summary Cache: A Scalable Wide-Area Web Cache Sharing Protocol"

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{CBloomError, Result};
use std::f64::consts::LN_2;

/// (ln 2)² ≈ 0.4804530139182014
const LN2_SQUARED: f64 = LN_2 * LN_2;

/// Largest counter bank the offset generator can address.
///
/// Offsets are reduced from a non-negative 32-bit signed hash, so every
/// position must fit in `[0, i32::MAX)`.
pub const MAX_FILTER_SIZE: usize = i32::MAX as usize;

/// Largest number of offsets per key.
///
/// Capacity-based sizing never exceeds about 1100 offsets, even at the
/// smallest positive `f64` error rate.
pub const MAX_HASH_COUNT: usize = 4096;

/// Calculate the counter bank size for a capacity and target error rate.
///
/// Implements `m = ⌈-n × ln(ε) / (ln 2)²⌉`.
///
/// # Errors
///
/// - [`CBloomError::InvalidItemCount`] if `n == 0`
/// - [`CBloomError::FalsePositiveRateOutOfBounds`] if `fp_rate` is not a finite value in (0, 1)
/// - [`CBloomError::InvalidFilterSize`] if the result exceeds [`MAX_FILTER_SIZE`]
///
/// # Examples
///
/// ```
/// use cbloom::core::params::size_for_capacity;
///
/// assert_eq!(size_for_capacity(1000, 0.01).unwrap(), 9586);
/// assert!(size_for_capacity(1000, 0.001).unwrap() > 9586);
/// ```
pub fn size_for_capacity(n: usize, fp_rate: f64) -> Result<usize> {
    if n == 0 {
        return Err(CBloomError::invalid_item_count(n));
    }
    validate_fp_rate(fp_rate)?;

    let m = (-(n as f64) * fp_rate.ln() / LN2_SQUARED).ceil();

    if m > MAX_FILTER_SIZE as f64 {
        return Err(CBloomError::invalid_filter_size(
            usize::MAX,
            MAX_FILTER_SIZE,
        ));
    }

    // -ln(ε) > 0 for ε in (0, 1), so the ceiling is at least 1.
    Ok((m as usize).max(1))
}

/// Calculate the number of offsets per key for a capacity and bank size.
///
/// Implements `k = ⌈ln 2 × m / n⌉`.
///
/// # Errors
///
/// - [`CBloomError::InvalidItemCount`] if `n == 0`
/// - [`CBloomError::InvalidFilterSize`] if `m == 0`
/// - [`CBloomError::InvalidHashCount`] if the result exceeds [`MAX_HASH_COUNT`]
///
/// # Examples
///
/// ```
/// use cbloom::core::params::hash_count_for;
///
/// assert_eq!(hash_count_for(1000, 9586).unwrap(), 7);
/// ```
pub fn hash_count_for(n: usize, m: usize) -> Result<usize> {
    if n == 0 {
        return Err(CBloomError::invalid_item_count(n));
    }
    if m == 0 {
        return Err(CBloomError::invalid_filter_size(m, MAX_FILTER_SIZE));
    }

    let k = (LN_2 * m as f64 / n as f64).ceil();
    if k > MAX_HASH_COUNT as f64 {
        return Err(CBloomError::invalid_hash_count(k as usize, MAX_HASH_COUNT));
    }
    Ok((k as usize).max(1))
}

/// Calculate `(m, k)` for a capacity and target error rate in one step.
///
/// # Errors
///
/// Same as [`size_for_capacity`].
pub fn dimensions_for(n: usize, fp_rate: f64) -> Result<(usize, usize)> {
    let m = size_for_capacity(n, fp_rate)?;
    let k = hash_count_for(n, m)?;
    Ok((m, k))
}

/// Validate a target false positive rate.
///
/// # Errors
///
/// [`CBloomError::FalsePositiveRateOutOfBounds`] unless `fp_rate` is finite and in (0, 1).
pub fn validate_fp_rate(fp_rate: f64) -> Result<()> {
    if !fp_rate.is_finite() || fp_rate <= 0.0 || fp_rate >= 1.0 {
        return Err(CBloomError::fp_rate_out_of_bounds(fp_rate));
    }
    Ok(())
}

/// Validate explicit `(m, k)` dimensions.
///
/// # Errors
///
/// - [`CBloomError::InvalidFilterSize`] if `m` is 0 or above [`MAX_FILTER_SIZE`]
/// - [`CBloomError::InvalidHashCount`] if `k` is 0 or above [`MAX_HASH_COUNT`]
pub fn validate_dimensions(m: usize, k: usize) -> Result<()> {
    if m == 0 || m > MAX_FILTER_SIZE {
        return Err(CBloomError::invalid_filter_size(m, MAX_FILTER_SIZE));
    }
    if k == 0 || k > MAX_HASH_COUNT {
        return Err(CBloomError::invalid_hash_count(k, MAX_HASH_COUNT));
    }
    Ok(())
}

/// Theoretical false positive probability after `n` insertions.
///
/// Implements `p = (1 - e^(-kn/m))^k`, clamped to [0, 1]. Returns 0 for an
/// empty filter or degenerate dimensions.
#[must_use]
pub fn false_positive_probability(m: usize, k: usize, n: usize) -> f64 {
    if m == 0 || k == 0 || n == 0 {
        return 0.0;
    }
    let k_f64 = k as f64;
    let exponent = -(k_f64 * n as f64) / m as f64;
    (1.0 - exponent.exp()).powf(k_f64).clamp(0.0, 1.0)
}

/// Counters spent per expected key, `m / n`.
#[must_use]
pub fn bits_per_element(m: usize, n: usize) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    m as f64 / n as f64
}

/// Probability that a given counter is still zero after `n` insertions.
///
/// Implements `(1 - 1/m)^(k × n)`.
#[must_use]
pub fn bit_zero_probability(m: usize, k: usize, n: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    (1.0 - 1.0 / m as f64).powf((k * n) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_for_capacity_known_values() {
        assert_eq!(size_for_capacity(1000, 0.01).unwrap(), 9586);
        assert_eq!(size_for_capacity(100, 0.01).unwrap(), 959);
        assert_eq!(size_for_capacity(10_000, 0.0001).unwrap(), 191_702);
        assert_eq!(size_for_capacity(1, 0.9).unwrap(), 1);
    }

    #[test]
    fn test_hash_count_for_known_values() {
        assert_eq!(hash_count_for(1000, 9586).unwrap(), 7);
        assert_eq!(hash_count_for(10_000, 191_702).unwrap(), 14);
        assert_eq!(hash_count_for(1, 1).unwrap(), 1);
        assert_eq!(hash_count_for(1, 2).unwrap(), 2);
    }

    #[test]
    fn test_dimensions_for() {
        assert_eq!(dimensions_for(1000, 0.01).unwrap(), (9586, 7));
        assert_eq!(dimensions_for(10_000_000, 0.00001).unwrap(), (239_626_460, 17));
    }

    #[test]
    fn test_size_grows_as_rate_shrinks() {
        let mut previous = 0;
        for rate in [0.5, 0.1, 0.05, 0.01, 0.001, 0.0001, 1e-6, 1e-9] {
            let m = size_for_capacity(10_000, rate).unwrap();
            assert!(m >= previous, "m shrank at rate {}", rate);
            previous = m;
        }
    }

    #[test]
    fn test_never_non_positive() {
        for n in [1usize, 2, 7, 100, 12_345] {
            for rate in [0.999, 0.5, 0.01, 1e-7] {
                let (m, k) = dimensions_for(n, rate).unwrap();
                assert!(m >= 1);
                assert!(k >= 1);
            }
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            size_for_capacity(0, 0.01),
            Err(CBloomError::InvalidItemCount { .. })
        ));
        for rate in [0.0, 1.0, -0.5, 1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                size_for_capacity(100, rate),
                Err(CBloomError::FalsePositiveRateOutOfBounds { .. })
            ));
        }
        assert!(hash_count_for(0, 100).is_err());
        assert!(hash_count_for(100, 0).is_err());
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let result = size_for_capacity(usize::MAX / 2, 1e-12);
        assert!(matches!(result, Err(CBloomError::InvalidFilterSize { .. })));
    }

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions(5, 3).is_ok());
        assert!(validate_dimensions(MAX_FILTER_SIZE, 1).is_ok());
        assert!(validate_dimensions(0, 3).is_err());
        assert!(validate_dimensions(MAX_FILTER_SIZE + 1, 3).is_err());
        assert!(matches!(
            validate_dimensions(5, 0),
            Err(CBloomError::InvalidHashCount { count: 0, .. })
        ));
    }

    #[test]
    fn test_hash_count_limit() {
        assert!(validate_dimensions(10, MAX_HASH_COUNT).is_ok());
        assert!(matches!(
            validate_dimensions(10, MAX_HASH_COUNT + 1),
            Err(CBloomError::InvalidHashCount { max: MAX_HASH_COUNT, .. })
        ));
        assert!(validate_dimensions(10, u32::MAX as usize + 2).is_err());
        assert!(matches!(
            hash_count_for(1, MAX_FILTER_SIZE),
            Err(CBloomError::InvalidHashCount { .. })
        ));

        // The tightest representable rate still sizes within the limit.
        let (_, k) = dimensions_for(1, f64::MIN_POSITIVE).unwrap();
        assert!(k <= MAX_HASH_COUNT);
    }

    #[test]
    fn test_false_positive_probability() {
        let p = false_positive_probability(9586, 7, 1000);
        assert!((p - 0.01).abs() < 0.001);
        assert_eq!(false_positive_probability(9586, 7, 0), 0.0);
    }

    #[test]
    fn test_bits_per_element_and_zero_probability() {
        assert_eq!(bits_per_element(9586, 1000), 9.586);
        let zero = bit_zero_probability(9586, 7, 1000);
        assert!((zero - 0.4818).abs() < 0.001);
        assert_eq!(bit_zero_probability(9586, 7, 0), 1.0);
    }
}
