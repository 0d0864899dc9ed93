//! Error types for cbloom operations.
//!
//! Construction problems, persistence failures and bit-store failures are
//! kept apart: each has its own variant family so callers can tell a bad
//! sizing parameter from a truncated dump or an unreachable store.
//!
//! Saturated counters, false positives and the weak-consistency windows of
//! the striped protocol are properties of the filter, not errors, and never
//! show up here.
//!
//! # Error Propagation
//!
//! ```
//! use cbloom::{Result, CBloomError};
//! use cbloom::core::params::{size_for_capacity, hash_count_for};
//!
//! fn dimensions(n: usize, p: f64) -> Result<(usize, usize)> {
//!     let m = size_for_capacity(n, p)?;
//!     let k = hash_count_for(n, m)?;
//!     Ok((m, k))
//! }
//! # assert!(dimensions(1000, 0.01).is_ok());
//! # assert!(dimensions(0, 0.01).is_err());
//! ```

#![allow(clippy::module_name_repetitions)]

use std::fmt;

/// Result type alias for cbloom operations.
pub type Result<T> = std::result::Result<T, CBloomError>;

/// Errors that can occur while building, persisting or proxying a filter.
///
/// `Clone` + `PartialEq` keep errors easy to compare in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum CBloomError {
    /// Invalid filter parameters provided during construction.
    InvalidParameters {
        /// Human-readable description of what's invalid.
        message: String,
    },

    /// Target false positive rate outside the open interval (0, 1).
    FalsePositiveRateOutOfBounds {
        /// The rejected rate.
        fp_rate: f64,
    },

    /// Expected item count is zero.
    InvalidItemCount {
        /// The rejected count.
        count: usize,
    },

    /// Counter bank size is zero or does not fit the offset range.
    InvalidFilterSize {
        /// The rejected size in counters.
        size: usize,
        /// Largest accepted size.
        max: usize,
    },

    /// Number of hash offsets per key is zero or above the supported limit.
    InvalidHashCount {
        /// The rejected count.
        count: usize,
        /// Largest accepted count.
        max: usize,
    },

    /// Stripe count is zero or above the supported limit.
    InvalidStripeCount {
        /// The rejected stripe count.
        count: usize,
        /// Largest accepted stripe count.
        max: usize,
    },

    /// Saturation limit does not fit a 4-bit counter.
    InvalidMaxCount {
        /// The rejected limit.
        max_count: u8,
    },

    /// A serialized filter could not be read or written.
    Codec(CodecError),

    /// A bit store refused or failed an operation.
    Store(StoreError),
}

impl fmt::Display for CBloomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters { message } => {
                write!(f, "Invalid filter parameters: {}.", message)
            }
            Self::FalsePositiveRateOutOfBounds { fp_rate } => {
                write!(
                    f,
                    "False positive rate {} is out of bounds. Must be in range (0, 1).",
                    fp_rate
                )
            }
            Self::InvalidItemCount { count } => {
                write!(
                    f,
                    "Invalid item count: {}. Expected items must be greater than 0.",
                    count
                )
            }
            Self::InvalidFilterSize { size, max } => {
                write!(
                    f,
                    "Invalid filter size: {} counters. Must be in range [1, {}].",
                    size, max
                )
            }
            Self::InvalidHashCount { count, max } => {
                write!(
                    f,
                    "Invalid hash count: {}. Must be in range [1, {}].",
                    count, max
                )
            }
            Self::InvalidStripeCount { count, max } => {
                write!(
                    f,
                    "Invalid stripe count: {}. Must be in range [1, {}].",
                    count, max
                )
            }
            Self::InvalidMaxCount { max_count } => {
                write!(
                    f,
                    "Invalid saturation limit: {}. 4-bit counters accept [1, 15].",
                    max_count
                )
            }
            Self::Codec(err) => write!(f, "Codec error: {}", err),
            Self::Store(err) => write!(f, "Bit store error: {}", err),
        }
    }
}

impl std::error::Error for CBloomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl CBloomError {
    /// Create an `InvalidParameters` error with a formatted message.
    ///
    /// # Examples
    /// ```
    /// use cbloom::CBloomError;
    ///
    /// let err = CBloomError::invalid_parameters(format!("m={} is too large", 1u64 << 40));
    /// assert!(err.to_string().contains("too large"));
    /// ```
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a `FalsePositiveRateOutOfBounds` error.
    #[must_use]
    pub fn fp_rate_out_of_bounds(fp_rate: f64) -> Self {
        Self::FalsePositiveRateOutOfBounds { fp_rate }
    }

    /// Create an `InvalidItemCount` error.
    #[must_use]
    pub fn invalid_item_count(count: usize) -> Self {
        Self::InvalidItemCount { count }
    }

    /// Create an `InvalidFilterSize` error.
    #[must_use]
    pub fn invalid_filter_size(size: usize, max: usize) -> Self {
        Self::InvalidFilterSize { size, max }
    }

    /// Create an `InvalidHashCount` error.
    #[must_use]
    pub fn invalid_hash_count(count: usize, max: usize) -> Self {
        Self::InvalidHashCount { count, max }
    }

    /// Create an `InvalidStripeCount` error.
    #[must_use]
    pub fn invalid_stripe_count(count: usize, max: usize) -> Self {
        Self::InvalidStripeCount { count, max }
    }

    /// Create an `InvalidMaxCount` error.
    #[must_use]
    pub fn invalid_max_count(max_count: u8) -> Self {
        Self::InvalidMaxCount { max_count }
    }

    /// True for the construction-time variants.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        !matches!(self, Self::Codec(_) | Self::Store(_))
    }
}

/// Failures reading or writing a persisted counter bank.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Framed stream does not start with the expected magic bytes.
    #[error("invalid magic bytes (expected 'CBLM')")]
    InvalidMagic,

    /// Framed stream was written by an unknown format version.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    /// Stream ended before all declared data was read.
    #[error("buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes the header promised.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Stream ended in the middle of a field.
    #[error("stream ended before the counter bank was complete")]
    Truncated,

    /// Trailing checksum does not match the payload.
    #[error("checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch {
        /// Checksum found in the stream.
        stored: u64,
        /// Checksum of the bytes actually read.
        computed: u64,
    },

    /// Counter words hold values the declared parameters cannot produce.
    #[error("corrupt counter data: {0}")]
    CorruptCounters(String),

    /// Underlying reader or writer failed.
    #[error("i/o failure: {0}")]
    Io(String),
}

impl From<CodecError> for CBloomError {
    fn from(err: CodecError) -> Self {
        CBloomError::Codec(err)
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::Truncated
        } else {
            CodecError::Io(err.to_string())
        }
    }
}

impl From<std::io::Error> for CBloomError {
    fn from(err: std::io::Error) -> Self {
        CBloomError::Codec(err.into())
    }
}

/// Failures reported by a [`BitStore`](crate::filters::store::BitStore).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something the proxy cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The requested bit lies outside what the store accepts.
    #[error("offset {offset} out of range for store key '{key}'")]
    OffsetOutOfRange {
        /// Store key addressed.
        key: String,
        /// Rejected bit offset.
        offset: usize,
    },
}

impl From<StoreError> for CBloomError {
    fn from(err: StoreError) -> Self {
        CBloomError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_parameters() {
        let err = CBloomError::invalid_parameters("test message");
        let display = format!("{err}");
        assert!(display.contains("Invalid filter parameters"));
        assert!(display.contains("test message"));
        assert!(display.ends_with('.'));
    }

    #[test]
    fn test_error_display_fp_rate_out_of_bounds() {
        let err = CBloomError::fp_rate_out_of_bounds(1.5);
        let display = format!("{err}");
        assert!(display.contains("1.5"));
        assert!(display.contains("(0, 1)"));
    }

    #[test]
    fn test_error_display_filter_size() {
        let err = CBloomError::invalid_filter_size(0, i32::MAX as usize);
        let display = format!("{err}");
        assert!(display.contains("0 counters"));
        assert!(display.contains(&(i32::MAX).to_string()));
    }

    #[test]
    fn test_error_display_limits() {
        let err = CBloomError::invalid_hash_count(5000, 4096);
        assert!(format!("{err}").contains("[1, 4096]"));
        let err = CBloomError::invalid_stripe_count(0, 65_536);
        assert!(format!("{err}").contains("[1, 65536]"));
    }

    #[test]
    fn test_error_display_max_count() {
        let err = CBloomError::invalid_max_count(16);
        assert!(format!("{err}").contains("[1, 15]"));
    }

    #[test]
    fn test_codec_error_wraps() {
        let err: CBloomError = CodecError::UnsupportedVersion(9).into();
        assert!(matches!(err, CBloomError::Codec(CodecError::UnsupportedVersion(9))));
        assert!(format!("{err}").contains("version: 9"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_store_error_is_distinct_kind() {
        let err: CBloomError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, CBloomError::Store(StoreError::Unavailable(_))));
        assert!(format!("{err}").contains("connection refused"));
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_io_eof_maps_to_truncated() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: CBloomError = io.into();
        assert_eq!(err, CBloomError::Codec(CodecError::Truncated));
    }

    #[test]
    fn test_construction_errors_flagged() {
        assert!(CBloomError::invalid_item_count(0).is_construction_error());
        assert!(CBloomError::invalid_hash_count(0, 4096).is_construction_error());
        assert!(CBloomError::invalid_stripe_count(0, 65_536).is_construction_error());
    }

    #[test]
    fn test_error_clone() {
        let err1 = CBloomError::invalid_parameters("test");
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(CBloomError::invalid_item_count(0))
        }

        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
