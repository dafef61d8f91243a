//! Error types for the Bloom filter subsystem

use thiserror::Error;

/// Errors raised while constructing a Bloom filter.
///
/// All variants are construction-time failures: the offending inputs never
/// produce a usable instance and retrying with the same inputs fails again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BloomFilterError {
    #[error("Invalid padding: {padding} (bitmap length {bitmap_len} bytes)")]
    InvalidPadding { padding: i32, bitmap_len: usize },

    #[error("Invalid hash count: {hash_count} (bitmap length {bitmap_len} bytes)")]
    InvalidHashCount { hash_count: i32, bitmap_len: usize },

    #[error("Invalid bitmap encoding: {0}")]
    InvalidBitmapEncoding(String),
}
