//! Core Bloom filter implementation
//!
//! INVARIANTS:
//! - Validated atomically at construction, never mutated afterwards
//! - No false negatives: a key inserted by the producer always tests positive
//! - An empty or zero-bit filter contains nothing

use bitvec::prelude::*;

use super::hash_functions::hash_positions;
use crate::error::BloomFilterError;

/// Largest number of unused trailing bits in the final bitmap byte.
pub const MAX_PADDING: i32 = 7;

/// Bloom filter for probabilistic membership testing
///
/// Built from a server-produced bitmap. False positives are possible,
/// false negatives are not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    /// Backing bitmap, bit `p` at byte `p / 8`, mask `1 << (p % 8)`
    bits: BitVec<u8, Lsb0>,
    /// Unused trailing bits in the final byte
    padding: u8,
    /// Number of hash positions per key (k)
    hash_count: u32,
    /// Addressable bits (m)
    bit_count: u64,
}

impl BloomFilter {
    /// Create a Bloom filter from a bitmap, padding and hash count.
    ///
    /// # Errors
    /// - `InvalidPadding` if the bitmap is empty and `padding != 0`, or the
    ///   bitmap is non-empty and `padding` is outside `[0, 7]`
    /// - `InvalidHashCount` if `hash_count < 0`, or the bitmap is non-empty
    ///   and `hash_count == 0`
    pub fn new(
        bitmap: impl Into<Vec<u8>>,
        padding: i32,
        hash_count: i32,
    ) -> Result<Self, BloomFilterError> {
        let bitmap = bitmap.into();
        let bitmap_len = bitmap.len();

        if bitmap.is_empty() {
            if padding != 0 {
                return Err(BloomFilterError::InvalidPadding {
                    padding,
                    bitmap_len,
                });
            }
            if hash_count < 0 {
                return Err(BloomFilterError::InvalidHashCount {
                    hash_count,
                    bitmap_len,
                });
            }
        } else {
            if !(0..=MAX_PADDING).contains(&padding) {
                return Err(BloomFilterError::InvalidPadding {
                    padding,
                    bitmap_len,
                });
            }
            if hash_count < 1 {
                return Err(BloomFilterError::InvalidHashCount {
                    hash_count,
                    bitmap_len,
                });
            }
        }

        let bit_count = if bitmap.is_empty() {
            0
        } else {
            bitmap_len as u64 * 8 - u64::from(padding.unsigned_abs())
        };

        Ok(Self {
            bits: BitVec::from_vec(bitmap),
            padding: padding.unsigned_abs() as u8,
            hash_count: hash_count.unsigned_abs(),
            bit_count,
        })
    }

    /// Create a filter that contains nothing.
    pub fn empty() -> Self {
        Self {
            bits: BitVec::new(),
            padding: 0,
            hash_count: 0,
            bit_count: 0,
        }
    }

    /// Test if a key might be in the filter
    ///
    /// The key is hashed as its UTF-8 bytes. Returns:
    /// - `true` if every addressed bit is set (possibly a false positive)
    /// - `false` if the key is definitely NOT in the set
    pub fn might_contain(&self, key: &str) -> bool {
        self.might_contain_bytes(key.as_bytes())
    }

    /// Test if a raw byte key might be in the filter
    ///
    /// Stops at the first unset bit.
    pub fn might_contain_bytes(&self, key: &[u8]) -> bool {
        if self.bit_count == 0 {
            return false;
        }
        hash_positions(key, self.hash_count, self.bit_count).all(|pos| self.is_bit_set(pos))
    }

    fn is_bit_set(&self, position: u64) -> bool {
        self.bits
            .get(position as usize)
            .map_or(false, |bit| *bit)
    }

    /// Get the number of addressable bits
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Get the number of hash positions per key
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Get the number of unused trailing bits
    pub fn padding(&self) -> u8 {
        self.padding
    }

    /// Get the raw bitmap bytes
    pub fn bitmap(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Check if the filter has no addressable bits
    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::empty()
    }
}
