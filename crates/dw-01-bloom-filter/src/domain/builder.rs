//! Producer-side Bloom filter construction
//!
//! Sets the same hash positions the consumer tests, so a filter built here
//! is bit-identical to one produced by the server for the same keys.

use bitvec::prelude::*;

use super::bloom_filter::BloomFilter;
use super::hash_functions::hash_positions;
use super::parameters::calculate_optimal_parameters;
use crate::error::BloomFilterError;

/// Mutable builder that produces an immutable [`BloomFilter`].
#[derive(Clone, Debug)]
pub struct BloomFilterBuilder {
    bits: BitVec<u8, Lsb0>,
    hash_count: u32,
    inserted: usize,
}

impl BloomFilterBuilder {
    /// Create a builder with an explicit size in bits and hash count.
    ///
    /// # Errors
    /// `InvalidHashCount` if `bit_count > 0` and `hash_count == 0`.
    pub fn new(bit_count: usize, hash_count: u32) -> Result<Self, BloomFilterError> {
        if bit_count > 0 && hash_count == 0 {
            return Err(BloomFilterError::InvalidHashCount {
                hash_count: 0,
                bitmap_len: bit_count.div_ceil(8),
            });
        }
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; bit_count],
            hash_count,
            inserted: 0,
        })
    }

    /// Create a builder sized for `expected_elements` at `target_fpr`.
    pub fn with_false_positive_rate(
        expected_elements: usize,
        target_fpr: f64,
    ) -> Result<Self, BloomFilterError> {
        let params = calculate_optimal_parameters(expected_elements, target_fpr);
        Self::new(params.size_bits, params.hash_count)
    }

    /// Insert a key, hashed as its UTF-8 bytes.
    pub fn insert(&mut self, key: &str) {
        self.insert_bytes(key.as_bytes());
    }

    /// Insert a raw byte key.
    pub fn insert_bytes(&mut self, key: &[u8]) {
        let bit_count = self.bits.len() as u64;
        if bit_count == 0 {
            return;
        }
        for pos in hash_positions(key, self.hash_count, bit_count) {
            self.bits.set(pos as usize, true);
        }
        self.inserted += 1;
    }

    /// Get the number of addressable bits.
    pub fn bit_count(&self) -> usize {
        self.bits.len()
    }

    /// Get the number of keys inserted so far.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Freeze the bits into a validated filter.
    pub fn build(self) -> Result<BloomFilter, BloomFilterError> {
        let bit_count = self.bits.len();
        let padding = ((8 - bit_count % 8) % 8) as i32;
        let bitmap = self.bits.into_vec();
        let hash_count =
            i32::try_from(self.hash_count).map_err(|_| BloomFilterError::InvalidHashCount {
                hash_count: i32::MAX,
                bitmap_len: bitmap.len(),
            })?;

        BloomFilter::new(bitmap, padding, hash_count)
    }
}
