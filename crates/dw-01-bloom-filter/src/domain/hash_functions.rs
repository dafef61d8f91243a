//! Hash functions for the Bloom filter
//!
//! Uses an MD5 digest split into two 64-bit halves and the double hashing
//! technique `h(i) = h1 + i * h2`. Producer and consumer must agree on every
//! step, including the unsigned modulo of the wrapped 64-bit sum.

use md5::{Digest, Md5};

/// Hash a key into the two 64-bit halves of its MD5 digest.
///
/// Both halves are read little-endian: `h1` from bytes `0..8`, `h2` from
/// bytes `8..16`.
pub fn md5_hash_pair(key: &[u8]) -> (u64, u64) {
    let digest = Md5::digest(key);

    let mut low = [0u8; 8];
    let mut high = [0u8; 8];
    low.copy_from_slice(&digest[..8]);
    high.copy_from_slice(&digest[8..16]);

    (u64::from_le_bytes(low), u64::from_le_bytes(high))
}

/// Compute hash position `index` for a key with hash halves `h1`, `h2`.
///
/// The sum wraps at 2^64 and the remainder is taken on the unsigned value.
/// A signed remainder of the same bits lands on different positions.
pub fn hash_position(h1: u64, h2: u64, index: u64, bit_count: u64) -> u64 {
    h1.wrapping_add(index.wrapping_mul(h2)) % bit_count
}

/// Iterate over the `hash_count` hash positions of a key.
///
/// `bit_count` must be non-zero.
pub fn hash_positions(
    key: &[u8],
    hash_count: u32,
    bit_count: u64,
) -> impl Iterator<Item = u64> {
    let (h1, h2) = md5_hash_pair(key);
    (0..u64::from(hash_count)).map(move |i| hash_position(h1, h2, i, bit_count))
}
