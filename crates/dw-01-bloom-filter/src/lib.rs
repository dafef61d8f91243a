//! # DW-01 Bloom Filter
//!
//! Existence-filter membership structure for the watch stream.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `BloomFilter`: Immutable, validated membership structure
//!   - `BloomFilterBuilder`: Producer side, sets bits for inserted keys
//!   - `hash_functions`: MD5 double hashing shared by both sides
//!   - `parameters`: Optimal size / hash count math
//!
//! - **Descriptor** (`descriptor`): Wire form `{ bits: { bitmap, padding }, hashCount }`
//!
//! ## Compatibility
//!
//! The bit layout must match filters produced by the server exactly:
//!
//! - Keys are hashed as raw UTF-8 bytes with MD5
//! - `h1`/`h2` are the little-endian halves of the digest
//! - Hash position `i` is `(h1 + i * h2) mod bitCount` in wrapping unsigned 64-bit arithmetic
//! - Bit `p` is `bitmap[p / 8] & (1 << (p % 8))`
//!
//! ## Invariants
//!
//! - A filter is validated atomically at construction and never mutated
//! - No false negatives: every inserted key tests positive
//!
//! ## Usage Example
//!
//! ```ignore
//! use dw_01_bloom_filter::{BloomFilter, BloomFilterBuilder};
//!
//! let mut builder = BloomFilterBuilder::new(512, 5)?;
//! builder.insert("projects/p/databases/(default)/documents/cities/SF");
//! let filter = builder.build()?;
//!
//! assert!(filter.might_contain("projects/p/databases/(default)/documents/cities/SF"));
//! ```

pub mod descriptor;
pub mod domain;
pub mod error;

// Re-exports for convenience
pub use descriptor::{BitSequence, BloomFilterDescriptor};
pub use domain::{
    calculate_fpr, calculate_optimal_parameters, BloomFilter, BloomFilterBuilder,
    BloomFilterParams,
};
pub use error::BloomFilterError;
