//! Domain Layer - Pure membership logic
//!
//! This layer contains:
//! - The immutable Bloom filter used by consumers
//! - The builder used by producers and tests
//! - Hash functions shared by both
//! - Parameter calculations
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod bloom_filter;
pub mod builder;
pub mod hash_functions;
pub mod parameters;

pub use bloom_filter::BloomFilter;
pub use builder::BloomFilterBuilder;
pub use parameters::{calculate_fpr, calculate_optimal_parameters, BloomFilterParams};
