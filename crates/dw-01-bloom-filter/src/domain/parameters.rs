//! Optimal Bloom filter parameter calculation
//!
//! Formulas:
//! - m = -n*ln(fpr) / (ln(2)^2)  -- optimal bits
//! - k = (m/n) * ln(2)           -- optimal hash functions
//! - fpr = (1 - e^(-kn/m))^k     -- expected false positive rate

use std::f64::consts::LN_2;

/// Upper bound on the hash count chosen by the optimizer.
pub const MAX_HASH_COUNT: u32 = 32;

/// Bloom filter parameters
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    /// Number of bits in the filter
    pub size_bits: usize,
    /// Number of hash functions
    pub hash_count: u32,
    /// Expected false positive rate with these parameters
    pub expected_fpr: f64,
}

/// Calculate optimal Bloom filter parameters for given constraints
///
/// # Arguments
/// * `num_elements` - Expected number of elements to insert (n)
/// * `target_fpr` - Target false positive rate, in `(0, 1)`
pub fn calculate_optimal_parameters(num_elements: usize, target_fpr: f64) -> BloomFilterParams {
    if num_elements == 0 {
        return BloomFilterParams {
            size_bits: 0,
            hash_count: 0,
            expected_fpr: 0.0,
        };
    }

    let n = num_elements as f64;
    let ln2_squared = LN_2 * LN_2;

    let m = ((-n * target_fpr.ln() / ln2_squared).ceil() as usize).max(1);

    let k = ((m as f64 / n) * LN_2).round() as u32;
    let k = k.clamp(1, MAX_HASH_COUNT);

    BloomFilterParams {
        size_bits: m,
        hash_count: k,
        expected_fpr: calculate_fpr(m, num_elements, k),
    }
}

/// Calculate the false positive rate for given parameters
///
/// Formula: FPR = (1 - e^(-kn/m))^k
pub fn calculate_fpr(m: usize, n: usize, k: u32) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let exponent = -(f64::from(k)) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}
