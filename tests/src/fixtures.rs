//! Shared fixtures: golden bloom filter vectors and key generators.

use dw_01_bloom_filter::{descriptor::decode_bitmap, BloomFilter, BloomFilterError};
use serde::Deserialize;

const GOLDEN_JSON: &str = include_str!("../fixtures/bloom_golden.json");

/// Database prefix shared by generated document names.
pub const DOCUMENTS_PREFIX: &str = "projects/demo-project/databases/(default)/documents";

/// A server-produced filter together with its expected membership answers.
///
/// Keys `prefix + 0 .. prefix + count - 1` were inserted. `expected` holds
/// one `0`/`1` per key `prefix + count .. prefix + 2 * count - 1`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldenVector {
    pub name: String,
    pub bitmap: String,
    pub padding: i32,
    pub hash_count: i32,
    pub prefix: String,
    pub count: usize,
    pub expected: String,
}

impl GoldenVector {
    /// Decode the bitmap and build the filter.
    pub fn filter(&self) -> Result<BloomFilter, BloomFilterError> {
        BloomFilter::new(decode_bitmap(&self.bitmap)?, self.padding, self.hash_count)
    }

    /// Key `prefix + index`.
    pub fn key(&self, index: usize) -> String {
        format!("{}{}", self.prefix, index)
    }

    /// Expected membership of the keys that were never inserted.
    pub fn expected_absent(&self) -> Vec<bool> {
        self.expected.chars().map(|c| c == '1').collect()
    }
}

#[derive(Deserialize)]
struct GoldenFile {
    vectors: Vec<GoldenVector>,
}

/// Every golden vector in the fixture file.
pub fn golden_vectors() -> Vec<GoldenVector> {
    serde_json::from_str::<GoldenFile>(GOLDEN_JSON)
        .map(|file| file.vectors)
        .unwrap_or_default()
}

/// The golden vector called `name`, if present.
pub fn golden_vector(name: &str) -> Option<GoldenVector> {
    golden_vectors().into_iter().find(|v| v.name == name)
}

/// `count` document names in `collection`: `{prefix}/{collection}/doc-{i}`.
pub fn document_names(collection: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{DOCUMENTS_PREFIX}/{collection}/doc-{i}"))
        .collect()
}

/// `count` random document names in `collection`.
pub fn random_document_names(collection: &str, count: usize, seed: u64) -> Vec<String> {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let id: u64 = rng.gen();
            format!("{DOCUMENTS_PREFIX}/{collection}/{id:016x}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_file_loads() {
        let vectors = golden_vectors();
        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.expected.len(), vector.count);
        }
    }

    #[test]
    fn test_random_names_deterministic() {
        assert_eq!(
            random_document_names("rooms", 5, 7),
            random_document_names("rooms", 5, 7)
        );
    }
}
