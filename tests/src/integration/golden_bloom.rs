//! # Golden Bloom Filter Vectors
//!
//! Filters produced by the server for known key sets. Membership must match
//! bit for bit: inserted keys always test positive, and every other key tests
//! exactly as the recorded expectation string says.

#[cfg(test)]
mod tests {
    use dw_01_bloom_filter::domain::hash_functions::{hash_positions, md5_hash_pair};
    use dw_01_bloom_filter::{BloomFilter, BloomFilterBuilder, BloomFilterDescriptor};

    use crate::fixtures::{golden_vector, golden_vectors, random_document_names, GoldenVector};

    fn check_vector(vector: &GoldenVector) {
        let filter = vector.filter().unwrap();

        for i in 0..vector.count {
            assert!(
                filter.might_contain(&vector.key(i)),
                "{}: inserted key {} must be present",
                vector.name,
                vector.key(i)
            );
        }

        let actual: String = (vector.count..2 * vector.count)
            .map(|i| if filter.might_contain(&vector.key(i)) { '1' } else { '0' })
            .collect();
        assert_eq!(actual, vector.expected, "{}: membership diverged", vector.name);
    }

    #[test]
    fn test_sparse_vector_matches() {
        let vector = golden_vector("sparse").unwrap();
        assert_eq!(vector.filter().unwrap().bit_count(), 120 * 8 - 5);
        check_vector(&vector);
        assert!(vector.expected_absent().iter().all(|present| !present));
    }

    #[test]
    fn test_dense_vector_matches() {
        let vector = golden_vector("dense").unwrap();
        assert_eq!(vector.filter().unwrap().bit_count(), 64 * 8 - 3);
        check_vector(&vector);
        // A dense filter must show some false positives.
        assert!(vector.expected_absent().iter().any(|present| *present));
    }

    #[test]
    fn test_vectors_survive_descriptor_json() {
        for vector in golden_vectors() {
            let json = serde_json::json!({
                "bits": { "bitmap": vector.bitmap, "padding": vector.padding },
                "hashCount": vector.hash_count,
            });
            let descriptor: BloomFilterDescriptor = serde_json::from_value(json).unwrap();
            let filter = BloomFilter::try_from(&descriptor).unwrap();
            assert_eq!(filter, vector.filter().unwrap());

            let reencoded = serde_json::to_value(&descriptor).unwrap();
            assert_eq!(reencoded["bits"]["bitmap"], vector.bitmap.as_str());
        }
    }

    #[test]
    fn test_hash_positions_known_keys() {
        let cases: [(&str, u64, u32, &[u64]); 5] = [
            ("", 8, 2, &[4, 5]),
            ("", 5, 3, &[3, 1, 3]),
            ("a", 5, 3, &[0, 1, 3]),
            ("a", 13, 4, &[8, 1, 10, 6]),
            ("\u{e9}t\u{e9}", 13, 4, &[2, 5, 8, 11]),
        ];
        for (key, bit_count, hash_count, expected) in cases {
            let positions: Vec<u64> = hash_positions(key.as_bytes(), hash_count, bit_count).collect();
            assert_eq!(positions, expected, "positions of {key:?}");
        }
        assert_eq!(
            md5_hash_pair(b""),
            (0x04b2_008f_d98c_1dd4, 0x7e42_f8ec_9809_80e9)
        );
    }

    #[test]
    fn test_single_hash_pair_filter_from_bits() {
        // "" with 8 bits and 2 hashes sets bits 4 and 5.
        let filter = BloomFilter::new(vec![0b0011_0000], 0, 2).unwrap();
        assert!(filter.might_contain(""));

        let missing_bit = BloomFilter::new(vec![0b0001_0000], 0, 2).unwrap();
        assert!(!missing_bit.might_contain(""));
    }

    #[test]
    fn test_builder_has_no_false_negatives() {
        let names = random_document_names("rooms", 500, 42);
        let mut builder = BloomFilterBuilder::with_false_positive_rate(names.len(), 0.01).unwrap();
        for name in &names {
            builder.insert(name);
        }
        let filter = builder.build().unwrap();
        assert!(names.iter().all(|name| filter.might_contain(name)));

        let strangers = random_document_names("strangers", 2000, 7);
        let false_positives = strangers
            .iter()
            .filter(|name| filter.might_contain(name))
            .count();
        assert!(false_positives < 100, "{false_positives} false positives");

        let descriptor = BloomFilterDescriptor::from(&filter);
        assert_eq!(BloomFilter::try_from(&descriptor).unwrap(), filter);
    }
}
