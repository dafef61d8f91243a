//! Wire descriptor for a Bloom filter
//!
//! JSON form: `{ "bits": { "bitmap": <base64 | bytes>, "padding": n }, "hashCount": k }`.
//! Missing numeric fields take their proto3 default of zero.

use serde::{Deserialize, Serialize};

use crate::domain::BloomFilter;
use crate::error::BloomFilterError;

/// Bitmap plus the number of unused trailing bits in its final byte.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitSequence {
    #[serde(default, with = "bitmap_serde")]
    pub bitmap: Vec<u8>,
    #[serde(default)]
    pub padding: i32,
}

/// Bloom filter as carried inside an existence filter message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloomFilterDescriptor {
    #[serde(default)]
    pub bits: BitSequence,
    #[serde(default)]
    pub hash_count: i32,
}

impl BloomFilterDescriptor {
    /// Create a descriptor from its raw parts.
    pub fn new(bitmap: Vec<u8>, padding: i32, hash_count: i32) -> Self {
        Self {
            bits: BitSequence { bitmap, padding },
            hash_count,
        }
    }

    /// Validate and build the filter this descriptor describes.
    pub fn to_filter(&self) -> Result<BloomFilter, BloomFilterError> {
        BloomFilter::try_from(self)
    }
}

impl TryFrom<&BloomFilterDescriptor> for BloomFilter {
    type Error = BloomFilterError;

    fn try_from(descriptor: &BloomFilterDescriptor) -> Result<Self, Self::Error> {
        BloomFilter::new(
            descriptor.bits.bitmap.clone(),
            descriptor.bits.padding,
            descriptor.hash_count,
        )
    }
}

impl From<&BloomFilter> for BloomFilterDescriptor {
    fn from(filter: &BloomFilter) -> Self {
        Self::new(
            filter.bitmap().to_vec(),
            i32::from(filter.padding()),
            filter.hash_count() as i32,
        )
    }
}

/// Decode a base64 bitmap, accepting both the standard and URL-safe alphabets.
pub fn decode_bitmap(encoded: &str) -> Result<Vec<u8>, BloomFilterError> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE};
    use base64::Engine;

    STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))
        .map_err(|e| BloomFilterError::InvalidBitmapEncoding(e.to_string()))
}

/// Serde support for bitmaps sent either as base64 text or as a byte array
mod bitmap_serde {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBitmap {
        Encoded(String),
        Bytes(Vec<u8>),
    }

    pub fn serialize<S>(bitmap: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bitmap))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawBitmap::deserialize(deserializer)? {
            RawBitmap::Encoded(text) => {
                super::decode_bitmap(&text).map_err(serde::de::Error::custom)
            }
            RawBitmap::Bytes(bytes) => Ok(bytes),
        }
    }
}
