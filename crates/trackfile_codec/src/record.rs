//! Keyed record sequences.
//!
//! A store file holds an ordered sequence of `{"key": .., "value": ..}`
//! records. The sequence is not a map on the wire, so the insertion order of
//! the records is kept across rewrites.

use crate::error::{CodecError, CodecResult};
use crate::format::Format;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One keyed entry of a store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<K, V> {
    /// Identifier of the entity.
    pub key: K,
    /// The serialized entity.
    pub value: V,
}

impl<K, V> Record<K, V> {
    /// Creates a record.
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// A record decoded without knowing the entity type.
pub type DynamicRecord = Record<serde_json::Value, serde_json::Value>;

/// Encodes an ordered sequence of records.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if a key or value cannot be encoded.
pub fn encode_records<K: Serialize, V: Serialize>(
    format: Format,
    records: &[Record<K, V>],
) -> CodecResult<Vec<u8>> {
    format.encode(records)
}

/// Decodes an ordered sequence of records.
///
/// Empty input (or whitespace-only JSON) decodes to an empty sequence.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are malformed.
pub fn decode_records<K: DeserializeOwned, V: DeserializeOwned>(
    format: Format,
    bytes: &[u8],
) -> CodecResult<Vec<Record<K, V>>> {
    if is_blank(format, bytes) {
        return Ok(Vec::new());
    }
    format.decode(bytes)
}

/// Decodes records into JSON values, whatever the file format.
///
/// CBOR input is read into a generic CBOR value first, so byte strings (such
/// as binary UUIDs) survive as arrays of numbers.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are malformed.
pub fn decode_dynamic(format: Format, bytes: &[u8]) -> CodecResult<Vec<DynamicRecord>> {
    match format {
        Format::Json => decode_records(format, bytes),
        Format::Cbor => {
            if bytes.is_empty() {
                return Ok(Vec::new());
            }
            let raw: Vec<Record<ciborium::Value, ciborium::Value>> = format.decode(bytes)?;
            raw.into_iter()
                .map(|record| {
                    let key = serde_json::to_value(&record.key)
                        .map_err(|e| CodecError::decoding_failed(format, e.to_string()))?;
                    let value = serde_json::to_value(&record.value)
                        .map_err(|e| CodecError::decoding_failed(format, e.to_string()))?;
                    Ok(Record::new(key, value))
                })
                .collect()
        }
    }
}

/// Encodes a single value (one entity per file).
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if the value cannot be encoded.
pub fn encode_value<T: Serialize + ?Sized>(format: Format, value: &T) -> CodecResult<Vec<u8>> {
    format.encode(value)
}

/// Decodes a single value.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are malformed or do not
/// match `T`.
pub fn decode_value<T: DeserializeOwned>(format: Format, bytes: &[u8]) -> CodecResult<T> {
    format.decode(bytes)
}

fn is_blank(format: Format, bytes: &[u8]) -> bool {
    match format {
        Format::Json => bytes.iter().all(u8::is_ascii_whitespace),
        Format::Cbor => bytes.is_empty(),
    }
}
