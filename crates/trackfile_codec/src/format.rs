//! Serialization formats.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// On-disk serialization format of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Human-readable JSON (`serde_json`).
    #[default]
    Json,
    /// Compact binary CBOR (`ciborium`).
    Cbor,
}

impl Format {
    /// Returns the file extension used for this format, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Cbor => "cbor",
        }
    }

    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Serializes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if the value cannot be
    /// represented in this format.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> CodecResult<Vec<u8>> {
        match self {
            Self::Json => serde_json::to_vec_pretty(value)
                .map_err(|e| CodecError::encoding_failed(self, e.to_string())),
            Self::Cbor => {
                let mut buffer = Vec::new();
                ciborium::into_writer(value, &mut buffer)
                    .map_err(|e| CodecError::encoding_failed(self, e.to_string()))?;
                Ok(buffer)
            }
        }
    }

    /// Deserializes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodingFailed`] if the bytes are malformed or do
    /// not match `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            Self::Json => serde_json::from_slice(bytes)
                .map_err(|e| CodecError::decoding_failed(self, e.to_string())),
            Self::Cbor => ciborium::from_reader(bytes)
                .map_err(|e| CodecError::decoding_failed(self, e.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "JSON"),
            Self::Cbor => write!(f, "CBOR"),
        }
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "cbor" => Ok(Self::Cbor),
            _ => Err(CodecError::UnknownFormat { name: s.to_string() }),
        }
    }
}
