//! # trackfile codec
//!
//! Serialization of entities and record sequences for trackfile stores.
//!
//! Two formats are supported:
//!
//! - [`Format::Json`] via `serde_json`, human readable, the default
//! - [`Format::Cbor`] via `ciborium`, compact binary
//!
//! A transactional store file is an ordered sequence of [`Record`]s; a simple
//! store file holds one serialized entity.
//!
//! ## Usage
//!
//! ```
//! use trackfile_codec::{decode_records, encode_records, Format, Record};
//!
//! let records = vec![Record::new("alice".to_string(), 30u32)];
//! let bytes = encode_records(Format::Json, &records).unwrap();
//!
//! let decoded: Vec<Record<String, u32>> = decode_records(Format::Json, &bytes).unwrap();
//! assert_eq!(decoded, records);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod format;
mod record;

pub use error::{CodecError, CodecResult};
pub use format::Format;
pub use record::{
    decode_dynamic, decode_records, decode_value, encode_records, encode_value, DynamicRecord,
    Record,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        font_size: u8,
    }

    #[test]
    fn single_value_in_both_formats() {
        let settings = Settings {
            theme: "dark".into(),
            font_size: 12,
        };

        for format in [Format::Json, Format::Cbor] {
            let bytes = encode_value(format, &settings).unwrap();
            let decoded: Settings = decode_value(format, &bytes).unwrap();
            assert_eq!(decoded, settings);
        }
    }

    #[test]
    fn wrong_shape_is_decoding_error() {
        let bytes = encode_value(Format::Json, &42u32).unwrap();
        let result: CodecResult<Settings> = decode_value(Format::Json, &bytes);
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }
}
