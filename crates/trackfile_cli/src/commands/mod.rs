//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod verify;

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use trackfile_codec::{decode_dynamic, CodecError, DynamicRecord, Format};
use trackfile_storage::{LockedFile, StorageError};

/// Errors raised while loading a store file.
#[derive(Debug, Error)]
pub enum CliError {
    /// The file does not exist.
    #[error("no store file found at '{}'", .0.display())]
    NotFound(PathBuf),

    /// The file could not be opened or read.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The file contents could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A decoded store file.
#[derive(Debug)]
pub struct LoadedStore {
    /// Format used to decode the file.
    pub format: Format,
    /// File size in bytes.
    pub size: u64,
    /// Records in file order.
    pub records: Vec<DynamicRecord>,
}

/// Reads and decodes the store at `path` under a shared lock.
///
/// Without an explicit format, the file extension decides; unknown
/// extensions fall back to JSON.
pub fn load(path: &Path, format: Option<Format>) -> Result<LoadedStore, CliError> {
    let format = format
        .or_else(|| Format::from_path(path))
        .unwrap_or_default();

    let Some(mut file) = LockedFile::try_open_shared(path)? else {
        return Err(CliError::NotFound(path.to_path_buf()));
    };
    let bytes = file.read_all()?;
    file.close()?;

    debug!(path = %path.display(), %format, bytes = bytes.len(), "loaded store file");
    Ok(LoadedStore {
        format,
        size: bytes.len() as u64,
        records: decode_dynamic(format, &bytes)?,
    })
}

/// Renders a record key for display.
pub fn display_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trackfile_codec::{encode_records, Record};

    #[test]
    fn load_infers_format_from_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.cbor");
        let records = vec![Record::new(1u32, "one".to_string())];
        std::fs::write(&path, encode_records(Format::Cbor, &records).unwrap()).unwrap();

        let store = load(&path, None).unwrap();
        assert_eq!(store.format, Format::Cbor);
        assert_eq!(store.records.len(), 1);
        assert_eq!(display_key(&store.records[0].key), "1");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("none.json"), None).unwrap_err();
        assert!(matches!(err, CliError::NotFound(_)));
    }

    #[test]
    fn string_keys_are_unquoted() {
        assert_eq!(display_key(&Value::String("abc".into())), "abc");
        assert_eq!(display_key(&serde_json::json!([1, 2])), "[1,2]");
    }
}
