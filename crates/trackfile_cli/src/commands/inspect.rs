//! Inspect command implementation.

use super::{display_key, load};
use serde::Serialize;
use std::path::Path;
use trackfile_codec::Format;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store file path.
    pub path: String,
    /// Format used to decode the file.
    pub format: Format,
    /// File size in bytes.
    pub size: u64,
    /// Number of records.
    pub record_count: usize,
    /// Record keys in file order.
    pub keys: Vec<String>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: Option<Format>, output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path, format)?;

    match output {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects the inspection result for the store at `path`.
pub fn inspect(path: &Path, format: Option<Format>) -> Result<InspectResult, super::CliError> {
    let store = load(path, format)?;

    Ok(InspectResult {
        path: path.display().to_string(),
        format: store.format,
        size: store.size,
        record_count: store.records.len(),
        keys: store.records.iter().map(|r| display_key(&r.key)).collect(),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("trackfile Store Inspection");
    println!("==========================");
    println!();
    println!("Path:    {}", result.path);
    println!("Format:  {}", result.format);
    println!("Size:    {}", format_size(result.size));
    println!("Records: {}", result.record_count);

    if !result.keys.is_empty() {
        println!();
        println!("Keys:");
        for key in &result.keys {
            println!("  {key}");
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trackfile_codec::{encode_records, Record};

    #[test]
    fn inspect_lists_keys_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.json");
        let records = vec![
            Record::new("b".to_string(), 2u32),
            Record::new("a".to_string(), 1u32),
        ];
        std::fs::write(&path, encode_records(Format::Json, &records).unwrap()).unwrap();

        let result = inspect(&path, None).unwrap();
        assert_eq!(result.record_count, 2);
        assert_eq!(result.keys, vec!["b", "a"]);
        assert_eq!(result.format, Format::Json);
    }

    #[test]
    fn empty_file_has_no_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.json");
        std::fs::write(&path, b"").unwrap();

        let result = inspect(&path, None).unwrap();
        assert_eq!(result.record_count, 0);
        assert_eq!(result.size, 0);
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(10), "10 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
