//! Verify command implementation.

use super::{display_key, load, CliError};
use std::collections::HashMap;
use std::path::Path;
use trackfile_codec::Format;

/// Verification result.
#[derive(Debug)]
pub struct VerifyResult {
    /// Number of records checked.
    pub records_checked: usize,
    /// Keys that occur more than once, with their record positions.
    pub duplicates: Vec<(String, Vec<usize>)>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.duplicates.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path, format: Option<Format>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {}", path.display());
    println!();

    let result = verify(path, format)?;
    println!("Records checked: {}", result.records_checked);
    for (key, positions) in &result.duplicates {
        println!("  Duplicate key {key} at records {positions:?}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

/// Decodes the store at `path` and looks for duplicate keys.
pub fn verify(path: &Path, format: Option<Format>) -> Result<VerifyResult, CliError> {
    let store = load(path, format)?;

    let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order = Vec::new();
    for (index, record) in store.records.iter().enumerate() {
        let key = display_key(&record.key);
        let seen = positions.entry(key.clone()).or_default();
        if seen.is_empty() {
            order.push(key);
        }
        seen.push(index);
    }

    let duplicates = order
        .into_iter()
        .filter_map(|key| {
            let found = positions.remove(&key)?;
            (found.len() > 1).then_some((key, found))
        })
        .collect();

    Ok(VerifyResult {
        records_checked: store.records.len(),
        duplicates,
    })
}
