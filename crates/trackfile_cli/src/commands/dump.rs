//! Dump command implementation.

use super::{load, CliError};
use std::path::Path;
use trackfile_codec::{DynamicRecord, Format};
use trackfile_core::paginate;

/// Runs the dump command.
pub fn run(
    path: &Path,
    format: Option<Format>,
    limit: Option<usize>,
    offset: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    for record in select(path, format, limit, offset)? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

/// Returns the records after skipping `offset`, at most `limit` of them.
pub fn select(
    path: &Path,
    format: Option<Format>,
    limit: Option<usize>,
    offset: usize,
) -> Result<Vec<DynamicRecord>, CliError> {
    let store = load(path, format)?;
    let remaining = store.records.into_iter().skip(offset);

    Ok(match limit {
        // page 1 of size n is the first n records
        Some(limit) if limit > 0 => paginate(remaining, 1, limit),
        Some(_) => Vec::new(),
        None => remaining.collect(),
    })
}
