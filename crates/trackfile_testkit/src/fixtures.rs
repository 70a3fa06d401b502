//! Test fixtures.
//!
//! Temporary directories and sample entity types shared by the test suites.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trackfile_core::{Entity, Tracked};
use uuid::Uuid;

/// A temporary directory removed when dropped.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path of `name` inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

/// A sample entity keyed by a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u32,
}

impl Person {
    /// Creates a person with a random identifier.
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            age,
        }
    }

    /// Creates a tracked person with a random identifier.
    pub fn tracked(name: &str, age: u32) -> Tracked<Self> {
        Tracked::new(Self::new(name, age))
    }
}

impl Entity for Person {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A sample single-entity settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Environment name.
    pub environment: String,
    /// Maximum number of items per page.
    pub page_size: usize,
    /// Enabled feature flags.
    pub features: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: "test".to_string(),
            page_size: 25,
            features: Vec::new(),
        }
    }
}

/// Creates `count` tracked people named `person-0`, `person-1`, ...
pub fn people(count: usize) -> Vec<Tracked<Person>> {
    (0..count)
        .map(|i| Person::tracked(&format!("person-{i}"), 20 + (i % 50) as u32))
        .collect()
}
