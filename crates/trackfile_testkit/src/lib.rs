//! # trackfile testkit
//!
//! Test utilities for trackfile.
//!
//! This crate provides:
//! - Test fixtures: temporary directories and sample entities
//! - Property-based test generators using proptest
//! - Integration helpers: raw record access and recording fakes for sagas
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trackfile_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn saves_people() {
//!     let dir = TestDir::new();
//!     let context = FileStorageContext::new();
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
