//! # seglog testkit
//!
//! Test utilities for seglog journals.
//!
//! This crate provides:
//! - Temporary journal fixtures on disk and in memory
//! - Property-based test generators using proptest
//! - Crash and corruption helpers that damage segment files
//! - A model-checking harness and cross-crate scenario tests
//!
//! ## Usage
//!
//! ```rust
//! use seglog_testkit::prelude::*;
//!
//! let fixture = TempJournal::new();
//! fixture.append_all((1..=3u8).map(|i| vec![i; 8]));
//! assert_eq!(fixture.read_from(1).len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
