//! Benchmark support for seglog.

pub mod utils;
