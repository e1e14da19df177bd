//! Report generation for lookup batches.

pub mod generator;

pub use generator::*;
