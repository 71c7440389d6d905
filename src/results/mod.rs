//! Result types, tables and normalization
//!
//! This module defines the typed result records shown to the user and
//! the normalizer that builds them from raw provider output.

pub mod normalize;
mod table;
mod types;

pub use normalize::{normalize, Normalized};
pub use table::ResultTable;
pub use types::*;
