//! Type definitions shared by the generator crates.
//!
//! This module contains the catalog identifier types.

mod ids;

pub use ids::{ColumnId, TableId};
