//! # nexus-common
//!
//! Common types, errors, and utilities for the NexusDB workload generator.
//!
//! This crate provides the foundational pieces shared by the generator crates:
//!
//! - **Types**: Catalog identifiers (`TableId`, `ColumnId`)
//! - **Errors**: Unified error handling with `NexusError`
//! - **Config**: Generator configuration (`GeneratorConfig`)
//! - **Memory**: The bounded scratch `Arena` used by one generator invocation
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use nexus_common::types::{ColumnId, TableId};
//! use nexus_common::error::NexusResult;
//!
//! fn example() -> NexusResult<()> {
//!     let table = TableId::new(1001);
//!     let column = ColumnId::new(16);
//!     assert!(table.is_valid() && column.is_valid());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod memory;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::{GeneratorConfig, RowkeyMode, WriteType};
pub use constants::*;
pub use error::{ErrorCode, IterEndExt, NexusError, NexusResult};
pub use memory::Arena;
pub use types::{ColumnId, TableId};
