//! # nexus-workload
//!
//! Deterministic, schema-driven workload generation for NexusDB.
//!
//! Given a schema catalog and an integer seed, this crate reproducibly builds:
//! - point-get and multi-get requests
//! - range-scan requests
//! - row mutation batches (updates or whole-row deletes)
//! - insert and conditional-update operator trees
//!
//! The same seed against the same catalog always yields the same output.
//! Catalogs are shared read-only; every generation call owns its seed and a
//! bounded scratch arena, so calls with different seeds may run on different
//! threads without coordination.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Request assemblers
pub mod assemble;

/// Schema catalog
pub mod catalog;

/// Postfix expressions
pub mod expr;

/// Table name patterns
pub mod pattern;

/// Execution-plan assembly
pub mod plan;

/// Engine request objects
pub mod request;

/// Name resolution
pub mod resolve;

/// Row materialization
pub mod row;

/// Seeds and the seeded RNG
pub mod seed;

/// Deterministic selection
pub mod selector;

/// Typed values and rowkeys
pub mod value;

pub use assemble::Generator;
pub use catalog::{ColumnSchema, ColumnType, MemoryCatalog, SchemaCatalog, TableSchema};
pub use plan::{PhysicalPlan, PlanBuilder, PlanOperator};
pub use request::{mutator_add, GetRequest, Mutator, ScanRequest};
pub use row::{RowBatch, RowBuilder};
pub use seed::Seed;
pub use value::{Rowkey, Value};
