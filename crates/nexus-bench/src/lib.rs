//! NexusDB Workload Generator Benchmarks
//!
//! This crate contains benchmarks for the workload generator:
//! - Table, column and rowkey selection
//! - Get, scan and mutator assembly
//! - Row materialization and scenario plans
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p nexus-bench
//! ```

pub mod utils;
