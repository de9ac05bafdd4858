//! Configuration for the workload generator.
//!
//! The configuration is an explicit value threaded into every assembler;
//! nothing reads process-wide state.

mod generator;

pub use generator::{GeneratorConfig, GeneratorConfigBuilder, RowkeyMode, WriteType};
