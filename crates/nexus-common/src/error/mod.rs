//! Error handling for the workload generator.
//!
//! This module provides a unified error type and result alias used
//! across all generator components.

mod generator;

pub use generator::{ErrorCode, IterEndExt, NexusError};

/// Result type alias for generator operations.
pub type NexusResult<T> = std::result::Result<T, NexusError>;
