//! System-wide constants for the workload generator.
//!
//! Values mirror the limits of the storage engine the generated requests are
//! submitted to.

// =============================================================================
// Catalog Constants
// =============================================================================

/// Smallest table id assigned to application (user) tables.
///
/// Ids below this value belong to system tables and are never picked by the
/// "any" table selector.
pub const APP_MIN_TABLE_ID: u64 = 1001;

/// Width of the application table-id window scanned by the "any" selector.
///
/// A table is eligible when `APP_MIN_TABLE_ID <= id < APP_MIN_TABLE_ID + APP_TABLE_ID_WINDOW`.
pub const APP_TABLE_ID_WINDOW: u64 = 10_000;

/// Maximum encoded rowkey length in bytes.
pub const MAX_ROWKEY_LENGTH: usize = 16 * 1024;

/// Table-name pattern that selects among all application tables.
pub const ANY_TABLE: &str = "any";

// =============================================================================
// Selection Constants
// =============================================================================

/// Attempts made by the column rejection sampler before giving up.
pub const DEFAULT_COLUMN_RETRY_BUDGET: usize = 1000;

/// Number of non-rowkey columns added to a materialized row descriptor.
pub const DEFAULT_MAX_PAYLOAD_COLUMNS: usize = 1;

/// Upper bound on generated varchar lengths when a column declares no size.
pub const DEFAULT_VARCHAR_LENGTH: usize = 32;

// =============================================================================
// Request Constants
// =============================================================================

/// Result-count limit attached to every generated scan.
pub const DEFAULT_SCAN_LIMIT: u64 = 200;

/// First major version produced by the engine; used as the version floor of
/// multi-get requests built from materialized rows.
pub const START_MAJOR_VERSION: i64 = 2;

/// Frozen version reported by generated execution plans.
pub const PLAN_FROZEN_VERSION: i64 = 1;

// =============================================================================
// Memory Constants
// =============================================================================

/// Default scratch arena size for one generator invocation (2 MB).
pub const DEFAULT_ARENA_SIZE: usize = 2 * 1024 * 1024;

/// Size classes expressed in bytes.
pub mod size {
    /// 1 Kilobyte.
    pub const KB: usize = 1024;
    /// 1 Megabyte.
    pub const MB: usize = 1024 * KB;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_window_is_non_empty() {
        assert!(APP_TABLE_ID_WINDOW > 0);
        assert!(APP_MIN_TABLE_ID.checked_add(APP_TABLE_ID_WINDOW).is_some());
    }

    #[test]
    fn test_arena_size() {
        assert_eq!(DEFAULT_ARENA_SIZE, 2 * size::MB);
    }
}
