//! Catalog identifier types.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing a column id from being passed where a table id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{APP_MIN_TABLE_ID, APP_TABLE_ID_WINDOW};

/// Table identifier - uniquely identifies a table in the schema catalog.
///
/// Cells of a request carry either a table id or a table name. Cells built by
/// name carry [`TableId::INVALID`]; some administrative operations carry it too.
///
/// # Example
///
/// ```rust
/// use nexus_common::types::TableId;
///
/// let table = TableId::new(1001);
/// assert!(table.is_valid());
/// assert!(table.is_application());
/// assert!(!TableId::INVALID.is_valid());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u64);

impl TableId {
    /// Invalid table ID constant, used as a sentinel value.
    pub const INVALID: Self = Self(u64::MAX);

    /// Creates a new `TableId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid table ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Checks if this id falls in the application (user) table window.
    #[inline]
    #[must_use]
    pub const fn is_application(self) -> bool {
        self.0 >= APP_MIN_TABLE_ID && self.0 < APP_MIN_TABLE_ID + APP_TABLE_ID_WINDOW
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TableId(INVALID)")
        } else {
            write!(f, "TableId({})", self.0)
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TableId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<TableId> for u64 {
    #[inline]
    fn from(id: TableId) -> Self {
        id.0
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Column identifier - identifies a column within one table.
///
/// Whole-row deletes and some administrative operations carry
/// [`ColumnId::INVALID`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ColumnId(u64);

impl ColumnId {
    /// Invalid column ID constant, used as a sentinel value.
    pub const INVALID: Self = Self(u64::MAX);

    /// Creates a new `ColumnId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid column ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "ColumnId(INVALID)")
        } else {
            write!(f, "ColumnId({})", self.0)
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ColumnId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<ColumnId> for u64 {
    #[inline]
    fn from(id: ColumnId) -> Self {
        id.0
    }
}

impl Default for ColumnId {
    fn default() -> Self {
        Self::INVALID
    }
}
