//! Plan operators for the write-path test scenarios.
//!
//! Operators form an immutable tree: each node owns its children through
//! `Arc`, so a finished plan can be shared and inspected but never rewired.

use std::fmt;
use std::sync::Arc;

use nexus_common::TableId;

use crate::expr::{ExprValues, PostfixExpr};
use crate::request::GetRequest;
use crate::row::{RowBatch, RowDesc};

/// A plan operator.
#[derive(Debug, Clone)]
pub enum PlanOperator {
    /// Applies the filtered rows to the table.
    Modify(ModifyOperator),

    /// Built-in insert semantics: drops rows whose key already exists.
    InsertFilter(InsertFilterOperator),

    /// Predicate filter.
    Filter(FilterOperator),

    /// Two-way merge of the current snapshot and the incoming writes.
    Merge(MergeOperator),

    /// Rows of the current visible state.
    SnapshotScan(SnapshotScanOperator),

    /// Rows looked up for the incoming writes.
    IncomingScan(IncomingScanOperator),
}

impl PlanOperator {
    /// Returns the child operators in wiring order.
    pub fn children(&self) -> Vec<&Arc<PlanOperator>> {
        match self {
            PlanOperator::SnapshotScan(_) | PlanOperator::IncomingScan(_) => vec![],

            PlanOperator::Modify(op) => vec![&op.input],
            PlanOperator::InsertFilter(op) => vec![&op.input],
            PlanOperator::Filter(op) => vec![&op.input],

            PlanOperator::Merge(op) => vec![&op.snapshot, &op.incoming],
        }
    }

    /// Returns the operator name.
    pub fn name(&self) -> &'static str {
        match self {
            PlanOperator::Modify(_) => "Modify",
            PlanOperator::InsertFilter(_) => "InsertFilter",
            PlanOperator::Filter(_) => "Filter",
            PlanOperator::Merge(_) => "Merge",
            PlanOperator::SnapshotScan(_) => "SnapshotScan",
            PlanOperator::IncomingScan(_) => "IncomingScan",
        }
    }

    /// Returns true for the filter stage of either scenario.
    pub fn is_filter(&self) -> bool {
        matches!(self, PlanOperator::InsertFilter(_) | PlanOperator::Filter(_))
    }
}

impl fmt::Display for PlanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Write Operators
// ============================================================================

/// Modify operator.
#[derive(Debug, Clone)]
pub struct ModifyOperator {
    /// Input operator.
    pub input: Arc<PlanOperator>,
    /// Target table.
    pub table_id: TableId,
}

impl ModifyOperator {
    /// Creates a new modify operator.
    pub fn new(input: Arc<PlanOperator>, table_id: TableId) -> Self {
        Self { input, table_id }
    }
}

// ============================================================================
// Filter Operators
// ============================================================================

/// Insert-semantics filter.
#[derive(Debug, Clone)]
pub struct InsertFilterOperator {
    /// Input operator.
    pub input: Arc<PlanOperator>,
    /// Literal values of the rows being inserted.
    pub values: ExprValues,
}

impl InsertFilterOperator {
    /// Creates a new insert filter.
    pub fn new(input: Arc<PlanOperator>, values: ExprValues) -> Self {
        Self { input, values }
    }
}

/// Predicate filter.
#[derive(Debug, Clone)]
pub struct FilterOperator {
    /// Input operator.
    pub input: Arc<PlanOperator>,
    /// Conjunctive predicates.
    pub predicates: Vec<PostfixExpr>,
}

impl FilterOperator {
    /// Creates a filter with no predicates.
    pub fn new(input: Arc<PlanOperator>) -> Self {
        Self {
            input,
            predicates: Vec::new(),
        }
    }

    /// Adds a predicate.
    pub fn with_predicate(mut self, predicate: PostfixExpr) -> Self {
        self.predicates.push(predicate);
        self
    }
}

// ============================================================================
// Merge and Scan Operators
// ============================================================================

/// Merge of the snapshot (child 0) and incoming (child 1) inputs.
#[derive(Debug, Clone)]
pub struct MergeOperator {
    /// Current visible state.
    pub snapshot: Arc<PlanOperator>,
    /// Incoming writes.
    pub incoming: Arc<PlanOperator>,
    /// Whether the inputs produce engine-internal update rows.
    pub is_ups_row: bool,
}

impl MergeOperator {
    /// Creates a merge over plain rows.
    pub fn new(snapshot: Arc<PlanOperator>, incoming: Arc<PlanOperator>) -> Self {
        Self {
            snapshot,
            incoming,
            is_ups_row: false,
        }
    }
}

/// Scan over an in-memory batch of rows.
#[derive(Debug, Clone)]
pub struct SnapshotScanOperator {
    /// Descriptor of the rows.
    pub row_desc: RowDesc,
    /// Rowkey descriptor.
    pub rowkey_desc: RowDesc,
    /// Rows returned.
    pub rows: RowBatch,
}

/// Scan mode of the incoming scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Point lookups of a key set.
    MultiGet,
    /// Key range.
    Range,
}

/// Lookup of the incoming keys.
#[derive(Debug, Clone)]
pub struct IncomingScanOperator {
    /// Scan mode.
    pub scan_type: ScanType,
    /// Rowkey literals to look up.
    pub lookup_keys: ExprValues,
    /// Multi-get by id over the materialized rows.
    pub get: GetRequest,
    /// Whether looked-up rows are write-locked.
    pub write_lock: bool,
}

impl IncomingScanOperator {
    /// Creates a locking multi-get scan.
    pub fn multi_get(lookup_keys: ExprValues, get: GetRequest) -> Self {
        Self {
            scan_type: ScanType::MultiGet,
            lookup_keys,
            get,
            write_lock: true,
        }
    }
}
