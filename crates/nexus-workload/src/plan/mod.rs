//! Execution-plan assembly for the write-path scenarios.
//!
//! Two canonical operator trees are built over the same node set:
//!
//! ```text
//! Modify
//!   Filter | InsertFilter
//!     Merge
//!       SnapshotScan
//!       IncomingScan
//! ```
//!
//! The insert scenario feeds an empty snapshot; the conditional update feeds
//! the freshly materialized rows and adds a `(col OR 0) > 0` predicate.

mod builder;
mod operator;

use std::fmt;
use std::sync::Arc;

pub use builder::PlanBuilder;
pub use operator::{
    FilterOperator, IncomingScanOperator, InsertFilterOperator, MergeOperator, ModifyOperator,
    PlanOperator, ScanType, SnapshotScanOperator,
};

use nexus_common::PLAN_FROZEN_VERSION;

/// Which scenario a plan realizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Plain insert.
    Insert,
    /// Update rows whose integer column is positive.
    UpdateIfGtZero,
}

impl Scenario {
    /// Returns the scenario name.
    pub const fn name(self) -> &'static str {
        match self {
            Scenario::Insert => "insert",
            Scenario::UpdateIfGtZero => "update_if_gt0",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata about an assembled plan.
#[derive(Debug, Clone)]
pub struct PlanMetadata {
    /// Schema version the plan was frozen against.
    pub frozen_version: i64,
    /// Scenario realized by the plan.
    pub scenario: Scenario,
    /// Target table name.
    pub table: String,
    /// Rows carried by the incoming side.
    pub row_count: usize,
}

/// An assembled operator tree.
#[derive(Debug, Clone)]
pub struct PhysicalPlan {
    /// Root operator of the plan.
    pub root: Arc<PlanOperator>,
    /// Plan-level metadata.
    pub metadata: PlanMetadata,
}

impl PhysicalPlan {
    /// Creates a plan.
    pub fn new(root: Arc<PlanOperator>, scenario: Scenario, table: impl Into<String>) -> Self {
        Self {
            root,
            metadata: PlanMetadata {
                frozen_version: PLAN_FROZEN_VERSION,
                scenario,
                table: table.into(),
                row_count: 0,
            },
        }
    }

    /// Sets the row count.
    pub fn with_row_count(mut self, rows: usize) -> Self {
        self.metadata.row_count = rows;
        self
    }

    /// Returns the root operator.
    pub fn root(&self) -> &PlanOperator {
        &self.root
    }

    /// Generates an indented description of the plan.
    pub fn explain(&self, verbose: bool) -> String {
        let mut output = String::new();
        Self::explain_recursive(&self.root, 0, verbose, &mut output);
        output
    }

    fn explain_recursive(op: &PlanOperator, indent: usize, verbose: bool, output: &mut String) {
        output.push_str(&"  ".repeat(indent));
        output.push_str(op.name());

        match op {
            PlanOperator::Modify(modify) => {
                output.push_str(&format!(" (table={})", modify.table_id));
            }
            PlanOperator::InsertFilter(filter) => {
                output.push_str(&format!(" (rows={})", filter.values.len()));
            }
            PlanOperator::Filter(filter) => {
                output.push_str(&format!(" (predicates={})", filter.predicates.len()));
                if verbose {
                    for predicate in &filter.predicates {
                        output.push_str(&format!(" [{predicate}]"));
                    }
                }
            }
            PlanOperator::Merge(merge) => {
                if merge.is_ups_row {
                    output.push_str(" (ups_row)");
                }
            }
            PlanOperator::SnapshotScan(scan) => {
                output.push_str(&format!(
                    " (rows={}, cols={})",
                    scan.rows.len(),
                    scan.row_desc.len()
                ));
                if verbose {
                    for row in scan.rows.iter() {
                        output.push_str(&format!(" {row}"));
                    }
                }
            }
            PlanOperator::IncomingScan(scan) => {
                output.push_str(&format!(
                    " (type={:?}, keys={}, cells={}",
                    scan.scan_type,
                    scan.lookup_keys.len(),
                    scan.get.len()
                ));
                if scan.write_lock {
                    output.push_str(", lock");
                }
                output.push(')');
            }
        }

        output.push('\n');

        for child in op.children() {
            Self::explain_recursive(child, indent + 1, verbose, output);
        }
    }

    /// Generates a tree visualization of the plan.
    pub fn display_tree(&self) -> String {
        let mut output = String::new();
        Self::display_tree_recursive(&self.root, "", true, &mut output);
        output
    }

    fn display_tree_recursive(op: &PlanOperator, prefix: &str, is_last: bool, output: &mut String) {
        let connector = if is_last { "\\-- " } else { "|-- " };
        output.push_str(prefix);
        output.push_str(connector);
        output.push_str(op.name());
        output.push('\n');

        let children = op.children();
        let child_prefix = format!("{}{}   ", prefix, if is_last { " " } else { "|" });
        for (i, child) in children.iter().enumerate() {
            let is_last_child = i == children.len() - 1;
            Self::display_tree_recursive(child, &child_prefix, is_last_child, output);
        }
    }

    /// Counts the operators in the plan.
    pub fn operator_count(&self) -> usize {
        fn count(op: &PlanOperator) -> usize {
            1 + op.children().iter().map(|c| count(c)).sum::<usize>()
        }
        count(&self.root)
    }

    /// Returns the depth of the plan tree.
    pub fn depth(&self) -> usize {
        fn depth(op: &PlanOperator) -> usize {
            1 + op.children().iter().map(|c| depth(c)).max().unwrap_or(0)
        }
        depth(&self.root)
    }

    /// Collects all operators matching `predicate`, pre-order.
    pub fn find_operators<F>(&self, predicate: F) -> Vec<&PlanOperator>
    where
        F: Fn(&PlanOperator) -> bool,
    {
        let mut result = Vec::new();
        Self::collect_operators(&self.root, &predicate, &mut result);
        result
    }

    fn collect_operators<'a, F>(
        op: &'a PlanOperator,
        predicate: &F,
        result: &mut Vec<&'a PlanOperator>,
    ) where
        F: Fn(&PlanOperator) -> bool,
    {
        if predicate(op) {
            result.push(op);
        }
        for child in op.children() {
            Self::collect_operators(child, predicate, result);
        }
    }
}

impl fmt::Display for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain(false))
    }
}
