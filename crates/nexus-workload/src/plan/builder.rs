//! Scenario plan assembly.

use std::sync::Arc;

use tracing::{debug, error};

use nexus_common::{GeneratorConfig, NexusResult};

use super::operator::{
    FilterOperator, IncomingScanOperator, InsertFilterOperator, MergeOperator, ModifyOperator,
    PlanOperator, SnapshotScanOperator,
};
use super::{PhysicalPlan, Scenario};
use crate::catalog::SchemaCatalog;
use crate::expr::PostfixExpr;
use crate::row::{RowBatch, RowBuilder};
use crate::seed::Seed;

/// Assembles scenario plans from materialized rows.
#[derive(Debug)]
pub struct PlanBuilder<'c, C: SchemaCatalog + ?Sized> {
    catalog: &'c C,
    config: GeneratorConfig,
}

/// Leaves and row data shared by both scenarios.
struct Inputs {
    rows: RowBuilder,
    values: RowBatch,
    merge_snapshot: Arc<PlanOperator>,
    merge_incoming: Arc<PlanOperator>,
}

impl<'c, C: SchemaCatalog + ?Sized> PlanBuilder<'c, C> {
    /// Creates a plan builder.
    pub fn new(catalog: &'c C, config: GeneratorConfig) -> Self {
        Self { catalog, config }
    }

    /// Builds the insert plan: `row_count` rows of `table` drawn from `seed`,
    /// an empty snapshot, and an insert filter carrying the row literals.
    ///
    /// # Errors
    ///
    /// Returns the first failing step: table or column selection, row
    /// materialization, or literal conversion.
    pub fn build_insert(
        &self,
        table: &str,
        seed: Seed,
        row_count: usize,
    ) -> NexusResult<PhysicalPlan> {
        let inputs = self.build_inputs(table, seed, row_count, Scenario::Insert)?;

        let literals = inputs.rows.build_expr_values(&inputs.values).map_err(|e| {
            error!(table, error = %e, "build insert values failed");
            e
        })?;
        let merge = Self::merge(inputs.merge_snapshot, inputs.merge_incoming);
        let filter = Arc::new(PlanOperator::InsertFilter(InsertFilterOperator::new(
            merge, literals,
        )));

        Ok(self.finish(filter, &inputs.rows, Scenario::Insert, row_count))
    }

    /// Builds the conditional update plan: the snapshot holds the rows drawn
    /// from `seed` and the filter keeps rows whose first integer payload
    /// column is positive.
    ///
    /// # Errors
    ///
    /// As [`PlanBuilder::build_insert`], plus `EntryNotExist` when the row
    /// descriptor has no integer payload column.
    pub fn build_update_if_gt0(
        &self,
        table: &str,
        seed: Seed,
        row_count: usize,
    ) -> NexusResult<PhysicalPlan> {
        let inputs = self.build_inputs(table, seed, row_count, Scenario::UpdateIfGtZero)?;

        let column = inputs.rows.first_int_column().map_err(|e| {
            error!(table, error = %e, "no predicate column");
            e
        })?;
        let predicate = PostfixExpr::gt_zero(column.table_id, column.column_id);
        debug!(table, predicate = %predicate, "update predicate");

        let merge = Self::merge(inputs.merge_snapshot, inputs.merge_incoming);
        let filter = Arc::new(PlanOperator::Filter(
            FilterOperator::new(merge).with_predicate(predicate),
        ));

        Ok(self.finish(filter, &inputs.rows, Scenario::UpdateIfGtZero, row_count))
    }

    fn build_inputs(
        &self,
        table: &str,
        seed: Seed,
        row_count: usize,
        scenario: Scenario,
    ) -> NexusResult<Inputs> {
        let rows = RowBuilder::new(self.catalog, table, seed, &self.config).map_err(|e| {
            error!(table, seed = seed.as_u64(), error = %e, "row descriptor failed");
            e
        })?;
        let values = rows.build_values(seed, row_count)?;
        let rowkeys = rows.build_rowkey_values(seed, row_count)?;

        let snapshot_rows = match scenario {
            Scenario::Insert => RowBatch::new(),
            Scenario::UpdateIfGtZero => values.clone(),
        };
        let snapshot = Arc::new(PlanOperator::SnapshotScan(SnapshotScanOperator {
            row_desc: rows.row_desc().clone(),
            rowkey_desc: rows.rowkey_desc().clone(),
            rows: snapshot_rows,
        }));

        let lookup_keys = rows.build_rowkey_expr_values(&rowkeys)?;
        let get = rows.build_get_param(&values)?;
        let incoming = Arc::new(PlanOperator::IncomingScan(IncomingScanOperator::multi_get(
            lookup_keys,
            get,
        )));

        Ok(Inputs {
            rows,
            values,
            merge_snapshot: snapshot,
            merge_incoming: incoming,
        })
    }

    fn merge(snapshot: Arc<PlanOperator>, incoming: Arc<PlanOperator>) -> Arc<PlanOperator> {
        Arc::new(PlanOperator::Merge(MergeOperator::new(snapshot, incoming)))
    }

    fn finish(
        &self,
        filter: Arc<PlanOperator>,
        rows: &RowBuilder,
        scenario: Scenario,
        row_count: usize,
    ) -> PhysicalPlan {
        let table = rows.table();
        let modify = Arc::new(PlanOperator::Modify(ModifyOperator::new(filter, table.table_id)));
        let plan =
            PhysicalPlan::new(modify, scenario, table.name.clone()).with_row_count(row_count);
        debug!(
            scenario = %scenario,
            table = %table.name,
            rows = row_count,
            arena_bytes = rows.arena_bytes_used(),
            "plan assembled"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnSchema, ColumnType, MemoryCatalog, TableSchema};
    use nexus_common::{ErrorCode, RowkeyMode, TableId, PLAN_FROZEN_VERSION};

    fn catalog() -> MemoryCatalog {
        let table = TableSchema::new(1001, "t")
            .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
            .with_column(ColumnSchema::new(17, "n", ColumnType::Int))
            .with_rowkey(&["k"])
            .unwrap();
        let strings = TableSchema::new(1002, "s")
            .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
            .with_column(ColumnSchema::new(17, "v", ColumnType::Varchar))
            .with_rowkey(&["k"])
            .unwrap();
        MemoryCatalog::new()
            .with_table(table)
            .unwrap()
            .with_table(strings)
            .unwrap()
    }

    fn builder(catalog: &MemoryCatalog) -> PlanBuilder<'_, MemoryCatalog> {
        PlanBuilder::new(catalog, GeneratorConfig::default())
    }

    #[test]
    fn test_insert_shape() {
        let catalog = catalog();
        let plan = builder(&catalog).build_insert("t", Seed::new(9), 4).unwrap();

        assert_eq!(plan.operator_count(), 5);
        assert_eq!(plan.depth(), 4);
        assert_eq!(plan.metadata.frozen_version, PLAN_FROZEN_VERSION);
        assert_eq!(plan.metadata.row_count, 4);

        let PlanOperator::Modify(modify) = plan.root() else {
            panic!("root is not Modify");
        };
        assert_eq!(modify.table_id, TableId::new(1001));
        let PlanOperator::InsertFilter(filter) = modify.input.as_ref() else {
            panic!("expected InsertFilter");
        };
        assert_eq!(filter.values.len(), 4);

        let snapshots = plan.find_operators(|op| matches!(op, PlanOperator::SnapshotScan(_)));
        let PlanOperator::SnapshotScan(snapshot) = snapshots[0] else {
            unreachable!();
        };
        assert!(snapshot.rows.is_empty());
    }

    #[test]
    fn test_update_predicate() {
        let catalog = catalog();
        let plan = builder(&catalog)
            .build_update_if_gt0("t", Seed::new(9), 3)
            .unwrap();

        let filters = plan.find_operators(|op| matches!(op, PlanOperator::Filter(_)));
        let PlanOperator::Filter(filter) = filters[0] else {
            unreachable!();
        };
        assert_eq!(filter.predicates.len(), 1);
        assert_eq!(filter.predicates[0].to_string(), "col(1001,17) 0 OR/2 0 GT/2");

        let scans = plan.find_operators(|op| matches!(op, PlanOperator::SnapshotScan(_)));
        let PlanOperator::SnapshotScan(snapshot) = scans[0] else {
            unreachable!();
        };
        assert_eq!(snapshot.rows.len(), 3);
    }

    #[test]
    fn test_incoming_is_locking_multi_get() {
        let catalog = catalog();
        let plan = builder(&catalog).build_insert("t", Seed::new(1), 2).unwrap();
        let scans = plan.find_operators(|op| matches!(op, PlanOperator::IncomingScan(_)));
        let PlanOperator::IncomingScan(scan) = scans[0] else {
            unreachable!();
        };
        assert_eq!(scan.scan_type, crate::plan::ScanType::MultiGet);
        assert!(scan.write_lock);
        assert_eq!(scan.lookup_keys.len(), 2);
        assert_eq!(scan.get.len(), 2 * 2);
    }

    #[test]
    fn test_update_without_int_payload() {
        let catalog = catalog();
        let err = builder(&catalog)
            .build_update_if_gt0("s", Seed::new(1), 1)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EntryNotExist);
    }

    #[test]
    fn test_legacy_not_supported() {
        let catalog = catalog();
        let config = GeneratorConfig::builder()
            .rowkey_mode(RowkeyMode::Legacy)
            .build();
        let err = PlanBuilder::new(&catalog, config)
            .build_insert("t", Seed::new(1), 1)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotSupported);
    }

    #[test]
    fn test_display_tree() {
        let catalog = catalog();
        let plan = builder(&catalog).build_insert("t", Seed::new(1), 1).unwrap();
        let tree = plan.display_tree();
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines[0], "\\-- Modify");
        assert_eq!(lines[3], "            |-- SnapshotScan");
        assert_eq!(lines[4], "            \\-- IncomingScan");
        assert!(plan.to_string().starts_with("Modify (table=1001)"));
    }
}
