//! Row descriptors and row materialization.
//!
//! A [`RowBuilder`] fixes a descriptor for one table (rowkey columns first, in
//! declared rowkey order, then a few payload columns) and materializes rows
//! that conform to it. Row `i` of a batch is a function of `base_seed + i`
//! alone.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use nexus_common::{
    Arena, ColumnId, GeneratorConfig, NexusError, NexusResult, TableId, START_MAJOR_VERSION,
};

use crate::catalog::{ColumnSchema, ColumnType, SchemaCatalog, TableSchema};
use crate::expr::{ExprValues, PostfixExpr};
use crate::request::{make_version_range, CellInfo, GetRequest};
use crate::seed::{Seed, SeedRng};
use crate::selector::{random_value, Selector};
use crate::value::{Rowkey, Value};

/// One descriptor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDesc {
    /// Owning table.
    pub table_id: TableId,
    /// Column.
    pub column_id: ColumnId,
    /// Expected value type.
    pub data_type: ColumnType,
    /// Size bound for generated values.
    pub max_length: usize,
}

impl ColumnDesc {
    fn of(table: &TableSchema, column: &ColumnSchema) -> Self {
        Self {
            table_id: table.table_id,
            column_id: column.id,
            data_type: column.data_type,
            max_length: column.max_length,
        }
    }
}

/// Ordered column descriptor whose first `rowkey_count` entries are the
/// rowkey.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowDesc {
    columns: Vec<ColumnDesc>,
    rowkey_count: usize,
}

impl RowDesc {
    /// Returns every entry.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the descriptor is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the number of rowkey entries.
    #[must_use]
    pub fn rowkey_count(&self) -> usize {
        self.rowkey_count
    }

    /// Returns the rowkey entries.
    #[must_use]
    pub fn rowkey_prefix(&self) -> &[ColumnDesc] {
        &self.columns[..self.rowkey_count]
    }

    /// Returns the non-rowkey entries.
    #[must_use]
    pub fn payload(&self) -> &[ColumnDesc] {
        &self.columns[self.rowkey_count..]
    }

    /// Returns true if the descriptor contains `column_id`.
    #[must_use]
    pub fn contains(&self, column_id: ColumnId) -> bool {
        self.columns.iter().any(|c| c.column_id == column_id)
    }

    /// Returns true if `row` has one value per entry, each of the expected
    /// type.
    #[must_use]
    pub fn conforms(&self, row: &Row) -> bool {
        row.values.len() == self.columns.len()
            && self
                .columns
                .iter()
                .zip(&row.values)
                .all(|(desc, value)| value.conforms_to(desc.data_type))
    }
}

/// A materialized row aligned with a [`RowDesc`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Returns the values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the first `rowkey_count` values as a rowkey.
    #[must_use]
    pub fn rowkey(&self, rowkey_count: usize) -> Rowkey {
        Rowkey::Typed(self.values[..rowkey_count.min(self.values.len())].to_vec())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

/// A batch of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowBatch {
    rows: Vec<Row>,
}

impl RowBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

/// Builds schema-conformant rows for one table.
///
/// The builder owns the scratch arena its string values live in.
#[derive(Debug)]
pub struct RowBuilder {
    table: Arc<TableSchema>,
    arena: Arena,
    row_desc: RowDesc,
    rowkey_desc: RowDesc,
}

impl RowBuilder {
    /// Resolves `table` and fixes the row descriptors.
    ///
    /// The row descriptor holds the rowkey columns followed by up to
    /// `max_payload_columns` non-rowkey columns drawn with seeds
    /// `seed + 0, seed + 1, ...`; a column drawn twice is kept once.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` in legacy rowkey mode, and any selection error.
    pub fn new<C: SchemaCatalog + ?Sized>(
        catalog: &C,
        table: &str,
        seed: Seed,
        config: &GeneratorConfig,
    ) -> NexusResult<Self> {
        if !config.rowkey_mode.is_typed() {
            return Err(NexusError::not_supported("row materialization with legacy rowkeys"));
        }

        let arena = Arena::with_limit(config.arena_bytes);
        let (table, row_desc, rowkey_desc) = {
            let selector = Selector::new(catalog, &arena, config);
            let (table, _) = selector.choose_table(table, seed)?;

            let rowkey: Vec<ColumnDesc> = table
                .rowkey_columns()
                .map(|c| ColumnDesc::of(&table, c))
                .collect();
            let rowkey_desc = RowDesc {
                columns: rowkey.clone(),
                rowkey_count: rowkey.len(),
            };

            let mut row_desc = RowDesc {
                rowkey_count: rowkey.len(),
                columns: rowkey,
            };
            let payload = config
                .max_payload_columns
                .min(table.columns().len().saturating_sub(table.rowkey_len()));
            for i in 0..payload as u64 {
                let (column, _) = selector.choose_column(&table, seed.offset(i), true)?;
                if !row_desc.contains(column.id) {
                    row_desc.columns.push(ColumnDesc::of(&table, column));
                }
            }
            (table, row_desc, rowkey_desc)
        };

        debug!(
            table = %table.name,
            columns = row_desc.len(),
            rowkey = row_desc.rowkey_count(),
            "row descriptor ready"
        );
        Ok(Self {
            table,
            arena,
            row_desc,
            rowkey_desc,
        })
    }

    /// Returns the resolved table.
    #[must_use]
    pub fn table(&self) -> &Arc<TableSchema> {
        &self.table
    }

    /// Returns the full row descriptor.
    #[must_use]
    pub fn row_desc(&self) -> &RowDesc {
        &self.row_desc
    }

    /// Returns the rowkey-only descriptor.
    #[must_use]
    pub fn rowkey_desc(&self) -> &RowDesc {
        &self.rowkey_desc
    }

    /// Returns the rowkey column count.
    #[must_use]
    pub fn rowkey_size(&self) -> usize {
        self.rowkey_desc.len()
    }

    /// Returns the bytes of scratch storage used so far.
    #[must_use]
    pub fn arena_bytes_used(&self) -> usize {
        self.arena.bytes_used()
    }

    /// Materializes one row for `desc`.
    ///
    /// Values are drawn in descriptor order from one stream, so the rowkey
    /// prefix of a full row equals the rowkey-only row built from the same
    /// seed.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for a column type without a generator and
    /// `SizeOverflow` when the arena is exhausted.
    pub fn build_row(&self, desc: &RowDesc, seed: Seed) -> NexusResult<Row> {
        let mut rng = SeedRng::new(seed);
        let values = desc
            .columns
            .iter()
            .map(|c| random_value(c.data_type, c.max_length, &mut rng, &self.arena))
            .collect::<NexusResult<Vec<_>>>()?;
        Ok(Row { values })
    }

    /// Materializes `row_count` full rows from `base_seed`.
    ///
    /// # Errors
    ///
    /// See [`RowBuilder::build_row`].
    pub fn build_values(&self, base_seed: Seed, row_count: usize) -> NexusResult<RowBatch> {
        self.build_batch(&self.row_desc, base_seed, row_count)
    }

    /// Materializes `row_count` rowkey-only rows from `base_seed`.
    ///
    /// # Errors
    ///
    /// See [`RowBuilder::build_row`].
    pub fn build_rowkey_values(&self, base_seed: Seed, row_count: usize) -> NexusResult<RowBatch> {
        self.build_batch(&self.rowkey_desc, base_seed, row_count)
    }

    fn build_batch(
        &self,
        desc: &RowDesc,
        base_seed: Seed,
        row_count: usize,
    ) -> NexusResult<RowBatch> {
        let rows = (0..row_count as u64)
            .map(|i| self.build_row(desc, base_seed.offset(i)))
            .collect::<NexusResult<Vec<_>>>()
            .map_err(|e| {
                warn!(
                    table = %self.table.name,
                    base_seed = base_seed.as_u64(),
                    row_count,
                    error = %e,
                    "build rows failed"
                );
                e
            })?;
        Ok(RowBatch { rows })
    }

    /// Turns full rows into a multi-get by id: one cell per descriptor
    /// column, keyed by the row's rowkey prefix, with the start major version
    /// as version floor.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a row does not match the row descriptor.
    pub fn build_get_param(&self, batch: &RowBatch) -> NexusResult<GetRequest> {
        let mut get = GetRequest::new();
        get.version_range = make_version_range(START_MAJOR_VERSION);

        for row in batch.iter() {
            if row.values.len() != self.row_desc.len() {
                return Err(NexusError::internal(format!(
                    "row has {} values, descriptor has {}",
                    row.values.len(),
                    self.row_desc.len()
                )));
            }
            let rowkey = row.rowkey(self.rowkey_size());
            for desc in &self.row_desc.columns {
                get.add_cell(CellInfo::by_id(desc.table_id, rowkey.clone(), desc.column_id));
            }
        }
        Ok(get)
    }

    /// Turns rows into literal expression values.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for values other than integers and strings.
    pub fn build_expr_values(&self, batch: &RowBatch) -> NexusResult<ExprValues> {
        let mut values = ExprValues::new();
        for row in batch.iter() {
            let exprs = row
                .values
                .iter()
                .map(PostfixExpr::literal)
                .collect::<NexusResult<Vec<_>>>()?;
            values.push_row(exprs);
        }
        Ok(values)
    }

    /// Turns rows into literal rowkey expressions, one row per input row
    /// holding only its rowkey prefix.
    ///
    /// # Errors
    ///
    /// Same as [`RowBuilder::build_expr_values`].
    pub fn build_rowkey_expr_values(&self, batch: &RowBatch) -> NexusResult<ExprValues> {
        let rowkey_size = self.rowkey_size();
        let mut values = ExprValues::new();
        for row in batch.iter() {
            let exprs = row
                .values
                .iter()
                .take(rowkey_size)
                .map(PostfixExpr::literal)
                .collect::<NexusResult<Vec<_>>>()?;
            values.push_row(exprs);
        }
        Ok(values)
    }

    /// Returns the first integer column of the row descriptor at or after
    /// the rowkey boundary.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotExist` if there is none.
    pub fn first_int_column(&self) -> NexusResult<ColumnDesc> {
        self.row_desc.columns[self.rowkey_size()..]
            .iter()
            .find(|c| c.data_type == ColumnType::Int)
            .copied()
            .ok_or_else(|| {
                NexusError::entry_not_exist(format!(
                    "integer payload column in row of '{}'",
                    self.table.name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use nexus_common::{ErrorCode, RowkeyMode};

    fn catalog() -> MemoryCatalog {
        let table = TableSchema::new(1001, "t")
            .with_column(ColumnSchema::new(16, "v", ColumnType::Varchar).with_max_length(8))
            .with_column(ColumnSchema::new(17, "b", ColumnType::Varchar).with_max_length(4))
            .with_column(ColumnSchema::new(18, "a", ColumnType::Int))
            .with_column(ColumnSchema::new(19, "c", ColumnType::Int))
            .with_rowkey(&["a", "b"])
            .unwrap();
        MemoryCatalog::new().with_table(table).unwrap()
    }

    fn config(payload: usize) -> GeneratorConfig {
        GeneratorConfig::builder().max_payload_columns(payload).build()
    }

    #[test]
    fn test_rowkey_prefix_order() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(1), &config(1)).unwrap();
        let ids: Vec<u64> = builder
            .row_desc()
            .rowkey_prefix()
            .iter()
            .map(|c| c.column_id.as_u64())
            .collect();
        assert_eq!(ids, vec![18, 17]);
        assert_eq!(builder.rowkey_size(), 2);
        assert_eq!(builder.row_desc().len(), 3);
        assert!(builder
            .row_desc()
            .payload()
            .iter()
            .all(|c| c.column_id.as_u64() == 16 || c.column_id.as_u64() == 19));
    }

    #[test]
    fn test_payload_bounded_by_columns() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(4), &config(10)).unwrap();
        assert!(builder.row_desc().payload().len() <= 2);
        assert!(!builder.row_desc().payload().is_empty());
    }

    #[test]
    fn test_rows_conform() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(2), &config(2)).unwrap();
        let batch = builder.build_values(Seed::new(100), 16).unwrap();
        assert_eq!(batch.len(), 16);
        for row in batch.iter() {
            assert!(builder.row_desc().conforms(row));
        }
    }

    #[test]
    fn test_row_reproducible_from_index() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(2), &config(1)).unwrap();
        let batch = builder.build_values(Seed::new(100), 5).unwrap();
        let single = builder.build_row(builder.row_desc(), Seed::new(103)).unwrap();
        assert_eq!(batch.rows()[3], single);
    }

    #[test]
    fn test_rowkey_batch_matches_prefix() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(2), &config(1)).unwrap();
        let full = builder.build_values(Seed::new(7), 4).unwrap();
        let keys = builder.build_rowkey_values(Seed::new(7), 4).unwrap();
        for (row, key) in full.iter().zip(keys.iter()) {
            assert_eq!(&row.values()[..2], key.values());
        }
    }

    #[test]
    fn test_get_param_by_id() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(2), &config(1)).unwrap();
        let batch = builder.build_values(Seed::new(7), 3).unwrap();
        let get = builder.build_get_param(&batch).unwrap();

        assert_eq!(get.len(), 3 * builder.row_desc().len());
        assert_eq!(get.version_range.unwrap().start_version, START_MAJOR_VERSION);
        let cell = &get.cells()[0];
        assert_eq!(cell.table_id, TableId::new(1001));
        assert_eq!(cell.rowkey, batch.rows()[0].rowkey(2));
    }

    #[test]
    fn test_expr_values() {
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(2), &config(1)).unwrap();
        let batch = builder.build_values(Seed::new(7), 2).unwrap();
        let exprs = builder.build_expr_values(&batch).unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs.rows()[0].len(), builder.row_desc().len());

        let keys = builder.build_rowkey_expr_values(&batch).unwrap();
        assert_eq!(keys.rows()[1].len(), 2);
        assert_eq!(keys.rows()[1][..], exprs.rows()[1][..2]);
    }

    #[test]
    fn test_legacy_not_supported() {
        let config = GeneratorConfig::builder()
            .rowkey_mode(RowkeyMode::Legacy)
            .build();
        let err = RowBuilder::new(&catalog(), "t", Seed::new(1), &config).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotSupported);
    }

    #[test]
    fn test_arena_overflow_reported() {
        let config = GeneratorConfig::builder().arena_bytes(16).build();
        let builder = RowBuilder::new(&catalog(), "t", Seed::new(1), &config).unwrap();
        let err = builder.build_values(Seed::new(1), 100).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SizeOverflow);
    }
}
