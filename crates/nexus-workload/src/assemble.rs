//! Request assemblers.
//!
//! A [`Generator`] turns seeds into populated get, scan and mutator requests.
//! Every public operation allocates its own scratch arena, which is released
//! when the operation returns, and reads the catalog only.
//!
//! Assemblers append to the request they are given and stop at the first
//! failing step. A request that was being populated when an error was
//! returned is half-built and must be discarded.

use tracing::{debug, warn};

use nexus_common::{
    Arena, ColumnId, GeneratorConfig, NexusError, NexusResult, TableId, WriteType,
};

use crate::catalog::SchemaCatalog;
use crate::request::{
    make_version_range, CellInfo, GetRequest, Mutator, RowkeyRange, ScanLimit, ScanRequest,
};
use crate::seed::Seed;
use crate::selector::{RowkeySpec, Selector};

/// Seeded request generator over a read-only catalog.
///
/// A generator holds no mutable state, so one instance may be shared by any
/// number of threads.
///
/// # Example
///
/// ```rust
/// use nexus_common::GeneratorConfig;
/// use nexus_workload::assemble::Generator;
/// use nexus_workload::catalog::{ColumnSchema, ColumnType, MemoryCatalog, TableSchema};
/// use nexus_workload::request::GetRequest;
/// use nexus_workload::seed::Seed;
///
/// let table = TableSchema::new(1001, "t")
///     .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
///     .with_column(ColumnSchema::new(17, "v", ColumnType::Varchar))
///     .with_rowkey(&["k"])
///     .unwrap();
/// let catalog = MemoryCatalog::new().with_table(table).unwrap();
///
/// let generator = Generator::new(&catalog, GeneratorConfig::default());
/// let mut get = GetRequest::new();
/// generator.build_rand_get_param(&mut get, Seed::new(42), "t").unwrap();
/// assert_eq!(get.len(), 1);
/// ```
#[derive(Debug)]
pub struct Generator<'c, C: SchemaCatalog + ?Sized> {
    catalog: &'c C,
    config: GeneratorConfig,
}

impl<'c, C: SchemaCatalog + ?Sized> Generator<'c, C> {
    /// Creates a generator.
    pub fn new(catalog: &'c C, config: GeneratorConfig) -> Self {
        Self { catalog, config }
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &'c C {
        self.catalog
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn arena(&self) -> Arena {
        Arena::with_limit(self.config.arena_bytes)
    }

    fn selector<'a>(&'a self, arena: &'a Arena) -> Selector<'a, C> {
        Selector::new(self.catalog, arena, &self.config)
    }

    /// Appends one random cell of `table` to `get`.
    ///
    /// The table, rowkey and column are all drawn from `seed`; the column is
    /// never a rowkey column.
    ///
    /// # Errors
    ///
    /// Returns the first selection error.
    pub fn build_rand_get_param(
        &self,
        get: &mut GetRequest,
        seed: Seed,
        table: &str,
    ) -> NexusResult<()> {
        let arena = self.arena();
        let selector = self.selector(&arena);

        let (schema, _) = selector.choose_table(table, seed)?;
        let (rowkey, _) = selector.choose_rowkey(&schema, RowkeySpec::Random, seed)?;
        let (column, _) = selector.choose_column(&schema, seed, true)?;

        debug!(
            seed = seed.as_u64(),
            table = %schema.name,
            column = %column.name,
            rowkey = %rowkey,
            "get cell"
        );
        get.add_cell(CellInfo::by_name(schema.name.as_str(), rowkey, column.name.as_str()));
        Ok(())
    }

    /// Appends one random cell per seed in `[start, end)` to `get`.
    ///
    /// A positive `start_version` sets an inclusive version floor. The batch
    /// does not require read consistency.
    ///
    /// # Errors
    ///
    /// Returns the first per-seed error.
    pub fn build_rand_mget_param(
        &self,
        get: &mut GetRequest,
        start: u64,
        end: u64,
        table: &str,
        start_version: i64,
    ) -> NexusResult<()> {
        if let Some(range) = make_version_range(start_version) {
            get.version_range = Some(range);
        }
        for raw in start..end {
            self.build_rand_get_param(get, Seed::new(raw), table)
                .map_err(|e| {
                    warn!(seed = raw, table, error = %e, "build_rand_get_param failed");
                    e
                })?;
        }
        get.read_consistency = false;
        Ok(())
    }

    /// Fills `scan` with a random inclusive range over one table.
    ///
    /// The table and start key come from `start`, the end key from `end`.
    /// The scan carries the configured limit and does not require read
    /// consistency.
    ///
    /// # Errors
    ///
    /// Returns the first selection error.
    pub fn build_rand_scan_param(
        &self,
        scan: &mut ScanRequest,
        start: u64,
        end: u64,
        table: &str,
        start_version: i64,
    ) -> NexusResult<()> {
        let arena = self.arena();
        let selector = self.selector(&arena);
        let (start, end) = (Seed::new(start), Seed::new(end));

        let (schema, _) = selector.choose_table(table, start)?;
        let (start_key, _) = selector.choose_rowkey(&schema, RowkeySpec::Random, start)?;
        let (end_key, _) = selector.choose_rowkey(&schema, RowkeySpec::Random, end)?;

        scan.table_id = TableId::INVALID;
        scan.table_name = schema.name.clone();
        scan.range = RowkeyRange::inclusive(start_key, end_key);
        scan.version_range = make_version_range(start_version);
        scan.limit = ScanLimit {
            offset: 0,
            count: self.config.scan_limit,
        };
        scan.read_consistency = false;

        debug!(table = %schema.name, range = %scan.range, "scan range");
        Ok(())
    }

    /// Fills `scan` with an explicit key range over `table`.
    ///
    /// `"min"` and `"max"` select the absolute key bounds; other keys are
    /// parsed as comma-separated values (typed mode) or hex (legacy mode).
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown table and `InvalidArgument` for
    /// a malformed key.
    pub fn set_range(
        &self,
        scan: &mut ScanRequest,
        table: &str,
        start_key: &str,
        end_key: &str,
        start_version: i64,
    ) -> NexusResult<()> {
        let arena = self.arena();
        let selector = self.selector(&arena);

        let schema = self
            .catalog
            .table_by_name(table)
            .ok_or_else(|| NexusError::TableNotFound {
                table: table.to_string(),
            })?;
        let (start, _) =
            selector.choose_rowkey(&schema, RowkeySpec::parse(start_key), Seed::default())?;
        let (end, _) =
            selector.choose_rowkey(&schema, RowkeySpec::parse(end_key), Seed::default())?;

        scan.table_id = TableId::INVALID;
        scan.table_name = schema.name.clone();
        scan.range = RowkeyRange::inclusive(start, end);
        scan.version_range = make_version_range(start_version);
        Ok(())
    }

    /// Appends the mutations for one random row of `table`.
    ///
    /// With [`WriteType::Delete`] this is a single row delete. Otherwise it
    /// is one update per column, skipping rowkey columns in typed mode; the
    /// value for column `i` is drawn from `seed + i`.
    ///
    /// # Errors
    ///
    /// Returns the first selection error.
    pub fn build_rand_mutator(
        &self,
        mutator: &mut Mutator,
        seed: Seed,
        table: &str,
    ) -> NexusResult<()> {
        let arena = self.arena();
        let selector = self.selector(&arena);

        let (schema, _) = selector.choose_table(table, seed)?;
        let (rowkey, _) = selector.choose_rowkey(&schema, RowkeySpec::Random, seed)?;

        if self.config.write_type == WriteType::Delete {
            debug!(table = %schema.name, rowkey = %rowkey, "row delete");
            return mutator.del_row(&schema.name, rowkey);
        }

        let skip_rowkey = self.config.rowkey_mode.is_typed();
        for (i, column) in schema.columns().iter().enumerate() {
            if skip_rowkey && schema.is_rowkey_column(column.id) {
                continue;
            }
            let (value, _) = selector.choose_value(&schema, column, seed.offset(i as u64))?;
            mutator.update(&schema.name, rowkey.clone(), &column.name, value)?;
        }
        Ok(())
    }

    /// Appends the mutations for every seed in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns the first per-seed error.
    pub fn build_rand_batch_mutator(
        &self,
        mutator: &mut Mutator,
        start: u64,
        end: u64,
        table: &str,
    ) -> NexusResult<()> {
        for raw in start..end {
            self.build_rand_mutator(mutator, Seed::new(raw), table)
                .map_err(|e| {
                    warn!(seed = raw, table, error = %e, "build_rand_mutator failed");
                    e
                })?;
        }
        Ok(())
    }

    /// Looks up a table id by name.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` if the table does not exist.
    pub fn get_table_id(&self, table: &str) -> NexusResult<TableId> {
        self.catalog
            .table_by_name(table)
            .map(|t| t.table_id)
            .ok_or_else(|| NexusError::TableNotFound {
                table: table.to_string(),
            })
    }

    /// Looks up a column id by table and column name.
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` if the column does not exist.
    pub fn get_column_id(&self, table: &str, column: &str) -> NexusResult<ColumnId> {
        self.catalog
            .column(table, column)
            .map(|c| c.id)
            .ok_or_else(|| NexusError::ColumnNotFound {
                column: column.to_string(),
                table: table.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnSchema, ColumnType, MemoryCatalog, TableSchema};
    use crate::request::MutationOp;
    use crate::value::Rowkey;
    use nexus_common::{ErrorCode, RowkeyMode};

    fn catalog() -> MemoryCatalog {
        let table = TableSchema::new(1001, "t")
            .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
            .with_column(ColumnSchema::new(17, "v", ColumnType::Varchar).with_max_length(32))
            .with_rowkey(&["k"])
            .unwrap();
        MemoryCatalog::new().with_table(table).unwrap()
    }

    #[test]
    fn test_mget_sets_floor_and_consistency() {
        let catalog = catalog();
        let generator = Generator::new(&catalog, GeneratorConfig::default());

        let mut get = GetRequest::new();
        generator.build_rand_mget_param(&mut get, 10, 15, "t", 3).unwrap();
        assert_eq!(get.len(), 5);
        assert_eq!(get.version_range.unwrap().start_version, 3);
        assert!(!get.read_consistency);

        let mut get = GetRequest::new();
        generator.build_rand_mget_param(&mut get, 0, 2, "t", 0).unwrap();
        assert!(get.version_range.is_none());
    }

    #[test]
    fn test_mget_stops_on_first_error() {
        let catalog = catalog();
        let generator = Generator::new(&catalog, GeneratorConfig::default());
        let mut get = GetRequest::new();
        let err = generator.build_rand_mget_param(&mut get, 0, 3, "nope", 0).unwrap_err();
        assert!(err.is_schema_error());
        assert!(get.is_empty());
    }

    #[test]
    fn test_set_range() {
        let catalog = catalog();
        let generator = Generator::new(&catalog, GeneratorConfig::default());

        let mut scan = ScanRequest::new();
        generator.set_range(&mut scan, "t", "min", "42", 7).unwrap();
        assert_eq!(scan.table_name, "t");
        assert_eq!(scan.range.start, Rowkey::Min);
        assert_eq!(scan.range.end, Rowkey::Typed(vec![crate::value::Value::Int(42)]));
        assert!(scan.range.start_inclusive && scan.range.end_inclusive);
        assert_eq!(scan.version_range.unwrap().start_version, 7);

        let err = generator.set_range(&mut scan, "t", "x", "max", 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_set_range_legacy_hex() {
        let catalog = catalog();
        let config = GeneratorConfig::builder().rowkey_mode(RowkeyMode::Legacy).build();
        let generator = Generator::new(&catalog, config);

        let mut scan = ScanRequest::new();
        generator.set_range(&mut scan, "t", "0a0b", "max", 0).unwrap();
        assert_eq!(scan.range.start, Rowkey::Binary(bytes::Bytes::from_static(&[0x0a, 0x0b])));
        assert_eq!(scan.range.end, Rowkey::Max);
    }

    #[test]
    fn test_legacy_mutator_includes_rowkey_columns() {
        let catalog = catalog();
        let config = GeneratorConfig::builder().rowkey_mode(RowkeyMode::Legacy).build();
        let generator = Generator::new(&catalog, config);

        let mut mutator = Mutator::new();
        generator.build_rand_mutator(&mut mutator, Seed::new(5), "t").unwrap();
        assert_eq!(mutator.len(), 2);
        assert!(matches!(mutator.mutations()[0].cell.rowkey, Rowkey::Binary(_)));
    }

    #[test]
    fn test_batch_mutator() {
        let catalog = catalog();
        let config = GeneratorConfig::builder().write_type(WriteType::Delete).build();
        let generator = Generator::new(&catalog, config);

        let mut mutator = Mutator::new();
        generator.build_rand_batch_mutator(&mut mutator, 0, 4, "t").unwrap();
        assert_eq!(mutator.len(), 4);
        assert!(mutator.iter().all(|m| m.op == MutationOp::DeleteRow));
    }

    #[test]
    fn test_id_lookups() {
        let catalog = catalog();
        let generator = Generator::new(&catalog, GeneratorConfig::default());
        assert_eq!(generator.get_table_id("t").unwrap(), TableId::new(1001));
        assert_eq!(generator.get_column_id("t", "v").unwrap(), ColumnId::new(17));
        assert!(generator.get_table_id("x").unwrap_err().is_schema_error());
        assert!(generator.get_column_id("t", "x").unwrap_err().is_schema_error());
    }
}
