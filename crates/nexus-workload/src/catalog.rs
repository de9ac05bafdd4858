//! Schema catalog seam and an in-memory implementation.
//!
//! The generator only reads the catalog. [`SchemaCatalog`] is the lookup
//! surface it needs; [`MemoryCatalog`] is an immutable implementation that can
//! be built in code or loaded from TOML:
//!
//! ```toml
//! [[tables]]
//! id = 1001
//! name = "orders"
//! rowkey = ["order_id"]
//!
//! [[tables.columns]]
//! id = 16
//! name = "order_id"
//! type = "int"
//!
//! [[tables.columns]]
//! id = 17
//! name = "note"
//! type = "varchar"
//! max_length = 64
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nexus_common::constants::{DEFAULT_VARCHAR_LENGTH, MAX_ROWKEY_LENGTH};
use nexus_common::{ColumnId, NexusError, NexusResult, RowkeyMode, TableId};

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit integer.
    Int,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Variable-length string.
    Varchar,
    /// Date and time.
    DateTime,
    /// Boolean.
    Bool,
}

impl ColumnType {
    /// Returns the type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Varchar => "varchar",
            ColumnType::DateTime => "datetime",
            ColumnType::Bool => "bool",
        }
    }

    /// Returns true if the column selector may pick a column of this type.
    ///
    /// Typed rowkey mode accepts integers and strings; legacy mode also
    /// accepts floats.
    #[must_use]
    pub const fn is_selectable(self, mode: RowkeyMode) -> bool {
        match self {
            ColumnType::Int | ColumnType::Varchar => true,
            ColumnType::Float => !mode.is_typed(),
            _ => false,
        }
    }

    /// Size bound used when a column declares none.
    #[must_use]
    pub const fn default_max_length(self) -> usize {
        match self {
            ColumnType::Int | ColumnType::Double | ColumnType::DateTime => 8,
            ColumnType::Float => 4,
            ColumnType::Bool => 1,
            ColumnType::Varchar => DEFAULT_VARCHAR_LENGTH,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A join (foreign-key) relationship of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinInfo {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
}

/// Information about a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column id, unique within the table.
    pub id: ColumnId,
    /// Column name.
    pub name: String,
    /// Declared type.
    pub data_type: ColumnType,
    /// Size bound in bytes (string length for varchar).
    pub max_length: usize,
    /// Join relationship, if the column participates in one.
    pub join: Option<JoinInfo>,
}

impl ColumnSchema {
    /// Creates a column with the type's default size bound.
    pub fn new(id: u64, name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            id: ColumnId::new(id),
            name: name.into(),
            data_type,
            max_length: data_type.default_max_length(),
            join: None,
        }
    }

    /// Sets the size bound.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Marks the column as joined to `table.column`.
    #[must_use]
    pub fn with_join(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.join = Some(JoinInfo {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Returns true if the column participates in a join.
    #[must_use]
    pub fn has_join(&self) -> bool {
        self.join.is_some()
    }
}

/// Information about a table.
///
/// The column list and rowkey are fixed once the table is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table id.
    pub table_id: TableId,
    /// Table name.
    pub name: String,
    columns: Vec<ColumnSchema>,
    /// Rowkey column positions in declared rowkey order.
    rowkey: Vec<usize>,
    rowkey_max_length: Option<usize>,
}

impl TableSchema {
    /// Creates a table with no columns.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            table_id: TableId::new(id),
            name: name.into(),
            columns: Vec::new(),
            rowkey: Vec::new(),
            rowkey_max_length: None,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the rowkey columns, by name, in rowkey order.
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` if a name is not a column of the table.
    pub fn with_rowkey(mut self, names: &[&str]) -> NexusResult<Self> {
        let rowkey = names
            .iter()
            .map(|name| {
                self.column_position(name)
                    .ok_or_else(|| NexusError::ColumnNotFound {
                        column: (*name).to_string(),
                        table: self.name.clone(),
                    })
            })
            .collect::<NexusResult<Vec<_>>>()?;
        self.rowkey = rowkey;
        Ok(self)
    }

    /// Overrides the legacy binary rowkey length.
    #[must_use]
    pub fn with_rowkey_max_length(mut self, length: usize) -> Self {
        self.rowkey_max_length = Some(length);
        self
    }

    /// Returns the columns in declared order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Returns the rowkey columns in declared rowkey order.
    pub fn rowkey_columns(&self) -> impl Iterator<Item = &ColumnSchema> + '_ {
        self.rowkey.iter().map(|&i| &self.columns[i])
    }

    /// Returns the number of rowkey columns.
    #[must_use]
    pub fn rowkey_len(&self) -> usize {
        self.rowkey.len()
    }

    /// Returns the binary rowkey length used in legacy mode.
    ///
    /// Defaults to the sum of the rowkey columns' size bounds, capped at the
    /// engine's maximum rowkey length.
    #[must_use]
    pub fn rowkey_max_length(&self) -> usize {
        self.rowkey_max_length
            .unwrap_or_else(|| {
                self.rowkey_columns()
                    .map(|c| c.max_length)
                    .sum::<usize>()
                    .max(1)
            })
            .min(MAX_ROWKEY_LENGTH)
    }

    /// Returns true if the column is part of the rowkey.
    #[must_use]
    pub fn is_rowkey_column(&self, id: ColumnId) -> bool {
        self.rowkey.iter().any(|&i| self.columns[i].id == id)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by id.
    #[must_use]
    pub fn column_by_id(&self, id: ColumnId) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.id == id)
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Read-only catalog lookups used by the generator.
///
/// Implementations must be immutable for the duration of a generation run;
/// many threads read one catalog concurrently.
pub trait SchemaCatalog: Send + Sync {
    /// Looks up a table by name.
    fn table_by_name(&self, name: &str) -> Option<Arc<TableSchema>>;

    /// Looks up a table by id.
    fn table_by_id(&self, id: TableId) -> Option<Arc<TableSchema>>;

    /// Returns every table in declared order.
    fn tables(&self) -> Vec<Arc<TableSchema>>;

    /// Looks up a column by table name and column name.
    fn column(&self, table: &str, column: &str) -> Option<ColumnSchema> {
        self.table_by_name(table)?.column(column).cloned()
    }

    /// Looks up a column by table id and column id.
    fn column_by_id(&self, table: TableId, column: ColumnId) -> Option<ColumnSchema> {
        self.table_by_id(table)?.column_by_id(column).cloned()
    }
}

/// Immutable in-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: Vec<Arc<TableSchema>>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<TableId, usize>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the name or id is already registered, the id
    /// is the invalid sentinel, two columns share an id or name, or a varchar
    /// column declares a zero max length.
    pub fn add_table(&mut self, table: TableSchema) -> NexusResult<()> {
        if !table.table_id.is_valid() {
            return Err(NexusError::schema(format!(
                "table '{}' has an invalid id",
                table.name
            )));
        }
        if self.by_name.contains_key(&table.name) || self.by_id.contains_key(&table.table_id) {
            return Err(NexusError::schema(format!(
                "table '{}' ({}) already exists",
                table.name, table.table_id
            )));
        }
        for (i, column) in table.columns.iter().enumerate() {
            let duplicate = table.columns[..i]
                .iter()
                .any(|c| c.id == column.id || c.name == column.name);
            if duplicate || !column.id.is_valid() {
                return Err(NexusError::schema(format!(
                    "column '{}' of table '{}' has a duplicate or invalid id",
                    column.name, table.name
                )));
            }
            if column.data_type == ColumnType::Varchar && column.max_length == 0 {
                return Err(NexusError::schema(format!(
                    "varchar column '{}' of table '{}' has a zero max length",
                    column.name, table.name
                )));
            }
        }

        let index = self.tables.len();
        self.by_name.insert(table.name.clone(), index);
        self.by_id.insert(table.table_id, index);
        self.tables.push(Arc::new(table));
        Ok(())
    }

    /// Registers a table, builder style.
    ///
    /// # Errors
    ///
    /// See [`MemoryCatalog::add_table`].
    pub fn with_table(mut self, table: TableSchema) -> NexusResult<Self> {
        self.add_table(table)?;
        Ok(self)
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Loads a catalog from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidConfig` if it does not
    /// parse, or a schema error if the tables are inconsistent.
    pub fn from_file(path: &Path) -> NexusResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// See [`MemoryCatalog::from_file`].
    pub fn from_toml(content: &str) -> NexusResult<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| NexusError::InvalidConfig {
            message: e.to_string(),
        })?;

        let mut catalog = Self::new();
        for def in file.tables {
            catalog.add_table(def.into_schema()?)?;
        }
        Ok(catalog)
    }
}

impl SchemaCatalog for MemoryCatalog {
    fn table_by_name(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.by_name.get(name).map(|&i| Arc::clone(&self.tables[i]))
    }

    fn table_by_id(&self, id: TableId) -> Option<Arc<TableSchema>> {
        self.by_id.get(&id).map(|&i| Arc::clone(&self.tables[i]))
    }

    fn tables(&self) -> Vec<Arc<TableSchema>> {
        self.tables.clone()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tables: Vec<TableDef>,
}

#[derive(Debug, Deserialize)]
struct TableDef {
    id: u64,
    name: String,
    #[serde(default)]
    rowkey: Vec<String>,
    rowkey_max_length: Option<usize>,
    #[serde(default)]
    columns: Vec<ColumnDef>,
}

#[derive(Debug, Deserialize)]
struct ColumnDef {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    data_type: ColumnType,
    max_length: Option<usize>,
    join: Option<JoinInfo>,
}

impl TableDef {
    fn into_schema(self) -> NexusResult<TableSchema> {
        let mut table = TableSchema::new(self.id, self.name);
        for def in self.columns {
            let mut column = ColumnSchema::new(def.id, def.name, def.data_type);
            if let Some(len) = def.max_length {
                column = column.with_max_length(len);
            }
            column.join = def.join;
            table = table.with_column(column);
        }
        if let Some(len) = self.rowkey_max_length {
            table = table.with_rowkey_max_length(len);
        }
        let rowkey: Vec<&str> = self.rowkey.iter().map(String::as_str).collect();
        table.with_rowkey(&rowkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn orders() -> TableSchema {
        TableSchema::new(1001, "orders")
            .with_column(ColumnSchema::new(16, "id", ColumnType::Int))
            .with_column(ColumnSchema::new(17, "region", ColumnType::Varchar).with_max_length(8))
            .with_column(
                ColumnSchema::new(18, "customer", ColumnType::Int).with_join("users", "id"),
            )
            .with_rowkey(&["region", "id"])
            .unwrap()
    }

    #[test]
    fn test_rowkey_order() {
        let table = orders();
        let names: Vec<&str> = table.rowkey_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["region", "id"]);
        assert_eq!(table.rowkey_len(), 2);
        assert!(table.is_rowkey_column(ColumnId::new(16)));
        assert!(!table.is_rowkey_column(ColumnId::new(18)));
        assert_eq!(table.rowkey_max_length(), 16);
    }

    #[test]
    fn test_unknown_rowkey_column() {
        let err = TableSchema::new(1001, "t")
            .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
            .with_rowkey(&["missing"])
            .unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_lookups() {
        let catalog = MemoryCatalog::new().with_table(orders()).unwrap();

        assert!(catalog.table_by_name("orders").is_some());
        assert!(catalog.table_by_name("users").is_none());
        assert_eq!(
            catalog.table_by_id(TableId::new(1001)).unwrap().name,
            "orders"
        );
        assert_eq!(
            catalog.column("orders", "customer").unwrap().id,
            ColumnId::new(18)
        );
        assert_eq!(
            catalog
                .column_by_id(TableId::new(1001), ColumnId::new(17))
                .unwrap()
                .name,
            "region"
        );
        assert!(catalog.column_by_id(TableId::new(1001), ColumnId::new(99)).is_none());
    }

    #[test]
    fn test_duplicate_table() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_table(orders()).unwrap();
        assert!(catalog.add_table(orders()).is_err());
        assert_eq!(catalog.table_count(), 1);
    }

    #[test]
    fn test_duplicate_column() {
        let table = TableSchema::new(1002, "t")
            .with_column(ColumnSchema::new(16, "a", ColumnType::Int))
            .with_column(ColumnSchema::new(16, "b", ColumnType::Int));
        assert!(MemoryCatalog::new().add_table(table).is_err());
    }

    #[test]
    fn test_zero_length_varchar_rejected() {
        let table = TableSchema::new(1002, "t")
            .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
            .with_column(ColumnSchema::new(17, "v", ColumnType::Varchar).with_max_length(0))
            .with_rowkey(&["k"])
            .unwrap();
        let err = MemoryCatalog::new().add_table(table).unwrap_err();
        assert_eq!(err.code(), nexus_common::ErrorCode::SchemaError);
    }

    #[test]
    fn test_selectable_types() {
        assert!(ColumnType::Int.is_selectable(RowkeyMode::Typed));
        assert!(ColumnType::Varchar.is_selectable(RowkeyMode::Typed));
        assert!(!ColumnType::Float.is_selectable(RowkeyMode::Typed));
        assert!(ColumnType::Float.is_selectable(RowkeyMode::Legacy));
        assert!(!ColumnType::Double.is_selectable(RowkeyMode::Legacy));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
            [[tables]]
            id = 1001
            name = "t"
            rowkey = ["k"]

            [[tables.columns]]
            id = 16
            name = "k"
            type = "int"

            [[tables.columns]]
            id = 17
            name = "v"
            type = "varchar"
            max_length = 32

            [[tables.columns]]
            id = 18
            name = "ref"
            type = "int"
            join = { table = "u", column = "id" }
            "#,
        )
        .unwrap();

        let catalog = MemoryCatalog::from_file(&path).unwrap();
        let table = catalog.table_by_name("t").unwrap();
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.column("v").unwrap().max_length, 32);
        assert!(table.column("ref").unwrap().has_join());
        assert_eq!(table.rowkey_len(), 1);
    }

    #[test]
    fn test_bad_toml() {
        let err = MemoryCatalog::from_toml("tables = 3").unwrap_err();
        assert!(matches!(err, NexusError::InvalidConfig { .. }));
    }
}
