//! Engine request objects populated by the assemblers.
//!
//! The generator only fills these in; it never interprets them. A request
//! that was being populated when an assembler failed is half-built and must
//! be discarded.
//!
//! # Mutator Encoding
//!
//! - Mutation count (4 bytes)
//! - For each mutation:
//!   - Op tag (1 byte)
//!   - Table id (8 bytes) + table name (length (4 bytes) + data)
//!   - Column id (8 bytes) + column name (length (4 bytes) + data)
//!   - Rowkey, then value (see [`crate::value`])

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use nexus_common::{ColumnId, NexusError, NexusResult, TableId};

use crate::value::{put_len, Rowkey, Value};

/// A lower bound on the data version visible to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    /// First visible version.
    pub start_version: i64,
    /// Whether `start_version` itself is visible.
    pub start_inclusive: bool,
    /// Upper bound, `None` when unbounded.
    pub end_version: Option<i64>,
}

impl VersionRange {
    /// Inclusive floor with an unbounded end.
    #[must_use]
    pub const fn floor(start_version: i64) -> Self {
        Self {
            start_version,
            start_inclusive: true,
            end_version: None,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.start_inclusive { '[' } else { '(' };
        match self.end_version {
            Some(end) => write!(f, "{open}{}, {end})", self.start_version),
            None => write!(f, "{open}{}, MAX)", self.start_version),
        }
    }
}

/// Returns the version floor for `start_version`, or `None` when it is not
/// positive.
#[must_use]
pub fn make_version_range(start_version: i64) -> Option<VersionRange> {
    (start_version > 0).then(|| VersionRange::floor(start_version))
}

/// Identity of one cell: table, rowkey and column, each by name or by id.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    /// Table id, [`TableId::INVALID`] when identified by name.
    pub table_id: TableId,
    /// Table name, if known.
    pub table_name: Option<String>,
    /// Row identity.
    pub rowkey: Rowkey,
    /// Column id, [`ColumnId::INVALID`] when identified by name or for
    /// whole-row operations.
    pub column_id: ColumnId,
    /// Column name, if known.
    pub column_name: Option<String>,
}

impl CellInfo {
    /// Creates a cell identified by names.
    pub fn by_name(table: impl Into<String>, rowkey: Rowkey, column: impl Into<String>) -> Self {
        Self {
            table_id: TableId::INVALID,
            table_name: Some(table.into()),
            rowkey,
            column_id: ColumnId::INVALID,
            column_name: Some(column.into()),
        }
    }

    /// Creates a cell identified by ids.
    #[must_use]
    pub fn by_id(table_id: TableId, rowkey: Rowkey, column_id: ColumnId) -> Self {
        Self {
            table_id,
            table_name: None,
            rowkey,
            column_id,
            column_name: None,
        }
    }

    /// Creates a whole-row cell identified by table name.
    pub fn row(table: impl Into<String>, rowkey: Rowkey) -> Self {
        Self {
            table_id: TableId::INVALID,
            table_name: Some(table.into()),
            rowkey,
            column_id: ColumnId::INVALID,
            column_name: None,
        }
    }

    fn encoded_len(&self) -> usize {
        let name_len = |name: &Option<String>| 4 + name.as_ref().map_or(0, String::len);
        8 + name_len(&self.table_name) + 8 + name_len(&self.column_name) + self.rowkey.encoded_len()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let put_name = |buf: &mut BytesMut, name: &Option<String>| {
            let name = name.as_deref().unwrap_or("");
            put_len(buf, name.len());
            buf.put_slice(name.as_bytes());
        };
        buf.put_u64(self.table_id.as_u64());
        put_name(buf, &self.table_name);
        buf.put_u64(self.column_id.as_u64());
        put_name(buf, &self.column_name);
        self.rowkey.encode_into(buf);
    }
}

impl fmt::Display for CellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table={}[{}] rowkey={} column={}[{}]",
            self.table_id,
            self.table_name.as_deref().unwrap_or("?"),
            self.rowkey,
            self.column_id,
            self.column_name.as_deref().unwrap_or("?"),
        )
    }
}

/// A point-get request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    cells: Vec<CellInfo>,
    /// Version floor, if any.
    pub version_range: Option<VersionRange>,
    /// Whether the read requires consistency.
    pub read_consistency: bool,
}

impl GetRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            version_range: None,
            read_consistency: true,
        }
    }

    /// Appends a cell.
    pub fn add_cell(&mut self, cell: CellInfo) {
        self.cells.push(cell);
    }

    /// Returns the cells.
    #[must_use]
    pub fn cells(&self) -> &[CellInfo] {
        &self.cells
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if there are no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Default for GetRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// An inclusive or exclusive rowkey range.
#[derive(Debug, Clone, PartialEq)]
pub struct RowkeyRange {
    /// Start key.
    pub start: Rowkey,
    /// End key.
    pub end: Rowkey,
    /// Whether `start` is included.
    pub start_inclusive: bool,
    /// Whether `end` is included.
    pub end_inclusive: bool,
}

impl RowkeyRange {
    /// Creates an inclusive range.
    #[must_use]
    pub fn inclusive(start: Rowkey, end: Rowkey) -> Self {
        Self {
            start,
            end,
            start_inclusive: true,
            end_inclusive: true,
        }
    }

    /// The whole key space.
    #[must_use]
    pub fn full() -> Self {
        Self::inclusive(Rowkey::Min, Rowkey::Max)
    }
}

impl fmt::Display for RowkeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.start_inclusive { '[' } else { '(' },
            self.start,
            self.end,
            if self.end_inclusive { ']' } else { ')' }
        )
    }
}

/// Offset and count applied to scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanLimit {
    /// Rows skipped.
    pub offset: u64,
    /// Rows returned at most.
    pub count: u64,
}

/// A range-scan request over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// Table id; scans built by name carry [`TableId::INVALID`].
    pub table_id: TableId,
    /// Table name.
    pub table_name: String,
    /// Key range.
    pub range: RowkeyRange,
    /// Version floor, if any.
    pub version_range: Option<VersionRange>,
    /// Result limit.
    pub limit: ScanLimit,
    /// Whether the read requires consistency.
    pub read_consistency: bool,
}

impl ScanRequest {
    /// Creates a full-range scan with no table set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_id: TableId::INVALID,
            table_name: String::new(),
            range: RowkeyRange::full(),
            version_range: None,
            limit: ScanLimit::default(),
            read_consistency: true,
        }
    }
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MutationOp {
    /// Column update.
    Update = 1,
    /// Whole-row delete.
    DeleteRow = 2,
}

impl MutationOp {
    /// Returns the op name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            MutationOp::Update => "update",
            MutationOp::DeleteRow => "del_row",
        }
    }
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One per-cell mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Operation.
    pub op: MutationOp,
    /// Target cell.
    pub cell: CellInfo,
    /// New value; `Null` for deletes.
    pub value: Value,
}

impl Mutation {
    /// Returns the number of bytes this mutation adds to the encoding.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + self.cell.encoded_len() + self.value.encoded_len()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.op as u8);
        self.cell.encode_into(buf);
        self.value.encode_into(buf);
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op={} {} value={}", self.op, self.cell, self.value)
    }
}

/// An ordered batch of mutations with a cell cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutator {
    mutations: Vec<Mutation>,
    cursor: usize,
}

impl Mutator {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column update by names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the table or column name is empty.
    pub fn update(
        &mut self,
        table: &str,
        rowkey: Rowkey,
        column: &str,
        value: Value,
    ) -> NexusResult<()> {
        if table.is_empty() || column.is_empty() {
            return Err(NexusError::invalid_argument("update needs a table and a column name"));
        }
        self.add_cell(Mutation {
            op: MutationOp::Update,
            cell: CellInfo::by_name(table, rowkey, column),
            value,
        });
        Ok(())
    }

    /// Appends a whole-row delete by table name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the table name is empty.
    pub fn del_row(&mut self, table: &str, rowkey: Rowkey) -> NexusResult<()> {
        if table.is_empty() {
            return Err(NexusError::invalid_argument("del_row needs a table name"));
        }
        self.add_cell(Mutation {
            op: MutationOp::DeleteRow,
            cell: CellInfo::row(table, rowkey),
            value: Value::Null,
        });
        Ok(())
    }

    /// Appends a prepared mutation.
    pub fn add_cell(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Returns the mutations in order.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Iterates the mutations without touching the cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }

    /// Returns the number of mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Advances the cursor and returns the next mutation.
    ///
    /// # Errors
    ///
    /// Returns `IterEnd` once every mutation has been visited. This is the
    /// normal end of the batch, not a failure.
    pub fn next_cell(&mut self) -> NexusResult<&mut Mutation> {
        let index = self.cursor;
        let mutation = self.mutations.get_mut(index).ok_or(NexusError::IterEnd)?;
        self.cursor = index + 1;
        Ok(mutation)
    }

    /// Rewinds the cursor.
    pub fn reset_iter(&mut self) {
        self.cursor = 0;
    }

    /// Returns the length of [`Mutator::encode`]'s output.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        4 + self.mutations.iter().map(Mutation::encoded_len).sum::<usize>()
    }

    /// Encodes the batch.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.serialized_size());
        put_len(&mut buf, self.mutations.len());
        for mutation in &self.mutations {
            mutation.encode_into(&mut buf);
        }
        buf.freeze()
    }
}

impl<'a> IntoIterator for &'a Mutator {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Appends every mutation of `src` to `dst`.
///
/// The size check precedes any append: when the merged batch would encode to
/// more than `limit` bytes, `dst` is left untouched.
///
/// # Errors
///
/// Returns `SizeOverflow` when the merged size exceeds `limit`.
pub fn mutator_add(dst: &mut Mutator, src: &Mutator, limit: usize) -> NexusResult<()> {
    let size = dst.serialized_size() + src.serialized_size();
    if size > limit {
        return Err(NexusError::SizeOverflow { size, limit });
    }
    dst.mutations.extend(src.mutations.iter().cloned());
    Ok(())
}
