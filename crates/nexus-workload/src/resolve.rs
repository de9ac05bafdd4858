//! Name resolution between catalog ids and symbolic names.
//!
//! Mutator batches carry cells identified by name, by id, or both. These
//! functions fill in the missing side so batches can be inspected and merged
//! uniformly. Cells carrying [`TableId::INVALID`] or [`ColumnId::INVALID`]
//! are left alone on that side; whole-row deletes legitimately carry an
//! invalid column id.

use tracing::info;

use nexus_common::{ColumnId, IterEndExt, NexusError, NexusResult, TableId};

use crate::catalog::SchemaCatalog;
use crate::request::{CellInfo, Mutator};

/// Attaches the table name for a cell identified by table id.
///
/// # Errors
///
/// Returns `TableIdNotFound` if the id is not in the catalog.
pub fn resolve_table_name<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    cell: &mut CellInfo,
) -> NexusResult<()> {
    if !cell.table_id.is_valid() {
        return Ok(());
    }
    let table = catalog
        .table_by_id(cell.table_id)
        .ok_or(NexusError::TableIdNotFound {
            table_id: cell.table_id,
        })?;
    cell.table_name = Some(table.name.clone());
    Ok(())
}

/// Attaches the column name for a cell identified by table and column id.
///
/// # Errors
///
/// Returns `ColumnIdNotFound` if the pair is not in the catalog.
pub fn resolve_column_name<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    cell: &mut CellInfo,
) -> NexusResult<()> {
    if !cell.table_id.is_valid() || !cell.column_id.is_valid() {
        return Ok(());
    }
    let column = catalog
        .column_by_id(cell.table_id, cell.column_id)
        .ok_or(NexusError::ColumnIdNotFound {
            table_id: cell.table_id,
            column_id: cell.column_id,
        })?;
    cell.column_name = Some(column.name);
    Ok(())
}

/// Attaches the table id for a cell identified by table name.
///
/// # Errors
///
/// Returns `TableNotFound` if the name is not in the catalog.
pub fn resolve_table_id<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    cell: &mut CellInfo,
) -> NexusResult<()> {
    let Some(name) = cell.table_name.as_deref() else {
        return Ok(());
    };
    if cell.table_id.is_valid() {
        return Ok(());
    }
    let table = catalog.table_by_name(name).ok_or_else(|| NexusError::TableNotFound {
        table: name.to_string(),
    })?;
    cell.table_id = table.table_id;
    Ok(())
}

/// Attaches the column id for a cell identified by table and column name.
///
/// # Errors
///
/// Returns `ColumnNotFound` if the pair is not in the catalog.
pub fn resolve_column_id<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    cell: &mut CellInfo,
) -> NexusResult<()> {
    let (Some(table), Some(column)) = (cell.table_name.as_deref(), cell.column_name.as_deref())
    else {
        return Ok(());
    };
    if cell.column_id.is_valid() {
        return Ok(());
    }
    let schema = catalog.column(table, column).ok_or_else(|| NexusError::ColumnNotFound {
        column: column.to_string(),
        table: table.to_string(),
    })?;
    cell.column_id = schema.id;
    Ok(())
}

/// Attaches symbolic names to every cell of `mutator`.
///
/// Walks the batch with its cursor from the start; reaching the end of the
/// batch is success.
///
/// # Errors
///
/// Returns the first lookup failure.
pub fn resolve_mutator_names<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    mutator: &mut Mutator,
) -> NexusResult<()> {
    mutator.reset_iter();
    let drained: NexusResult<()> = (|| loop {
        let mutation = mutator.next_cell()?;
        resolve_column_name(catalog, &mut mutation.cell)?;
        resolve_table_name(catalog, &mut mutation.cell)?;
    })();
    drained.ignore_iter_end()
}

/// Attaches catalog ids to every cell of `mutator`.
///
/// # Errors
///
/// Returns the first lookup failure.
pub fn resolve_mutator_ids<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    mutator: &mut Mutator,
) -> NexusResult<()> {
    mutator.reset_iter();
    let drained: NexusResult<()> = (|| loop {
        let mutation = mutator.next_cell()?;
        resolve_table_id(catalog, &mut mutation.cell)?;
        resolve_column_id(catalog, &mut mutation.cell)?;
    })();
    drained.ignore_iter_end()
}

/// Logs one line per mutation: op, table id and name, column id and name.
pub fn dump_mutator(mutator: &Mutator) {
    for (i, mutation) in mutator.iter().enumerate() {
        let cell = &mutation.cell;
        info!(
            "[{i}] op={} table={}[{}] column={}[{}]",
            mutation.op,
            display_id(cell.table_id.is_valid(), cell.table_id.as_u64()),
            cell.table_name.as_deref().unwrap_or(""),
            display_id(cell.column_id.is_valid(), cell.column_id.as_u64()),
            cell.column_name.as_deref().unwrap_or(""),
        );
    }
}

fn display_id(valid: bool, id: u64) -> String {
    if valid {
        id.to_string()
    } else {
        "INVALID".to_string()
    }
}

/// Returns true if every cell carries valid ids and names on both sides,
/// whole-row cells excepted on the column side.
#[must_use]
pub fn is_fully_resolved(mutator: &Mutator) -> bool {
    mutator.iter().all(|m| {
        let cell = &m.cell;
        let table_ok = cell.table_id != TableId::INVALID && cell.table_name.is_some();
        let column_ok = (cell.column_id == ColumnId::INVALID && cell.column_name.is_none())
            || (cell.column_id.is_valid() && cell.column_name.is_some());
        table_ok && column_ok
    })
}
