//! Benchmark utilities and helpers.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nexus_common::{NexusResult, APP_MIN_TABLE_ID};
use nexus_workload::{ColumnSchema, ColumnType, MemoryCatalog, TableSchema};

/// First column id handed out to generated columns.
const FIRST_COLUMN_ID: u64 = 16;

/// Generates random string data for benchmarks.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates table names `prefix000`, `prefix001`, ...
pub fn generate_table_names(count: usize, prefix: &str) -> Vec<String> {
    (0..count).map(|i| format!("{}{:03}", prefix, i)).collect()
}

/// Generates one application table with an integer rowkey `id` and
/// `payload` columns of mixed type.
///
/// Payload types cycle int, varchar, float so every table has an integer
/// payload column once `payload >= 1`.
pub fn generate_table(
    rng: &mut StdRng,
    table_id: u64,
    name: &str,
    payload: usize,
) -> NexusResult<TableSchema> {
    let mut table = TableSchema::new(table_id, name)
        .with_column(ColumnSchema::new(FIRST_COLUMN_ID, "id", ColumnType::Int));

    for i in 0..payload {
        let id = FIRST_COLUMN_ID + 1 + i as u64;
        let name = format!("c{}_{}", i, random_string(rng, 6).to_lowercase());
        let column = match i % 3 {
            0 => ColumnSchema::new(id, name, ColumnType::Int),
            1 => ColumnSchema::new(id, name, ColumnType::Varchar)
                .with_max_length(rng.gen_range(8..=64)),
            _ => ColumnSchema::new(id, name, ColumnType::Float),
        };
        table = table.with_column(column);
    }

    table.with_rowkey(&["id"])
}

/// Generates a catalog of `tables` application tables with `payload`
/// columns each, reproducible across runs.
pub fn generate_catalog(tables: usize, payload: usize) -> NexusResult<MemoryCatalog> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut catalog = MemoryCatalog::new();

    for (i, name) in generate_table_names(tables, "bench_").iter().enumerate() {
        let table = generate_table(&mut rng, APP_MIN_TABLE_ID + i as u64, name, payload)?;
        catalog.add_table(table)?;
    }

    Ok(catalog)
}
