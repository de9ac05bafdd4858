//! Request generation integration tests.
//!
//! These tests drive the public assemblers against catalogs loaded from
//! TOML and check reproducibility and schema conformance.

use std::thread;

use nexus_common::{ErrorCode, GeneratorConfig, TableId, WriteType, DEFAULT_SCAN_LIMIT};
use nexus_workload::request::MutationOp;
use nexus_workload::resolve::{is_fully_resolved, resolve_mutator_ids, resolve_mutator_names};
use nexus_workload::{
    mutator_add, GetRequest, Generator, MemoryCatalog, Mutator, Rowkey, ScanRequest, Seed, Value,
};

const CATALOG: &str = r#"
[[tables]]
id = 1001
name = "T"
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

[[tables]]
id = 1002
name = "wide"
rowkey = ["k"]

[[tables.columns]]
id = 16
name = "k"
type = "int"

[[tables.columns]]
id = 17
name = "qty"
type = "int"

[[tables.columns]]
id = 18
name = "note"
type = "varchar"
max_length = 16

[[tables.columns]]
id = 19
name = "ratio"
type = "float"

[[tables]]
id = 7
name = "__sys"
rowkey = ["k"]

[[tables.columns]]
id = 16
name = "k"
type = "int"
"#;

fn catalog() -> MemoryCatalog {
    MemoryCatalog::from_toml(CATALOG).expect("catalog parses")
}

fn generator(catalog: &MemoryCatalog) -> Generator<'_, MemoryCatalog> {
    Generator::new(catalog, GeneratorConfig::default())
}

/// A get for seed 42 on a one-payload table targets that payload column.
#[test]
fn test_get_single_cell() {
    let catalog = catalog();
    let mut get = GetRequest::new();
    generator(&catalog)
        .build_rand_get_param(&mut get, Seed::new(42), "T")
        .unwrap();

    assert_eq!(get.len(), 1);
    let cell = &get.cells()[0];
    assert_eq!(cell.table_name.as_deref(), Some("T"));
    assert_eq!(cell.column_name.as_deref(), Some("v"));
    let Rowkey::Typed(values) = &cell.rowkey else {
        panic!("expected a typed rowkey, got {}", cell.rowkey);
    };
    assert_eq!(values.len(), 1);
    assert!(matches!(values[0], Value::Int(_)));
}

/// Random scans carry the default limit and no version floor.
#[test]
fn test_scan_limits_and_floor() {
    let catalog = catalog();
    let generator = generator(&catalog);

    let mut scan = ScanRequest::new();
    generator
        .build_rand_scan_param(&mut scan, 1, 2, "T", 0)
        .unwrap();
    assert_eq!(scan.table_name, "T");
    assert_eq!(scan.table_id, TableId::INVALID);
    assert_eq!(scan.limit.count, DEFAULT_SCAN_LIMIT);
    assert_eq!(scan.limit.offset, 0);
    assert!(scan.version_range.is_none());
    assert!(scan.range.start_inclusive && scan.range.end_inclusive);
    assert!(!scan.read_consistency);

    let mut start_only = ScanRequest::new();
    generator
        .build_rand_scan_param(&mut start_only, 1, 1, "T", 0)
        .unwrap();
    assert_eq!(start_only.range.start, scan.range.start);

    let mut end_only = ScanRequest::new();
    generator
        .build_rand_scan_param(&mut end_only, 2, 2, "T", 0)
        .unwrap();
    assert_eq!(scan.range.end, end_only.range.start);
    assert_ne!(scan.range.start, scan.range.end);

    let mut floored = ScanRequest::new();
    generator
        .build_rand_scan_param(&mut floored, 1, 2, "T", 5)
        .unwrap();
    assert_eq!(floored.version_range.unwrap().start_version, 5);
}

/// One update per payload column, or one row delete.
#[test]
fn test_mutator_write_types() {
    let catalog = catalog();

    let mut updates = Mutator::new();
    generator(&catalog)
        .build_rand_mutator(&mut updates, Seed::new(3), "wide")
        .unwrap();
    assert_eq!(updates.len(), 3);
    assert!(updates.iter().all(|m| m.op == MutationOp::Update));
    assert!(updates
        .iter()
        .all(|m| m.cell.column_name.as_deref() != Some("k")));

    let config = GeneratorConfig::builder()
        .write_type(WriteType::Delete)
        .build();
    let mut deletes = Mutator::new();
    Generator::new(&catalog, config)
        .build_rand_mutator(&mut deletes, Seed::new(3), "wide")
        .unwrap();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes.mutations()[0].op, MutationOp::DeleteRow);
    assert_eq!(deletes.mutations()[0].cell.rowkey, updates.mutations()[0].cell.rowkey);
}

/// Same seed, same catalog, same output.
#[test]
fn test_determinism() {
    let catalog = catalog();

    let build = || {
        let generator = generator(&catalog);
        let mut get = GetRequest::new();
        generator
            .build_rand_mget_param(&mut get, 0, 32, "any", 0)
            .unwrap();
        let mut scan = ScanRequest::new();
        generator
            .build_rand_scan_param(&mut scan, 10, 11, "any", 0)
            .unwrap();
        let mut mutator = Mutator::new();
        generator
            .build_rand_batch_mutator(&mut mutator, 0, 16, "any")
            .unwrap();
        (get, scan, mutator)
    };

    let (get_a, scan_a, mutator_a) = build();
    let (get_b, scan_b, mutator_b) = build();
    assert_eq!(get_a, get_b);
    assert_eq!(scan_a, scan_b);
    assert_eq!(mutator_a, mutator_b);
    assert_eq!(mutator_a.encode(), mutator_b.encode());
}

/// "any" never lands on a system table.
#[test]
fn test_any_skips_system_tables() {
    let catalog = catalog();
    let mut get = GetRequest::new();
    generator(&catalog)
        .build_rand_mget_param(&mut get, 0, 64, "any", 0)
        .unwrap();
    assert_eq!(get.len(), 64);
    assert!(get
        .cells()
        .iter()
        .all(|c| c.table_name.as_deref() != Some("__sys")));
}

/// Unknown tables and unmatched patterns fail differently.
#[test]
fn test_table_lookup_errors() {
    let catalog = catalog();
    let generator = generator(&catalog);
    let mut get = GetRequest::new();

    let err = generator
        .build_rand_get_param(&mut get, Seed::new(1), "missing")
        .unwrap_err();
    assert!(err.is_schema_error());

    let err = generator
        .build_rand_get_param(&mut get, Seed::new(1), "missing_*")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::EntryNotExist);
    assert!(get.is_empty());
}

/// Independent seeds on independent threads reproduce the serial output.
#[test]
fn test_parallel_generation() {
    let catalog = catalog();

    let serial: Vec<Mutator> = (0..8u64)
        .map(|i| {
            let mut mutator = Mutator::new();
            generator(&catalog)
                .build_rand_batch_mutator(&mut mutator, i * 10, i * 10 + 10, "any")
                .unwrap();
            mutator
        })
        .collect();

    let parallel: Vec<Mutator> = thread::scope(|s| {
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let catalog = &catalog;
                s.spawn(move || {
                    let mut mutator = Mutator::new();
                    generator(catalog)
                        .build_rand_batch_mutator(&mut mutator, i * 10, i * 10 + 10, "any")
                        .unwrap();
                    mutator
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(serial, parallel);
}

/// Resolving ids then names is stable under repetition.
#[test]
fn test_resolution_idempotent() {
    let catalog = catalog();
    let mut mutator = Mutator::new();
    generator(&catalog)
        .build_rand_batch_mutator(&mut mutator, 0, 4, "wide")
        .unwrap();

    resolve_mutator_ids(&catalog, &mut mutator).unwrap();
    resolve_mutator_names(&catalog, &mut mutator).unwrap();
    assert!(is_fully_resolved(&mutator));

    let once = mutator.clone();
    resolve_mutator_ids(&catalog, &mut mutator).unwrap();
    resolve_mutator_names(&catalog, &mut mutator).unwrap();
    assert_eq!(once, mutator);
}

/// Merges are all-or-nothing against the size limit.
#[test]
fn test_merge_bounded() {
    let catalog = catalog();
    let generator = generator(&catalog);

    let mut dst = Mutator::new();
    generator
        .build_rand_mutator(&mut dst, Seed::new(1), "wide")
        .unwrap();
    let mut src = Mutator::new();
    generator
        .build_rand_mutator(&mut src, Seed::new(2), "wide")
        .unwrap();

    let before = dst.clone();
    let exact = dst.serialized_size() + src.serialized_size();
    let err = mutator_add(&mut dst, &src, exact - 1).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SizeOverflow);
    assert_eq!(dst, before);

    mutator_add(&mut dst, &src, exact).unwrap();
    assert_eq!(dst.len(), before.len() + src.len());
    assert_eq!(&dst.mutations()[before.len()..], src.mutations());
}
