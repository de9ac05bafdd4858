//! NexusDB workload generator CLI
//!
//! Prints the requests and plans the generator builds for a catalog and a
//! seed, for inspecting test workloads without a running engine.
//!
//! # Usage
//!
//! ```bash
//! # One random get against any application table
//! nexus-workload --catalog schema.toml get --seed 42
//!
//! # Scan with a version floor
//! nexus-workload --catalog schema.toml scan --start 1 --end 2 -t orders --version 5
//!
//! # Row deletes instead of updates
//! nexus-workload --catalog schema.toml mutate --start 0 --end 10 --write-type delete
//!
//! # Conditional update plan, verbose
//! nexus-workload --catalog schema.toml plan update -t orders --rows 8 --explain
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nexus_common::{GeneratorConfig, WriteType, ANY_TABLE};
use nexus_workload::resolve::{dump_mutator, resolve_mutator_ids};
use nexus_workload::{
    GetRequest, Generator, MemoryCatalog, Mutator, PlanBuilder, ScanRequest, Seed,
};

/// NexusDB workload generator
#[derive(Parser, Debug)]
#[command(
    name = "nexus-workload",
    author = "NexusDB Team",
    version,
    about = "Deterministic request and plan generator for NexusDB"
)]
struct Args {
    /// Schema catalog file (TOML)
    #[arg(short = 'C', long, value_name = "FILE", env = "NEXUS_CATALOG")]
    catalog: PathBuf,

    /// Generator configuration file (TOML)
    #[arg(long, value_name = "FILE", env = "NEXUS_WORKLOAD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build one random single-cell get
    Get {
        /// Seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Table name, pattern, or "any"
        #[arg(short, long, default_value = ANY_TABLE)]
        table: String,
    },

    /// Build a multi-get over the seeds in [start, end)
    Mget {
        /// First seed
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// End seed (exclusive)
        #[arg(long, default_value_t = 10)]
        end: u64,

        /// Table name, pattern, or "any"
        #[arg(short, long, default_value = ANY_TABLE)]
        table: String,

        /// Version floor (ignored unless positive)
        #[arg(long, default_value_t = 0)]
        version: i64,
    },

    /// Build a random inclusive range scan
    Scan {
        /// Seed of the table and start key
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Seed of the end key
        #[arg(long, default_value_t = 1)]
        end: u64,

        /// Table name, pattern, or "any"
        #[arg(short, long, default_value = ANY_TABLE)]
        table: String,

        /// Version floor (ignored unless positive)
        #[arg(long, default_value_t = 0)]
        version: i64,
    },

    /// Build a scan over explicit keys ("min", "max", or comma-separated values)
    Range {
        /// Table name
        #[arg(short, long)]
        table: String,

        /// Start key
        #[arg(long, default_value = "min")]
        from: String,

        /// End key
        #[arg(long, default_value = "max")]
        to: String,

        /// Version floor (ignored unless positive)
        #[arg(long, default_value_t = 0)]
        version: i64,
    },

    /// Build a mutation batch over the seeds in [start, end)
    Mutate {
        /// First seed
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// End seed (exclusive)
        #[arg(long, default_value_t = 1)]
        end: u64,

        /// Table name, pattern, or "any"
        #[arg(short, long, default_value = ANY_TABLE)]
        table: String,

        /// Overrides the configured write type ("mutator" or "delete")
        #[arg(long)]
        write_type: Option<String>,
    },

    /// Build a scenario operator tree
    Plan {
        /// Scenario
        #[arg(value_enum)]
        scenario: ScenarioArg,

        /// Seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Table name, pattern, or "any"
        #[arg(short, long, default_value = ANY_TABLE)]
        table: String,

        /// Rows carried by the plan
        #[arg(long, default_value_t = 1)]
        rows: usize,

        /// Print operator details instead of the tree
        #[arg(long)]
        explain: bool,
    },
}

/// Plan scenario argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    /// Plain insert
    Insert,
    /// Update rows whose integer column is positive
    Update,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let catalog = MemoryCatalog::from_file(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let config = load_config(&args)?;
    info!(tables = catalog.table_count(), "catalog loaded");

    match args.command {
        Command::Get { seed, table } => {
            let mut get = GetRequest::new();
            Generator::new(&catalog, config).build_rand_get_param(
                &mut get,
                Seed::new(seed),
                &table,
            )?;
            print_get(&get);
        }
        Command::Mget {
            start,
            end,
            table,
            version,
        } => {
            let mut get = GetRequest::new();
            Generator::new(&catalog, config)
                .build_rand_mget_param(&mut get, start, end, &table, version)?;
            print_get(&get);
        }
        Command::Scan {
            start,
            end,
            table,
            version,
        } => {
            let mut scan = ScanRequest::new();
            Generator::new(&catalog, config)
                .build_rand_scan_param(&mut scan, start, end, &table, version)?;
            print_scan(&scan);
        }
        Command::Range {
            table,
            from,
            to,
            version,
        } => {
            let mut scan = ScanRequest::new();
            Generator::new(&catalog, config).set_range(&mut scan, &table, &from, &to, version)?;
            print_scan(&scan);
        }
        Command::Mutate {
            start,
            end,
            table,
            write_type,
        } => {
            let mut config = config;
            if let Some(write_type) = write_type {
                config.write_type = WriteType::from_option(&write_type);
            }
            let mut mutator = Mutator::new();
            Generator::new(&catalog, config)
                .build_rand_batch_mutator(&mut mutator, start, end, &table)?;
            resolve_mutator_ids(&catalog, &mut mutator)?;
            dump_mutator(&mutator);
            for mutation in &mutator {
                println!("{mutation}");
            }
            println!(
                "-- {} mutations, {} bytes",
                mutator.len(),
                mutator.serialized_size()
            );
        }
        Command::Plan {
            scenario,
            seed,
            table,
            rows,
            explain,
        } => {
            let builder = PlanBuilder::new(&catalog, config);
            let plan = match scenario {
                ScenarioArg::Insert => builder.build_insert(&table, Seed::new(seed), rows)?,
                ScenarioArg::Update => {
                    builder.build_update_if_gt0(&table, Seed::new(seed), rows)?
                }
            };
            println!(
                "-- {} on {} ({} rows, frozen version {})",
                plan.metadata.scenario,
                plan.metadata.table,
                plan.metadata.row_count,
                plan.metadata.frozen_version
            );
            if explain {
                print!("{}", plan.explain(true));
            } else {
                print!("{}", plan.display_tree());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("nexus_workload=debug")
    } else {
        EnvFilter::new("nexus_workload=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<GeneratorConfig> {
    match &args.config {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(GeneratorConfig::default()),
    }
}

fn print_get(get: &GetRequest) {
    for cell in get.cells() {
        println!("{cell}");
    }
    let floor = get
        .version_range
        .map_or_else(|| "none".to_string(), |v| v.to_string());
    println!(
        "-- {} cells, version {floor}, consistent read {}",
        get.len(),
        get.read_consistency
    );
}

fn print_scan(scan: &ScanRequest) {
    let floor = scan
        .version_range
        .map_or_else(|| "none".to_string(), |v| v.to_string());
    println!("{} {}", scan.table_name, scan.range);
    println!(
        "-- limit {} offset {}, version {floor}, consistent read {}",
        scan.limit.count, scan.limit.offset, scan.read_consistency
    );
}
