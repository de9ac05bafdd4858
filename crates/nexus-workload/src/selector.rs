//! Deterministic selection of tables, columns, rowkeys and values.
//!
//! Every selection is a pure function of the catalog and the seed it is
//! given. Selections return the chosen item together with the seed they
//! finished on; callers decide whether to chain it or reuse the input seed.

use std::iter;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

use nexus_common::{Arena, GeneratorConfig, NexusError, NexusResult, RowkeyMode};

use crate::catalog::{ColumnSchema, ColumnType, SchemaCatalog, TableSchema};
use crate::pattern::{expand_table_pattern, TableSpec};
use crate::seed::{Seed, SeedRng};
use crate::value::{Rowkey, Value};

/// How a rowkey is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowkeySpec<'a> {
    /// Drawn from the seed.
    #[default]
    Random,
    /// The absolute lower bound marker.
    Min,
    /// The absolute upper bound marker.
    Max,
    /// A literal key: comma-separated values in typed mode, hex in legacy mode.
    Text(&'a str),
}

impl<'a> RowkeySpec<'a> {
    /// Parses a textual key, recognizing the `"min"` and `"max"` sentinels.
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        match text {
            "min" => RowkeySpec::Min,
            "max" => RowkeySpec::Max,
            _ => RowkeySpec::Text(text),
        }
    }
}

/// Seeded selector over a schema catalog.
///
/// A selector borrows the scratch arena of one generator invocation; string
/// values it produces are views into that arena.
pub struct Selector<'a, C: SchemaCatalog + ?Sized> {
    catalog: &'a C,
    arena: &'a Arena,
    mode: RowkeyMode,
    retry_budget: usize,
}

impl<'a, C: SchemaCatalog + ?Sized> Selector<'a, C> {
    /// Creates a selector.
    pub fn new(catalog: &'a C, arena: &'a Arena, config: &GeneratorConfig) -> Self {
        Self {
            catalog,
            arena,
            mode: config.rowkey_mode,
            retry_budget: config.column_retry_budget,
        }
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &'a C {
        self.catalog
    }

    /// Returns the rowkey mode.
    pub fn mode(&self) -> RowkeyMode {
        self.mode
    }

    /// Chooses a table.
    ///
    /// `spec` is a literal name, a name pattern, or `"any"`. A pattern is
    /// expanded to its candidates and one is picked with a single step. See
    /// [`choose_any_table`] for `"any"`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty `spec`
    /// - `TableNotFound` for a literal name missing from the catalog
    /// - `EntryNotExist` for a pattern matching no table
    /// - `Schema` for `"any"` when no application table exists
    pub fn choose_table(&self, spec: &str, seed: Seed) -> NexusResult<(Arc<TableSchema>, Seed)> {
        let chosen = match TableSpec::parse(spec)? {
            TableSpec::Any => choose_any_table(&self.catalog.tables(), seed)
                .ok_or_else(|| NexusError::schema("no application table in catalog")),
            TableSpec::Pattern(pattern) => {
                let candidates = expand_table_pattern(self.catalog, pattern)?;
                if candidates.is_empty() {
                    Err(if crate::pattern::is_glob(pattern) || pattern.contains('{') {
                        NexusError::entry_not_exist(format!("table matching '{pattern}'"))
                    } else {
                        NexusError::TableNotFound {
                            table: pattern.to_string(),
                        }
                    })
                } else {
                    let (index, next) = seed.pick(candidates.len());
                    Ok((Arc::clone(&candidates[index]), next))
                }
            }
        };

        match &chosen {
            Ok((table, _)) => {
                debug!(spec, seed = seed.as_u64(), table = %table.name, "chose table")
            }
            Err(e) => warn!(spec, seed = seed.as_u64(), error = %e, "choose table failed"),
        }
        chosen
    }

    /// Chooses a column of `table` by rejection sampling.
    ///
    /// # Errors
    ///
    /// See [`rand_choose_column`].
    pub fn choose_column<'t>(
        &self,
        table: &'t TableSchema,
        seed: Seed,
        exclude_rowkey: bool,
    ) -> NexusResult<(&'t ColumnSchema, Seed)> {
        let chosen = rand_choose_column(table, seed, exclude_rowkey, self.mode, self.retry_budget);
        match &chosen {
            Ok((column, _)) => debug!(
                table = %table.name,
                seed = seed.as_u64(),
                column = %column.name,
                "chose column"
            ),
            Err(e) => warn!(
                table = %table.name,
                seed = seed.as_u64(),
                error = %e,
                "choose column failed"
            ),
        }
        chosen
    }

    /// Chooses a rowkey for `table`.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if a rowkey column has a type the generator
    /// cannot produce, `InvalidArgument` for a malformed literal key, and
    /// `SizeOverflow` if the scratch arena is exhausted.
    pub fn choose_rowkey(
        &self,
        table: &TableSchema,
        spec: RowkeySpec<'_>,
        seed: Seed,
    ) -> NexusResult<(Rowkey, Seed)> {
        let (rowkey, next) = match spec {
            RowkeySpec::Min => (Rowkey::Min, seed),
            RowkeySpec::Max => (Rowkey::Max, seed),
            RowkeySpec::Text(text) => (self.parse_rowkey(table, text)?, seed),
            RowkeySpec::Random => {
                let mut rng = SeedRng::new(seed);
                let rowkey = if self.mode.is_typed() {
                    let values = table
                        .rowkey_columns()
                        .map(|c| random_value(c.data_type, c.max_length, &mut rng, self.arena))
                        .collect::<NexusResult<Vec<_>>>()?;
                    Rowkey::Typed(values)
                } else {
                    let key = random_alphanumeric(table.rowkey_max_length(), &mut rng);
                    Rowkey::Binary(self.arena.alloc_bytes(&key)?)
                };
                (rowkey, rng.seed())
            }
        };

        debug!(table = %table.name, seed = seed.as_u64(), rowkey = %rowkey, "chose rowkey");
        Ok((rowkey, next))
    }

    /// Parses a literal rowkey.
    ///
    /// Typed mode expects one comma-separated literal per rowkey column;
    /// legacy mode expects a hex string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed key and `NotSupported` for a
    /// rowkey column type without a literal syntax.
    pub fn parse_rowkey(&self, table: &TableSchema, text: &str) -> NexusResult<Rowkey> {
        if !self.mode.is_typed() {
            let bytes = hex::decode(text.trim()).map_err(|e| {
                NexusError::invalid_argument(format!("rowkey '{text}' is not hex: {e}"))
            })?;
            return Ok(Rowkey::Binary(self.arena.alloc_bytes(&bytes)?));
        }

        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() != table.rowkey_len() {
            return Err(NexusError::invalid_argument(format!(
                "rowkey '{text}' has {} values, table '{}' expects {}",
                parts.len(),
                table.name,
                table.rowkey_len()
            )));
        }

        let values = table
            .rowkey_columns()
            .zip(parts)
            .map(|(column, literal)| self.parse_literal(column, literal))
            .collect::<NexusResult<Vec<_>>>()?;
        Ok(Rowkey::Typed(values))
    }

    fn parse_literal(&self, column: &ColumnSchema, literal: &str) -> NexusResult<Value> {
        let invalid = || {
            NexusError::invalid_argument(format!(
                "'{literal}' is not a valid {} for column '{}'",
                column.data_type, column.name
            ))
        };
        match column.data_type {
            ColumnType::Int => literal.parse().map(Value::Int).map_err(|_| invalid()),
            ColumnType::Float => literal.parse().map(Value::Float).map_err(|_| invalid()),
            ColumnType::Double => literal.parse().map(Value::Double).map_err(|_| invalid()),
            ColumnType::Varchar => {
                if literal.len() > column.max_length {
                    return Err(invalid());
                }
                Ok(Value::Varchar(self.arena.alloc_str(literal)?))
            }
            other => Err(NexusError::not_supported(format!("{other} rowkey literal"))),
        }
    }

    /// Draws a random value for `column`.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for a column type the generator cannot produce
    /// and `SizeOverflow` if the scratch arena is exhausted.
    pub fn choose_value(
        &self,
        table: &TableSchema,
        column: &ColumnSchema,
        seed: Seed,
    ) -> NexusResult<(Value, Seed)> {
        let mut rng = SeedRng::new(seed);
        let value = random_value(column.data_type, column.max_length, &mut rng, self.arena)?;
        debug!(
            table = %table.name,
            column = %column.name,
            seed = seed.as_u64(),
            value = %value,
            "chose value"
        );
        Ok((value, rng.seed()))
    }
}

/// Chooses among the application tables by a running maximum.
///
/// Walks `tables` in order with a weight that starts at the seed. Each
/// application table steps the weight once and becomes the choice when the
/// new weight is strictly greater than the best so far. The result depends
/// on catalog order and is not a uniform sample.
///
/// Returns `None` when no table lies in the application id window.
#[must_use]
pub fn choose_any_table(
    tables: &[Arc<TableSchema>],
    seed: Seed,
) -> Option<(Arc<TableSchema>, Seed)> {
    let mut weight = seed;
    let mut best: Option<(&Arc<TableSchema>, Seed)> = None;

    for table in tables.iter().filter(|t| t.table_id.is_application()) {
        weight = weight.step();
        if best.map_or(true, |(_, max)| weight.as_u64() > max.as_u64()) {
            best = Some((table, weight));
        }
    }

    best.map(|(table, _)| (Arc::clone(table), weight))
}

/// Rejection-samples a column of `table` within `attempts` draws.
///
/// Each draw steps the seed and takes the column at `seed % column_count`.
/// A draw is rejected when the column participates in a join, when
/// `exclude_rowkey` is set and the column is part of the rowkey (typed mode
/// only), or when its type is not selectable in `mode`.
///
/// # Errors
///
/// - `EntryNotExist` if the table has no columns
/// - `Internal` if every draw is rejected
pub fn rand_choose_column(
    table: &TableSchema,
    seed: Seed,
    exclude_rowkey: bool,
    mode: RowkeyMode,
    attempts: usize,
) -> NexusResult<(&ColumnSchema, Seed)> {
    let columns = table.columns();
    if columns.is_empty() {
        return Err(NexusError::entry_not_exist(format!(
            "column of table '{}'",
            table.name
        )));
    }
    let exclude_rowkey = exclude_rowkey && mode.is_typed();

    iter::successors(Some(seed), |s| Some(s.step()))
        .skip(1)
        .take(attempts)
        .find_map(|draw| {
            #[allow(clippy::cast_possible_truncation)]
            let column = &columns[(draw.as_u64() % columns.len() as u64) as usize];
            let rejected = column.has_join()
                || (exclude_rowkey && table.is_rowkey_column(column.id))
                || !column.data_type.is_selectable(mode);
            (!rejected).then_some((column, draw))
        })
        .ok_or_else(|| {
            NexusError::internal(format!(
                "no selectable column in table '{}' after {attempts} attempts",
                table.name
            ))
        })
}

/// Draws a value of type `ty` bounded by `max_length`.
pub(crate) fn random_value(
    ty: ColumnType,
    max_length: usize,
    rng: &mut SeedRng,
    arena: &Arena,
) -> NexusResult<Value> {
    match ty {
        ColumnType::Int => Ok(Value::Int(rng.gen())),
        ColumnType::Float => Ok(Value::Float(rng.gen())),
        ColumnType::Double => Ok(Value::Double(rng.gen())),
        ColumnType::Varchar => {
            let len = match max_length {
                0 => 0,
                max => rng.gen_range(1..=max),
            };
            let text = random_alphanumeric(len, rng);
            Ok(Value::Varchar(arena.alloc_bytes(&text)?))
        }
        other => Err(NexusError::not_supported(format!("random {other} value"))),
    }
}

fn random_alphanumeric(len: usize, rng: &mut SeedRng) -> Vec<u8> {
    rng.sample_iter(&Alphanumeric).take(len).collect()
}
