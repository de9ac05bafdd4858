//! Table-name expressions.
//!
//! A table argument is a literal name, the sentinel `"any"`, or a name
//! pattern. Patterns support brace alternatives (`orders_{eu,us}`), numeric
//! brace ranges (`part_{1..4}`) and shell wildcards (`*`, `?`) matched against
//! the catalog's table names.

use std::sync::Arc;

use regex::Regex;

use nexus_common::{NexusError, NexusResult, ANY_TABLE};

use crate::catalog::{SchemaCatalog, TableSchema};

/// A parsed table argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSpec<'a> {
    /// Any application table.
    Any,
    /// A literal name or name pattern.
    Pattern(&'a str),
}

impl<'a> TableSpec<'a> {
    /// Parses a table argument.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty argument.
    pub fn parse(spec: &'a str) -> NexusResult<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(NexusError::invalid_argument("table name is empty"));
        }
        if spec == ANY_TABLE {
            Ok(TableSpec::Any)
        } else {
            Ok(TableSpec::Pattern(spec))
        }
    }
}

/// Expands brace alternatives and ranges into the list of names they denote.
///
/// # Example
///
/// ```rust
/// use nexus_workload::pattern::expand_braces;
///
/// let names = expand_braces("t_{a,b}{1..2}").unwrap();
/// assert_eq!(names, vec!["t_a1", "t_a2", "t_b1", "t_b2"]);
/// ```
///
/// # Errors
///
/// Returns `InvalidArgument` for unbalanced braces or a malformed range.
pub fn expand_braces(pattern: &str) -> NexusResult<Vec<String>> {
    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err(unbalanced(pattern));
        }
        return Ok(vec![pattern.to_string()]);
    };
    let close = pattern[open..]
        .find('}')
        .map(|i| open + i)
        .ok_or_else(|| unbalanced(pattern))?;

    let head = &pattern[..open];
    let body = &pattern[open + 1..close];
    if body.contains('{') {
        return Err(unbalanced(pattern));
    }
    let tails = expand_braces(&pattern[close + 1..])?;

    let alternatives = brace_alternatives(body)?;
    let total = alternatives.len().saturating_mul(tails.len());
    if total > MAX_BRACE_RANGE {
        return Err(NexusError::invalid_argument(format!(
            "'{pattern}' expands to {total} names, limit is {MAX_BRACE_RANGE}"
        )));
    }

    let mut names = Vec::with_capacity(total);
    for alternative in alternatives {
        for tail in &tails {
            names.push(format!("{head}{alternative}{tail}"));
        }
    }
    Ok(names)
}

/// Most table names a single brace pattern may expand to.
pub const MAX_BRACE_RANGE: usize = 10_000;

fn brace_alternatives(body: &str) -> NexusResult<Vec<String>> {
    if let Some((lo, hi)) = body.split_once("..") {
        let parse = |s: &str| {
            s.trim().parse::<i64>().map_err(|_| {
                NexusError::invalid_argument(format!("bad brace range '{{{body}}}'"))
            })
        };
        let (lo, hi) = (parse(lo)?, parse(hi)?);
        let width = (i128::from(hi) - i128::from(lo)).unsigned_abs() + 1;
        if width > MAX_BRACE_RANGE as u128 {
            return Err(NexusError::invalid_argument(format!(
                "brace range '{{{body}}}' expands to {width} names, limit is {MAX_BRACE_RANGE}"
            )));
        }
        let range: Vec<String> = if lo <= hi {
            (lo..=hi).map(|n| n.to_string()).collect()
        } else {
            (hi..=lo).rev().map(|n| n.to_string()).collect()
        };
        return Ok(range);
    }
    Ok(body.split(',').map(str::to_string).collect())
}

fn unbalanced(pattern: &str) -> NexusError {
    NexusError::invalid_argument(format!("unbalanced braces in '{pattern}'"))
}

/// Returns true if the name contains wildcard characters.
#[must_use]
pub fn is_glob(name: &str) -> bool {
    name.contains(|c: char| c == '*' || c == '?')
}

/// Compiles a shell wildcard into an anchored regex.
///
/// # Errors
///
/// Returns `InvalidArgument` if the resulting expression does not compile.
pub fn glob_to_regex(glob: &str) -> NexusResult<Regex> {
    let mut expr = String::with_capacity(glob.len() + 8);
    expr.push('^');
    let mut literal = [0u8; 4];
    for ch in glob.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(ch.encode_utf8(&mut literal))),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| NexusError::invalid_argument(e.to_string()))
}

/// Resolves a name pattern against the catalog.
///
/// Candidates are returned in catalog declared order for wildcard matches and
/// in expansion order for literal names, without duplicates. Names that do not
/// exist are skipped.
///
/// # Errors
///
/// Returns `InvalidArgument` for a malformed pattern.
pub fn expand_table_pattern<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    pattern: &str,
) -> NexusResult<Vec<Arc<TableSchema>>> {
    let mut candidates: Vec<Arc<TableSchema>> = Vec::new();
    let mut push = |table: Arc<TableSchema>| {
        if !candidates.iter().any(|t| t.table_id == table.table_id) {
            candidates.push(table);
        }
    };

    for name in expand_braces(pattern)? {
        if is_glob(&name) {
            let matcher = glob_to_regex(&name)?;
            catalog
                .tables()
                .into_iter()
                .filter(|t| matcher.is_match(&t.name))
                .for_each(&mut push);
        } else if let Some(table) = catalog.table_by_name(&name) {
            push(table);
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnSchema, ColumnType, MemoryCatalog};

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        for (id, name) in [(1001, "orders_eu"), (1002, "orders_us"), (1003, "users")] {
            catalog
                .add_table(
                    TableSchema::new(id, name)
                        .with_column(ColumnSchema::new(16, "k", ColumnType::Int))
                        .with_rowkey(&["k"])
                        .unwrap(),
                )
                .unwrap();
        }
        catalog
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(TableSpec::parse("any").unwrap(), TableSpec::Any);
        assert_eq!(TableSpec::parse("t").unwrap(), TableSpec::Pattern("t"));
        assert!(TableSpec::parse("  ").is_err());
    }

    #[test]
    fn test_expand_alternatives() {
        assert_eq!(expand_braces("t").unwrap(), vec!["t"]);
        assert_eq!(expand_braces("{a,b}_x").unwrap(), vec!["a_x", "b_x"]);
        assert_eq!(expand_braces("p{3..1}").unwrap(), vec!["p3", "p2", "p1"]);
    }

    #[test]
    fn test_expand_errors() {
        assert!(expand_braces("t{a,b").is_err());
        assert!(expand_braces("t}").is_err());
        assert!(expand_braces("t{1..x}").is_err());
    }

    #[test]
    fn test_expand_limits() {
        assert_eq!(expand_braces("t{1..10000}").unwrap().len(), MAX_BRACE_RANGE);

        let err = expand_braces("t{1..9999999999}").unwrap_err();
        assert_eq!(err.code(), nexus_common::ErrorCode::InvalidArgument);
        let err = expand_braces("t{0..-9223372036854775808}").unwrap_err();
        assert_eq!(err.code(), nexus_common::ErrorCode::InvalidArgument);
        let err = expand_braces("t{1..200}_{1..200}").unwrap_err();
        assert_eq!(err.code(), nexus_common::ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_glob() {
        let re = glob_to_regex("orders_*").unwrap();
        assert!(re.is_match("orders_eu"));
        assert!(!re.is_match("users"));
        assert!(glob_to_regex("a.b?").unwrap().is_match("a.bc"));
        assert!(!glob_to_regex("a.b?").unwrap().is_match("axbc"));
    }

    #[test]
    fn test_expand_table_pattern() {
        let catalog = catalog();

        let names = |p: &str| -> Vec<String> {
            expand_table_pattern(&catalog, p)
                .unwrap()
                .iter()
                .map(|t| t.name.clone())
                .collect()
        };

        assert_eq!(names("orders_*"), vec!["orders_eu", "orders_us"]);
        assert_eq!(names("{users,orders_eu}"), vec!["users", "orders_eu"]);
        assert_eq!(names("{users,*}"), vec!["users", "orders_eu", "orders_us"]);
        assert!(names("missing").is_empty());
    }
}
