//! Generator configuration structures.
//!
//! These structures define all configurable aspects of a generation run.
//! Configuration is loaded from TOML and passed by value to the assemblers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_ARENA_SIZE, DEFAULT_COLUMN_RETRY_BUDGET, DEFAULT_MAX_PAYLOAD_COLUMNS,
    DEFAULT_SCAN_LIMIT,
};
use crate::error::{NexusError, NexusResult};

/// What the mutator assembler emits for a chosen row.
///
/// Parsing is lenient: `"delete"` selects row deletion, every other value
/// (including an unset option) selects column updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WriteType {
    /// One column update per non-rowkey column.
    #[default]
    Mutator,
    /// One whole-row delete.
    Delete,
}

impl WriteType {
    /// Parses the `write_type` option value.
    #[must_use]
    pub fn from_option(value: &str) -> Self {
        if value == "delete" {
            Self::Delete
        } else {
            Self::Mutator
        }
    }

    /// Returns the option spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mutator => "mutator",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for WriteType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_option(s))
    }
}

impl From<String> for WriteType {
    fn from(value: String) -> Self {
        Self::from_option(&value)
    }
}

impl From<WriteType> for String {
    fn from(value: WriteType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WriteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the rowkeys the target engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowkeyMode {
    /// Composite rowkeys with one typed value per rowkey column.
    #[default]
    Typed,
    /// Single binary rowkey of the table's maximum rowkey length.
    Legacy,
}

impl RowkeyMode {
    /// Returns true for composite typed rowkeys.
    #[must_use]
    pub const fn is_typed(self) -> bool {
        matches!(self, Self::Typed)
    }
}

/// Main generator configuration.
///
/// # Example
///
/// ```rust
/// use nexus_common::config::{GeneratorConfig, WriteType};
///
/// let config = GeneratorConfig::default();
/// assert_eq!(config.write_type, WriteType::Mutator);
/// assert_eq!(config.scan_limit, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Mutation kind emitted by the mutator assembler.
    /// Default: "mutator"
    #[serde(default)]
    pub write_type: WriteType,

    /// Rowkey shape of the target engine.
    /// Default: typed
    #[serde(default)]
    pub rowkey_mode: RowkeyMode,

    /// Scratch arena size for one generator invocation, in bytes.
    /// Default: 2 MB
    #[serde(default = "default_arena_bytes")]
    pub arena_bytes: usize,

    /// Result-count limit of generated scans.
    /// Default: 200
    #[serde(default = "default_scan_limit")]
    pub scan_limit: u64,

    /// Non-rowkey columns added to a materialized row descriptor.
    /// Default: 1
    #[serde(default = "default_max_payload_columns")]
    pub max_payload_columns: usize,

    /// Attempts made by the column rejection sampler.
    /// Default: 1000
    #[serde(default = "default_column_retry_budget")]
    pub column_retry_budget: usize,
}

fn default_arena_bytes() -> usize {
    DEFAULT_ARENA_SIZE
}

fn default_scan_limit() -> u64 {
    DEFAULT_SCAN_LIMIT
}

fn default_max_payload_columns() -> usize {
    DEFAULT_MAX_PAYLOAD_COLUMNS
}

fn default_column_retry_budget() -> usize {
    DEFAULT_COLUMN_RETRY_BUDGET
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            write_type: WriteType::default(),
            rowkey_mode: RowkeyMode::default(),
            arena_bytes: default_arena_bytes(),
            scan_limit: default_scan_limit(),
            max_payload_columns: default_max_payload_columns(),
            column_retry_budget: default_column_retry_budget(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::new()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `InvalidConfig` if it does
    /// not parse or fails validation.
    pub fn from_file(path: &Path) -> NexusResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the text does not parse or fails validation.
    pub fn from_toml(content: &str) -> NexusResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| NexusError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns `Io` on write failure.
    pub fn save(&self, path: &Path) -> NexusResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if serialization fails.
    pub fn to_toml(&self) -> NexusResult<String> {
        toml::to_string_pretty(self).map_err(|e| NexusError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> NexusResult<()> {
        if self.arena_bytes == 0 {
            return Err(NexusError::InvalidConfig {
                message: "arena_bytes must be greater than 0".to_string(),
            });
        }

        if self.scan_limit == 0 {
            return Err(NexusError::InvalidConfig {
                message: "scan_limit must be greater than 0".to_string(),
            });
        }

        if self.column_retry_budget == 0 {
            return Err(NexusError::InvalidConfig {
                message: "column_retry_budget must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for generator configuration.
#[derive(Debug, Default)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write type.
    #[must_use]
    pub fn write_type(mut self, write_type: WriteType) -> Self {
        self.config.write_type = write_type;
        self
    }

    /// Sets the rowkey mode.
    #[must_use]
    pub fn rowkey_mode(mut self, mode: RowkeyMode) -> Self {
        self.config.rowkey_mode = mode;
        self
    }

    /// Sets the scratch arena size in bytes.
    #[must_use]
    pub fn arena_bytes(mut self, bytes: usize) -> Self {
        self.config.arena_bytes = bytes;
        self
    }

    /// Sets the scan limit.
    #[must_use]
    pub fn scan_limit(mut self, limit: u64) -> Self {
        self.config.scan_limit = limit;
        self
    }

    /// Sets the number of payload columns per materialized row.
    #[must_use]
    pub fn max_payload_columns(mut self, columns: usize) -> Self {
        self.config.max_payload_columns = columns;
        self
    }

    /// Sets the column rejection-sampling budget.
    #[must_use]
    pub fn column_retry_budget(mut self, attempts: usize) -> Self {
        self.config.column_retry_budget = attempts;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> GeneratorConfig {
        self.config
    }
}
