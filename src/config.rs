//! Load configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::input::CsvOptions;
use crate::schema::builder::validate_table_name;

/// Everything a load needs besides the store connection.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Destination table, `table` or `database.table`.
    pub table: String,
    /// Primary key column, as a raw CSV label or a normalized identifier.
    pub primary_key: String,
    /// Source file; informational for logs when batches come from elsewhere.
    pub source: Option<PathBuf>,
    /// Reader settings, including the batch size.
    pub csv: CsvOptions,
    /// `(normalized column, ClickHouse type)` pairs replacing mapped types.
    pub type_overrides: Vec<(String, String)>,
}

impl LoadConfig {
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            source: None,
            csv: CsvOptions::default(),
            type_overrides: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.csv.batch_size = batch_size;
        self
    }

    pub fn with_type_override(
        mut self,
        column: impl Into<String>,
        ch_type: impl Into<String>,
    ) -> Self {
        self.type_overrides.push((column.into(), ch_type.into()));
        self
    }

    /// Checks that do not need any data. Run before anything is read.
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.table)?;
        if self.primary_key.trim().is_empty() {
            return Err(Error::Configuration("primary key must not be empty".to_string()));
        }
        if self.csv.batch_size == 0 {
            return Err(Error::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
