//! chload
//!
//! Bulk-load a CSV file into a ClickHouse table.
//!
//! The first batch of rows decides everything about the destination: column
//! identifiers are normalized from the header, a dtype is inferred per
//! column, dtypes are mapped to ClickHouse types and the table is dropped and
//! recreated with a `MergeTree` engine. Every batch, the first included, is
//! then coerced to those dtypes and inserted in file order.
//!
//! # Example
//!
//! ```rust
//! use chload::{load_csv, LoadConfig, MemoryStore};
//!
//! let csv = "Start Time,Topic\n2024-01-01 09:00:00,standup\n";
//! let mut store = MemoryStore::new();
//! let summary = load_csv(csv.as_bytes(), LoadConfig::new("meetings", "Start Time"), &mut store)
//!     .unwrap();
//!
//! assert_eq!(summary.rows, 1);
//! assert_eq!(store.row_count("meetings"), 1);
//! ```

pub mod batch;
pub mod coerce;
pub mod config;
pub mod error;
pub mod inference;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use batch::{Batch, Column, Row, Value};
pub use coerce::Coercer;
pub use config::LoadConfig;
pub use error::{Error, Result};
pub use input::{CsvBatchReader, CsvOptions, DEFAULT_BATCH_SIZE};
pub use output::{write_plan_json, write_schema_ddl, OutputFormat};
pub use pipeline::{plan_table, BatchReport, LoadPipeline, LoadState, LoadSummary, TablePlan};
pub use schema::{ColumnDef, Dtype, DtypeMap, IdentifierMap, TableSchema, TypeMap};
pub use store::{HttpStore, MemoryStore, Store, StoreConfig, StoreError};

use std::io::Read;

/// High-level function to load CSV data from a reader into `store`.
///
/// Reader settings come from `config.csv`.
pub fn load_csv<R: Read, S: Store>(input: R, config: LoadConfig, store: S) -> Result<LoadSummary> {
    let reader = CsvBatchReader::new(input, config.csv.clone())?;
    let mut pipeline = LoadPipeline::new(config, store);
    pipeline.run(reader)
}

/// High-level function to derive the table plan from the first batch of a
/// CSV reader without touching any store.
///
/// Returns `None` when the input has no data rows.
pub fn plan_csv<R: Read>(input: R, config: &LoadConfig) -> Result<Option<TablePlan>> {
    let reader = CsvBatchReader::new(input, config.csv.clone())?;
    plan_table(reader, config)
}
