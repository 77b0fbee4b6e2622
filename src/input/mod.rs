//! Input readers for delimited text files.

pub mod csv;

pub use self::csv::{CsvBatchReader, CsvOptions, DEFAULT_BATCH_SIZE};
