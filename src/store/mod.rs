//! Destination store clients.
//!
//! The loader only needs two operations from a store: run a statement and
//! insert a batch of rows into a named table. [`HttpStore`] talks to a
//! ClickHouse server over its HTTP interface; [`MemoryStore`] keeps
//! everything in process and backs dry runs and tests.

pub mod http;
pub mod memory;

pub use http::{HttpStore, StoreConfig};
pub use memory::MemoryStore;

use thiserror::Error;

use crate::batch::Row;

/// Failure reported by a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never got an answer (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered and refused the request.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Rows could not be encoded for the request.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// A destination for the load.
///
/// Both operations either succeed completely or return an error; the
/// loader never retries.
pub trait Store {
    /// Run a single DDL statement.
    fn execute(&mut self, statement: &str) -> Result<(), StoreError>;

    /// Insert rows into `table`. `columns` is the table's declared column
    /// order and every row is keyed in that order.
    fn insert(&mut self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StoreError>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        (**self).execute(statement)
    }

    fn insert(&mut self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StoreError> {
        (**self).insert(table, columns, rows)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        (**self).execute(statement)
    }

    fn insert(&mut self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StoreError> {
        (**self).insert(table, columns, rows)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
