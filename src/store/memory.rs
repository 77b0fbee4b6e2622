//! In-process store.
//!
//! Understands just enough DDL to model a load: `DROP TABLE IF EXISTS t`
//! removes `t`, `CREATE TABLE t (...)` creates an empty `t`. Anything else
//! is recorded and accepted.

use indexmap::IndexMap;
use log::debug;

use crate::batch::Row;
use crate::store::{Store, StoreError};

/// A table held by a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub create_statement: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Store that keeps statements and rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: IndexMap<String, MemoryTable>,
    statements: Vec<String>,
    insert_calls: usize,
    fail_statement: Option<usize>,
    fail_insert: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th statement (zero-based, counted over the store's
    /// lifetime) fail with a rejection.
    pub fn fail_statement_at(mut self, n: usize) -> Self {
        self.fail_statement = Some(n);
        self
    }

    /// Make the `n`th insert call (zero-based) fail with a rejection.
    pub fn fail_insert_at(mut self, n: usize) -> Self {
        self.fail_insert = Some(n);
        self
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Every statement executed, in order, including failed ones.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Number of insert calls attempted.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    fn apply(&mut self, statement: &str) -> Result<(), StoreError> {
        let words: Vec<&str> = statement.split_whitespace().collect();
        let upper: Vec<String> = words.iter().take(5).map(|w| w.to_uppercase()).collect();
        let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

        match upper.as_slice() {
            ["DROP", "TABLE", "IF", "EXISTS", ..] if words.len() > 4 => {
                self.tables.shift_remove(words[4]);
                Ok(())
            }
            ["CREATE", "TABLE", ..] if words.len() > 2 => {
                let name = words[2].trim_end_matches('(').to_string();
                if self.tables.contains_key(&name) {
                    return Err(StoreError::Rejected {
                        status: 500,
                        message: format!("Table {} already exists", name),
                    });
                }
                self.tables.insert(
                    name,
                    MemoryTable {
                        create_statement: statement.to_string(),
                        ..Default::default()
                    },
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        let position = self.statements.len();
        self.statements.push(statement.to_string());
        if self.fail_statement == Some(position) {
            return Err(StoreError::Rejected {
                status: 500,
                message: "injected statement failure".to_string(),
            });
        }
        self.apply(statement)
    }

    fn insert(&mut self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StoreError> {
        let call = self.insert_calls;
        self.insert_calls += 1;
        if self.fail_insert == Some(call) {
            return Err(StoreError::Rejected {
                status: 500,
                message: "injected insert failure".to_string(),
            });
        }

        let target = self.tables.get_mut(table).ok_or_else(|| StoreError::Rejected {
            status: 404,
            message: format!("Table {} doesn't exist", table),
        })?;

        if target.columns.is_empty() {
            target.columns = columns.to_vec();
        } else if target.columns != columns {
            return Err(StoreError::Rejected {
                status: 400,
                message: format!(
                    "column list {:?} does not match {:?}",
                    columns, target.columns
                ),
            });
        }

        target.rows.extend_from_slice(rows);
        debug!("memory store: {} row(s) into {}", rows.len(), table);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
