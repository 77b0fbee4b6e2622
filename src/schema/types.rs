//! Core types for the destination schema.
//!
//! A load fixes three column-keyed maps from its first batch: the
//! identifier map, the dtype map and the destination type map. All of them
//! are `IndexMap`s so that column order follows the source file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source-side value representation of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// 64-bit signed integers
    Int64,
    /// 64-bit floats
    Float64,
    /// Naive timestamps with second precision
    DateTime,
    /// Untyped text as produced by the reader. Never stored in a [`DtypeMap`].
    Object,
    /// Explicit text
    Str,
}

impl Dtype {
    /// Returns the dtype name as used in log output and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Int64 => "int64",
            Dtype::Float64 => "float64",
            Dtype::DateTime => "datetime64[ns]",
            Dtype::Object => "object",
            Dtype::Str => "str",
        }
    }

    /// Object is a mixed type and would not convert other values in the
    /// column to text, so it is replaced with an explicit text dtype before
    /// it is fixed for a load.
    pub fn normalized(self) -> Dtype {
        match self {
            Dtype::Object => Dtype::Str,
            other => other,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw column label to normalized identifier, in source column order.
pub type IdentifierMap = IndexMap<String, String>;

/// Normalized identifier to the dtype fixed by the first batch.
pub type DtypeMap = IndexMap<String, Dtype>;

/// Normalized identifier to destination storage type.
pub type TypeMap = IndexMap<String, String>;

/// A single column of the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ch_type: String,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: String, ch_type: String, nullable: bool) -> Self {
        Self {
            name,
            ch_type,
            nullable,
        }
    }

    /// Column definition as it appears inside `CREATE TABLE`.
    pub fn to_ddl(&self) -> String {
        if self.nullable {
            format!("`{}` {} NULL", self.name, self.ch_type)
        } else {
            format!("`{}` {}", self.name, self.ch_type)
        }
    }
}

/// Destination table schema: column definitions plus the statements that
/// (re)create the table. Built once per load and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub primary_key: String,
    pub engine: String,
    pub columns: Vec<ColumnDef>,
    pub create_statement: String,
    pub drop_statement: String,
}

impl TableSchema {
    /// Column identifiers in declared order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}
