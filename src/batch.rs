//! In-memory batch representation.
//!
//! A [`Batch`] is a bounded slice of the source file stored column-wise.
//! It lives only while one chunk is being coerced and inserted.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

use crate::schema::types::Dtype;

/// Text layout for timestamps in inserts and text casts.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form of the value; `None` for nulls.
    ///
    /// Floats always carry a fractional part (`1.0`, not `1`) so that a
    /// float column cast to text stays recognisable as one.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            Value::Str(s) => Some(s.clone()),
            Value::DateTime(dt) => Some(dt.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::DateTime(dt) => {
                serializer.serialize_str(&dt.format(TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

/// One named column of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: Dtype,
    pub values: Vec<Value>,
    /// Cell text as read from the file, when the column came from a reader.
    pub source: Option<Vec<Option<String>>>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: Dtype, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
            source: None,
        }
    }

    /// Attach the cell text the values were parsed from.
    pub fn with_source(mut self, cells: Vec<Option<String>>) -> Self {
        debug_assert_eq!(cells.len(), self.values.len());
        self.source = Some(cells);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// A row keyed by column identifier, in declared column order.
pub type Row = IndexMap<String, Value>;

/// An ordered table of equally long columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Zero-based position of the batch in the source file.
    pub index: usize,
    pub columns: Vec<Column>,
}

impl Batch {
    pub fn new(index: usize, columns: Vec<Column>) -> Self {
        debug_assert!(
            columns.windows(2).all(|w| w[0].len() == w[1].len()),
            "batch columns must have equal length"
        );
        Self { index, columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Current dtype of every column, in column order.
    pub fn dtypes(&self) -> Vec<(String, Dtype)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.dtype))
            .collect()
    }

    /// Transpose into rows. Consumes the batch so values move instead of
    /// being cloned.
    pub fn into_rows(self) -> Vec<Row> {
        let row_count = self.row_count();
        let mut rows: Vec<Row> = (0..row_count)
            .map(|_| Row::with_capacity(self.columns.len()))
            .collect();

        for column in self.columns {
            for (row, value) in rows.iter_mut().zip(column.values) {
                row.insert(column.name.clone(), value);
            }
        }

        rows
    }
}
