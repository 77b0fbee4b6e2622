//! Per-batch coercion to the schema fixed by the first batch.
//!
//! Each batch goes through four steps, in order:
//! 1. timestamp sniffing on object columns ([`sniff_batch`]);
//! 2. renaming raw labels to normalized identifiers ([`rename_columns`]);
//! 3. filling absent values with a per-dtype sentinel ([`fill_nulls`]);
//! 4. casting every column to its fixed dtype ([`cast_column`]).
//!
//! Filling has to happen before casting: integer and timestamp columns
//! have no in-memory representation for an absent value once cast.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, trace};

use crate::batch::{Batch, Column, Value};
use crate::error::{Error, Result};
use crate::inference::{parse_float, parse_int, parse_timestamp, sniff_timestamps};
use crate::schema::types::{Dtype, DtypeMap, IdentifierMap};

/// Text written in place of absent values in text columns.
pub const TEXT_NULL_SENTINEL: &str = "NULL";

/// Timestamp written in place of absent values: the Unix epoch, the
/// smallest value a ClickHouse `DateTime` can hold.
pub fn epoch_sentinel() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

/// Sentinel for an absent value in a column of the given dtype.
pub fn null_sentinel(dtype: Dtype) -> Value {
    match dtype {
        Dtype::Int64 => Value::Int(0),
        Dtype::Float64 => Value::Float(0.0),
        Dtype::DateTime => Value::DateTime(epoch_sentinel()),
        Dtype::Object | Dtype::Str => Value::Str(TEXT_NULL_SENTINEL.to_string()),
    }
}

/// Step 1: try to turn every object column into a timestamp column.
///
/// Returns the labels of the columns that were converted. Columns that do
/// not parse completely are left untouched.
pub fn sniff_batch(batch: &mut Batch) -> Vec<String> {
    let mut converted = Vec::new();
    for column in &mut batch.columns {
        if sniff_timestamps(column) {
            converted.push(column.name.clone());
        }
    }
    if !converted.is_empty() {
        debug!(
            "Batch {}: parsed {} column(s) as timestamps: {}",
            batch.index,
            converted.len(),
            converted.join(", ")
        );
    }
    converted
}

/// Step 2: rename the batch's raw labels with the identifier map built from
/// the first batch. The labels must match that batch's labels exactly.
pub fn rename_columns(batch: &mut Batch, identifiers: &IdentifierMap) -> Result<()> {
    let matches = batch.columns.len() == identifiers.len()
        && batch
            .columns
            .iter()
            .zip(identifiers.keys())
            .all(|(column, label)| &column.name == label);

    if !matches {
        return Err(Error::ColumnMismatch {
            batch: batch.index,
            expected: identifiers.keys().cloned().collect(),
            found: batch.labels(),
        });
    }

    for (column, identifier) in batch.columns.iter_mut().zip(identifiers.values()) {
        column.name = identifier.clone();
    }
    Ok(())
}

/// Step 3: replace absent values with the sentinel for the column's fixed
/// dtype. Columns without an entry in `dtypes` use their own dtype.
///
/// Returns the number of values filled.
pub fn fill_nulls(batch: &mut Batch, dtypes: &DtypeMap) -> usize {
    let mut filled = 0;
    for column in &mut batch.columns {
        let nulls = column.null_count();
        if nulls == 0 {
            continue;
        }
        let dtype = dtypes.get(&column.name).copied().unwrap_or(column.dtype);
        let sentinel = null_sentinel(dtype);
        for value in column.values.iter_mut().filter(|v| v.is_null()) {
            *value = sentinel.clone();
        }
        filled += nulls;
    }
    if filled > 0 {
        trace!("Batch {}: filled {} absent value(s)", batch.index, filled);
    }
    filled
}

/// Cast a single value. A value that cannot be represented in `dtype` is
/// handed back as the error.
pub fn cast_value(value: Value, dtype: Dtype) -> std::result::Result<Value, Value> {
    match (dtype, value) {
        (Dtype::Int64, Value::Int(i)) => Ok(Value::Int(i)),
        (Dtype::Int64, Value::Float(f)) => {
            if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(Value::Int(f as i64))
            } else {
                Err(Value::Float(f))
            }
        }
        (Dtype::Int64, Value::Str(s)) => parse_int(&s).map(Value::Int).ok_or(Value::Str(s)),

        (Dtype::Float64, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (Dtype::Float64, Value::Float(f)) => Ok(Value::Float(f)),
        (Dtype::Float64, Value::Str(s)) => {
            parse_float(&s).map(Value::Float).ok_or(Value::Str(s))
        }

        (Dtype::DateTime, Value::DateTime(ts)) => Ok(Value::DateTime(ts)),
        (Dtype::DateTime, Value::Str(s)) => {
            parse_timestamp(&s).map(Value::DateTime).ok_or(Value::Str(s))
        }

        (Dtype::Object | Dtype::Str, Value::Null) => Err(Value::Null),
        (Dtype::Object | Dtype::Str, other) => Ok(Value::Str(other.to_text().unwrap_or_default())),

        (_, other) => Err(other),
    }
}

/// Step 4: cast a column to `dtype`.
///
/// The whole batch fails on the first value that cannot be cast; no value
/// is dropped or replaced. A text column takes its cells verbatim from the
/// file, so `007` stays `007` even when this batch inferred an integer.
pub fn cast_column(column: &mut Column, dtype: Dtype, batch: usize) -> Result<()> {
    let dtype = dtype.normalized();
    if dtype == Dtype::Str {
        restore_source_text(column);
    }
    if column.dtype == dtype && !column.values.iter().any(Value::is_null) {
        return Ok(());
    }

    let values = std::mem::take(&mut column.values);
    let mut cast = Vec::with_capacity(values.len());
    for (row, value) in values.into_iter().enumerate() {
        match cast_value(value, dtype) {
            Ok(v) => cast.push(v),
            Err(rejected) => {
                return Err(Error::Coercion {
                    batch,
                    column: column.name.clone(),
                    row,
                    value: rejected.to_text().unwrap_or_else(|| "<null>".to_string()),
                    dtype,
                })
            }
        }
    }

    column.values = cast;
    column.dtype = dtype;
    Ok(())
}

/// Put the file text back into every cell that had one. Filled sentinels
/// stay as they are.
fn restore_source_text(column: &mut Column) {
    let source = match column.source.take() {
        Some(source) if source.len() == column.values.len() => source,
        _ => return,
    };
    for (value, cell) in column.values.iter_mut().zip(source) {
        if let Some(text) = cell {
            *value = Value::Str(text);
        }
    }
}

/// Cast every column of a renamed batch to the fixed dtypes.
pub fn cast_batch(batch: &mut Batch, dtypes: &DtypeMap) -> Result<()> {
    let index = batch.index;
    for column in &mut batch.columns {
        let dtype = match dtypes.get(&column.name) {
            Some(dtype) => *dtype,
            None => {
                return Err(Error::ColumnMismatch {
                    batch: index,
                    expected: dtypes.keys().cloned().collect(),
                    found: vec![column.name.clone()],
                })
            }
        };
        cast_column(column, dtype, index)?;
    }
    Ok(())
}

/// Chunk coercer bound to the maps fixed by the first batch.
#[derive(Debug, Clone, Copy)]
pub struct Coercer<'a> {
    identifiers: &'a IdentifierMap,
    dtypes: &'a DtypeMap,
}

impl<'a> Coercer<'a> {
    pub fn new(identifiers: &'a IdentifierMap, dtypes: &'a DtypeMap) -> Self {
        Self {
            identifiers,
            dtypes,
        }
    }

    /// Run all four steps on a batch.
    pub fn coerce(&self, mut batch: Batch) -> Result<Batch> {
        sniff_batch(&mut batch);
        self.coerce_sniffed(batch)
    }

    /// Run renaming, filling and casting on a batch that was already
    /// sniffed. The first batch is sniffed before the schema exists.
    pub fn coerce_sniffed(&self, mut batch: Batch) -> Result<Batch> {
        rename_columns(&mut batch, self.identifiers)?;
        fill_nulls(&mut batch, self.dtypes);
        cast_batch(&mut batch, self.dtypes)?;
        Ok(batch)
    }
}
