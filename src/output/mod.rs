//! Output formatting for table plans.
//!
//! Supports two formats:
//! - DDL: the drop and create statements a load would run (default)
//! - JSON: the whole plan, including identifier and dtype maps

use std::io::Write;

use crate::error::{Error, Result};
use crate::pipeline::TablePlan;
use crate::schema::types::TableSchema;

/// Output format for a table plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Ddl,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ddl" | "sql" => Ok(OutputFormat::Ddl),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

// =============================================================================
// DDL Output
// =============================================================================

/// Write the schema's statements, one column per line.
///
/// Output format:
/// ```sql
/// DROP TABLE IF EXISTS zoom_meetings;
/// CREATE TABLE zoom_meetings (
///   `start_time` DateTime,
///   `topic` String NULL
/// )
/// ENGINE = MergeTree()
/// PRIMARY KEY (`start_time`);
/// ```
pub fn write_schema_ddl<W: Write>(schema: &TableSchema, writer: &mut W) -> Result<()> {
    writeln!(writer, "{};", schema.drop_statement)?;
    writeln!(writer, "CREATE TABLE {} (", schema.table)?;

    let last = schema.columns.len().saturating_sub(1);
    for (i, column) in schema.columns.iter().enumerate() {
        let separator = if i < last { "," } else { "" };
        writeln!(writer, "  {}{}", column.to_ddl(), separator)?;
    }

    writeln!(writer, ")")?;
    writeln!(writer, "ENGINE = {}", schema.engine)?;
    writeln!(writer, "PRIMARY KEY (`{}`);", schema.primary_key)?;
    Ok(())
}

// =============================================================================
// JSON Output
// =============================================================================

/// Write the plan as pretty-printed JSON.
pub fn write_plan_json<W: Write>(plan: &TablePlan, writer: &mut W) -> Result<()> {
    let json =
        serde_json::to_string_pretty(plan).map_err(|e| Error::Serialization(e.to_string()))?;
    writeln!(writer, "{}", json)?;
    Ok(())
}

/// Write the plan in the requested format.
pub fn write_plan<W: Write>(plan: &TablePlan, format: OutputFormat, writer: &mut W) -> Result<()> {
    match format {
        OutputFormat::Ddl => write_schema_ddl(&plan.schema, writer),
        OutputFormat::Json => write_plan_json(plan, writer),
    }
}
