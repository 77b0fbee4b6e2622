//! Builds the `CREATE TABLE` / `DROP TABLE` statements for a load.
//!
//! Executing the pair is destructive: whatever is stored under the table
//! name is dropped and replaced by an empty table with the new schema.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::mapper::DEFAULT_CH_TYPE;
use crate::schema::types::{ColumnDef, TableSchema, TypeMap};

/// Table engine for append-only bulk ingestion.
pub const TABLE_ENGINE: &str = "MergeTree()";

/// `table` or `database.table`, each part a plain identifier.
static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap()
});

/// Check that a table name is safe to splice into a statement.
pub fn validate_table_name(table: &str) -> Result<()> {
    if TABLE_NAME.is_match(table) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "invalid table name '{}', expected 'table' or 'database.table'",
            table
        )))
    }
}

/// `DROP TABLE IF EXISTS`; never fails on a missing table.
pub fn drop_table_statement(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", table)
}

/// `CREATE TABLE` for the given column definitions.
pub fn create_table_statement(table: &str, columns: &[ColumnDef], primary_key: &str) -> String {
    let columns: Vec<String> = columns.iter().map(ColumnDef::to_ddl).collect();
    format!(
        "CREATE TABLE {} ({}) ENGINE = {} PRIMARY KEY (`{}`)",
        table,
        columns.join(", "),
        TABLE_ENGINE,
        primary_key
    )
}

/// Build the table schema.
///
/// `columns` are normalized identifiers in declared order; every one of
/// them is nullable except `primary_key`, which must be among them.
/// Columns missing from `types` get the default text type.
pub fn build_table_schema(
    table: &str,
    columns: &[String],
    primary_key: &str,
    types: &TypeMap,
) -> Result<TableSchema> {
    validate_table_name(table)?;

    if columns.is_empty() {
        return Err(Error::Configuration(format!(
            "table '{}' has no columns",
            table
        )));
    }

    if !columns.iter().any(|c| c == primary_key) {
        return Err(Error::Configuration(format!(
            "primary key '{}' is not one of the columns: {}",
            primary_key,
            columns.join(", ")
        )));
    }

    let defs: Vec<ColumnDef> = columns
        .iter()
        .map(|name| {
            let ch_type = types
                .get(name)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CH_TYPE.to_string());
            ColumnDef::new(name.clone(), ch_type, name != primary_key)
        })
        .collect();

    Ok(TableSchema {
        table: table.to_string(),
        primary_key: primary_key.to_string(),
        engine: TABLE_ENGINE.to_string(),
        create_statement: create_table_statement(table, &defs, primary_key),
        drop_statement: drop_table_statement(table),
        columns: defs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom_types() -> TypeMap {
        let mut types = TypeMap::new();
        types.insert("start_time".to_string(), "DateTime".to_string());
        types.insert("end_time".to_string(), "DateTime".to_string());
        types.insert("topic".to_string(), "String".to_string());
        types
    }

    fn zoom_columns() -> Vec<String> {
        vec![
            "start_time".to_string(),
            "end_time".to_string(),
            "topic".to_string(),
        ]
    }

    #[test]
    fn test_create_statement() {
        let schema =
            build_table_schema("zoom_meetings", &zoom_columns(), "start_time", &zoom_types())
                .unwrap();
        assert_eq!(
            schema.create_statement,
            "CREATE TABLE zoom_meetings (`start_time` DateTime, `end_time` DateTime NULL, \
             `topic` String NULL) ENGINE = MergeTree() PRIMARY KEY (`start_time`)"
        );
    }

    #[test]
    fn test_drop_statement() {
        let schema =
            build_table_schema("zoom_meetings", &zoom_columns(), "start_time", &zoom_types())
                .unwrap();
        assert_eq!(schema.drop_statement, "DROP TABLE IF EXISTS zoom_meetings");
    }

    #[test]
    fn test_only_primary_key_is_not_nullable() {
        let schema =
            build_table_schema("zoom_meetings", &zoom_columns(), "end_time", &zoom_types())
                .unwrap();
        let nullable: Vec<_> = schema.columns.iter().map(|c| c.nullable).collect();
        assert_eq!(nullable, vec![true, false, true]);
    }

    #[test]
    fn test_missing_type_defaults_to_string() {
        let schema = build_table_schema(
            "t",
            &["id".to_string(), "extra".to_string()],
            "id",
            &TypeMap::new(),
        )
        .unwrap();
        assert_eq!(schema.column("extra").unwrap().ch_type, "String");
        assert_eq!(schema.column("id").unwrap().ch_type, "String");
    }

    #[test]
    fn test_unknown_primary_key_is_configuration_error() {
        let err = build_table_schema("t", &zoom_columns(), "meeting_id", &zoom_types())
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("meeting_id"));
    }

    #[test]
    fn test_database_qualified_table_name() {
        let schema =
            build_table_schema("analytics.zoom", &zoom_columns(), "topic", &zoom_types()).unwrap();
        assert!(schema.create_statement.starts_with("CREATE TABLE analytics.zoom ("));
        assert_eq!(schema.drop_statement, "DROP TABLE IF EXISTS analytics.zoom");
    }

    #[test]
    fn test_invalid_table_names() {
        for name in ["", "1table", "a.b.c", "zoom; DROP TABLE x", "zoom meetings"] {
            assert!(validate_table_name(name).is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn test_no_columns() {
        let err = build_table_schema("t", &[], "id", &TypeMap::new()).unwrap_err();
        assert!(err.is_configuration());
    }
}
