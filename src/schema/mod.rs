//! Destination schema derivation: identifier normalization, type mapping
//! and `CREATE TABLE` construction.

pub mod builder;
pub mod identifiers;
pub mod mapper;
pub mod types;

pub use builder::{build_table_schema, create_table_statement, drop_table_statement};
pub use identifiers::{normalize_identifiers, resolve_identifier, to_identifier};
pub use mapper::{build_type_map, ch_type_for, parse_dtype, parse_type_override};
pub use types::{ColumnDef, Dtype, DtypeMap, IdentifierMap, TableSchema, TypeMap};
