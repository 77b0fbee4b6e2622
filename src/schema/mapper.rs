//! Mapping from source dtypes to ClickHouse storage types.

use crate::error::{Error, Result};
use crate::schema::types::{Dtype, DtypeMap, TypeMap};

/// Destination type used for every dtype without an explicit mapping.
pub const DEFAULT_CH_TYPE: &str = "String";

/// The fixed lookup table. Anything not listed maps to [`DEFAULT_CH_TYPE`].
const DTYPE_TO_CH: &[(Dtype, &str)] = &[
    (Dtype::Int64, "Int64"),
    (Dtype::Float64, "Float64"),
    (Dtype::DateTime, "DateTime"),
];

/// Map a dtype to its ClickHouse storage type.
pub fn ch_type_for(dtype: Dtype) -> &'static str {
    let dtype = dtype.normalized();
    DTYPE_TO_CH
        .iter()
        .find(|(d, _)| *d == dtype)
        .map(|(_, ch)| *ch)
        .unwrap_or(DEFAULT_CH_TYPE)
}

/// Parse a dtype from its name (`int64`, `float64`, `datetime64[ns]`, ...).
///
/// Returns `None` for names that are not dtypes of this crate.
pub fn parse_dtype(name: &str) -> Option<Dtype> {
    match name.trim().to_lowercase().as_str() {
        "int64" | "int" | "integer" => Some(Dtype::Int64),
        "float64" | "float" | "double" => Some(Dtype::Float64),
        "datetime64[ns]" | "datetime64" | "datetime" | "timestamp" => Some(Dtype::DateTime),
        "object" | "o" => Some(Dtype::Object),
        "str" | "string" | "text" => Some(Dtype::Str),
        _ => None,
    }
}

/// Map a dtype given by name; unknown names fall back to the default type.
pub fn ch_type_for_name(name: &str) -> &'static str {
    parse_dtype(name).map(ch_type_for).unwrap_or(DEFAULT_CH_TYPE)
}

/// Build the destination type map for a fixed dtype map, then apply
/// explicit `(column, type)` overrides.
///
/// Override columns may be given as normalized identifiers only; an
/// override naming a column that is not in the dtype map is rejected.
pub fn build_type_map(dtypes: &DtypeMap, overrides: &[(String, String)]) -> Result<TypeMap> {
    let mut types: TypeMap = dtypes
        .iter()
        .map(|(column, dtype)| (column.clone(), ch_type_for(*dtype).to_string()))
        .collect();

    for (column, ch_type) in overrides {
        let ch_type = ch_type.trim();
        if ch_type.is_empty() {
            return Err(Error::Configuration(format!(
                "type override for column '{}' is empty",
                column
            )));
        }
        match types.get_mut(column) {
            Some(slot) => *slot = ch_type.to_string(),
            None => {
                return Err(Error::Configuration(format!(
                    "type override names unknown column '{}' (known: {})",
                    column,
                    dtypes.keys().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
        }
    }

    Ok(types)
}

/// Parse a `column=Type` override as given on the command line.
pub fn parse_type_override(spec: &str) -> Result<(String, String)> {
    match spec.split_once('=') {
        Some((column, ch_type)) if !column.trim().is_empty() && !ch_type.trim().is_empty() => {
            Ok((column.trim().to_string(), ch_type.trim().to_string()))
        }
        _ => Err(Error::Configuration(format!(
            "invalid type override '{}', expected COLUMN=TYPE",
            spec
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ch_type_for_table() {
        assert_eq!(ch_type_for(Dtype::Int64), "Int64");
        assert_eq!(ch_type_for(Dtype::Float64), "Float64");
        assert_eq!(ch_type_for(Dtype::DateTime), "DateTime");
        assert_eq!(ch_type_for(Dtype::Str), "String");
    }

    #[test]
    fn test_object_is_normalized_to_text() {
        assert_eq!(ch_type_for(Dtype::Object), "String");
    }

    #[test]
    fn test_ch_type_for_name() {
        assert_eq!(ch_type_for_name("int64"), "Int64");
        assert_eq!(ch_type_for_name("float64"), "Float64");
        assert_eq!(ch_type_for_name("datetime64[ns]"), "DateTime");
        assert_eq!(ch_type_for_name("object"), "String");
        assert_eq!(ch_type_for_name("bool"), "String");
        assert_eq!(ch_type_for_name("category"), "String");
        assert_eq!(ch_type_for_name(""), "String");
    }

    #[test]
    fn test_build_type_map_in_column_order() {
        let mut dtypes = DtypeMap::new();
        dtypes.insert("id".to_string(), Dtype::Int64);
        dtypes.insert("score".to_string(), Dtype::Float64);
        dtypes.insert("name".to_string(), Dtype::Str);

        let types = build_type_map(&dtypes, &[]).unwrap();
        let pairs: Vec<_> = types.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("id", "Int64"), ("score", "Float64"), ("name", "String")]
        );
    }

    #[test]
    fn test_build_type_map_overrides() {
        let mut dtypes = DtypeMap::new();
        dtypes.insert("name".to_string(), Dtype::Str);
        let overrides = vec![("name".to_string(), "LowCardinality(String)".to_string())];

        let types = build_type_map(&dtypes, &overrides).unwrap();
        assert_eq!(types["name"], "LowCardinality(String)");
    }

    #[test]
    fn test_build_type_map_unknown_override_column() {
        let mut dtypes = DtypeMap::new();
        dtypes.insert("name".to_string(), Dtype::Str);
        let overrides = vec![("nope".to_string(), "UInt8".to_string())];

        let err = build_type_map(&dtypes, &overrides).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_parse_type_override() {
        assert_eq!(
            parse_type_override("amount = Decimal(18, 2)").unwrap(),
            ("amount".to_string(), "Decimal(18, 2)".to_string())
        );
        assert!(parse_type_override("amount").is_err());
        assert!(parse_type_override("=Int64").is_err());
        assert!(parse_type_override("amount=").is_err());
    }
}
