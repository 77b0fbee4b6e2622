//! Column identifier normalization.
//!
//! Raw CSV labels such as `"Start Time"` or `"2023"` are rewritten into
//! identifiers that are safe to use unquoted in ClickHouse: lowercase, with
//! every run of non-word characters collapsed to `_`, never empty, never
//! starting with a digit and unique within the table.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::types::IdentifierMap;

/// Runs of characters that are not letters, digits or underscore.
static NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// Lowercase a label and collapse its non-word runs to a single `_`.
///
/// This is the per-label step only; it does not handle empty results,
/// digit prefixes or collisions. Use [`normalize_identifiers`] for that.
pub fn to_identifier(label: &str) -> String {
    NON_WORD_RUN.replace_all(label, "_").to_lowercase()
}

/// Build the identifier map for an ordered set of raw labels.
///
/// Rules, applied in order for the label at zero-based `index`:
/// 1. an empty identifier becomes `column_{index}`;
/// 2. an identifier starting with a digit becomes `column_{index}_{identifier}`;
/// 3. an identifier already taken by an earlier label gets `_{index}`
///    appended, then `_2`, `_3`, ... until it is unique.
///
/// A raw label that repeats an earlier raw label keeps the first mapping;
/// the reader rejects such headers before they get here.
pub fn normalize_identifiers<S: AsRef<str>>(labels: &[S]) -> IdentifierMap {
    let mut map = IdentifierMap::with_capacity(labels.len());
    let mut taken: HashSet<String> = HashSet::with_capacity(labels.len());

    for (index, label) in labels.iter().enumerate() {
        let label = label.as_ref();
        if map.contains_key(label) {
            continue;
        }

        let mut identifier = to_identifier(label);
        if identifier.is_empty() {
            identifier = format!("column_{}", index);
        } else if identifier.starts_with(char::is_numeric) {
            identifier = format!("column_{}_{}", index, identifier);
        }

        let identifier = disambiguate(identifier, index, &taken);
        taken.insert(identifier.clone());
        map.insert(label.to_string(), identifier);
    }

    map
}

fn disambiguate(identifier: String, index: usize, taken: &HashSet<String>) -> String {
    if !taken.contains(&identifier) {
        return identifier;
    }

    let positional = format!("{}_{}", identifier, index);
    if !taken.contains(&positional) {
        return positional;
    }

    let mut counter = 2;
    loop {
        let candidate = format!("{}_{}", positional, counter);
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Look up the identifier for a primary key given either its raw label or
/// an identifier that is already normalized.
pub fn resolve_identifier<'a>(map: &'a IdentifierMap, key: &str) -> Option<&'a str> {
    map.get(key)
        .or_else(|| map.values().find(|id| id.as_str() == key))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_identifier_basic() {
        assert_eq!(to_identifier("Start Time"), "start_time");
        assert_eq!(to_identifier("Topic"), "topic");
        assert_eq!(to_identifier("Meeting ID (UTC)"), "meeting_id_utc_");
        assert_eq!(to_identifier("a -- b"), "a_b");
    }

    #[test]
    fn test_to_identifier_keeps_underscores() {
        assert_eq!(to_identifier("user__id"), "user__id");
        assert_eq!(to_identifier("_private"), "_private");
    }

    #[test]
    fn test_to_identifier_unicode_letters_are_word_chars() {
        assert_eq!(to_identifier("Größe"), "größe");
    }

    #[test]
    fn test_normalize_simple_labels() {
        let map = normalize_identifiers(&["Start Time", "End Time", "Topic"]);
        assert_eq!(map["Start Time"], "start_time");
        assert_eq!(map["End Time"], "end_time");
        assert_eq!(map["Topic"], "topic");
        let order: Vec<_> = map.keys().cloned().collect();
        assert_eq!(order, vec!["Start Time", "End Time", "Topic"]);
    }

    #[test]
    fn test_normalize_empty_label() {
        let map = normalize_identifiers(&["id", "", "%%"]);
        assert_eq!(map[""], "column_1");
        // A run of symbols collapses to a lone separator, which is not empty
        assert_eq!(map["%%"], "_");
    }

    #[test]
    fn test_normalize_digit_leading_label() {
        let map = normalize_identifiers(&["name", "2023"]);
        assert_eq!(map["2023"], "column_1_2023");
        assert!(!map["2023"].starts_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn test_normalize_collision_gets_positional_suffix() {
        let map = normalize_identifiers(&["First Name", "first-name", "FIRST NAME"]);
        assert_eq!(map["First Name"], "first_name");
        assert_eq!(map["first-name"], "first_name_1");
        assert_eq!(map["FIRST NAME"], "first_name_2");
    }

    #[test]
    fn test_normalize_collision_with_existing_suffix() {
        let map = normalize_identifiers(&["a", "a_1", "A"]);
        // "A" at index 2 would become "a", then "a_2" which is free
        assert_eq!(map["a"], "a");
        assert_eq!(map["a_1"], "a_1");
        assert_eq!(map["A"], "a_2");

        let map = normalize_identifiers(&["a", "a_1", "a 1", "A"]);
        assert_eq!(map["a 1"], "a_1_2");
    }

    #[test]
    fn test_normalize_collision_counter() {
        let map = normalize_identifiers(&["c_2", "c", "C"]);
        assert_eq!(map["c_2"], "c_2");
        assert_eq!(map["c"], "c");
        assert_eq!(map["C"], "c_2_2");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let labels = ["Col A", "col a", "2x", ""];
        assert_eq!(normalize_identifiers(&labels), normalize_identifiers(&labels));
    }

    #[test]
    fn test_resolve_identifier_by_label_or_identifier() {
        let map = normalize_identifiers(&["Start Time", "Topic"]);
        assert_eq!(resolve_identifier(&map, "Start Time"), Some("start_time"));
        assert_eq!(resolve_identifier(&map, "start_time"), Some("start_time"));
        assert_eq!(resolve_identifier(&map, "missing"), None);
    }
}
