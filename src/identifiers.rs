//! SQL identifier validation
//!
//! Schema, table and column names cannot be bound as placeholders, so any
//! name that ends up interpolated into SQL text must either come from a
//! closed allow-list or be derived by a pure sanitizer. Values never pass
//! through here; they are always bound parameters.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Schemas the data layer may touch
pub const ALLOWED_SCHEMAS: &[&str] = &["ads_lakehouse"];

/// Statically named layer tables
pub const ALLOWED_TABLES: &[&str] = &["ads_bronze", "ads_silver"];

/// Columns accepted as filter keys or projections
pub const ALLOWED_COLUMNS: &[&str] = &[
    "scrap_date",
    "source_url",
    "norm_text",
    "hash",
    "entity_text",
    "label",
    "start_pos",
    "end_pos",
];

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").unwrap());

/// Reject any (schema, table) pair outside the allow-lists
pub fn validate_identifiers(schema: &str, table: &str) -> Result<()> {
    if !ALLOWED_SCHEMAS.contains(&schema) {
        return Err(Error::InvalidIdentifier(format!("schema '{schema}'")));
    }
    if !ALLOWED_TABLES.contains(&table) {
        return Err(Error::InvalidIdentifier(format!("table '{table}'")));
    }
    Ok(())
}

/// Reject a column name outside the allow-list
pub fn validate_column(column: &str) -> Result<()> {
    if !ALLOWED_COLUMNS.contains(&column) {
        return Err(Error::InvalidIdentifier(format!("column '{column}'")));
    }
    Ok(())
}

/// Derive the gold table name for an entity label
///
/// Pure: lower-cases, collapses every run of characters outside `[a-z0-9_]`
/// to a single `_`, then prefixes `gold_`. Never fails on its own; use
/// [`gold_table_for`] when the label comes from outside.
pub fn safe_table_name(label: &str) -> String {
    let lowered = label.to_lowercase();
    let sanitized = NON_WORD.replace_all(&lowered, "_");
    format!("gold_{sanitized}")
}

/// Gold table name for a label, rejecting labels that sanitize to nothing
///
/// Every label with no word characters at all would land on the same table
/// name, so such labels are malformed rather than silently merged. Collision
/// checking across a label set happens at schema initialization.
pub fn gold_table_for(label: &str) -> Result<String> {
    let table = safe_table_name(label);
    if table.trim_start_matches("gold_").trim_matches('_').is_empty() {
        return Err(Error::MalformedLabel(label.to_string()));
    }
    Ok(table)
}

/// Check that a name has the shape `safe_table_name` produces
///
/// Used before interpolating a gold table name that arrived as data rather
/// than straight from the sanitizer.
pub fn is_gold_table_name(name: &str) -> bool {
    match name.strip_prefix("gold_") {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_identifiers_pass() {
        validate_identifiers("ads_lakehouse", "ads_bronze").unwrap();
        validate_identifiers("ads_lakehouse", "ads_silver").unwrap();
    }

    #[test]
    fn test_injection_attempt_rejected() {
        let err =
            validate_identifiers("ads_lakehouse", "ads_silver; DROP TABLE x").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));

        let err = validate_identifiers("main", "ads_bronze").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn test_unknown_column_rejected() {
        validate_column("entity_text").unwrap();
        assert!(validate_column("entity_text OR 1=1").is_err());
    }

    #[test]
    fn test_safe_table_name_sanitizes() {
        assert_eq!(safe_table_name("PUESTO"), "gold_puesto");
        assert_eq!(safe_table_name("Años Exp."), "gold_a_os_exp_");
        assert_eq!(safe_table_name("soft-skill"), "gold_soft_skill");
    }

    #[test]
    fn test_safe_table_name_is_pure() {
        assert_eq!(safe_table_name("PUESTO"), safe_table_name("PUESTO"));
    }

    #[test]
    fn test_gold_table_for_rejects_empty_sanitization() {
        let err = gold_table_for("!!!").unwrap_err();
        assert!(matches!(err, Error::MalformedLabel(_)));
        assert_eq!(gold_table_for("PUESTO").unwrap(), "gold_puesto");
    }

    #[test]
    fn test_is_gold_table_name() {
        assert!(is_gold_table_name("gold_puesto"));
        assert!(!is_gold_table_name("gold_"));
        assert!(!is_gold_table_name("ads_bronze"));
        assert!(!is_gold_table_name("gold_x; DROP TABLE y"));
    }
}
