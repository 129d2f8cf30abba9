//! Parameterized WHERE-clause construction
//!
//! Every value is emitted as a bind parameter; the only interpolated text is
//! allow-listed column names. Building fails before any SQL exists when the
//! selector is empty or a filter key is unknown.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use rusqlite::types::Value;

use crate::identifiers::validate_column;
use crate::{Error, Result};

/// Equality filters, keyed by column name
///
/// BTreeMap so the emitted SQL is deterministic for a given filter set.
pub type Filters = BTreeMap<String, Value>;

/// The date predicate of a layer query
///
/// Exactly one interpretation applies, in priority order:
/// 1. `date` set: equality on that date, range bounds ignored.
/// 2. `since` and `to` set: inclusive range on both ends.
/// 3. only `since` set: inclusive range up to today at call time.
/// 4. only `to` set: equality on `to` (deliberate asymmetry, not a range).
/// 5. nothing set: the build fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateSelector {
    pub date: Option<NaiveDate>,
    pub since: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateSelector {
    pub fn exact(date: NaiveDate) -> Self {
        Self { date: Some(date), ..Self::default() }
    }

    pub fn since(since: NaiveDate) -> Self {
        Self { since: Some(since), ..Self::default() }
    }

    pub fn to(to: NaiveDate) -> Self {
        Self { to: Some(to), ..Self::default() }
    }

    pub fn range(since: NaiveDate, to: NaiveDate) -> Self {
        Self { date: None, since: Some(since), to: Some(to) }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.since.is_none() && self.to.is_none()
    }
}

/// Strict `YYYY-MM-DD` parse for execution-date arguments
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidDateRange(format!("'{s}' is not YYYY-MM-DD")))
}

fn date_param(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

/// Build the WHERE predicate and its positional parameters
///
/// Returns the predicate text (without the `WHERE` keyword) and the bound
/// values in placeholder order. Filters are ANDed onto the date predicate;
/// no OR or grouping is supported.
pub fn build_where_clause(
    selector: &DateSelector,
    filters: Option<&Filters>,
) -> Result<(String, Vec<Value>)> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(date) = selector.date {
        clauses.push("scrap_date = ?".to_string());
        params.push(date_param(date));
    } else if let Some(since) = selector.since {
        // Upper bound defaults to today; reproducible runs always pin `to`.
        let to = selector.to.unwrap_or_else(|| Local::now().date_naive());
        clauses.push("scrap_date >= ?".to_string());
        params.push(date_param(since));
        clauses.push("scrap_date <= ?".to_string());
        params.push(date_param(to));
    } else if let Some(to) = selector.to {
        clauses.push("scrap_date = ?".to_string());
        params.push(date_param(to));
    } else {
        return Err(Error::InvalidDateRange(
            "no exact date or range bound supplied".to_string(),
        ));
    }

    if let Some(filters) = filters {
        for (column, value) in filters {
            validate_column(column)?;
            clauses.push(format!("{column} = ?"));
            params.push(value.clone());
        }
    }

    Ok((clauses.join(" AND "), params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_exact_date_wins_over_range() {
        let selector = DateSelector {
            date: Some(d("2025-08-01")),
            since: Some(d("2025-01-01")),
            to: Some(d("2025-12-31")),
        };
        let (sql, params) = build_where_clause(&selector, None).unwrap();
        assert_eq!(sql, "scrap_date = ?");
        assert_eq!(params, vec![Value::Text("2025-08-01".into())]);
    }

    #[test]
    fn test_since_and_to_is_inclusive_range() {
        let selector = DateSelector::range(d("2025-01-01"), d("2025-12-31"));
        let (sql, params) = build_where_clause(&selector, None).unwrap();
        assert_eq!(sql, "scrap_date >= ? AND scrap_date <= ?");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_since_only_upper_bounds_at_today() {
        let selector = DateSelector::since(d("2025-01-01"));
        let (sql, params) = build_where_clause(&selector, None).unwrap();
        assert_eq!(sql, "scrap_date >= ? AND scrap_date <= ?");
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(params[1], Value::Text(today));
    }

    #[test]
    fn test_to_only_is_equality_not_range() {
        let selector = DateSelector::to(d("2025-08-01"));
        let (sql, params) = build_where_clause(&selector, None).unwrap();
        assert_eq!(sql, "scrap_date = ?");
        assert_eq!(params, vec![Value::Text("2025-08-01".into())]);
    }

    #[test]
    fn test_empty_selector_fails_before_sql() {
        let err = build_where_clause(&DateSelector::default(), None).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidDateRange(_)));
    }

    #[test]
    fn test_filters_are_anded_and_bound() {
        let mut filters = Filters::new();
        filters.insert("label".to_string(), Value::Text("PUESTO".into()));
        filters.insert("hash".to_string(), Value::Text("abc".into()));

        let selector = DateSelector::exact(d("2025-08-01"));
        let (sql, params) = build_where_clause(&selector, Some(&filters)).unwrap();
        // BTreeMap ordering: hash before label
        assert_eq!(sql, "scrap_date = ? AND hash = ? AND label = ?");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_unknown_filter_column_rejected() {
        let mut filters = Filters::new();
        filters.insert("label = 'x' OR 1=1 --".to_string(), Value::Null);

        let selector = DateSelector::exact(d("2025-08-01"));
        let err = build_where_clause(&selector, Some(&filters)).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidIdentifier(_)));
    }

    #[test]
    fn test_parse_date_rejects_bad_format() {
        assert!(parse_date("2025-08-01").is_ok());
        assert!(parse_date("01/08/2025").is_err());
        assert!(parse_date("2025-13-40").is_err());
    }
}
