//! Silver-to-gold aggregation
//!
//! One GROUP BY pass over the silver layer: mention count and distinct-ad
//! count per (entity_text, label, scrap_date). The result rows are gold
//! candidates; writing them back is the caller's step.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::query::{build_where_clause, DateSelector, Filters};
use crate::records::GoldRecord;
use crate::schema::SCHEMA_NAME;
use crate::{Error, Result};

/// Group matching silver rows into gold candidates, ordered by count desc
///
/// `count` is the number of mentions in the bucket; `count_ads` the number
/// of distinct documents, so a repeated mention inside one ad raises `count`
/// but not `count_ads`. The selector follows the same validation rules as
/// any layer query and fails before SQL is built when empty.
pub fn aggregate(
    conn: &Connection,
    selector: &DateSelector,
    label: Option<&str>,
) -> Result<Vec<GoldRecord>> {
    let mut filters = Filters::new();
    if let Some(label) = label {
        filters.insert("label".to_string(), Value::Text(label.to_string()));
    }
    let (predicate, bind) = build_where_clause(selector, Some(&filters))?;

    let sql = format!(
        "SELECT entity_text, label, COUNT(*) AS count, \
         COUNT(DISTINCT hash) AS count_ads, scrap_date \
         FROM {SCHEMA_NAME}.ads_silver WHERE {predicate} \
         GROUP BY entity_text, label, scrap_date \
         ORDER BY count DESC"
    );

    let result = (|| -> rusqlite::Result<Vec<GoldRecord>> {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), |row| {
            Ok(GoldRecord {
                entity_text: row.get(0)?,
                label: row.get(1)?,
                count: row.get(2)?,
                count_ads: row.get(3)?,
                scrap_date: row.get(4)?,
            })
        })?;
        rows.collect()
    })();

    result.map_err(|source| {
        tracing::error!(
            "Silver aggregation failed: {} (sql: {}, params: {:?})",
            source,
            sql,
            bind
        );
        Error::SilverQuery { query: sql, source }
    })
}
