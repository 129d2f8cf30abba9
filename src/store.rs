//! Layer Store - typed inserts and generic fetch
//!
//! Every operation borrows an open connection owned by the caller; the store
//! never opens or closes one. Inserts are upsert-or-skip: a duplicate key is
//! expected steady-state traffic and comes back as a `0` return, never an
//! error, which is what makes re-running a pipeline stage on the same input
//! a no-op. Each statement commits on its own (autocommit), so a batch of N
//! inserts is N independent commits.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::identifiers::{gold_table_for, validate_column, validate_identifiers};
use crate::query::{build_where_clause, DateSelector, Filters};
use crate::records::{BronzeRecord, GoldRecord, SilverRecord};
use crate::schema::{table_exists, SCHEMA_NAME};
use crate::{Error, Result};

/// Insert one bronze row; returns 1 if created, 0 if the hash already exists
pub fn insert_bronze(conn: &Connection, record: &BronzeRecord) -> Result<usize> {
    conn.execute(
        "INSERT INTO ads_lakehouse.ads_bronze (scrap_date, source_url, norm_text, hash) \
         VALUES (?, ?, ?, ?) ON CONFLICT(hash) DO NOTHING",
        params![
            record.scrap_date,
            record.source_url,
            record.norm_text,
            record.hash,
        ],
    )
    .map_err(|source| {
        tracing::error!("Error inserting bronze record with hash: {}", record.hash);
        Error::BronzeWrite { hash: record.hash.clone(), source }
    })
}

/// Insert one silver row; returns 1 if created, 0 on a (hash, entity) repeat
pub fn insert_silver(conn: &Connection, record: &SilverRecord) -> Result<usize> {
    conn.execute(
        "INSERT INTO ads_lakehouse.ads_silver \
         (scrap_date, entity_text, label, start_pos, end_pos, hash) \
         VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(hash, entity_text) DO NOTHING",
        params![
            record.scrap_date,
            record.entity_text,
            record.label,
            record.start_pos,
            record.end_pos,
            record.hash,
        ],
    )
    .map_err(|source| {
        tracing::error!(
            "Error inserting silver record with hash: {} entity: {}",
            record.hash,
            record.entity_text
        );
        Error::SilverWrite {
            hash: record.hash.clone(),
            entity: record.entity_text.clone(),
            source,
        }
    })
}

/// Upsert one gold aggregate into the per-label gold table
///
/// The table must already exist (it is created from the known label set at
/// initialization) and may not hold aggregates of a different label: two
/// labels sanitizing to the same table name must fail fast here, or one
/// label's counts would silently overwrite the other's. Conflict target is
/// (entity_text, scrap_date); identical values change nothing and return 0,
/// so daily re-aggregation is safe to repeat.
pub fn insert_gold(conn: &Connection, record: &GoldRecord) -> Result<usize> {
    let table = gold_table_for(&record.label)?;
    if !table_exists(conn, SCHEMA_NAME, &table)? {
        return Err(Error::UnknownGoldTable(record.label.clone()));
    }

    let owner_sql =
        format!("SELECT label FROM {SCHEMA_NAME}.{table} WHERE label <> ? LIMIT 1");
    let foreign_label: Option<String> = conn
        .query_row(&owner_sql, [&record.label], |row| row.get(0))
        .optional()
        .map_err(|source| Error::GoldWrite {
            entity: record.entity_text.clone(),
            label: record.label.clone(),
            source,
        })?;
    if let Some(owner) = foreign_label {
        return Err(Error::LabelCollision(owner, record.label.clone(), table));
    }

    let sql = format!(
        "INSERT INTO {SCHEMA_NAME}.{table} \
         (entity_text, label, count, count_ads, scrap_date) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(entity_text, scrap_date) DO UPDATE SET \
         count = excluded.count, count_ads = excluded.count_ads \
         WHERE count IS NOT excluded.count OR count_ads IS NOT excluded.count_ads"
    );
    conn.execute(
        &sql,
        params![
            record.entity_text,
            record.label,
            record.count,
            record.count_ads,
            record.scrap_date,
        ],
    )
    .map_err(|source| {
        tracing::error!(
            "Error inserting gold aggregate for entity: {} ({})",
            record.entity_text,
            record.label
        );
        Error::GoldWrite {
            entity: record.entity_text.clone(),
            label: record.label.clone(),
            source,
        }
    })
}

/// Fetch all rows matching a date selector and optional equality filters
///
/// Identifiers are validated before any SQL is assembled; values travel as
/// bind parameters. An empty result is a valid outcome, not an error. On
/// execution failure the SQL text and parameters are logged and a
/// layer-specific query error is returned.
pub fn fetch(
    conn: &Connection,
    table: &str,
    selector: &DateSelector,
    filters: Option<&Filters>,
    columns: Option<&[&str]>,
    schema: &str,
) -> Result<Vec<Vec<Value>>> {
    validate_identifiers(schema, table)?;
    let projection = match columns {
        Some(cols) => {
            for col in cols {
                validate_column(col)?;
            }
            cols.join(", ")
        }
        None => "*".to_string(),
    };
    let (predicate, bind) = build_where_clause(selector, filters)?;
    let sql = format!("SELECT {projection} FROM {schema}.{table} WHERE {predicate}");

    let result = (|| -> rusqlite::Result<Vec<Vec<Value>>> {
        let mut stmt = conn.prepare(&sql)?;
        let ncols = stmt.column_count();
        let mut out = Vec::new();
        let mut rows = stmt.query(params_from_iter(bind.iter()))?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(ncols);
            for i in 0..ncols {
                values.push(row.get::<_, Value>(i)?);
            }
            out.push(values);
        }
        Ok(out)
    })();

    result.map_err(|source| {
        tracing::error!("Layer query failed: {} (sql: {}, params: {:?})", source, sql, bind);
        match table {
            "ads_bronze" => Error::BronzeQuery { query: sql, source },
            _ => Error::SilverQuery { query: sql, source },
        }
    })
}
