//! Lakehouse schema initialization
//!
//! Every creation statement is `IF NOT EXISTS`, so re-running `db_init`
//! against an initialized store is a no-op. The lakehouse schema maps to an
//! ATTACHed SQLite database: a sibling file next to the main database, or an
//! in-memory attach when the connection itself is in-memory.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::Connection;

use crate::identifiers::{gold_table_for, validate_identifiers, ALLOWED_SCHEMAS};
use crate::{Error, Result};

/// The one schema this crate writes to
pub const SCHEMA_NAME: &str = "ads_lakehouse";

/// SQL to create the bronze layer table
pub const CREATE_BRONZE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ads_lakehouse.ads_bronze (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scrap_date TEXT NOT NULL,
    source_url TEXT,
    norm_text TEXT,
    hash TEXT,
    UNIQUE(hash)
)
"#;

/// SQL to create the silver layer table
pub const CREATE_SILVER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ads_lakehouse.ads_silver (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scrap_date TEXT NOT NULL,
    entity_text TEXT,
    label TEXT,
    start_pos INTEGER,
    end_pos INTEGER,
    hash TEXT,
    UNIQUE(hash, entity_text)
)
"#;

/// SQL for one per-label gold table
///
/// Uniqueness on (entity_text, scrap_date) inside a per-label table is the
/// (entity_text, label, scrap_date) aggregate key: the label picks the table.
pub fn gold_table_sql(schema: &str, table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {schema}.{table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_text TEXT NOT NULL,
    label TEXT NOT NULL,
    count INTEGER NOT NULL,
    count_ads INTEGER NOT NULL,
    scrap_date TEXT NOT NULL,
    UNIQUE(entity_text, scrap_date)
)
"#
    )
}

/// Whether `schema` is attached on this connection
pub fn schema_exists(conn: &Connection, schema: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_database_list WHERE name = ?",
            [schema],
            |row| row.get(0),
        )
        .map_err(|source| Error::Schema { table: schema.to_string(), source })?;
    Ok(count > 0)
}

/// Whether `table` exists inside the attached schema
///
/// `table` must be allow-listed or have the gold-table shape; anything else
/// is rejected before the catalog is consulted.
pub fn table_exists(conn: &Connection, schema: &str, table: &str) -> Result<bool> {
    if !ALLOWED_SCHEMAS.contains(&schema) {
        return Err(Error::InvalidIdentifier(format!("schema '{schema}'")));
    }
    if validate_identifiers(schema, table).is_err()
        && !crate::identifiers::is_gold_table_name(table)
    {
        return Err(Error::InvalidIdentifier(format!("table '{table}'")));
    }

    let sql = format!(
        "SELECT COUNT(*) FROM {schema}.sqlite_master WHERE type = 'table' AND name = ?"
    );
    let count: i64 = conn
        .query_row(&sql, [table], |row| row.get(0))
        .map_err(|source| Error::Schema { table: table.to_string(), source })?;
    Ok(count > 0)
}

/// Attach the lakehouse schema if it is not already present
///
/// The schema database lives next to the main database file. An in-memory
/// connection gets an in-memory attach, which lives and dies with it.
pub fn ensure_schema(conn: &Connection, schema: &str) -> Result<()> {
    if !ALLOWED_SCHEMAS.contains(&schema) {
        return Err(Error::InvalidIdentifier(format!("schema '{schema}'")));
    }
    if schema_exists(conn, schema)? {
        return Ok(());
    }

    let target = match conn.path() {
        Some(p) if !p.is_empty() => Path::new(p)
            .with_file_name(format!("{schema}.db"))
            .to_string_lossy()
            .into_owned(),
        _ => ":memory:".to_string(),
    };

    // Schema name validated above; the file path is a bound parameter.
    let sql = format!("ATTACH DATABASE ? AS {schema}");
    conn.execute(&sql, [&target])
        .map_err(|source| Error::Schema { table: schema.to_string(), source })?;
    tracing::info!("Attached schema '{}' at {}", schema, target);
    Ok(())
}

fn create_layer_table(conn: &Connection, table: &str, sql: &str) -> Result<()> {
    conn.execute(sql, []).map_err(|source| {
        tracing::error!("Unable to create '{}' table: {}", table, source);
        Error::Schema { table: table.to_string(), source }
    })?;
    tracing::info!("Table '{}' ready.", table);
    Ok(())
}

/// Ensure the schema, the static layer tables and one gold table per label
///
/// Bronze and silver are required: a failure there aborts initialization.
/// Gold tables are isolated per label: a malformed label or a failed create
/// is logged and recorded, the remaining labels still get their tables, and
/// the accumulated failures surface as one error at the end. Two distinct
/// labels landing on the same table name abort immediately; proceeding
/// would merge their aggregates.
pub fn db_init<S: AsRef<str>>(conn: &Connection, labels: &[S]) -> Result<()> {
    ensure_schema(conn, SCHEMA_NAME)?;
    create_layer_table(conn, "ads_bronze", CREATE_BRONZE_TABLE)?;
    create_layer_table(conn, "ads_silver", CREATE_SILVER_TABLE)?;

    let mut owner_of: BTreeMap<String, String> = BTreeMap::new();
    let mut failed: Vec<String> = Vec::new();

    for label in labels {
        let label = label.as_ref();
        let table = match gold_table_for(label) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Skipping gold table for label '{}': {}", label, e);
                failed.push(label.to_string());
                continue;
            }
        };
        if let Some(prev) = owner_of.get(&table) {
            if prev != label {
                return Err(Error::LabelCollision(prev.clone(), label.to_string(), table));
            }
            continue;
        }
        owner_of.insert(table.clone(), label.to_string());

        if let Err(e) = create_layer_table(conn, &table, &gold_table_sql(SCHEMA_NAME, &table)) {
            tracing::error!("Gold table '{}' creation failed: {}", table, e);
            failed.push(label.to_string());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::GoldTables(failed.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_db_init_creates_all_tables() {
        let conn = test_conn();
        db_init(&conn, &["PUESTO", "SKILL"]).unwrap();

        assert!(schema_exists(&conn, SCHEMA_NAME).unwrap());
        assert!(table_exists(&conn, SCHEMA_NAME, "ads_bronze").unwrap());
        assert!(table_exists(&conn, SCHEMA_NAME, "ads_silver").unwrap());
        assert!(table_exists(&conn, SCHEMA_NAME, "gold_puesto").unwrap());
        assert!(table_exists(&conn, SCHEMA_NAME, "gold_skill").unwrap());
    }

    #[test]
    fn test_db_init_is_idempotent() {
        let conn = test_conn();
        db_init(&conn, &["PUESTO"]).unwrap();
        db_init(&conn, &["PUESTO"]).unwrap();
    }

    #[test]
    fn test_malformed_label_does_not_block_others() {
        let conn = test_conn();
        let err = db_init(&conn, &["PUESTO", "!!!", "SKILL"]).unwrap_err();
        assert!(matches!(err, Error::GoldTables(_)));

        // The well-formed labels still got their tables.
        assert!(table_exists(&conn, SCHEMA_NAME, "gold_puesto").unwrap());
        assert!(table_exists(&conn, SCHEMA_NAME, "gold_skill").unwrap());
    }

    #[test]
    fn test_label_collision_aborts() {
        let conn = test_conn();
        let err = db_init(&conn, &["PU ESTO", "PU-ESTO"]).unwrap_err();
        assert!(matches!(err, Error::LabelCollision(_, _, _)));
    }

    #[test]
    fn test_table_exists_rejects_arbitrary_names() {
        let conn = test_conn();
        db_init::<&str>(&conn, &[]).unwrap();
        let err = table_exists(&conn, SCHEMA_NAME, "sqlite_master; --").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn test_file_backed_schema_attaches_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("adlake.db");
        let conn = Connection::open(&db_path).unwrap();
        db_init(&conn, &["PUESTO"]).unwrap();
        drop(conn);
        assert!(dir.path().join("ads_lakehouse.db").exists());
    }
}
