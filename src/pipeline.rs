//! Pipeline stage entry points
//!
//! Each stage takes the open connection by reference; the invoker (the CLI)
//! owns acquiring it and dropping it on every exit path. A stage that
//! inserts nothing new logs a warning and still succeeds; only write and
//! query failures abort.

use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Deserialize;

use crate::aggregate::aggregate;
use crate::query::{parse_date, DateSelector};
use crate::records::{BronzeRecord, EntitySpan};
use crate::schema::SCHEMA_NAME;
use crate::store::{fetch, insert_bronze, insert_gold, insert_silver};
use crate::{Error, Result};

/// The extraction collaborator: entity spans out of normalized ad text
pub trait EntityExtractor {
    fn extract(&self, text: &str) -> Vec<EntitySpan>;
}

/// One line of cleaned JSONL, as the cleaning stage emits it
///
/// The hash is optional on the wire; a missing one is filled with a blake3
/// digest of the normalized text here, at the boundary, so the store always
/// receives it as a plain caller-supplied field.
#[derive(Debug, Deserialize)]
struct CleanedAd {
    scrap_date: NaiveDate,
    source_url: String,
    norm_text: String,
    hash: Option<String>,
}

/// Read a cleaned-ads JSONL file into bronze records
pub fn read_cleaned_jsonl(path: &Path) -> Result<Vec<BronzeRecord>> {
    let file = std::fs::File::open(path)?;
    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let ad: CleanedAd = serde_json::from_str(&line)
            .map_err(|source| Error::BatchInput { line: lineno + 1, source })?;
        let hash = ad
            .hash
            .unwrap_or_else(|| blake3::hash(ad.norm_text.as_bytes()).to_hex().to_string());
        records.push(BronzeRecord {
            scrap_date: ad.scrap_date,
            source_url: ad.source_url,
            norm_text: ad.norm_text,
            hash,
        });
    }
    Ok(records)
}

/// Bronze stage: load cleaned records, counting only newly created rows
pub fn run_ingest(conn: &Connection, records: &[BronzeRecord]) -> Result<usize> {
    let mut inserted = 0;
    for record in records {
        inserted += insert_bronze(conn, record)?;
    }
    if inserted == 0 {
        tracing::warn!("No new ads were inserted to bronze");
    } else {
        tracing::info!("{} new ads were inserted to bronze", inserted);
    }
    Ok(inserted)
}

/// Silver stage: run the extractor over the day's bronze rows
///
/// One silver row per reported span; repeats of the same entity in the same
/// document are suppressed by the layer's uniqueness and do not count.
pub fn run_extract(
    conn: &Connection,
    run_date: NaiveDate,
    extractor: &dyn EntityExtractor,
) -> Result<usize> {
    tracing::info!("Querying ads scraped on: {}", run_date);
    let rows = fetch(
        conn,
        "ads_bronze",
        &DateSelector::exact(run_date),
        None,
        Some(&["scrap_date", "norm_text", "hash"]),
        SCHEMA_NAME,
    )?;

    let mut inserted = 0;
    for row in rows {
        let Some((date, text, hash)) = decode_bronze_row(&row) else {
            tracing::warn!("Skipping malformed bronze row: {:?}", row);
            continue;
        };
        for span in extractor.extract(&text) {
            inserted += insert_silver(conn, &span.into_silver(date, &hash))?;
        }
    }

    if inserted == 0 {
        tracing::warn!("No new entities were inserted to silver");
    } else {
        tracing::info!("{} new entities were inserted to silver", inserted);
    }
    Ok(inserted)
}

/// Gold stage: aggregate the day's silver rows and upsert the counts
pub fn run_count(conn: &Connection, run_date: NaiveDate, label: Option<&str>) -> Result<usize> {
    tracing::info!("Reading from the silver layer: {}", run_date);
    let candidates = aggregate(conn, &DateSelector::exact(run_date), label)?;

    let mut inserted = 0;
    for candidate in &candidates {
        inserted += insert_gold(conn, candidate)?;
    }
    if inserted == 0 {
        tracing::warn!("No new entity counts were saved");
    } else {
        tracing::info!("Inserted counts in gold layer for {} entities", inserted);
    }
    Ok(inserted)
}

fn decode_bronze_row(row: &[Value]) -> Option<(NaiveDate, String, String)> {
    match row {
        [Value::Text(date), Value::Text(text), Value::Text(hash)] => {
            let date = parse_date(date).ok()?;
            Some((date, text.clone(), hash.clone()))
        }
        _ => None,
    }
}
