//! # Adlake - Classified-Ads Entity Lakehouse
//!
//! A small bronze/silver/gold "medallion" data layer for scraped
//! classified-ad job postings.
//!
//! Adlake provides:
//! - Content-addressed, idempotent inserts across three refinement layers
//! - An allow-list identifier validator for dynamically assembled SQL
//! - A parameterized date-range/filter query builder
//! - Silver-to-gold aggregation of entity mention counts
//! - Idempotent schema initialization, including per-label gold tables

pub mod aggregate;
pub mod config;
pub mod identifiers;
pub mod pipeline;
pub mod query;
pub mod records;
pub mod rules;
pub mod schema;
pub mod store;

// Re-exports for convenient access
pub use query::DateSelector;
pub use records::{BronzeRecord, EntitySpan, GoldRecord, SilverRecord};

/// Result type alias for Adlake operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Adlake operations
///
/// One variant per layer plus the pre-execution validation failures, so
/// callers can branch on kind without parsing message text. Duplicate-key
/// conflicts never surface here; every insert converts them to a `0` return.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("identifier not allowed: {0}")]
    InvalidIdentifier(String),

    #[error("invalid date selector: {0}")]
    InvalidDateRange(String),

    #[error("bronze insert failed for hash {hash}: {source}")]
    BronzeWrite {
        hash: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("silver insert failed for hash {hash} / entity '{entity}': {source}")]
    SilverWrite {
        hash: String,
        entity: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("gold insert failed for entity '{entity}' ({label}): {source}")]
    GoldWrite {
        entity: String,
        label: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("bronze query failed: {source} (sql: {query})")]
    BronzeQuery {
        query: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("silver query failed: {source} (sql: {query})")]
    SilverQuery {
        query: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema setup failed for '{table}': {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("no gold table exists for label '{0}'")]
    UnknownGoldTable(String),

    #[error("label '{0}' does not yield a usable gold table name")]
    MalformedLabel(String),

    #[error("labels '{0}' and '{1}' collide on gold table '{2}'")]
    LabelCollision(String, String, String),

    #[error("gold table creation failed for labels: {0}")]
    GoldTables(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rules file error: {0}")]
    Rules(#[from] serde_json::Error),

    #[error("cleaned batch line {line} is not a valid record: {source}")]
    BatchInput {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
