//! Layer record types
//!
//! One struct per refinement layer, plus the entity span shape produced by
//! the extraction collaborator. All serde-derived so bronze batches can be
//! read straight from cleaned JSONL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A raw-but-normalized ad document, content-addressed by `hash`
///
/// `hash` is always caller-supplied: a deterministic digest of `norm_text`
/// computed by the cleaning stage. The store never derives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BronzeRecord {
    pub scrap_date: NaiveDate,
    pub source_url: String,
    pub norm_text: String,
    pub hash: String,
}

/// One entity span extracted from one bronze document
///
/// Keeps a weak back-reference to its document via `hash`; silver rows
/// survive independently of the bronze row they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilverRecord {
    pub scrap_date: NaiveDate,
    pub entity_text: String,
    pub label: String,
    pub start_pos: i64,
    pub end_pos: i64,
    pub hash: String,
}

/// Per-entity-per-day aggregate
///
/// `count` is total mentions in the date bucket; `count_ads` is distinct
/// source documents (a repeated mention inside one ad counts once).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldRecord {
    pub entity_text: String,
    pub label: String,
    pub count: i64,
    pub count_ads: i64,
    pub scrap_date: NaiveDate,
}

/// Entity span as produced by an extractor, before it is tied to a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub entity_text: String,
    pub label: String,
    pub start_pos: i64,
    pub end_pos: i64,
}

impl EntitySpan {
    /// Attach the source document's date and hash, yielding a silver row
    pub fn into_silver(self, scrap_date: NaiveDate, hash: &str) -> SilverRecord {
        SilverRecord {
            scrap_date,
            entity_text: self.entity_text,
            label: self.label,
            start_pos: self.start_pos,
            end_pos: self.end_pos,
            hash: hash.to_string(),
        }
    }
}
