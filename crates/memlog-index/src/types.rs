use serde::{Deserialize, Serialize};

use memlog_core::{Seq, Tier};

/// Where an index row's `source` originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Auto,
    Manual,
    Curation,
}

/// Decay stage used by garbage collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayTier {
    Hot,
    Warm,
    Cold,
    Archived,
}

/// One derived row per non-redacted, body-present entry. Rebuilt wholesale from the chain; never the source of truth.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexRow {
    pub seq: Seq,
    pub content: String,
    pub summary: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: memlog_core::EntryType,
    pub tier: Tier,
    pub importance: f64,
    pub access_count: u64,
    pub last_accessed: Option<String>,
    pub created_at: String,
    pub decay_tier: DecayTier,
    pub source: Source,
}
