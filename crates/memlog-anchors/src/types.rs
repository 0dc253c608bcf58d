use serde::{Deserialize, Serialize};

/// What a submission binds to an external timeline: either a single
/// entry's content hash (Provider A) or the chain tip plus its entry
/// count (Provider B, which signs over both).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorTarget {
    Entry { seq: u64, hash: String },
    Tip { hash: String, entry_count: u64 },
}

impl AnchorTarget {
    /// The value actually hashed/signed for this target.
    pub fn target_hash(&self) -> &str {
        match self {
            AnchorTarget::Entry { hash, .. } => hash,
            AnchorTarget::Tip { hash, .. } => hash,
        }
    }

    /// The key used to index `anchors/pending.json` records: a seq for
    /// Provider A, the entry count for Provider B (there is one tip
    /// anchor per chain length).
    pub fn target_id(&self) -> String {
        match self {
            AnchorTarget::Entry { seq, .. } => seq.to_string(),
            AnchorTarget::Tip { entry_count, .. } => entry_count.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    Pending,
    Confirmed,
    Failed,
}

/// An external service's coordinates for a confirmed anchor: where to
/// independently look it up and the timeline it attests to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalCoords {
    /// e.g. a Bitcoin block height for Provider A, or `{tx_hash, block_number}`
    /// rendered as a string for Provider B.
    pub locator: String,
    /// The external timestamp the anchor attests to, RFC 3339.
    pub external_ts: String,
}

/// One persisted record in `anchors/pending.json`, keyed by `target_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub provider: String,
    pub target_id: String,
    pub target_hash: String,
    pub status: AnchorStatus,
    pub submitted_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confirmed_at: Option<String>,
    pub proof_artifact_path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_coords: Option<ExternalCoords>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SubmitResult {
    pub record: AnchorRecord,
}

#[derive(Clone, Debug)]
pub struct VerifyResult {
    pub valid: bool,
    pub status: AnchorStatus,
    pub external_coords: Option<ExternalCoords>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct StatusReport {
    pub upgraded: Vec<String>,
    pub still_pending: Vec<String>,
    pub newly_confirmed: Vec<String>,
    pub newly_failed: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct CostEstimate {
    pub fee: f64,
    pub unit: &'static str,
    pub available: bool,
}

/// Options governing one `submit`/`upgrade_pending`/`verify` call.
#[derive(Clone, Copy, Debug)]
pub struct CallOptions {
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout_secs: memlog_core::constants::ANCHOR_CALL_TIMEOUT_SECS,
            max_attempts: memlog_core::constants::ANCHOR_CALL_MAX_ATTEMPTS,
        }
    }
}
