use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{METADATA_MAX_DEPTH, METADATA_MAX_STRING_LEN};
use crate::error::MemlogError;

/// Monotonic per-entry sequence number. Genesis is `seq == 0`.
pub type Seq = u64;

// ── EntryType / Tier ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[serde(rename = "genesis/identity")]
    GenesisIdentity,
    Memory,
    Decision,
    Redaction,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryType::GenesisIdentity => "genesis/identity",
            EntryType::Memory => "memory",
            EntryType::Decision => "decision",
            EntryType::Redaction => "redaction",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Committed,
    Relationship,
    Ephemeral,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Committed => "committed",
            Tier::Relationship => "relationship",
            Tier::Ephemeral => "ephemeral",
        };
        write!(f, "{s}")
    }
}

// ── Metadata ───────────────────────────────────────────────────────────────

/// A bounded, JSON-serializable metadata value: depth <= 5, string
/// leaves <= 10_000 bytes, finite numbers only. Object keys are kept in a
/// `BTreeMap` so canonical encoding gets lexicographic key order for free.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<MetadataValue>),
    Object(BTreeMap<String, MetadataValue>),
}

pub type MetadataMap = BTreeMap<String, MetadataValue>;

/// Validate a metadata value against the depth/size bounds above. `depth` is the
/// depth of `value` itself (the top-level map passed to `validate_metadata`
/// starts at depth 1).
fn validate_value(value: &MetadataValue, depth: usize) -> Result<(), MemlogError> {
    if depth > METADATA_MAX_DEPTH {
        return Err(MemlogError::MetadataInvalid {
            reason: format!("nesting depth exceeds {METADATA_MAX_DEPTH}"),
        });
    }
    match value {
        MetadataValue::Null | MetadataValue::Bool(_) => Ok(()),
        MetadataValue::Number(n) => {
            if !n.is_finite() {
                return Err(MemlogError::MetadataInvalid {
                    reason: "numbers must be finite".into(),
                });
            }
            Ok(())
        }
        MetadataValue::String(s) => {
            if s.len() > METADATA_MAX_STRING_LEN {
                return Err(MemlogError::MetadataInvalid {
                    reason: format!("string exceeds {METADATA_MAX_STRING_LEN} bytes"),
                });
            }
            Ok(())
        }
        MetadataValue::Array(items) => {
            for item in items {
                validate_value(item, depth + 1)?;
            }
            Ok(())
        }
        MetadataValue::Object(map) => {
            for v in map.values() {
                validate_value(v, depth + 1)?;
            }
            Ok(())
        }
    }
}

/// Validate a top-level metadata mapping against the bounds above.
pub fn validate_metadata(map: &MetadataMap) -> Result<(), MemlogError> {
    for v in map.values() {
        validate_value(v, 1)?;
    }
    Ok(())
}

// ── Entry ──────────────────────────────────────────────────────────────────

/// One signed, immutable header in the hash chain.
///
/// Field order is fixed and matches the on-disk `chain.jsonl` line format
/// (`seq, ts, type, tier, content_hash, prev_hash, signature, metadata?`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub seq: Seq,
    /// ISO 8601 UTC, millisecond precision, e.g. `2026-01-01T00:00:00.000Z`.
    pub ts: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub tier: Tier,
    /// `"sha256:" + 64 hex chars`.
    pub content_hash: String,
    /// `"sha256:" + 64 hex chars`, or `None` iff `seq == 0`.
    pub prev_hash: Option<String>,
    /// `"ed25519:" + 128 hex chars`.
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<MetadataMap>,
}

impl Entry {
    pub fn is_genesis(&self) -> bool {
        self.seq == 0
    }
}

// ── ChainConfig / KeyMode ──────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyMode {
    Raw,
    PassphraseWrapped,
    Environment { variable: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub agent_name: String,
    pub key_mode: KeyMode,
    pub created_at: String,
    pub version: u32,
}

pub const CHAIN_CONFIG_VERSION: u32 = 1;

/// Validate `ChainConfig::agent_name`: non-empty, <= 256 chars.
pub fn validate_agent_name(name: &str) -> Result<(), MemlogError> {
    if name.is_empty() {
        return Err(MemlogError::AgentNameInvalid {
            reason: "agent_name must not be empty".into(),
        });
    }
    if name.chars().count() > crate::constants::MAX_AGENT_NAME_LEN {
        return Err(MemlogError::AgentNameInvalid {
            reason: format!(
                "agent_name exceeds {} characters",
                crate::constants::MAX_AGENT_NAME_LEN
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_depth_over_limit_rejected() {
        let mut inner = MetadataValue::String("leaf".into());
        for _ in 0..METADATA_MAX_DEPTH + 2 {
            let mut m = BTreeMap::new();
            m.insert("k".to_string(), inner);
            inner = MetadataValue::Object(m);
        }
        let mut top = BTreeMap::new();
        top.insert("root".to_string(), inner);
        assert!(validate_metadata(&top).is_err());
    }

    #[test]
    fn metadata_within_limit_accepted() {
        let mut top = BTreeMap::new();
        top.insert("k".to_string(), MetadataValue::String("short".into()));
        assert!(validate_metadata(&top).is_ok());
    }

    #[test]
    fn metadata_non_finite_number_rejected() {
        let mut top = BTreeMap::new();
        top.insert("k".to_string(), MetadataValue::Number(f64::NAN));
        assert!(validate_metadata(&top).is_err());
    }

    #[test]
    fn metadata_string_too_long_rejected() {
        let mut top = BTreeMap::new();
        top.insert(
            "k".to_string(),
            MetadataValue::String("x".repeat(METADATA_MAX_STRING_LEN + 1)),
        );
        assert!(validate_metadata(&top).is_err());
    }

    #[test]
    fn agent_name_rejects_empty_and_overlong() {
        assert!(validate_agent_name("").is_err());
        assert!(validate_agent_name(&"a".repeat(300)).is_err());
        assert!(validate_agent_name("Atlas").is_ok());
    }
}
