use memlog_core::{Entry, EntryType, MemlogError, MetadataValue};
use memlog_store::ContentStore;
use tracing::{debug, info};

use crate::db::IndexDb;
use crate::summarize::summarize;
use crate::tokenizer::tokenize;
use crate::types::{DecayTier, IndexRow, Source};

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildReport {
    pub indexed: u64,
    pub skipped_redactions: u64,
    pub skipped_missing_bodies: u64,
}

fn extract_importance(entry: &Entry) -> f64 {
    if let Some(metadata) = &entry.metadata {
        if let Some(MetadataValue::Number(n)) = metadata.get("importance") {
            return n.clamp(0.0, 1.0);
        }
    }
    heuristic_importance(&entry.metadata)
}

fn heuristic_importance(metadata: &Option<memlog_core::MetadataMap>) -> f64 {
    // No explicit signal: start from a neutral baseline. Curated/manual
    // entries (flagged via metadata) default slightly higher.
    match metadata.as_ref().and_then(|m| m.get("curated")) {
        Some(MetadataValue::Bool(true)) => 0.7,
        _ => 0.5,
    }
}

fn extract_source(entry: &Entry) -> Source {
    match entry.metadata.as_ref().and_then(|m| m.get("source")) {
        Some(MetadataValue::String(s)) if s == "manual" => Source::Manual,
        Some(MetadataValue::String(s)) if s == "curation" => Source::Curation,
        _ => Source::Auto,
    }
}

/// Rebuild the entire index from `entries` + `store`.
/// Clears the index first so repeated runs are bit-for-bit idempotent:
/// redactions and entries with absent bodies are skipped.
pub fn rebuild(db: &IndexDb, entries: &[Entry], store: &ContentStore) -> Result<RebuildReport, MemlogError> {
    db.clear()?;
    let mut report = RebuildReport::default();

    for entry in entries {
        if entry.entry_type == EntryType::Redaction {
            report.skipped_redactions += 1;
            continue;
        }

        let Some(body) = store.get(&entry.content_hash, false)? else {
            report.skipped_missing_bodies += 1;
            continue;
        };
        let content = String::from_utf8_lossy(&body).into_owned();
        let summary = if content.is_empty() { None } else { Some(summarize(&content, None)) };

        let row = IndexRow {
            seq: entry.seq,
            content: content.clone(),
            summary,
            entry_type: entry.entry_type,
            tier: entry.tier,
            importance: extract_importance(entry),
            access_count: 0,
            last_accessed: None,
            created_at: entry.ts.clone(),
            decay_tier: DecayTier::Hot,
            source: extract_source(entry),
        };

        for token in tokenize(&row.content) {
            db.add_posting(&token, row.seq)?;
        }
        if let Some(summary) = &row.summary {
            for token in tokenize(summary) {
                db.add_posting(&token, row.seq)?;
            }
        }

        db.put_row(&row)?;
        report.indexed += 1;
        debug!(seq = entry.seq, "indexed entry");
    }

    db.set_meta("last_rebuilt_seq", &entries.last().map(|e| e.seq).unwrap_or(0).to_be_bytes())?;
    db.flush()?;
    info!(
        indexed = report.indexed,
        skipped_redactions = report.skipped_redactions,
        skipped_missing_bodies = report.skipped_missing_bodies,
        "index rebuilt"
    );
    Ok(report)
}
