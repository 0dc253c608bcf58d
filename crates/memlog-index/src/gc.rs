use chrono::{DateTime, Utc};
use memlog_core::constants::{GC_MAX_AGE_DAYS, GC_THRESHOLD};
use memlog_core::{MemlogError, Seq, Tier};
use tracing::info;

use crate::db::IndexDb;
use crate::scoring::{access_score, recency, relevance_score};
use crate::types::DecayTier;

pub struct GcOptions {
    pub max_age_days: i64,
    pub threshold: f64,
    pub dry_run: bool,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            max_age_days: GC_MAX_AGE_DAYS,
            threshold: GC_THRESHOLD,
            dry_run: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct GcReport {
    pub scanned: u64,
    pub archived_seqs: Vec<Seq>,
    pub dry_run: bool,
}

/// Re-label rows below the relevance threshold as `archived`. Never touches the chain or body files — only
/// derived row labels. `dry_run` scores and reports without writing.
pub fn gc(db: &IndexDb, now: DateTime<Utc>, options: &GcOptions) -> Result<GcReport, MemlogError> {
    let mut report = GcReport { dry_run: options.dry_run, ..Default::default() };

    for row in db.all_rows()? {
        if row.tier == Tier::Committed || row.decay_tier == DecayTier::Archived {
            continue;
        }

        let Ok(created) = DateTime::parse_from_rfc3339(&row.created_at) else {
            continue;
        };
        let age_days = (now - created.with_timezone(&Utc)).num_days();
        if age_days <= options.max_age_days {
            continue;
        }
        report.scanned += 1;

        let rec = recency(&row.created_at, now);
        let access = access_score(row.access_count);
        let relevance = relevance_score(rec, row.importance, access);

        if relevance < options.threshold {
            report.archived_seqs.push(row.seq);
            if !options.dry_run {
                let mut updated = row;
                updated.decay_tier = DecayTier::Archived;
                db.put_row(&updated)?;
            }
        }
    }

    info!(
        scanned = report.scanned,
        archived = report.archived_seqs.len(),
        dry_run = options.dry_run,
        "garbage collection pass complete"
    );
    Ok(report)
}

/// Demote an archived row back to `cold`, making it visible to retrieval
/// again.
pub fn restore(db: &IndexDb, seq: Seq) -> Result<(), MemlogError> {
    let Some(mut row) = db.get_row(seq)? else {
        return Err(MemlogError::EntryNotFound { seq });
    };
    row.decay_tier = DecayTier::Cold;
    db.put_row(&row)
}
