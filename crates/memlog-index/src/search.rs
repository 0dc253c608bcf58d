use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use memlog_core::constants::CHARS_PER_TOKEN;
use memlog_core::{EntryType, MemlogError, Tier};

use crate::db::IndexDb;
use crate::scoring::{access_score, fts_score, hybrid_score, recency};
use crate::tokenizer::tokenize;
use crate::types::{DecayTier, IndexRow};

/// Query filters.
pub struct SearchOptions {
    pub max_tokens: usize,
    pub max_results: usize,
    pub offset: usize,
    pub types: Option<Vec<EntryType>>,
    pub tiers: Option<Vec<Tier>>,
    pub min_importance: Option<f64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            max_results: 20,
            offset: 0,
            types: None,
            tiers: None,
            min_importance: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScoredRow {
    pub row: IndexRow,
    pub score: f64,
}

/// Rank candidate rows against `query` using the hybrid scoring formula,
/// truncate to an approximate token budget, and bump the
/// access counter of every row returned.
pub fn search(
    db: &IndexDb,
    query: &str,
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> Result<Vec<ScoredRow>, MemlogError> {
    let query_tokens = tokenize(query);

    // A non-empty query narrows candidates to rows the postings tree says
    // contain at least one query token, rather than scanning every row.
    // An empty query (pure filter lookup) falls back to the full row set.
    let row_source: Vec<IndexRow> = if query_tokens.is_empty() {
        db.all_rows()?
    } else {
        let mut seqs = BTreeSet::new();
        for token in &query_tokens {
            seqs.extend(db.get_posting(token)?);
        }
        let mut rows = Vec::with_capacity(seqs.len());
        for seq in seqs {
            if let Some(row) = db.get_row(seq)? {
                rows.push(row);
            }
        }
        rows
    };

    let mut candidates: Vec<ScoredRow> = Vec::new();
    for row in row_source {
        if row.decay_tier == DecayTier::Archived {
            continue;
        }
        if let Some(types) = &options.types {
            if !types.contains(&row.entry_type) {
                continue;
            }
        }
        if let Some(tiers) = &options.tiers {
            if !tiers.contains(&row.tier) {
                continue;
            }
        }
        if let Some(min_importance) = options.min_importance {
            if row.importance < min_importance {
                continue;
            }
        }

        let content_tokens = tokenize(&row.content);
        let fts = fts_score(&content_tokens, &query_tokens);
        let rec = recency(&row.created_at, now);
        let access = access_score(row.access_count);
        let score = hybrid_score(fts, rec, row.importance, access);
        candidates.push(ScoredRow { row, score });
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| b.row.importance.partial_cmp(&a.row.importance).unwrap())
            .then_with(|| b.row.seq.cmp(&a.row.seq))
    });

    let mut selected = Vec::new();
    let mut tokens_used = 0usize;
    for scored in candidates.into_iter().skip(options.offset) {
        if selected.len() >= options.max_results {
            break;
        }
        let approx_tokens = ((scored.row.content.len() as f64) / CHARS_PER_TOKEN).ceil() as usize;
        if tokens_used + approx_tokens > options.max_tokens && !selected.is_empty() {
            break;
        }
        tokens_used += approx_tokens;
        selected.push(scored);
    }

    for scored in &selected {
        let mut row = scored.row.clone();
        row.access_count += 1;
        row.last_accessed = Some(now.to_rfc3339_opts(SecondsFormat::Millis, true));
        db.put_row(&row)?;
    }

    Ok(selected)
}
