use std::collections::HashMap;

use chrono::{DateTime, Utc};
use memlog_core::constants::{
    ACCESS_COUNT_MAX, RECENCY_HALF_LIFE_SECS, SCORE_WEIGHT_ACCESS, SCORE_WEIGHT_FTS,
    SCORE_WEIGHT_IMPORTANCE, SCORE_WEIGHT_RECENCY,
};

/// Keyword-match score for `content_tokens` against `query_tokens`,
/// normalized into `[0, 1]`: presence of each
/// distinct query token contributes up to `1 / len(query)`, with a small
/// repeated-occurrence bonus that never lets a single term dominate.
pub fn fts_score(content_tokens: &[String], query_tokens: &[String]) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for t in content_tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }

    let mut matched = 0usize;
    let mut tf_bonus = 0.0f64;
    for qt in query_tokens {
        if let Some(&c) = counts.get(qt.as_str()) {
            matched += 1;
            tf_bonus += (c as f64).ln_1p();
        }
    }

    let n = query_tokens.len() as f64;
    let presence = matched as f64 / n;
    (presence + (tf_bonus / n) * 0.1).min(1.0)
}

/// Exponential recency decay: `exp(-Δt / τ)` with `τ` chosen so a
/// `RECENCY_HALF_LIFE_SECS`-old row scores ~0.5.
pub fn recency(created_at: &str, now: DateTime<Utc>) -> f64 {
    let Ok(created) = DateTime::parse_from_rfc3339(created_at) else {
        return 0.0;
    };
    let delta_secs = (now - created.with_timezone(&Utc)).num_seconds().max(0) as f64;
    let tau = RECENCY_HALF_LIFE_SECS / std::f64::consts::LN_2;
    (-delta_secs / tau).exp()
}

/// `log1p(access_count) / log1p(ACCESS_COUNT_MAX)`, clamped to `[0, 1]`.
pub fn access_score(access_count: u64) -> f64 {
    ((access_count as f64).ln_1p() / ACCESS_COUNT_MAX.ln_1p()).min(1.0)
}

/// `score(r, q) = w_fts·fts + w_rec·recency + w_imp·importance + w_acc·access`.
pub fn hybrid_score(fts: f64, recency: f64, importance: f64, access: f64) -> f64 {
    SCORE_WEIGHT_FTS * fts
        + SCORE_WEIGHT_RECENCY * recency
        + SCORE_WEIGHT_IMPORTANCE * importance
        + SCORE_WEIGHT_ACCESS * access
}

/// Relevance score used by garbage collection: recency + importance +
/// access, re-weighted without the FTS term.
pub fn relevance_score(recency: f64, importance: f64, access: f64) -> f64 {
    let total_weight = SCORE_WEIGHT_RECENCY + SCORE_WEIGHT_IMPORTANCE + SCORE_WEIGHT_ACCESS;
    (SCORE_WEIGHT_RECENCY * recency + SCORE_WEIGHT_IMPORTANCE * importance + SCORE_WEIGHT_ACCESS * access)
        / total_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fts_score_rewards_full_query_coverage() {
        let content = vec!["dark".to_string(), "mode".to_string(), "preferred".to_string()];
        let query = vec!["dark".to_string(), "mode".to_string()];
        let score = fts_score(&content, &query);
        assert!(score > 0.9);
    }

    #[test]
    fn fts_score_zero_when_no_overlap() {
        let content = vec!["weather".to_string()];
        let query = vec!["dark".to_string(), "mode".to_string()];
        assert_eq!(fts_score(&content, &query), 0.0);
    }

    #[test]
    fn recency_decays_to_half_at_half_life() {
        let now = Utc::now();
        let created = now - chrono::Duration::seconds(RECENCY_HALF_LIFE_SECS as i64);
        let score = recency(&created.to_rfc3339(), now);
        assert!((score - 0.5).abs() < 0.01);
    }

    #[test]
    fn access_score_is_bounded() {
        assert!(access_score(0) == 0.0);
        assert!(access_score(1000) <= 1.0);
    }
}
