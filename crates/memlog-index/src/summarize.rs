//! Extractive summarization. Deterministic and lossy:
//! sentences are scored, greedily selected to fill a character budget, then
//! re-ordered by their original position.

use memlog_core::constants::SUMMARY_CHAR_BUDGET;

const SIGNAL_WORDS: &[&str] = &[
    "prefer", "prefers", "preferred", "decided", "decision", "always", "never",
    "important", "remember", "must", "should", "avoid", "requires", "require",
];

const PREFERRED_LEN_MIN: usize = 40;
const PREFERRED_LEN_MAX: usize = 160;

struct Sentence<'a> {
    text: &'a str,
    position: usize,
}

/// Split `text` into sentences on `.`, `!`, `?` boundaries, trimming
/// whitespace. Trailing fragments without terminal punctuation still count
/// as a sentence (common in short memory bodies).
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'.' || b == b'!' || b == b'?' {
            let candidate = text[start..=i].trim();
            if !candidate.is_empty() {
                sentences.push(candidate);
            }
            start = i + 1;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn looks_like_entity(word: &str) -> bool {
    word.contains("://")
        || word.contains('@')
        || (word.contains('/') && word.len() > 3)
        || word.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Truncate `s` to at most `max_bytes`, backing off to the nearest preceding
/// UTF-8 char boundary so multi-byte characters are never split.
fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn score_sentence(sentence: &str, position: usize, total: usize) -> f64 {
    let mut score = 0.0;

    if position == 0 || position == total.saturating_sub(1) {
        score += 1.0;
    }

    let words: Vec<&str> = sentence.split_whitespace().collect();
    let mut capitalized_run = 0;
    for word in &words {
        let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
        if clean.chars().next().is_some_and(|c| c.is_uppercase()) && clean.len() > 1 {
            capitalized_run += 1;
            if capitalized_run >= 2 {
                score += 0.5;
            }
        } else {
            capitalized_run = 0;
        }
        if looks_like_entity(word) {
            score += 0.3;
        }
    }

    let len = sentence.len();
    if (PREFERRED_LEN_MIN..=PREFERRED_LEN_MAX).contains(&len) {
        score += 0.5;
    }

    let lower = sentence.to_lowercase();
    for signal in SIGNAL_WORDS {
        if lower.contains(signal) {
            score += 0.8;
        }
    }

    score
}

/// Produce a deterministic extractive summary of `text`, filling at most
/// `budget` characters. `budget` defaults to `SUMMARY_CHAR_BUDGET` when the
/// caller has no override.
pub fn summarize(text: &str, budget: Option<usize>) -> String {
    let budget = budget.unwrap_or(SUMMARY_CHAR_BUDGET);
    let raw_sentences = split_sentences(text);
    if raw_sentences.is_empty() {
        return String::new();
    }
    if raw_sentences.len() == 1 {
        let s = raw_sentences[0];
        return safe_truncate(s, budget).to_string();
    }

    let total = raw_sentences.len();
    let mut sentences: Vec<Sentence> = raw_sentences
        .iter()
        .enumerate()
        .map(|(i, s)| Sentence { text: s, position: i })
        .collect();

    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (i, score_sentence(s.text, s.position, total)))
        .collect();
    // Stable sort descending by score, ties broken by original position (stable sort preserves it).
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let mut selected_indices = Vec::new();
    let mut used = 0usize;
    for (idx, _score) in scored {
        let len = sentences[idx].text.len();
        if used + len > budget && !selected_indices.is_empty() {
            continue;
        }
        selected_indices.push(idx);
        used += len;
        if used >= budget {
            break;
        }
    }
    selected_indices.sort_unstable();

    sentences.sort_by_key(|s| s.position);
    let summary = selected_indices
        .iter()
        .map(|&i| sentences[i].text)
        .collect::<Vec<_>>()
        .join(" ");

    if summary.len() > budget {
        safe_truncate(&summary, budget).to_string()
    } else {
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_deterministic() {
        let text = "User joined the team. User always prefers dark mode for the editor. The weather was nice.";
        let a = summarize(text, None);
        let b = summarize(text, None);
        assert_eq!(a, b);
    }

    #[test]
    fn summary_respects_budget() {
        let text = "A. ".repeat(200);
        let summary = summarize(&text, Some(50));
        assert!(summary.len() <= 50);
    }

    #[test]
    fn single_sentence_short_body_returned_whole() {
        let summary = summarize("short memory", None);
        assert_eq!(summary, "short memory");
    }

    #[test]
    fn signal_words_favor_sentence_selection() {
        let text = "Nothing notable happened today in the office building downtown. \
                     User always prefers dark mode. \
                     Another filler sentence about the weather conditions outside.";
        let summary = summarize(text, Some(40));
        assert!(summary.contains("always prefers dark mode"));
    }
}
