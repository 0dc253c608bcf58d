/// Lowercase, split on non-alphanumeric boundaries. Deterministic so rebuild
/// (P4) produces identical postings bit-for-bit on every run.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        let tokens = tokenize("User PREFERS dark-mode, always.");
        assert_eq!(tokens, vec!["user", "prefers", "dark", "mode", "always"]);
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(tokenize("   ...   ").is_empty());
    }
}
