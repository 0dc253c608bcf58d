use sha2::{Digest, Sha256};

/// Compute SHA-256 of `data` and render it as `"sha256:" + 64 hex chars`,
/// the digest form used for `content_hash` and `prev_hash` throughout the
/// chain.
pub fn hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("sha256:{}", hex::encode(digest))
}

/// Split a prefixed digest (`"sha256:<hex>"`) into its algorithm tag and raw
/// bytes. Returns `None` if the prefix is missing or the hex is malformed.
pub fn parse_hash(tagged: &str) -> Option<(&str, [u8; 32])> {
    let (algo, hex_part) = tagged.split_once(':')?;
    if algo != "sha256" {
        return None;
    }
    let bytes = hex::decode(hex_part).ok()?;
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some((algo, arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_has_expected_shape() {
        let h = hash(b"hello");
        assert!(h.starts_with("sha256:"));
        assert_eq!(h.len(), "sha256:".len() + 64);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(b"same"), hash(b"same"));
        assert_ne!(hash(b"same"), hash(b"different"));
    }

    #[test]
    fn parse_hash_round_trips() {
        let h = hash(b"payload");
        let (algo, _bytes) = parse_hash(&h).expect("should parse");
        assert_eq!(algo, "sha256");
    }
}
