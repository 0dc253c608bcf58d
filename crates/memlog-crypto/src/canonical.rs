use memlog_core::types::{EntryType, MetadataMap, Tier};
use memlog_core::Entry;
use serde::Serialize;

/// The unsigned projection of an `Entry`: every header field except
/// `signature`, serialized in the entry's fixed field order.
///
/// This is the byte string fed to `sign`. `canonical_encode_signed` (the
/// byte string fed to `prev_hash`) is simply the full `Entry`'s canonical
/// JSON, since `Entry`'s field order already matches the wire format.
#[derive(Serialize)]
struct UnsignedEntry<'a> {
    seq: u64,
    ts: &'a str,
    #[serde(rename = "type")]
    entry_type: EntryType,
    tier: Tier,
    content_hash: &'a str,
    prev_hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a MetadataMap>,
}

/// Canonically encode an entry **without** its signature: sorted object
/// keys (guaranteed by `MetadataMap` being a `BTreeMap`), fixed field order,
/// no insignificant whitespace, canonical number form. This is the byte
/// string that gets signed.
///
/// Two distinct headers never share an encoding: every field that
/// participates in equality is present, and there is exactly one way to
/// serialize each value.
pub fn canonical_encode_unsigned(entry: &Entry) -> Vec<u8> {
    let projection = UnsignedEntry {
        seq: entry.seq,
        ts: &entry.ts,
        entry_type: entry.entry_type,
        tier: entry.tier,
        content_hash: &entry.content_hash,
        prev_hash: entry.prev_hash.as_deref(),
        metadata: entry.metadata.as_ref(),
    };
    // `serde_json::to_vec` is compact (no whitespace) and `MetadataMap`'s
    // `BTreeMap` backing guarantees lexicographic key order at every level.
    serde_json::to_vec(&projection).expect("Entry fields are always JSON-serializable")
}

/// Canonically encode a **fully signed** entry header. This is the byte
/// string whose hash becomes the next entry's `prev_hash`.
pub fn canonical_encode_signed(entry: &Entry) -> Vec<u8> {
    serde_json::to_vec(entry).expect("Entry is always JSON-serializable")
}
