use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use memlog_chain::{AddInput, ChainEngine, ViolationKind};
use memlog_core::{EntryType, KeyMode, Tier};

fn init(agent_name: &str) -> (tempfile::TempDir, ChainEngine) {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = ChainEngine::init(dir.path(), agent_name, KeyMode::Raw, None).unwrap();
    (dir, engine)
}

#[test]
fn scenario_genesis() {
    let (dir, engine) = init("Atlas");
    let entries = engine.read_chain().unwrap();
    assert_eq!(entries.len(), 1);
    let genesis = &entries[0];
    assert_eq!(genesis.seq, 0);
    assert_eq!(genesis.entry_type, EntryType::GenesisIdentity);
    assert_eq!(genesis.tier, Tier::Committed);
    assert!(genesis.prev_hash.is_none());

    let result = engine.verify().unwrap();
    assert!(result.valid);

    let (_, digest) = memlog_crypto::hash::parse_hash(&genesis.content_hash).unwrap();
    let body_path = dir.path().join("content").join(hex::encode(digest));
    assert!(body_path.exists());
}

#[test]
fn scenario_simple_append() {
    let (dir, engine) = init("Atlas");
    let genesis = engine.read_chain().unwrap()[0].clone();
    let entry = engine
        .add(
            AddInput {
                body: b"User prefers dark mode".to_vec(),
                entry_type: EntryType::Memory,
                tier: None,
                metadata: None,
            },
            None,
        )
        .unwrap();

    assert_eq!(entry.seq, 1);
    assert_eq!(entry.tier, Tier::Relationship);
    let expected_prev = memlog_crypto::hash::hash(&memlog_crypto::canonical::canonical_encode_signed(&genesis));
    assert_eq!(entry.prev_hash.as_deref(), Some(expected_prev.as_str()));

    let body_hash = memlog_crypto::hash::hash(b"User prefers dark mode");
    let (_, digest) = memlog_crypto::hash::parse_hash(&body_hash).unwrap();
    assert!(dir.path().join("content").join(hex::encode(digest)).exists());
}

#[test]
fn scenario_tamper_detection() {
    let (dir, engine) = init("Atlas");
    let entry = engine
        .add(
            AddInput {
                body: b"User prefers dark mode".to_vec(),
                entry_type: EntryType::Memory,
                tier: None,
                metadata: None,
            },
            None,
        )
        .unwrap();

    let (_, digest) = memlog_crypto::hash::parse_hash(&entry.content_hash).unwrap();
    let path = dir.path().join("content").join(hex::encode(digest));
    fs::write(&path, b"I am FAKE content").unwrap();

    let result = engine.verify().unwrap();
    assert!(!result.valid);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].seq, 1);
    assert_eq!(result.violations[0].kind, ViolationKind::ContentMismatch);
}

#[test]
fn scenario_redaction() {
    let (_dir, engine) = init("Atlas");
    let entry = engine
        .add(
            AddInput {
                body: b"User prefers dark mode".to_vec(),
                entry_type: EntryType::Memory,
                tier: None,
                metadata: None,
            },
            None,
        )
        .unwrap();

    engine.redact(entry.seq, "requested removal", None).unwrap();

    let entries = engine.read_chain().unwrap();
    assert_eq!(entries.len(), 3);
    let redaction = &entries[2];
    assert_eq!(redaction.entry_type, EntryType::Redaction);
    assert_eq!(redaction.tier, Tier::Committed);

    assert!(engine.verify().unwrap().valid);
}

#[test]
fn property_p1_verify_valid_after_many_appends() {
    let (_dir, engine) = init("Atlas");
    for i in 0..50 {
        engine
            .add(
                AddInput {
                    body: format!("entry body {i}").into_bytes(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap();
    }
    let result = engine.verify().unwrap();
    assert!(result.valid);
    assert_eq!(result.entries_checked, 51);
    assert!(result.violations.is_empty());
}

#[test]
fn property_p3_deleting_body_keeps_chain_valid() {
    let (_dir, engine) = init("Atlas");
    let entry = engine
        .add(
            AddInput {
                body: b"deletable".to_vec(),
                entry_type: EntryType::Memory,
                tier: None,
                metadata: None,
            },
            None,
        )
        .unwrap();

    engine.redact(entry.seq, "cleanup", None).unwrap();
    assert!(engine.verify().unwrap().valid);
}

#[test]
fn property_p7_export_import_round_trip() {
    let (_dir, engine) = init("Atlas");
    for i in 0..5 {
        engine
            .add(
                AddInput {
                    body: format!("memory {i}").into_bytes(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap();
    }

    let export = engine.export(None, None, true).unwrap();
    let target = tempfile::tempdir().unwrap();
    let imported = ChainEngine::import(&export, target.path(), false).unwrap();

    assert!(imported.verify().unwrap().valid);
    assert_eq!(imported.read_chain().unwrap().len(), engine.read_chain().unwrap().len());
    for (a, b) in imported.read_chain().unwrap().iter().zip(engine.read_chain().unwrap().iter()) {
        assert_eq!(a.seq, b.seq);
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.signature, b.signature);
    }
}

#[test]
fn property_p8_concurrent_writers_produce_dense_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = ChainEngine::init(dir.path(), "Atlas", KeyMode::Raw, None).unwrap();
    let engine = Arc::new(engine);
    let writers = 10;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine
                    .add(
                        AddInput {
                            body: format!("writer {i}").into_bytes(),
                            entry_type: EntryType::Memory,
                            tier: None,
                            metadata: None,
                        },
                        None,
                    )
                    .unwrap();
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let entries = engine.read_chain().unwrap();
    assert_eq!(entries.len(), writers + 1);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.seq, i as u64);
    }
    assert!(engine.verify().unwrap().valid);
}
