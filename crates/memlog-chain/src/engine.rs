use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use memlog_core::constants::MAX_BODY_BYTES;
use memlog_core::types::{validate_agent_name, validate_metadata};
use memlog_core::{ChainConfig, Entry, EntryType, KeyMode, MemlogError, MetadataMap, Seq, Tier};
use memlog_crypto::canonical::{canonical_encode_signed, canonical_encode_unsigned};
use memlog_crypto::hash::hash;
use memlog_crypto::keypair::{sign, verify, KeyPair};
use memlog_store::ContentStore;
use tracing::{info, warn};

use crate::keyfile;
use crate::lock::ChainLock;
use crate::passphrase::PassphraseProvider;

const CHAIN_FILE: &str = "chain.jsonl";
const CONFIG_FILE: &str = "config.json";

/// Input to `ChainEngine::add`: everything the caller supplies for one
/// appended entry. `tier` defaults to `Tier::Relationship` when omitted.
pub struct AddInput {
    pub body: Vec<u8>,
    pub entry_type: EntryType,
    pub tier: Option<Tier>,
    pub metadata: Option<MetadataMap>,
}

/// Result of a successful `ChainEngine::init`.
pub struct InitOutput {
    pub entry: Entry,
    pub public_key_hex: String,
    /// `Some` only when `key_mode == Environment`: the caller must export
    /// this hex string into the named variable themselves.
    pub env_secret_hex: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    HashMismatch,
    SignatureInvalid,
    SequenceGap,
    TimestampInvalid,
    ContentMismatch,
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub seq: Seq,
    pub kind: ViolationKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub valid: bool,
    pub entries_checked: u64,
    pub first_seq: Option<Seq>,
    pub last_seq: Option<Seq>,
    pub redaction_count: u64,
    pub violations: Vec<Violation>,
}

/// Export bundle produced by `ChainEngine::export` and consumed by
/// `ChainEngine::import`.
pub struct ChainExport {
    pub config: ChainConfig,
    pub entries: Vec<Entry>,
    pub bodies: Option<BTreeMap<String, Vec<u8>>>,
    pub public_key: String,
    pub exported_at: String,
}

/// The chain engine: init, append-under-lock, verify, redact,
/// export/import over a single data directory.
pub struct ChainEngine {
    data_dir: PathBuf,
    config: ChainConfig,
    store: ContentStore,
    public_key: [u8; 32],
}

impl ChainEngine {
    /// Initialize a fresh data directory: generates a keypair, writes
    /// `config.json`/`agent.pub`/the private key material, and appends the
    /// genesis entry.
    pub fn init(
        data_dir: &Path,
        agent_name: &str,
        key_mode: KeyMode,
        passphrase: Option<&dyn PassphraseProvider>,
    ) -> Result<(Self, InitOutput), MemlogError> {
        let chain_path = data_dir.join(CHAIN_FILE);
        if chain_path.exists() {
            return Err(MemlogError::ChainExists {
                path: chain_path.display().to_string(),
            });
        }
        validate_agent_name(agent_name)?;

        fs::create_dir_all(data_dir)?;
        fs::create_dir_all(data_dir.join("anchors"))?;
        let store = ContentStore::open(data_dir)?;

        let keypair = KeyPair::generate();
        let env_secret_hex = keyfile::write_key_material(
            data_dir,
            &key_mode,
            &keypair.public_key_hex(),
            keypair.secret_key_bytes(),
            passphrase,
        )?;

        let config = ChainConfig {
            agent_name: agent_name.to_string(),
            key_mode,
            created_at: now_iso(),
            version: memlog_core::CHAIN_CONFIG_VERSION,
        };
        fs::write(data_dir.join(CONFIG_FILE), serde_json::to_string_pretty(&config)?)?;
        info!(agent_name, "initialized chain config");

        let _lock = ChainLock::acquire(&chain_path)?;
        let body = serde_json::json!({
            "event": "genesis",
            "agentName": agent_name,
            "message": format!("{agent_name} begins."),
        });
        let body_bytes = serde_json::to_vec(&body)?;
        let content_hash = store.put(&body_bytes)?;

        let mut metadata = MetadataMap::new();
        metadata.insert("genesis".to_string(), memlog_core::MetadataValue::Bool(true));

        let mut header = Entry {
            seq: 0,
            ts: now_iso(),
            entry_type: EntryType::GenesisIdentity,
            tier: Tier::Committed,
            content_hash,
            prev_hash: None,
            signature: String::new(),
            metadata: Some(metadata),
        };
        header.signature = sign(keypair.secret_key_bytes(), &canonical_encode_unsigned(&header))
            .map_err(|e| MemlogError::Other(e.to_string()))?;
        append_line(&chain_path, &header)?;
        info!(seq = 0, "genesis entry appended");

        let engine = Self {
            data_dir: data_dir.to_path_buf(),
            config: config.clone(),
            store,
            public_key: *keypair.public_key_bytes(),
        };
        let output = InitOutput {
            entry: header,
            public_key_hex: keypair.public_key_hex(),
            env_secret_hex,
        };
        Ok((engine, output))
    }

    /// Open an existing data directory.
    pub fn open(data_dir: &Path) -> Result<Self, MemlogError> {
        let chain_path = data_dir.join(CHAIN_FILE);
        if !chain_path.exists() {
            return Err(MemlogError::ChainMissing {
                path: chain_path.display().to_string(),
            });
        }
        let config_json = fs::read_to_string(data_dir.join(CONFIG_FILE))?;
        let config: ChainConfig = serde_json::from_str(&config_json)?;
        let store = ContentStore::open(data_dir)?;
        let public_key = keyfile::read_public_key(data_dir)?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            store,
            public_key,
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    fn chain_path(&self) -> PathBuf {
        self.data_dir.join(CHAIN_FILE)
    }

    /// Append one entry under the exclusive lock.
    pub fn add(
        &self,
        input: AddInput,
        passphrase: Option<&dyn PassphraseProvider>,
    ) -> Result<Entry, MemlogError> {
        if input.body.len() > MAX_BODY_BYTES {
            return Err(MemlogError::ContentTooLarge {
                size: input.body.len(),
                max: MAX_BODY_BYTES,
            });
        }
        if let Some(metadata) = &input.metadata {
            validate_metadata(metadata)?;
        }

        let chain_path = self.chain_path();
        let _lock = ChainLock::acquire(&chain_path)?;

        let entries = read_chain(&chain_path)?;
        let tail = entries
            .last()
            .ok_or_else(|| MemlogError::ChainMissing {
                path: chain_path.display().to_string(),
            })?
            .clone();

        let secret = keyfile::load_private_key(&self.data_dir, &self.config.key_mode, passphrase)?;

        let content_hash = self.store.put(&input.body)?;
        let prev_hash = hash(&canonical_encode_signed(&tail));
        let ts = monotonic_ts(&tail.ts);
        let seq = tail.seq + 1;
        let tier = input.tier.unwrap_or(Tier::Relationship);

        let mut header = Entry {
            seq,
            ts,
            entry_type: input.entry_type,
            tier,
            content_hash,
            prev_hash: Some(prev_hash),
            signature: String::new(),
            metadata: input.metadata,
        };
        header.signature = sign(&secret, &canonical_encode_unsigned(&header))
            .map_err(|e| MemlogError::Other(e.to_string()))?;
        append_line(&chain_path, &header)?;
        info!(seq, entry_type = %header.entry_type, "entry appended");
        Ok(header)
    }

    /// Stream `chain.jsonl` in full. A malformed *trailing* line is
    /// discarded; a malformed line anywhere else is a
    /// hard failure naming the line number.
    pub fn read_chain(&self) -> Result<Vec<Entry>, MemlogError> {
        read_chain(&self.chain_path())
    }

    /// Full-chain integrity check: hash linkage, signature, content hash,
    /// sequence order, and timestamp monotonicity for every entry in one pass.
    pub fn verify(&self) -> Result<VerificationResult, MemlogError> {
        let entries = self.read_chain()?;
        self.verify_entries(&entries)
    }

    /// Verify only `entries[from..=to]` against the chain's public key,
    /// without re-reading the journal. `from == 0` checks the genesis
    /// prev_hash/seq invariants too; `from > 0` assumes the caller already
    /// trusts entries before it, letting an external verifier check a
    /// large chain incrementally instead of re-validating from genesis
    /// every time.
    pub fn verify_range(&self, from: Seq, to: Seq) -> Result<VerificationResult, MemlogError> {
        let entries = self.read_chain()?;
        let slice: Vec<Entry> = entries
            .into_iter()
            .filter(|e| e.seq >= from && e.seq <= to)
            .collect();
        self.verify_entries(&slice)
    }

    fn verify_entries(&self, entries: &[Entry]) -> Result<VerificationResult, MemlogError> {
        let mut violations = Vec::new();
        let mut redaction_count = 0u64;
        let mut prev: Option<&Entry> = None;

        for (i, entry) in entries.iter().enumerate() {
            if entry.entry_type == EntryType::Redaction {
                redaction_count += 1;
            }

            if entry.seq != i as u64 {
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::SequenceGap,
                    message: format!("expected seq {i}, got {}", entry.seq),
                });
            }

            match prev {
                None => {
                    if entry.prev_hash.is_some() {
                        violations.push(Violation {
                            seq: entry.seq,
                            kind: ViolationKind::HashMismatch,
                            message: "genesis entry must have prev_hash = null".into(),
                        });
                    }
                }
                Some(prev_entry) => {
                    let expected = hash(&canonical_encode_signed(prev_entry));
                    if entry.prev_hash.as_deref() != Some(expected.as_str()) {
                        violations.push(Violation {
                            seq: entry.seq,
                            kind: ViolationKind::HashMismatch,
                            message: "prev_hash does not match predecessor's canonical encoding".into(),
                        });
                    }
                    if entry.ts <= prev_entry.ts {
                        violations.push(Violation {
                            seq: entry.seq,
                            kind: ViolationKind::TimestampInvalid,
                            message: format!(
                                "ts {} is not strictly greater than predecessor's ts {}",
                                entry.ts, prev_entry.ts
                            ),
                        });
                    }
                }
            }

            if verify(
                &canonical_encode_unsigned(entry),
                &entry.signature,
                &self.public_key,
            )
            .is_err()
            {
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::SignatureInvalid,
                    message: "signature does not verify under the chain's public key".into(),
                });
            }

            match self.store.get(&entry.content_hash, true) {
                Ok(_) => {}
                Err(MemlogError::IntegrityError { .. }) => {
                    violations.push(Violation {
                        seq: entry.seq,
                        kind: ViolationKind::ContentMismatch,
                        message: "stored body does not re-hash to content_hash".into(),
                    });
                }
                Err(e) => return Err(e),
            }

            prev = Some(entry);
        }

        Ok(VerificationResult {
            valid: violations.is_empty(),
            entries_checked: entries.len() as u64,
            first_seq: entries.first().map(|e| e.seq),
            last_seq: entries.last().map(|e| e.seq),
            redaction_count,
            violations,
        })
    }

    /// Delete a body and append a redaction entry recording the deletion.
    pub fn redact(
        &self,
        seq: Seq,
        reason: &str,
        passphrase: Option<&dyn PassphraseProvider>,
    ) -> Result<Entry, MemlogError> {
        let entries = self.read_chain()?;
        let target = entries
            .iter()
            .find(|e| e.seq == seq)
            .ok_or(MemlogError::EntryNotFound { seq })?;

        if target.entry_type == EntryType::Redaction {
            return Err(MemlogError::AlreadyRedacted { seq });
        }
        if target.tier == Tier::Committed {
            return Err(MemlogError::CommittedNotRedactable { seq });
        }

        let target_hash = target.content_hash.clone();
        self.store.delete(&target_hash)?;
        warn!(seq, "body redacted");

        let body = serde_json::json!({
            "event": "redaction",
            "target_seq": seq,
            "target_hash": target_hash,
            "reason": reason,
        });

        self.add(
            AddInput {
                body: serde_json::to_vec(&body)?,
                entry_type: EntryType::Redaction,
                tier: Some(Tier::Committed),
                metadata: None,
            },
            passphrase,
        )
    }

    /// Bundle `{config, entries, bodies?, public_key, exported_at}`,
    /// optionally filtered to `[from, to]` and optionally including bodies.
    pub fn export(
        &self,
        from: Option<Seq>,
        to: Option<Seq>,
        include_bodies: bool,
    ) -> Result<ChainExport, MemlogError> {
        let all = self.read_chain()?;
        let from = from.unwrap_or(0);
        let to = to.unwrap_or(u64::MAX);
        let entries: Vec<Entry> = all.into_iter().filter(|e| e.seq >= from && e.seq <= to).collect();

        let bodies = if include_bodies {
            let mut map = BTreeMap::new();
            for entry in &entries {
                if let Some(body) = self.store.get(&entry.content_hash, false)? {
                    map.insert(entry.content_hash.clone(), body);
                }
            }
            Some(map)
        } else {
            None
        };

        Ok(ChainExport {
            config: self.config.clone(),
            entries,
            bodies,
            public_key: self.public_key_hex(),
            exported_at: now_iso(),
        })
    }

    /// Validate an export bundle (hash linkage, signatures, content hashes,
    /// and sequence order, plus body hash matching on any bundled bodies)
    /// and materialize it into a fresh `target_dir`. The
    /// resulting directory is verifiable and readable but holds no private
    /// key material — importing does not restore write capability.
    pub fn import(export: &ChainExport, target_dir: &Path, overwrite: bool) -> Result<Self, MemlogError> {
        let chain_path = target_dir.join(CHAIN_FILE);
        if chain_path.exists() && !overwrite {
            return Err(MemlogError::ChainExists {
                path: chain_path.display().to_string(),
            });
        }

        let public_key_bytes = hex::decode(&export.public_key)
            .ok()
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
            .ok_or_else(|| MemlogError::Other("import bundle public_key malformed".into()))?;

        let mut prev: Option<&Entry> = None;
        for (i, entry) in export.entries.iter().enumerate() {
            if entry.seq != i as u64 {
                return Err(MemlogError::SequenceGap {
                    expected: i as u64,
                    got: entry.seq,
                });
            }
            match prev {
                None => {
                    if entry.prev_hash.is_some() {
                        return Err(MemlogError::HashMismatch { seq: entry.seq });
                    }
                }
                Some(prev_entry) => {
                    let expected = hash(&canonical_encode_signed(prev_entry));
                    if entry.prev_hash.as_deref() != Some(expected.as_str()) {
                        return Err(MemlogError::HashMismatch { seq: entry.seq });
                    }
                }
            }
            if verify(&canonical_encode_unsigned(entry), &entry.signature, &public_key_bytes).is_err() {
                return Err(MemlogError::SignatureInvalid { seq: entry.seq });
            }
            if let Some(bodies) = &export.bodies {
                if let Some(body) = bodies.get(&entry.content_hash) {
                    let actual = hash(body);
                    if actual != entry.content_hash {
                        return Err(MemlogError::ContentMismatch { seq: entry.seq });
                    }
                }
            }
            prev = Some(entry);
        }

        fs::create_dir_all(target_dir)?;
        fs::create_dir_all(target_dir.join("anchors"))?;
        let store = ContentStore::open(target_dir)?;
        if let Some(bodies) = &export.bodies {
            for body in bodies.values() {
                store.put(body)?;
            }
        }

        fs::write(target_dir.join(CONFIG_FILE), serde_json::to_string_pretty(&export.config)?)?;
        fs::write(target_dir.join("agent.pub"), format!("{}\n", export.public_key))?;

        {
            let mut file = OpenOptions::new().create(true).append(true).open(&chain_path)?;
            if overwrite {
                file.set_len(0)?;
            }
            for entry in &export.entries {
                let mut line = canonical_encode_signed(entry);
                line.push(b'\n');
                file.write_all(&line)?;
            }
            file.sync_all()?;
        }

        info!(count = export.entries.len(), dir = %target_dir.display(), "chain imported");
        Self::open(target_dir)
    }
}

fn append_line(chain_path: &Path, entry: &Entry) -> Result<(), MemlogError> {
    let mut file = OpenOptions::new().create(true).append(true).open(chain_path)?;
    let mut line = canonical_encode_signed(entry);
    line.push(b'\n');
    file.write_all(&line)?;
    file.sync_all()?;
    Ok(())
}

/// Parse `chain.jsonl`. A missing file is an empty chain. A malformed
/// trailing line is discarded (tolerating a reader racing a concurrent
/// writer's partial flush); a malformed line elsewhere fails fast, naming
/// the 1-based line number.
fn read_chain(chain_path: &Path) -> Result<Vec<Entry>, MemlogError> {
    let content = match fs::read_to_string(chain_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<&str> = content.lines().collect();
    let mut entries = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Entry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                if i + 1 == lines.len() {
                    warn!(line = i + 1, error = %e, "discarding malformed trailing chain line");
                    break;
                }
                return Err(MemlogError::Other(format!(
                    "malformed chain line {}: {e}",
                    i + 1
                )));
            }
        }
    }
    Ok(entries)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Bump `prev_ts` by the smallest representable increment if the current
/// wall clock would not strictly exceed it, so timestamps stay strictly
/// increasing even under a fast clock or clock skew.
fn monotonic_ts(prev_ts: &str) -> String {
    let now = Utc::now();
    match DateTime::parse_from_rfc3339(prev_ts) {
        Ok(prev) => {
            let prev_utc = prev.with_timezone(&Utc);
            if now > prev_utc {
                now.to_rfc3339_opts(SecondsFormat::Millis, true)
            } else {
                (prev_utc + ChronoDuration::milliseconds(1)).to_rfc3339_opts(SecondsFormat::Millis, true)
            }
        }
        Err(_) => now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::StaticPassphrase;

    fn init_tmp() -> (tempfile::TempDir, ChainEngine) {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = ChainEngine::init(dir.path(), "Atlas", KeyMode::Raw, None).unwrap();
        (dir, engine)
    }

    #[test]
    fn init_creates_genesis_entry() {
        let (_dir, engine) = init_tmp();
        let entries = engine.read_chain().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seq, 0);
        assert!(entries[0].prev_hash.is_none());
        assert_eq!(entries[0].tier, Tier::Committed);
    }

    #[test]
    fn second_init_fails_chain_exists() {
        let (dir, _engine) = init_tmp();
        let result = ChainEngine::init(dir.path(), "Atlas", KeyMode::Raw, None);
        assert!(matches!(result, Err(MemlogError::ChainExists { .. })));
    }

    #[test]
    fn append_then_verify_is_valid() {
        let (_dir, engine) = init_tmp();
        engine
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
        let result = engine.verify().unwrap();
        assert!(result.valid);
        assert_eq!(result.entries_checked, 2);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn default_tier_is_relationship() {
        let (_dir, engine) = init_tmp();
        let entry = engine
            .add(
                AddInput {
                    body: b"note".to_vec(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap();
        assert_eq!(entry.tier, Tier::Relationship);
    }

    #[test]
    fn oversized_body_rejected() {
        let (_dir, engine) = init_tmp();
        let err = engine
            .add(
                AddInput {
                    body: vec![0u8; MAX_BODY_BYTES + 1],
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, MemlogError::ContentTooLarge { .. }));
    }

    #[test]
    fn tamper_detection_reports_content_mismatch() {
        let (dir, engine) = init_tmp();
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
        assert_eq!(result.violations[0].kind, ViolationKind::ContentMismatch);
        assert_eq!(result.violations[0].seq, entry.seq);
    }

    #[test]
    fn redact_deletes_body_and_appends_redaction_entry() {
        let (dir, engine) = init_tmp();
        let entry = engine
            .add(
                AddInput {
                    body: b"secret memory".to_vec(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap();

        let redaction = engine.redact(entry.seq, "user request", None).unwrap();
        assert_eq!(redaction.entry_type, EntryType::Redaction);
        assert_eq!(redaction.tier, Tier::Committed);

        let entries = engine.read_chain().unwrap();
        assert_eq!(entries.len(), 3);

        assert!(engine.store.get(&entry.content_hash, false).unwrap().is_none());
        let result = engine.verify().unwrap();
        assert!(result.valid);
        let _ = dir;
    }

    #[test]
    fn redact_committed_entry_refused() {
        let (_dir, engine) = init_tmp();
        let err = engine.redact(0, "oops", None).unwrap_err();
        assert!(matches!(err, MemlogError::CommittedNotRedactable { .. }));
    }

    #[test]
    fn redact_already_redacted_refused() {
        let (_dir, engine) = init_tmp();
        let entry = engine
            .add(
                AddInput {
                    body: b"x".to_vec(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap();
        let redaction = engine.redact(entry.seq, "reason", None).unwrap();
        let err = engine.redact(redaction.seq, "again", None).unwrap_err();
        assert!(matches!(err, MemlogError::AlreadyRedacted { .. }));
    }

    #[test]
    fn export_import_round_trip_preserves_validity() {
        let (_dir, engine) = init_tmp();
        engine
            .add(
                AddInput {
                    body: b"hello".to_vec(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                None,
            )
            .unwrap();

        let export = engine.export(None, None, true).unwrap();
        let target = tempfile::tempdir().unwrap();
        let imported = ChainEngine::import(&export, target.path(), false).unwrap();

        let result = imported.verify().unwrap();
        assert!(result.valid);
        assert_eq!(imported.read_chain().unwrap().len(), engine.read_chain().unwrap().len());
    }

    #[test]
    fn passphrase_wrapped_key_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let passphrase = StaticPassphrase::new("correct horse battery staple");
        let (engine, _) =
            ChainEngine::init(dir.path(), "Atlas", KeyMode::PassphraseWrapped, Some(&passphrase)).unwrap();
        let entry = engine
            .add(
                AddInput {
                    body: b"wrapped".to_vec(),
                    entry_type: EntryType::Memory,
                    tier: None,
                    metadata: None,
                },
                Some(&passphrase),
            )
            .unwrap();
        assert_eq!(entry.seq, 1);
        assert!(engine.verify().unwrap().valid);
    }

    #[test]
    fn malformed_trailing_line_is_discarded() {
        let (dir, engine) = init_tmp();
        let chain_path = dir.path().join(CHAIN_FILE);
        let mut file = OpenOptions::new().append(true).open(&chain_path).unwrap();
        file.write_all(b"{not valid json").unwrap();

        let entries = engine.read_chain().unwrap();
        assert_eq!(entries.len(), 1);
    }
}
