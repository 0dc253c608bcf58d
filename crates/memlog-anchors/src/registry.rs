//! Provider B: a smart-contract registry anchor.
//!
//! The target is always the chain tip plus its entry count, signed with the
//! agent's private key over a fixed 48-byte layout. The actual chain
//! interaction (fee quote, allowance, sending the transaction, waiting for
//! the receipt, decoding the emitted event) is delegated to a `ChainClient`
//! the embedder supplies: a smart-contract *client* (wallet, gas, RPC) is
//! an external collaborator this crate never owns. This provider owns only
//! the signing payload and the pending-record lifecycle.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use memlog_core::MemlogError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::pending::PendingStore;
use crate::provider::AnchorProvider;
use crate::types::{
    AnchorRecord, AnchorStatus, AnchorTarget, CallOptions, CostEstimate, ExternalCoords,
    StatusReport, SubmitResult, VerifyResult,
};

const BASE_ANCHORS_FILE: &str = "base-anchors.json";

/// The exact 48-byte big-endian layout signed for a tip anchor:
/// `tip (32 bytes) || entry_count (8 bytes) || chain_id (8 bytes)`.
pub fn signing_payload(tip: &alloy_primitives::B256, entry_count: u64, chain_id: u64) -> [u8; 48] {
    let mut buf = [0u8; 48];
    buf[0..32].copy_from_slice(tip.as_slice());
    buf[32..40].copy_from_slice(&entry_count.to_be_bytes());
    buf[40..48].copy_from_slice(&chain_id.to_be_bytes());
    buf
}

/// One confirmed on-chain anchor, persisted to `anchors/base-anchors.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OnChainAnchor {
    pub tx_hash: String,
    pub block_number: u64,
    pub anchor_index: u64,
    pub chain_root: String,
    pub entry_count: u64,
    pub agent_pubkey_hash: String,
}

/// The fee quote, allowance state, and transaction lifecycle an embedder's
/// smart-contract client provides. `memlog-anchors` never holds a wallet,
/// signer, or RPC endpoint itself.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, String>;
    async fn quote_fee(&self) -> Result<alloy_primitives::U256, String>;
    async fn ensure_allowance(&self, fee: alloy_primitives::U256) -> Result<(), String>;
    /// Send the anchoring transaction (payload + signature + a small dust
    /// fee) and block until the receipt is available, returning the
    /// receipt's tx hash, block number, and the `anchor_index` recovered
    /// from the emitted event.
    async fn send_anchor_tx(
        &self,
        payload: [u8; 48],
        signature: &[u8],
    ) -> Result<(String, u64, u64), String>;
    /// Read the most recent on-chain anchor for `agent_pubkey_hash`.
    async fn read_latest_anchor(&self, agent_pubkey_hash: &str) -> Result<Option<OnChainAnchor>, String>;
}

pub struct RegistryAnchorProvider {
    client: std::sync::Arc<dyn ChainClient>,
    agent_public_key: [u8; 32],
    sign: Box<dyn Fn(&[u8]) -> String + Send + Sync>,
    pending: PendingStore,
    base_anchors_path: std::path::PathBuf,
}

impl RegistryAnchorProvider {
    pub fn new(
        data_dir: &std::path::Path,
        client: std::sync::Arc<dyn ChainClient>,
        agent_public_key: [u8; 32],
        sign: Box<dyn Fn(&[u8]) -> String + Send + Sync>,
    ) -> Result<Self, MemlogError> {
        let pending = PendingStore::open(data_dir)?;
        let base_anchors_path = pending.anchors_dir().join(BASE_ANCHORS_FILE);
        Ok(Self { client, agent_public_key, sign, pending, base_anchors_path })
    }

    fn agent_pubkey_hash(&self) -> String {
        memlog_crypto::hash::hash(&self.agent_public_key)
    }

    fn read_base_anchors(&self) -> Result<Vec<OnChainAnchor>, MemlogError> {
        match std::fs::read_to_string(&self.base_anchors_path) {
            Ok(json) => {
                serde_json::from_str(&json).map_err(|e| MemlogError::Serialization(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn append_base_anchor(&self, anchor: OnChainAnchor) -> Result<(), MemlogError> {
        let mut all = self.read_base_anchors()?;
        all.push(anchor);
        std::fs::write(&self.base_anchors_path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }
}

#[async_trait]
impl AnchorProvider for RegistryAnchorProvider {
    fn name(&self) -> &'static str {
        "registry"
    }

    async fn submit(
        &self,
        target: AnchorTarget,
        _options: CallOptions,
        cancel: CancellationToken,
    ) -> Result<SubmitResult, MemlogError> {
        let AnchorTarget::Tip { hash, entry_count } = &target else {
            return Err(MemlogError::Other("registry provider anchors the chain tip only".into()));
        };

        if self.pending.get(&target.target_id())?.is_some() {
            return Err(MemlogError::AnchorAlready { provider: self.name().to_string() });
        }

        let (_, tip_bytes) = memlog_crypto::hash::parse_hash(hash)
            .ok_or_else(|| MemlogError::Other(format!("malformed tip hash: {hash}")))?;
        let tip = alloy_primitives::B256::from(tip_bytes);

        let chain_id = self.client.chain_id().await.map_err(|e| MemlogError::AnchorSubmitFailed { reason: e })?;
        if cancel.is_cancelled() {
            return Err(MemlogError::AnchorSubmitFailed { reason: "cancelled before write".into() });
        }

        let payload = signing_payload(&tip, *entry_count, chain_id);
        let signature = (self.sign)(&payload);

        let fee = self.client.quote_fee().await.map_err(|e| MemlogError::AnchorSubmitFailed { reason: e })?;
        self.client
            .ensure_allowance(fee)
            .await
            .map_err(|e| MemlogError::AnchorSubmitFailed { reason: e })?;

        if cancel.is_cancelled() {
            return Err(MemlogError::AnchorSubmitFailed { reason: "cancelled before write".into() });
        }

        let (tx_hash, block_number, anchor_index) = self
            .client
            .send_anchor_tx(payload, signature.as_bytes())
            .await
            .map_err(|e| MemlogError::AnchorSubmitFailed { reason: e })?;

        let anchor = OnChainAnchor {
            tx_hash: tx_hash.clone(),
            block_number,
            anchor_index,
            chain_root: hash.clone(),
            entry_count: *entry_count,
            agent_pubkey_hash: self.agent_pubkey_hash(),
        };
        self.append_base_anchor(anchor.clone())?;

        let record = AnchorRecord {
            provider: self.name().to_string(),
            target_id: target.target_id(),
            target_hash: hash.clone(),
            status: AnchorStatus::Confirmed,
            submitted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            confirmed_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            proof_artifact_path: self.base_anchors_path.display().to_string(),
            external_coords: Some(ExternalCoords {
                locator: format!("{tx_hash}#{block_number}"),
                external_ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
            error: None,
        };
        self.pending.insert_new(record.clone())?;
        info!(tx_hash, block_number, anchor_index, "tip anchored on-chain");
        Ok(SubmitResult { record })
    }

    /// On-chain anchors confirm within a single transaction receipt, so
    /// this provider never leaves a record pending — there is nothing to
    /// upgrade.
    async fn upgrade_pending(
        &self,
        _options: CallOptions,
        _cancel: CancellationToken,
    ) -> Result<StatusReport, MemlogError> {
        Ok(StatusReport::default())
    }

    async fn verify(
        &self,
        target: &AnchorTarget,
        _options: CallOptions,
        _cancel: CancellationToken,
    ) -> Result<VerifyResult, MemlogError> {
        let agent_hash = self.agent_pubkey_hash();
        let on_chain = self
            .client
            .read_latest_anchor(&agent_hash)
            .await
            .map_err(|e| MemlogError::AnchorSubmitFailed { reason: e })?;

        match on_chain {
            Some(anchor) => {
                let valid = anchor.chain_root == target.target_hash();
                Ok(VerifyResult {
                    valid,
                    status: if valid { AnchorStatus::Confirmed } else { AnchorStatus::Failed },
                    external_coords: Some(ExternalCoords {
                        locator: format!("{}#{}", anchor.tx_hash, anchor.block_number),
                        external_ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    }),
                    error: None,
                })
            }
            None => Ok(VerifyResult {
                valid: false,
                status: AnchorStatus::Failed,
                external_coords: None,
                error: Some("no on-chain anchor for this agent".to_string()),
            }),
        }
    }

    fn status(&self) -> Result<Vec<AnchorRecord>, MemlogError> {
        self.pending.all()
    }

    fn available(&self) -> bool {
        true
    }

    fn estimate_cost(&self, count: u64) -> CostEstimate {
        CostEstimate { fee: count as f64, unit: "tx", available: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeChainClient {
        next_anchor_index: Mutex<u64>,
        latest: Mutex<Option<OnChainAnchor>>,
    }

    impl FakeChainClient {
        fn new() -> Self {
            Self { next_anchor_index: Mutex::new(0), latest: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl ChainClient for FakeChainClient {
        async fn chain_id(&self) -> Result<u64, String> {
            Ok(1337)
        }
        async fn quote_fee(&self) -> Result<alloy_primitives::U256, String> {
            Ok(alloy_primitives::U256::from(100u64))
        }
        async fn ensure_allowance(&self, _fee: alloy_primitives::U256) -> Result<(), String> {
            Ok(())
        }
        async fn send_anchor_tx(&self, _payload: [u8; 48], _sig: &[u8]) -> Result<(String, u64, u64), String> {
            let mut idx = self.next_anchor_index.lock().unwrap();
            *idx += 1;
            Ok((format!("0xabc{idx}"), 42, *idx))
        }
        async fn read_latest_anchor(&self, _agent_pubkey_hash: &str) -> Result<Option<OnChainAnchor>, String> {
            Ok(self.latest.lock().unwrap().clone())
        }
    }

    fn tip_target() -> AnchorTarget {
        AnchorTarget::Tip { hash: memlog_crypto::hash::hash(b"tip header"), entry_count: 5 }
    }

    #[tokio::test]
    async fn submit_persists_confirmed_record_and_base_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let client = std::sync::Arc::new(FakeChainClient::new());
        let provider = RegistryAnchorProvider::new(
            dir.path(),
            client,
            [7u8; 32],
            Box::new(|payload| memlog_crypto::hash::hash(payload)),
        )
        .unwrap();

        let result = provider
            .submit(tip_target(), CallOptions::default(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.record.status, AnchorStatus::Confirmed);

        let records = provider.status().unwrap();
        assert_eq!(records.len(), 1);
        assert!(dir.path().join("anchors").join(BASE_ANCHORS_FILE).exists());
    }

    #[tokio::test]
    async fn duplicate_tip_submission_fails() {
        let dir = tempfile::tempdir().unwrap();
        let client = std::sync::Arc::new(FakeChainClient::new());
        let provider = RegistryAnchorProvider::new(
            dir.path(),
            client,
            [7u8; 32],
            Box::new(|payload| memlog_crypto::hash::hash(payload)),
        )
        .unwrap();

        provider.submit(tip_target(), CallOptions::default(), CancellationToken::new()).await.unwrap();
        let err = provider
            .submit(tip_target(), CallOptions::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MemlogError::AnchorAlready { .. }));
    }

    #[tokio::test]
    async fn verify_reports_failed_when_chain_root_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let client = std::sync::Arc::new(FakeChainClient::new());
        *client.latest.lock().unwrap() = Some(OnChainAnchor {
            tx_hash: "0xdead".into(),
            block_number: 10,
            anchor_index: 1,
            chain_root: memlog_crypto::hash::hash(b"stale tip"),
            entry_count: 4,
            agent_pubkey_hash: memlog_crypto::hash::hash(&[7u8; 32]),
        });
        let provider = RegistryAnchorProvider::new(
            dir.path(),
            client,
            [7u8; 32],
            Box::new(|payload| memlog_crypto::hash::hash(payload)),
        )
        .unwrap();

        let result = provider.verify(&tip_target(), CallOptions::default(), CancellationToken::new()).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.status, AnchorStatus::Failed);
    }

    #[test]
    fn signing_payload_has_fixed_48_byte_layout() {
        let tip = alloy_primitives::B256::from([9u8; 32]);
        let payload = signing_payload(&tip, 12, 1);
        assert_eq!(payload.len(), 48);
        assert_eq!(&payload[0..32], tip.as_slice());
        assert_eq!(&payload[32..40], &12u64.to_be_bytes());
        assert_eq!(&payload[40..48], &1u64.to_be_bytes());
    }
}
