use async_trait::async_trait;
use memlog_core::MemlogError;
use tokio_util::sync::CancellationToken;

use crate::types::{AnchorRecord, AnchorTarget, CallOptions, CostEstimate, StatusReport, SubmitResult, VerifyResult};

/// Common interface both external timestamp providers (Provider A —
/// calendar/blockchain, Provider B — smart-contract registry) implement.
/// Every call accepts a `CancellationToken` so an embedder can abandon a
/// slow external round trip without leaving on-disk state inconsistent:
/// cancellation before any write is a no-op, never a partial write.
#[async_trait]
pub trait AnchorProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submit `target` for external timestamping. Fails with
    /// `MemlogError::AnchorAlready` if this target already has a record
    /// for this provider.
    async fn submit(
        &self,
        target: AnchorTarget,
        options: CallOptions,
        cancel: CancellationToken,
    ) -> Result<SubmitResult, MemlogError>;

    /// Re-check every pending record, attempting to upgrade it toward
    /// `confirmed`. Calls `verify` internally once an artifact looks
    /// complete.
    async fn upgrade_pending(
        &self,
        options: CallOptions,
        cancel: CancellationToken,
    ) -> Result<StatusReport, MemlogError>;

    /// Re-derive the target's hash, load its proof artifact, and ask the
    /// external service(s) for an attestation.
    async fn verify(
        &self,
        target: &AnchorTarget,
        options: CallOptions,
        cancel: CancellationToken,
    ) -> Result<VerifyResult, MemlogError>;

    /// All records this provider has persisted, regardless of status.
    fn status(&self) -> Result<Vec<AnchorRecord>, MemlogError>;

    /// Whether the external service appears reachable/configured at all
    /// (e.g. has calendar URLs configured, or an RPC endpoint wired in).
    fn available(&self) -> bool;

    /// Estimate the fee for anchoring `count` additional targets.
    fn estimate_cost(&self, count: u64) -> CostEstimate;
}
