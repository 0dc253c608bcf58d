//! External timestamp anchors: periodically binding entries (or the chain
//! tip) to an independent, agent-uncontrolled timeline so a verifier can
//! detect silent history rewrites even if the agent's own signing key is
//! later compromised.
//!
//! Two independent providers are offered, selected per call rather than
//! globally — an embedder can anchor every entry to the calendar service
//! and the tip only to the registry, or any other mix:
//!
//! - [`calendar::CalendarAnchorProvider`] (Provider A) anchors a single
//!   entry's content hash to a decentralized calendar network, tolerating
//!   partial failure across the configured calendar URLs.
//! - [`registry::RegistryAnchorProvider`] (Provider B) anchors the chain
//!   tip plus its entry count to a smart-contract registry, delegating the
//!   wallet/gas/RPC concerns to an injected [`registry::ChainClient`].
//!
//! Both implement the shared [`provider::AnchorProvider`] trait and persist
//! their bookkeeping under `<data_dir>/anchors/`.

pub mod calendar;
pub mod pending;
pub mod provider;
pub mod registry;
pub mod types;

pub use provider::AnchorProvider;
pub use types::{
    AnchorRecord, AnchorStatus, AnchorTarget, CallOptions, CostEstimate, ExternalCoords,
    StatusReport, SubmitResult, VerifyResult,
};
