//! memlog-chain
//!
//! The signed hash-chain engine: initialize a data
//! directory, append entries under an exclusive lock, verify the full chain,
//! redact non-committed entries, and export/import chain bundles.

pub mod engine;
pub mod keyfile;
pub mod lock;
pub mod passphrase;

pub use engine::{
    AddInput, ChainEngine, ChainExport, InitOutput, VerificationResult, Violation, ViolationKind,
};
pub use lock::ChainLock;
pub use passphrase::{EnvPassphrase, NoPassphrase, PassphraseProvider, StaticPassphrase};
