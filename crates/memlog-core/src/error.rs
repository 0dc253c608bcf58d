use thiserror::Error;

/// Coarse error classification, used by embedders to decide retry/surface
/// policy without string-matching on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemlogErrorKind {
    Validation,
    Integrity,
    State,
    Concurrency,
    Io,
    Crypto,
    External,
}

#[derive(Debug, Error)]
pub enum MemlogError {
    // ── State / existence ────────────────────────────────────────────────────
    #[error("chain already exists at {path}")]
    ChainExists { path: String },

    #[error("no chain found at {path}")]
    ChainMissing { path: String },

    #[error("entry not found: seq {seq}")]
    EntryNotFound { seq: u64 },

    #[error("entry {seq} has tier=committed and cannot be redacted")]
    CommittedNotRedactable { seq: u64 },

    #[error("entry {seq} is already a redaction")]
    AlreadyRedacted { seq: u64 },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("body too large: {size} bytes (max {max})")]
    ContentTooLarge { size: usize, max: usize },

    #[error("metadata invalid: {reason}")]
    MetadataInvalid { reason: String },

    #[error("agent name invalid: {reason}")]
    AgentNameInvalid { reason: String },

    // ── Integrity ────────────────────────────────────────────────────────────
    #[error("integrity error: expected {expected}, actual {actual}")]
    IntegrityError { expected: String, actual: String },

    #[error("signature invalid for entry seq {seq}")]
    SignatureInvalid { seq: u64 },

    #[error("hash mismatch for entry seq {seq}")]
    HashMismatch { seq: u64 },

    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("timestamp invalid at seq {seq}: {reason}")]
    TimestampInvalid { seq: u64, reason: String },

    #[error("content mismatch for seq {seq}")]
    ContentMismatch { seq: u64 },

    // ── Crypto ───────────────────────────────────────────────────────────────
    #[error("passphrase required but not supplied")]
    PassphraseMissing,

    #[error("passphrase incorrect (authentication tag mismatch)")]
    PassphraseWrong,

    // ── Concurrency ──────────────────────────────────────────────────────────
    #[error("could not acquire exclusive lock on {path} within the retry budget")]
    LockTimeout { path: String },

    // ── External (anchors) ───────────────────────────────────────────────────
    #[error("anchor submission failed: {reason}")]
    AnchorSubmitFailed { reason: String },

    #[error("target is already anchored with provider {provider}")]
    AnchorAlready { provider: String },

    #[error("anchor not yet confirmed (status: {status})")]
    AnchorNotConfirmed { status: String },

    // ── IO / serialization / storage ─────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl MemlogError {
    pub fn kind(&self) -> MemlogErrorKind {
        use MemlogError::*;
        match self {
            ChainExists { .. } | ChainMissing { .. } | EntryNotFound { .. }
            | CommittedNotRedactable { .. } | AlreadyRedacted { .. } => MemlogErrorKind::State,

            ContentTooLarge { .. } | MetadataInvalid { .. } | AgentNameInvalid { .. } => {
                MemlogErrorKind::Validation
            }

            IntegrityError { .. }
            | SignatureInvalid { .. }
            | HashMismatch { .. }
            | SequenceGap { .. }
            | TimestampInvalid { .. }
            | ContentMismatch { .. } => MemlogErrorKind::Integrity,

            PassphraseMissing | PassphraseWrong => MemlogErrorKind::Crypto,

            LockTimeout { .. } => MemlogErrorKind::Concurrency,

            AnchorSubmitFailed { .. } | AnchorAlready { .. } | AnchorNotConfirmed { .. } => {
                MemlogErrorKind::External
            }

            Io(_) | Storage(_) => MemlogErrorKind::Io,

            Serialization(_) | Other(_) => MemlogErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for MemlogError {
    fn from(e: std::io::Error) -> Self {
        MemlogError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for MemlogError {
    fn from(e: serde_json::Error) -> Self {
        MemlogError::Serialization(e.to_string())
    }
}
