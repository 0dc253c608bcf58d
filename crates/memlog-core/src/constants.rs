//! ─── memlog protocol constants ──────────────────────────────────────────────
//!
//! Fixed limits referenced across every crate in the workspace. Changing any
//! of these breaks on-disk compatibility with chains written under the old
//! value — treat them as part of the wire contract, not tuning knobs.

/// Maximum body size in bytes (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Maximum nesting depth of a metadata value.
pub const METADATA_MAX_DEPTH: usize = 5;

/// Maximum length, in bytes, of any metadata string leaf.
pub const METADATA_MAX_STRING_LEN: usize = 10_000;

/// Maximum length of `ChainConfig::agent_name`.
pub const MAX_AGENT_NAME_LEN: usize = 256;

/// Lock acquisition retry budget for `chain.jsonl`.
pub const LOCK_MAX_RETRIES: u32 = 10;
pub const LOCK_BACKOFF_MIN_MS: u64 = 50;
pub const LOCK_BACKOFF_MAX_MS: u64 = 2_000;

/// Default scrypt KDF cost parameters for the passphrase-wrapped key envelope.
pub const SCRYPT_LOG_N: u8 = 14; // N = 2^14
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;
pub const SCRYPT_SALT_LEN: usize = 32;

/// ChaCha20-Poly1305 envelope sizes.
pub const ENVELOPE_IV_LEN: usize = 12;
pub const ENVELOPE_TAG_LEN: usize = 16;

/// Default retrieval index scoring weights (w_fts, w_rec, w_imp, w_acc).
pub const SCORE_WEIGHT_FTS: f64 = 0.40;
pub const SCORE_WEIGHT_RECENCY: f64 = 0.30;
pub const SCORE_WEIGHT_IMPORTANCE: f64 = 0.20;
pub const SCORE_WEIGHT_ACCESS: f64 = 0.10;

/// Recency half-life target: a two-week-old row scores ~0.5.
pub const RECENCY_HALF_LIFE_SECS: f64 = 14.0 * 86_400.0;

/// Access-count normalization ceiling for `log1p(access_count) / log1p(ACC_MAX)`.
pub const ACCESS_COUNT_MAX: f64 = 100.0;

/// Approximate characters-per-token heuristic used to truncate search results
/// to a token budget.
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Default extractive-summary character budget.
pub const SUMMARY_CHAR_BUDGET: usize = 150;

/// Garbage collection defaults.
pub const GC_MAX_AGE_DAYS: i64 = 30;
pub const GC_THRESHOLD: f64 = 0.2;

/// External anchor call policy defaults, chosen conservatively for
/// services with no documented SLA; see DESIGN.md.
pub const ANCHOR_CALL_TIMEOUT_SECS: u64 = 30;
pub const ANCHOR_CALL_MAX_ATTEMPTS: u32 = 3;
