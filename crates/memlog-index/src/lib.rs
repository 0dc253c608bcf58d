//! memlog-index
//!
//! The derived retrieval index: rebuild from a
//! chain + body store, hybrid keyword/recency/importance/access ranking,
//! extractive summarization, and decay-tier garbage collection. Entirely
//! rebuildable — this crate never writes to the journal or content store.

pub mod db;
pub mod gc;
pub mod rebuild;
pub mod scoring;
pub mod search;
pub mod summarize;
pub mod tokenizer;
pub mod types;

pub use db::IndexDb;
pub use gc::{gc, restore, GcOptions, GcReport};
pub use rebuild::{rebuild, RebuildReport};
pub use search::{search, ScoredRow, SearchOptions};
pub use types::{DecayTier, IndexRow, Source};
