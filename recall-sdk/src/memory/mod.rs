//! Conversation Memory System
//!
//! Preserves an agent's working context beyond the active context window:
//! an append-only store of typed conversation entries, and a multi-strategy
//! retriever over it.
//!
//! # Architecture
//!
//! - **types** - the entry/session data model
//! - **store** - SQLite persistence (append, query, stats, clear)
//! - **scoring** - pure keyword/temporal/importance ranking functions
//! - **retriever** - candidate pull, ranking, top-k and budget selection
//! - **summarizer** - recursive chunk-summarize-merge reduction for
//!   selections too large for one external call
//! - **context** - rendering entries for an LLM context window
//!
//! Retrieval flow: candidates come out of the store, the scoring engine
//! ranks them, the budget pass trims them, and the summarizer reduces
//! whatever still exceeds a single-pass budget.

mod context;
mod retriever;
mod scoring;
mod store;
mod summarizer;
mod types;

pub mod migrations;

// Re-export public types
pub use types::{
    EntryFilter, EntryType, Importance, MemoryEntry, NewEntry, Retrieval, ScoredEntry,
    SessionInfo, SessionStats, SortOrder, OVERFLOW_PREVIEW_CHARS, OVERFLOW_THRESHOLD_BYTES,
};

pub use context::{approx_tokens, format_entries_for_context};
pub use retriever::Retriever;
pub use scoring::{
    combined_score, compare_ranked, importance_score, keyword_score, score_entry, temporal_score,
    tokenize,
};
pub use store::MemoryStore;
pub use summarizer::{
    Reduction, RecursiveSummarizer, SummarizeCapability, CHUNK_SUMMARY_PROMPT, RETRIEVAL_PROMPT,
};
