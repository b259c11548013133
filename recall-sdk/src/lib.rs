//! Recall SDK - Durable Conversation Memory
//!
//! Preserves a conversational agent's working context beyond what fits in
//! an active context window, and answers targeted questions against the
//! preserved history without re-reading everything.
//!
//! # Modules
//!
//! - **memory** - the append-only entry store, scoring engine, retriever,
//!   and recursive summarizer
//! - **config** - startup configuration ([`RecallConfig`])
//! - **error** - the [`RecallError`] taxonomy
//!
//! # Example
//!
//! ```rust,no_run
//! use recall_sdk::{Recall, RecallConfig};
//! use recall_sdk::memory::{EntryFilter, EntryType, NewEntry};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let recall = Recall::new(RecallConfig::new("recall.db"))?;
//!
//!     // Preserve a unit of conversation
//!     recall
//!         .store()
//!         .append(NewEntry::new("session-1", EntryType::Decision, "use WAL mode"))
//!         .await?;
//!
//!     // Answer a targeted question against the history
//!     let retrieval = recall
//!         .retriever()
//!         .retrieve("session-1", "what did we decide about WAL", 10, &EntryFilter::default(), None)
//!         .await?;
//!     println!("{} entries", retrieval.results.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;

pub use config::{RecallConfig, RetrievalConfig, ScoreWeights, SummarizerConfig};
pub use error::{RecallError, RecallResult};

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::RwLock;

use memory::{MemoryStore, RecursiveSummarizer, Retriever, SummarizeCapability};

/// Recall SDK - Main entry point
///
/// Owns the connection handle (the only process-wide resource; every call
/// takes its session id explicitly) and wires the store and retriever
/// together. Attach a summarization capability with
/// [`Recall::with_capability`] to enable recursive reduction of oversized
/// retrievals.
pub struct Recall {
    config: RecallConfig,
    store: Arc<MemoryStore>,
    retriever: Retriever,
}

impl Recall {
    /// Create a new Recall instance: validates the configuration, opens
    /// the database, and runs migrations.
    pub fn new(config: RecallConfig) -> RecallResult<Self> {
        config.validate()?;

        let conn = Connection::open(&config.database_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        memory::migrations::run_migrations(&conn)?;

        let db = Arc::new(RwLock::new(conn));
        let store = Arc::new(MemoryStore::new(db));
        let retriever = Retriever::new(store.clone(), config.retrieval.clone());

        tracing::info!(path = %config.database_path.display(), "opened recall store");

        Ok(Self {
            config,
            store,
            retriever,
        })
    }

    /// Attach the external summarization capability. Ignored when the
    /// summarizer is disabled in configuration; retrieval then returns
    /// raw top-k scored entries.
    pub fn with_capability(mut self, capability: Arc<dyn SummarizeCapability>) -> Self {
        if self.config.summarizer.enabled {
            let summarizer = Arc::new(RecursiveSummarizer::new(
                capability,
                self.config.summarizer.clone(),
            ));
            self.retriever = Retriever::new(self.store.clone(), self.config.retrieval.clone())
                .with_summarizer(summarizer);
        }
        self
    }

    /// Access the persistence layer
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Access the retriever
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Access the configuration
    pub fn config(&self) -> &RecallConfig {
        &self.config
    }
}
