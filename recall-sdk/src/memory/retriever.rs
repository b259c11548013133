//! Retriever
//!
//! Orchestrates the scoring engine over candidates pulled from the store,
//! applies top-k and budget constraints, and optionally hands oversized
//! selections to the recursive summarizer.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::config::RetrievalConfig;
use crate::{RecallError, RecallResult};
use super::context::{approx_tokens, format_entries_for_context};
use super::scoring;
use super::store::MemoryStore;
use super::summarizer::RecursiveSummarizer;
use super::types::{EntryFilter, MemoryEntry, Retrieval, ScoredEntry};

/// Multi-strategy retriever over the memory store
pub struct Retriever {
    store: Arc<MemoryStore>,
    config: RetrievalConfig,
    summarizer: Option<Arc<RecursiveSummarizer>>,
}

impl Retriever {
    /// Create a new retriever without a summarization stage
    pub fn new(store: Arc<MemoryStore>, config: RetrievalConfig) -> Self {
        Self {
            store,
            config,
            summarizer: None,
        }
    }

    /// Attach a recursive summarizer for oversized selections
    pub fn with_summarizer(mut self, summarizer: Arc<RecursiveSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Retrieve the most relevant entries for a query.
    ///
    /// Pulls a bounded candidate set, ranks it, truncates to `k`, then
    /// greedily fills `budget` (bytes of content; the configured default
    /// when `None`). When a summarizer is attached and the selection
    /// exceeds its per-call budget, the selection is reduced into a
    /// synthesized answer; if that reduction ultimately fails, the ranked
    /// entries are still returned (the answer is just absent).
    pub async fn retrieve(
        &self,
        session_id: &str,
        query: &str,
        k: usize,
        filter: &EntryFilter,
        budget: Option<usize>,
    ) -> RecallResult<Retrieval> {
        let started = Instant::now();
        let budget = budget.unwrap_or(self.config.default_budget_bytes);

        // A session id the store has never seen is NotFound; an empty
        // result for a known session is not.
        if self.store.session(session_id).await?.is_none() {
            return Err(RecallError::not_found("Session", session_id));
        }

        let candidates = self.candidates(session_id, filter).await?;
        let ranked = self.rank(query, candidates);
        let selected = Self::fit_budget(ranked, k, budget)?;

        let (answer, omitted_chunks) = self.maybe_reduce(query, &selected).await;

        let approx = selected
            .iter()
            .map(|s| approx_tokens(&s.entry.content))
            .sum();

        Ok(Retrieval {
            results: selected,
            answer,
            omitted_chunks,
            elapsed_ms: started.elapsed().as_millis() as u64,
            approx_tokens: approx,
        })
    }

    /// Pull a bounded candidate set. Never an unfiltered full-table scan:
    /// the configured hard cap applies even when the caller sets none.
    async fn candidates(
        &self,
        session_id: &str,
        filter: &EntryFilter,
    ) -> RecallResult<Vec<MemoryEntry>> {
        let mut bounded = filter.clone();
        bounded.limit = Some(
            filter
                .limit
                .map_or(self.config.max_candidates, |l| l.min(self.config.max_candidates)),
        );
        self.store.query(session_id, &bounded).await
    }

    /// Score and sort candidates with the deterministic tie-break rule.
    /// For a non-empty query, candidates below the relevance floor drop.
    fn rank(&self, query: &str, candidates: Vec<MemoryEntry>) -> Vec<ScoredEntry> {
        let now = Utc::now();
        let query_tokens = scoring::tokenize(query);
        let filter_by_floor = !query.trim().is_empty();

        let mut ranked: Vec<ScoredEntry> = candidates
            .into_iter()
            .map(|entry| {
                let score = scoring::score_entry(
                    &entry,
                    query,
                    &query_tokens,
                    now,
                    self.config.half_life_secs,
                    &self.config.weights,
                );
                ScoredEntry { entry, score }
            })
            .filter(|scored| !filter_by_floor || scored.score >= self.config.min_relevance_score)
            .collect();

        ranked.sort_by(scoring::compare_ranked);
        ranked
    }

    /// Truncate to top-k, then greedily fill the byte budget, skipping
    /// entries that individually exceed what remains. When nothing fits
    /// because even the top entry alone overflows the whole budget, that
    /// is a `BudgetExceeded` rather than a silently truncated result.
    fn fit_budget(
        ranked: Vec<ScoredEntry>,
        k: usize,
        budget: usize,
    ) -> RecallResult<Vec<ScoredEntry>> {
        let top_k: Vec<ScoredEntry> = ranked.into_iter().take(k).collect();

        let mut selected = Vec::new();
        let mut remaining = budget;
        for scored in &top_k {
            let size = scored.entry.content_bytes();
            if size <= remaining {
                remaining -= size;
                selected.push(scored.clone());
            }
        }

        if selected.is_empty() {
            if let Some(top) = top_k.first() {
                return Err(RecallError::BudgetExceeded {
                    entry_id: top.entry.id.clone(),
                    size_bytes: top.entry.content_bytes(),
                    budget_bytes: budget,
                });
            }
        }

        Ok(selected)
    }

    /// Run the recursive summarizer when the selection exceeds its
    /// per-call budget. Failures degrade to the raw ranked list rather
    /// than losing the retrieval.
    async fn maybe_reduce(
        &self,
        query: &str,
        selected: &[ScoredEntry],
    ) -> (Option<String>, Vec<usize>) {
        let Some(ref summarizer) = self.summarizer else {
            return (None, Vec::new());
        };

        let total: usize = selected.iter().map(|s| s.entry.content_bytes()).sum();
        if total <= summarizer.per_call_budget() {
            return (None, Vec::new());
        }

        // Chunks are built in chronological order, not rank order.
        let mut chronological: Vec<&ScoredEntry> = selected.iter().collect();
        chronological.sort_by_key(|s| (s.entry.timestamp, s.entry.id.clone()));
        let pieces: Vec<String> = chronological
            .iter()
            .map(|s| format_entries_for_context(std::slice::from_ref(&s.entry), usize::MAX, true))
            .collect();

        match summarizer.reduce(query, pieces).await {
            Ok(reduction) => (Some(reduction.answer), reduction.omitted_chunks),
            Err(e) => {
                tracing::warn!(error = %e, "summarization failed, returning unreduced ranking");
                (None, Vec::new())
            }
        }
    }
}
