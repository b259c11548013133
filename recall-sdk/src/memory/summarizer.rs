//! Recursive Summarizer
//!
//! Reduces retrieved material that exceeds a single-pass budget: partition
//! into chunks, summarize siblings concurrently, and recurse on the partial
//! results until one synthesis call fits. The summarizer never touches the
//! persistence layer, so cancelling an in-flight reduction (dropping its
//! future aborts the fan-out tasks) cannot corrupt stored state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::config::SummarizerConfig;
use crate::{RecallError, RecallResult};

/// Prompt template for synthesizing an answer from retrieved memory.
/// Capabilities may substitute `{query}` and `{memory_content}`.
pub const RETRIEVAL_PROMPT: &str = "\
You are analyzing conversation memory to find information relevant to a query.

QUERY: {query}

CONVERSATION MEMORY (chronological):
{memory_content}

Your task:
1. Identify which parts of the memory are most relevant to the query
2. Extract the key information that answers or relates to the query
3. Summarize findings concisely while preserving important details

RELEVANT FINDINGS:";

/// Prompt template for summarizing one chunk of conversation memory.
pub const CHUNK_SUMMARY_PROMPT: &str = "\
You are creating a summary of one portion of conversation memory.

QUERY: {query}

CONVERSATION MEMORY:
{memory_content}

Create a concise summary that captures decisions, file operations, and
technical details relevant to the query.

SUMMARY:";

/// External summarization capability.
///
/// Implementations wrap whatever LLM client the host provides: given a
/// prompt context and a budget, return text or fail with a
/// [`RecallError::Capability`].
#[async_trait]
pub trait SummarizeCapability: Send + Sync {
    /// Summarize or answer over the given context, staying within
    /// `budget` bytes of output.
    async fn summarize(&self, context: &str, query: &str, budget: usize) -> RecallResult<String>;
}

/// Result of a recursive reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// Final synthesized answer
    pub answer: String,
    /// Sequence numbers of chunks whose calls failed twice and were
    /// replaced by placeholders
    pub omitted_chunks: Vec<usize>,
}

/// Tree-structured fan-out/fan-in reducer over an external capability.
pub struct RecursiveSummarizer {
    capability: Arc<dyn SummarizeCapability>,
    config: SummarizerConfig,
}

impl RecursiveSummarizer {
    /// Create a new summarizer
    pub fn new(capability: Arc<dyn SummarizeCapability>, config: SummarizerConfig) -> Self {
        Self { capability, config }
    }

    /// Safe single-call content budget in bytes
    pub fn per_call_budget(&self) -> usize {
        self.config.per_call_budget_bytes
    }

    /// Reduce ordered pieces of content into one in-budget answer.
    ///
    /// Runs level by level rather than via stack recursion: each level
    /// partitions the current pieces into chunks, summarizes siblings
    /// concurrently behind a join barrier, and feeds the partials into the
    /// next level. A chunk call is retried once; a second failure replaces
    /// the chunk with a placeholder and the reduction continues. Only a
    /// failure of the final synthesis call escalates to the caller.
    pub async fn reduce(&self, query: &str, pieces: Vec<String>) -> RecallResult<Reduction> {
        let budget = self.config.per_call_budget_bytes;
        let mut pieces = pieces;
        let mut omitted = Vec::new();
        let mut chunk_seq = 0usize;

        for depth in 0..self.config.max_depth {
            if Self::joined_len(&pieces) <= budget {
                break;
            }

            let chunks = Self::partition(&pieces, budget);
            tracing::debug!(depth, chunks = chunks.len(), "reducing level");

            let mut set = JoinSet::new();
            for (idx, chunk) in chunks.iter().enumerate() {
                let capability = self.capability.clone();
                let query = query.to_string();
                let content = chunk.join("\n\n");
                let timeout_secs = self.config.call_timeout_secs;
                set.spawn(async move {
                    let result =
                        Self::call_with_retry(&capability, &content, &query, budget, timeout_secs)
                            .await;
                    (idx, result)
                });
            }

            // Join barrier: every sibling resolves to a partial or a
            // placeholder before the next level starts.
            let mut partials: Vec<Option<String>> = vec![None; chunks.len()];
            while let Some(joined) = set.join_next().await {
                let (idx, result) =
                    joined.map_err(|e| anyhow::anyhow!("chunk task panicked: {e}"))?;
                let seq = chunk_seq + idx;
                partials[idx] = Some(match result {
                    Ok(partial) => partial,
                    Err(e) => {
                        tracing::warn!(chunk = seq, error = %e, "chunk summarization failed, omitting");
                        omitted.push(seq);
                        format!("[chunk {} omitted: summarization failed]", seq)
                    }
                });
            }
            chunk_seq += chunks.len();

            pieces = partials.into_iter().flatten().collect();
        }

        // Depth cap reached with oversized material: truncate into the
        // final call rather than fail the recall.
        let mut context = pieces.join("\n\n");
        if context.len() > budget {
            tracing::warn!(
                len = context.len(),
                budget,
                "reduction still over budget at depth cap, truncating"
            );
            context.truncate(Self::char_floor(&context, budget));
        }

        let answer = Self::call_with_retry(
            &self.capability,
            &context,
            query,
            budget,
            self.config.call_timeout_secs,
        )
        .await?;

        omitted.sort_unstable();
        Ok(Reduction {
            answer,
            omitted_chunks: omitted,
        })
    }

    /// One capability call with a per-call timeout, retried once on
    /// failure. A timeout counts as a failure.
    async fn call_with_retry(
        capability: &Arc<dyn SummarizeCapability>,
        context: &str,
        query: &str,
        budget: usize,
        timeout_secs: u64,
    ) -> RecallResult<String> {
        let deadline = Duration::from_secs(timeout_secs);
        for attempt in 0..2 {
            let result = tokio::time::timeout(deadline, capability.summarize(context, query, budget))
                .await
                .unwrap_or_else(|_| Err(RecallError::timeout(timeout_secs * 1000)));
            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt == 0 => {
                    tracing::debug!(error = %e, "capability call failed, retrying once");
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("retry loop returns on the second attempt")
    }

    /// Greedily pack ordered pieces into chunks no larger than `budget`.
    /// A single piece over budget becomes its own chunk; chronological
    /// order is preserved within and across chunks.
    fn partition(pieces: &[String], budget: usize) -> Vec<Vec<String>> {
        let mut chunks: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;

        for piece in pieces {
            let piece_len = piece.len() + 2;
            if !current.is_empty() && current_len + piece_len > budget {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current_len += piece_len;
            current.push(piece.clone());
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn joined_len(pieces: &[String]) -> usize {
        pieces.iter().map(|p| p.len() + 2).sum()
    }

    /// Largest index at or below `max` that falls on a char boundary.
    fn char_floor(s: &str, max: usize) -> usize {
        let mut idx = max.min(s.len());
        while idx > 0 && !s.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Capability that shrinks input to a fixed-size summary, optionally
    /// failing specific call numbers.
    struct MockCapability {
        calls: AtomicUsize,
        fail_calls: Vec<usize>,
    }

    impl MockCapability {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls: Vec::new(),
            }
        }

        fn failing_on(fail_calls: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummarizeCapability for MockCapability {
        async fn summarize(&self, context: &str, _query: &str, _budget: usize) -> RecallResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_calls.contains(&call) {
                return Err(RecallError::capability("mock transport failure"));
            }
            let head: String = context.chars().take(20).collect();
            Ok(format!("summary({})", head))
        }
    }

    fn config(budget: usize) -> SummarizerConfig {
        SummarizerConfig {
            enabled: true,
            per_call_budget_bytes: budget,
            max_depth: 3,
            call_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_small_input_single_synthesis_call() {
        let capability = Arc::new(MockCapability::new());
        let summarizer = RecursiveSummarizer::new(capability.clone(), config(1024));

        let reduction = summarizer
            .reduce("what happened", vec!["short piece".into()])
            .await
            .unwrap();
        assert!(reduction.answer.starts_with("summary("));
        assert!(reduction.omitted_chunks.is_empty());
        assert_eq!(capability.call_count(), 1);
    }

    #[tokio::test]
    async fn test_oversized_input_fans_out_then_synthesizes() {
        let capability = Arc::new(MockCapability::new());
        let summarizer = RecursiveSummarizer::new(capability.clone(), config(100));

        let pieces: Vec<String> = (0..6).map(|i| format!("piece {} {}", i, "x".repeat(60))).collect();
        let reduction = summarizer.reduce("query", pieces).await.unwrap();

        assert!(!reduction.answer.is_empty());
        assert!(reduction.omitted_chunks.is_empty());
        // More than one chunk call plus the final synthesis.
        assert!(capability.call_count() > 2);
    }

    #[tokio::test]
    async fn test_terminates_within_depth_bound() {
        // Capability that never shrinks its input, forcing the depth cap.
        struct EchoCapability;
        #[async_trait]
        impl SummarizeCapability for EchoCapability {
            async fn summarize(&self, context: &str, _q: &str, _b: usize) -> RecallResult<String> {
                Ok(context.to_string())
            }
        }

        let summarizer = RecursiveSummarizer::new(Arc::new(EchoCapability), config(50));
        let pieces: Vec<String> = (0..20).map(|i| format!("entry {} {}", i, "y".repeat(40))).collect();

        // Must terminate (depth cap + truncation), not loop forever.
        let reduction = summarizer.reduce("query", pieces).await.unwrap();
        assert!(!reduction.answer.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chunk_is_omitted_not_fatal() {
        // Fails every call whose context contains the poison marker, so
        // exactly one chunk fails both its attempt and its retry.
        struct PoisonCapability;
        #[async_trait]
        impl SummarizeCapability for PoisonCapability {
            async fn summarize(&self, context: &str, _q: &str, _b: usize) -> RecallResult<String> {
                if context.contains("poison") {
                    return Err(RecallError::capability("mock transport failure"));
                }
                Ok("partial summary".to_string())
            }
        }

        let summarizer = RecursiveSummarizer::new(Arc::new(PoisonCapability), config(100));

        let mut pieces: Vec<String> =
            (0..5).map(|i| format!("piece {} {}", i, "z".repeat(60))).collect();
        pieces.insert(2, format!("poison {}", "z".repeat(60)));

        let reduction = summarizer.reduce("query", pieces).await.unwrap();
        assert_eq!(reduction.omitted_chunks.len(), 1);
        assert!(!reduction.answer.is_empty());
    }

    #[tokio::test]
    async fn test_single_failure_recovers_via_retry() {
        // Only the first attempt fails; the retry succeeds.
        let capability = Arc::new(MockCapability::failing_on(vec![0]));
        let summarizer = RecursiveSummarizer::new(capability.clone(), config(1024));

        let reduction = summarizer.reduce("query", vec!["piece".into()]).await.unwrap();
        assert!(reduction.omitted_chunks.is_empty());
        assert_eq!(capability.call_count(), 2);
    }

    #[tokio::test]
    async fn test_final_synthesis_failure_escalates() {
        // Single piece: the only call is the final synthesis; fail it and
        // its retry.
        let capability = Arc::new(MockCapability::failing_on(vec![0, 1]));
        let summarizer = RecursiveSummarizer::new(capability, config(1024));

        let err = summarizer.reduce("query", vec!["piece".into()]).await.unwrap_err();
        assert!(matches!(err, RecallError::Capability { .. }));
    }

    #[test]
    fn test_partition_preserves_order_and_budget() {
        let pieces: Vec<String> = (0..10).map(|i| format!("p{}", i)).collect();
        let chunks = RecursiveSummarizer::partition(&pieces, 10);

        let flattened: Vec<String> = chunks.iter().flatten().cloned().collect();
        assert_eq!(flattened, pieces);
        for chunk in &chunks {
            if chunk.len() > 1 {
                let total: usize = chunk.iter().map(|p| p.len() + 2).sum();
                assert!(total <= 10);
            }
        }
    }
}
