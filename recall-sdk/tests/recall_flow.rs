//! End-to-end tests for the Recall SDK against an on-disk database.

use std::sync::Arc;

use async_trait::async_trait;
use recall_sdk::memory::{
    EntryFilter, EntryType, Importance, NewEntry, SummarizeCapability, OVERFLOW_THRESHOLD_BYTES,
};
use recall_sdk::{Recall, RecallConfig, RecallResult, SummarizerConfig};

struct StubCapability;

#[async_trait]
impl SummarizeCapability for StubCapability {
    async fn summarize(&self, _context: &str, query: &str, _budget: usize) -> RecallResult<String> {
        Ok(format!("answer to '{}'", query))
    }
}

fn open_recall(dir: &tempfile::TempDir) -> Recall {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Recall::new(RecallConfig::new(dir.path().join("recall.db"))).unwrap()
}

#[tokio::test]
async fn append_retrieve_clear_flow() {
    let dir = tempfile::tempdir().unwrap();
    let recall = open_recall(&dir);

    recall
        .store()
        .append(
            NewEntry::new("s1", EntryType::Decision, "adopt redis for the cache layer")
                .with_importance(Importance::High),
        )
        .await
        .unwrap();
    recall
        .store()
        .append(NewEntry::new("s1", EntryType::UserMessage, "how is the build going"))
        .await
        .unwrap();

    let retrieval = recall
        .retriever()
        .retrieve("s1", "redis cache", 10, &EntryFilter::default(), None)
        .await
        .unwrap();
    assert!(!retrieval.results.is_empty());
    assert_eq!(retrieval.results[0].entry.entry_type, EntryType::Decision);

    let stats = recall.store().session_stats("s1").await.unwrap();
    assert_eq!(stats.entry_count, 2);

    let deleted = recall.store().clear_session("s1", true).await.unwrap();
    assert_eq!(deleted, 2);
    let err = recall.store().session_stats("s1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let recall = open_recall(&dir);
        recall
            .store()
            .append(NewEntry::new(
                "s1",
                EntryType::ToolResult,
                "p".repeat(OVERFLOW_THRESHOLD_BYTES + 1),
            ))
            .await
            .unwrap();
    }

    let recall = open_recall(&dir);
    let entries = recall
        .store()
        .query("s1", &EntryFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].overflow);

    let full = recall
        .store()
        .get(&entries[0].id, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(full.content.len(), OVERFLOW_THRESHOLD_BYTES + 1);
}

#[tokio::test]
async fn capability_enables_synthesized_answers() {
    let dir = tempfile::tempdir().unwrap();
    let config = RecallConfig::new(dir.path().join("recall.db")).with_summarizer(SummarizerConfig {
        enabled: true,
        per_call_budget_bytes: 200,
        max_depth: 3,
        call_timeout_secs: 5,
    });
    let recall = Recall::new(config).unwrap().with_capability(Arc::new(StubCapability));

    for i in 0..6 {
        recall
            .store()
            .append(NewEntry::new(
                "s1",
                EntryType::AssistantMessage,
                format!("deploy step {} {}", i, "d".repeat(80)),
            ))
            .await
            .unwrap();
    }

    let retrieval = recall
        .retriever()
        .retrieve("s1", "deploy", 10, &EntryFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(retrieval.answer.as_deref(), Some("answer to 'deploy'"));
}

#[tokio::test]
async fn disabled_summarizer_returns_raw_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let config = RecallConfig::new(dir.path().join("recall.db")).with_summarizer(SummarizerConfig {
        enabled: false,
        ..Default::default()
    });
    let recall = Recall::new(config).unwrap().with_capability(Arc::new(StubCapability));

    for i in 0..6 {
        recall
            .store()
            .append(NewEntry::new(
                "s1",
                EntryType::AssistantMessage,
                format!("deploy step {} {}", i, "d".repeat(80)),
            ))
            .await
            .unwrap();
    }

    let retrieval = recall
        .retriever()
        .retrieve("s1", "deploy", 10, &EntryFilter::default(), None)
        .await
        .unwrap();
    assert!(retrieval.answer.is_none());
    assert_eq!(retrieval.results.len(), 6);
}
