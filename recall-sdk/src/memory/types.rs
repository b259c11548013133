//! Memory Type Definitions
//!
//! Defines the core types for the conversation memory system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entry content larger than this is redirected to the overflow table.
pub const OVERFLOW_THRESHOLD_BYTES: usize = 10 * 1024;

/// Inline preview length kept for overflowed entries.
pub const OVERFLOW_PREVIEW_CHARS: usize = 1000;

/// Kind of conversational record an entry holds. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    UserMessage,
    AssistantMessage,
    ToolCall,
    ToolResult,
    FileOp,
    Decision,
    Summary,
}

impl EntryType {
    /// Convert from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user_message" => Some(Self::UserMessage),
            "assistant_message" => Some(Self::AssistantMessage),
            "tool_call" => Some(Self::ToolCall),
            "tool_result" => Some(Self::ToolResult),
            "file_op" => Some(Self::FileOp),
            "decision" => Some(Self::Decision),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserMessage => "user_message",
            Self::AssistantMessage => "assistant_message",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::FileOp => "file_op",
            Self::Decision => "decision",
            Self::Summary => "summary",
        }
    }

    /// Parse a string, rejecting values outside the closed set.
    pub fn parse(s: &str) -> crate::RecallResult<Self> {
        Self::from_str(s)
            .ok_or_else(|| crate::RecallError::validation(format!("unknown entry type: {}", s)))
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Importance level for retrieval prioritization. Ordered low to critical.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Importance {
    /// Convert from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a string, rejecting values outside the closed set.
    pub fn parse(s: &str) -> crate::RecallResult<Self> {
        Self::from_str(s)
            .ok_or_else(|| crate::RecallError::validation(format!("unknown importance: {}", s)))
    }

    /// Numeric weight for scoring, monotone in level.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.8,
            Self::Critical => 1.0,
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single immutable unit of stored conversational memory.
///
/// Once written, `content` and `entry_type` are never mutated; only
/// derived metadata may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub entry_type: EntryType,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub importance: Importance,
    /// SHA-256 of the full content, computed on append.
    pub content_hash: String,
    /// True when `content` is a preview and the full payload lives in
    /// the overflow table.
    pub overflow: bool,
}

impl MemoryEntry {
    /// Approximate size of this entry's content in bytes.
    pub fn content_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Input for appending a new entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub session_id: String,
    pub entry_type: EntryType,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub importance: Importance,
    /// Timestamp to record; assigned at append time when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewEntry {
    /// Create a new entry input with default metadata and importance.
    pub fn new(
        session_id: impl Into<String>,
        entry_type: EntryType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            entry_type,
            content: content.into(),
            metadata: HashMap::new(),
            importance: Importance::default(),
            timestamp: None,
        }
    }

    /// Set the importance level
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Set the timestamp explicitly
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach a metadata key/value pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filters for querying entries within a session.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Restrict to these entry types
    pub entry_types: Option<Vec<EntryType>>,
    /// Keep entries at or above this importance level
    pub min_importance: Option<Importance>,
    /// Keep entries at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Keep entries at or before this instant
    pub until: Option<DateTime<Utc>>,
    /// Free-text substring match against content
    pub contains: Option<String>,
    /// Chronological order of results
    pub order: SortOrder,
    /// Maximum number of entries to return
    pub limit: Option<usize>,
}

/// Information about a conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub entry_count: u64,
}

/// Statistics for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub entry_count: u64,
    pub by_type: HashMap<String, u64>,
    pub storage_bytes: u64,
    /// Oldest and newest entry timestamps, when any entries exist.
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// An entry paired with its combined relevance score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: MemoryEntry,
    pub score: f64,
}

/// Result of a retrieval operation.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Ranked entries that survived top-k and budget selection
    pub results: Vec<ScoredEntry>,
    /// Synthesized answer, when recursive summarization ran
    pub answer: Option<String>,
    /// Indices of chunks the summarizer had to omit
    pub omitted_chunks: Vec<usize>,
    /// Wall-clock retrieval time
    pub elapsed_ms: u64,
    /// Rough token estimate for the selected content
    pub approx_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_conversion() {
        assert_eq!(EntryType::from_str("tool_result"), Some(EntryType::ToolResult));
        assert_eq!(EntryType::Decision.as_str(), "decision");
        assert!(EntryType::parse("banana").is_err());
    }

    #[test]
    fn test_importance_ordering() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::Medium < Importance::High);
        assert!(Importance::High < Importance::Critical);
        assert_eq!(Importance::default(), Importance::Medium);
    }

    #[test]
    fn test_importance_weight_monotone() {
        let levels = [
            Importance::Low,
            Importance::Medium,
            Importance::High,
            Importance::Critical,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0].weight() < pair[1].weight());
        }
    }

    #[test]
    fn test_importance_parse_rejects_unknown() {
        assert!(Importance::parse("urgent").is_err());
        assert_eq!(Importance::parse("critical").unwrap(), Importance::Critical);
    }
}
