//! Context Formatting
//!
//! Renders memory entries into text suitable for an LLM context window,
//! under an approximate token budget.

use super::types::MemoryEntry;

/// Rough chars-to-tokens ratio used for budget estimates.
const TOKENS_PER_CHAR: f64 = 0.25;

/// Estimate the token count of a piece of text.
pub fn approx_tokens(text: &str) -> u64 {
    (text.len() as f64 * TOKENS_PER_CHAR) as u64
}

/// Format memory entries for inclusion in LLM context.
///
/// Entries are rendered in the given order and joined by separators; once
/// the running estimate hits `max_tokens` the current entry is truncated
/// (when enough budget remains to be useful) and the rest are dropped.
pub fn format_entries_for_context(
    entries: &[MemoryEntry],
    max_tokens: usize,
    include_metadata: bool,
) -> String {
    if entries.is_empty() {
        return "No relevant memories found.".to_string();
    }

    let mut parts = Vec::new();
    let mut estimated_tokens = 0usize;

    for entry in entries {
        let text = format_single_entry(entry, include_metadata);
        let entry_tokens = approx_tokens(&text) as usize;

        if estimated_tokens + entry_tokens > max_tokens {
            let remaining = max_tokens.saturating_sub(estimated_tokens);
            if remaining > 100 {
                let max_chars = (remaining as f64 / TOKENS_PER_CHAR) as usize;
                let truncated: String = text.chars().take(max_chars).collect();
                parts.push(format!("{}...", truncated));
            }
            break;
        }

        parts.push(text);
        estimated_tokens += entry_tokens;
    }

    parts.join("\n\n---\n\n")
}

fn format_single_entry(entry: &MemoryEntry, include_metadata: bool) -> String {
    let mut parts = vec![format!(
        "[{}] ({})",
        entry.entry_type.as_str().to_uppercase(),
        entry.timestamp.format("%Y-%m-%d %H:%M"),
    )];

    if include_metadata && !entry.metadata.is_empty() {
        let mut pairs: Vec<String> = entry
            .metadata
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(s) => format!("{}={}", k, s),
                None => format!("{}={}", k, v),
            })
            .collect();
        pairs.sort();
        parts.push(format!("  Metadata: {}", pairs.join(", ")));
    }

    parts.push(entry.content.clone());

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{EntryType, Importance};
    use chrono::Utc;
    use std::collections::HashMap;

    fn entry(content: &str) -> MemoryEntry {
        MemoryEntry {
            id: "e1".into(),
            session_id: "s1".into(),
            timestamp: Utc::now(),
            entry_type: EntryType::Decision,
            content: content.into(),
            metadata: HashMap::new(),
            importance: Importance::Medium,
            content_hash: String::new(),
            overflow: false,
        }
    }

    #[test]
    fn test_empty_entries() {
        assert_eq!(format_entries_for_context(&[], 1000, true), "No relevant memories found.");
    }

    #[test]
    fn test_includes_type_header_and_content() {
        let formatted = format_entries_for_context(&[entry("chose sqlite")], 1000, true);
        assert!(formatted.contains("[DECISION]"));
        assert!(formatted.contains("chose sqlite"));
    }

    #[test]
    fn test_metadata_line() {
        let mut e = entry("ran command");
        e.metadata
            .insert("tool".into(), serde_json::Value::String("bash".into()));
        let formatted = format_entries_for_context(&[e.clone()], 1000, true);
        assert!(formatted.contains("Metadata: tool=bash"));

        let without = format_entries_for_context(&[e], 1000, false);
        assert!(!without.contains("Metadata"));
    }

    #[test]
    fn test_budget_truncates() {
        let entries: Vec<MemoryEntry> = (0..20).map(|_| entry(&"long text ".repeat(100))).collect();
        let formatted = format_entries_for_context(&entries, 200, false);
        // Budget of 200 tokens ~ 800 chars; far less than 20 full entries.
        assert!(formatted.len() < 2000);
    }
}
