//! Scoring Engine
//!
//! Pure ranking functions combining keyword, temporal, and importance
//! sub-scores. No I/O; all inputs are passed in so results are
//! deterministic and testable in isolation.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::config::ScoreWeights;
use super::types::{Importance, MemoryEntry, ScoredEntry};

/// Common words excluded from keyword matching.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "and", "but", "if", "or", "because",
    "until", "while", "this", "that", "these", "those", "what", "which", "who", "whom", "it",
    "its", "i", "me", "my", "we", "our", "you", "your", "he", "him", "his", "she", "her", "they",
    "them", "their",
];

/// Extract lowercase keyword tokens from text, dropping stop words and
/// tokens shorter than three characters.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() > 2)
        .filter(|w| w.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'))
        .filter(|w| !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Keyword score: Jaccard similarity between the query's and the entry's
/// token sets, plus a bonus when the whole query occurs verbatim in the
/// content. Zero when either token set is empty.
pub fn keyword_score(query: &str, query_tokens: &HashSet<String>, entry: &MemoryEntry) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }

    let mut entry_text = entry.content.clone();
    for value in entry.metadata.values() {
        if let Some(s) = value.as_str() {
            entry_text.push(' ');
            entry_text.push_str(s);
        }
    }
    let entry_tokens = tokenize(&entry_text);
    if entry_tokens.is_empty() {
        return 0.0;
    }

    let intersection = query_tokens.intersection(&entry_tokens).count();
    let union = query_tokens.union(&entry_tokens).count();
    let jaccard = intersection as f64 / union as f64;

    let phrase_bonus = if entry.content.to_lowercase().contains(&query.to_lowercase()) {
        0.3
    } else {
        0.0
    };

    (jaccard + phrase_bonus).min(1.0)
}

/// Temporal score: exponential decay with the configured half-life.
/// An entry exactly one half-life old scores 0.5; scores never go
/// negative and future timestamps clamp to 1.0.
pub fn temporal_score(now: DateTime<Utc>, timestamp: DateTime<Utc>, half_life_secs: u64) -> f64 {
    let age_secs = (now - timestamp).num_milliseconds() as f64 / 1000.0;
    if age_secs <= 0.0 {
        return 1.0;
    }
    let half_lives = age_secs / half_life_secs as f64;
    (0.5f64).powf(half_lives).clamp(0.0, 1.0)
}

/// Importance score: the fixed level-to-weight mapping.
pub fn importance_score(importance: Importance) -> f64 {
    importance.weight()
}

/// Combined score: weighted sum of sub-scores, normalized by the weight
/// total so the result stays in [0, 1] regardless of configured weights.
pub fn combined_score(keyword: f64, temporal: f64, importance: f64, weights: &ScoreWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    (weights.keyword * keyword + weights.temporal * temporal + weights.importance * importance)
        / total
}

/// Score one entry against a query context.
pub fn score_entry(
    entry: &MemoryEntry,
    query: &str,
    query_tokens: &HashSet<String>,
    now: DateTime<Utc>,
    half_life_secs: u64,
    weights: &ScoreWeights,
) -> f64 {
    let keyword = keyword_score(query, query_tokens, entry);
    let temporal = temporal_score(now, entry.timestamp, half_life_secs);
    let importance = importance_score(entry.importance);
    combined_score(keyword, temporal, importance, weights)
}

/// Ranking comparator: score descending, ties broken by more-recent-first,
/// then higher-importance-first, then entry id for determinism.
pub fn compare_ranked(a: &ScoredEntry, b: &ScoredEntry) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.entry.timestamp.cmp(&a.entry.timestamp))
        .then_with(|| b.entry.importance.cmp(&a.entry.importance))
        .then_with(|| a.entry.id.cmp(&b.entry.id))
}
