//! Recall Configuration
//!
//! Defines configuration options for the Recall SDK. The host layer reads
//! this once at startup and passes it into [`crate::Recall::new`]; the core
//! keeps no process-wide state beyond the connection handle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Recall configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Retrieval and scoring configuration
    pub retrieval: RetrievalConfig,

    /// Recursive summarizer configuration
    pub summarizer: SummarizerConfig,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("recall.db"),
            retrieval: RetrievalConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

/// Weights for combining the scoring engine's sub-scores.
///
/// The combined score is normalized by the weight total, so any
/// non-negative weights with a positive sum keep scores in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight for keyword (Jaccard) similarity
    pub keyword: f64,

    /// Weight for exponential recency decay
    pub temporal: f64,

    /// Weight for the importance level mapping
    pub importance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        // Keyword-heavy defaults: a query term match should outrank
        // recency and importance combined.
        Self {
            keyword: 0.6,
            temporal: 0.25,
            importance: 0.15,
        }
    }
}

impl ScoreWeights {
    /// Sum of all weights (normalization denominator)
    pub fn total(&self) -> f64 {
        self.keyword + self.temporal + self.importance
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Scoring weights
    pub weights: ScoreWeights,

    /// Half-life for temporal decay in seconds (default: 86400 = 1 day)
    pub half_life_secs: u64,

    /// Minimum combined score for a candidate to survive a non-empty
    /// query (default: 0.1)
    pub min_relevance_score: f64,

    /// Hard cap on the candidate set pulled from storage (default: 500)
    pub max_candidates: usize,

    /// Default content budget in bytes when the caller passes none
    /// (default: 16384)
    pub default_budget_bytes: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            half_life_secs: 86_400, // 1 day
            min_relevance_score: 0.1,
            max_candidates: 500,
            default_budget_bytes: 16_384,
        }
    }
}

/// Recursive summarizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Whether recursive summarization runs at all. When disabled,
    /// retrieval returns the raw ranked entries.
    pub enabled: bool,

    /// Safe content size for a single capability call in bytes
    /// (default: 16384)
    pub per_call_budget_bytes: usize,

    /// Hard cap on reduction depth (default: 3)
    pub max_depth: usize,

    /// Per-call timeout in seconds (default: 60)
    pub call_timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_call_budget_bytes: 16_384,
            max_depth: 3,
            call_timeout_secs: 60,
        }
    }
}

impl RecallConfig {
    /// Create a new config with the given database path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Default::default()
        }
    }

    /// Set retrieval configuration
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Set summarizer configuration
    pub fn with_summarizer(mut self, summarizer: SummarizerConfig) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let w = &self.retrieval.weights;
        if w.keyword < 0.0 || w.temporal < 0.0 || w.importance < 0.0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.weights".into(),
                message: "weights must be non-negative".into(),
            });
        }
        if w.total() <= 0.0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.weights".into(),
                message: "weight total must be positive".into(),
            });
        }
        if self.retrieval.half_life_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.half_life_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retrieval.max_candidates == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.max_candidates".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retrieval.default_budget_bytes == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.default_budget_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.summarizer.per_call_budget_bytes == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "summarizer.per_call_budget_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.summarizer.max_depth == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "summarizer.max_depth".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    /// A field has an invalid value
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RecallConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_weights_normalize_to_one() {
        let w = ScoreWeights::default();
        assert!((w.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_half_life_rejected() {
        let mut config = RecallConfig::default();
        config.retrieval.half_life_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = RecallConfig::default();
        config.retrieval.weights.keyword = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut config = RecallConfig::default();
        config.summarizer.max_depth = 0;
        assert!(config.validate().is_err());
    }
}
