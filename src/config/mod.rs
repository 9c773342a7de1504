//! Pipeline configuration.
//!
//! All tunables of a run live in one serde-friendly [`PipelineConfig`]. The
//! `cluster` binary starts from the defaults, overlays an optional JSON file
//! and then command-line flags, and validates the result before running.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::DEFAULT_LABEL_TERMS;
use crate::orchestrator::OrchestratorConfig;
use crate::reduction::ReductionParams;
use crate::selector::SelectorConfig;
use crate::summary::SummaryConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Config file is not valid JSON for this schema
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete configuration of a clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Embedding batching and normalisation
    pub orchestrator: OrchestratorConfig,

    /// Dimensionality reduction parameters
    pub reduction: ReductionParams,

    /// Grid search around the default `min_cluster_size`
    pub selector: SelectorConfig,

    /// Keywords kept per cluster by the keyword extractor
    pub keywords_per_cluster: usize,

    /// Terms per label
    pub label_terms: usize,

    /// Summary generation
    pub summary: SummaryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            reduction: ReductionParams::default(),
            selector: SelectorConfig::default(),
            keywords_per_cluster: 30,
            label_terms: DEFAULT_LABEL_TERMS,
            summary: SummaryConfig::default(),
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.orchestrator.batch_size == 0 {
            return Err(invalid("orchestrator.batch_size", "must be at least 1"));
        }
        if self.reduction.target_dim == 0 {
            return Err(invalid("reduction.target_dim", "must be at least 1"));
        }
        if self.reduction.n_neighbors < 2 {
            return Err(invalid("reduction.n_neighbors", "must be at least 2"));
        }
        if !(self.reduction.min_dist.is_finite() && self.reduction.min_dist >= 0.0) {
            return Err(invalid("reduction.min_dist", "must be a non-negative number"));
        }
        if self.selector.min_cluster_size < 2 {
            return Err(invalid(
                "selector.min_cluster_size",
                format!("must be at least 2, got {}", self.selector.min_cluster_size),
            ));
        }
        if self.keywords_per_cluster == 0 {
            return Err(invalid("keywords_per_cluster", "must be at least 1"));
        }
        if self.label_terms == 0 {
            return Err(invalid("label_terms", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.summary.diversity) {
            return Err(invalid(
                "summary.diversity",
                format!("must be in [0, 1], got {}", self.summary.diversity),
            ));
        }
        if self.summary.max_chars == 0 {
            return Err(invalid("summary.max_chars", "must be at least 1"));
        }
        if !self.summary.impact_bonus.is_finite() {
            return Err(invalid("summary.impact_bonus", "must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.orchestrator.batch_size, 64);
        assert_eq!(config.orchestrator.batch_threshold, 1000);
        assert_eq!(config.reduction.target_dim, 50);
        assert_eq!(config.reduction.n_neighbors, 15);
        assert_eq!(config.reduction.seed, 42);
        assert_eq!(config.selector.min_cluster_size, 3);
        assert_eq!(config.label_terms, 5);
        assert_eq!(config.summary.n_sentences, 2);
        assert!(config.validate().is_ok(), "Defaults should be valid");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"selector": {{"min_cluster_size": 5, "parallel": true}}, "label_terms": 3}}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.selector.min_cluster_size, 5);
        assert!(config.selector.parallel);
        assert_eq!(config.label_terms, 3);
        assert_eq!(config.summary, SummaryConfig::default(), "Absent sections keep defaults");
    }

    #[test]
    fn test_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.selector.min_cluster_size = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "selector.min_cluster_size", .. })
        ));

        let mut config = PipelineConfig::default();
        config.summary.diversity = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "summary.diversity", .. })));

        let mut config = PipelineConfig::default();
        config.reduction.target_dim = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.orchestrator.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
