//! Pipeline configuration management.
//!
//! This module provides one configuration struct for the whole pipeline, from
//! indicators through evaluation, with serialization support for experiment
//! reproducibility.
//!
//! # Features
//!
//! - **Unified Configuration**: Single struct combining all pipeline stages
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Every stage is checked before the pipeline is built
//!
//! Missing sections and fields fall back to their defaults, so a TOML file
//! only needs the values that differ:
//!
//! ```toml
//! [labels]
//! horizon = 10
//!
//! [filter]
//! min_price = 1000.0
//! ```
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! config.save_toml("experiment_config.toml")?;
//!
//! let loaded = PipelineConfig::load_toml("experiment_config.toml")?;
//! let pipeline = Pipeline::from_config(loaded)?;
//! ```

use crate::error::{PipelineError, Result};
use crate::evaluation::EvaluationConfig;
use crate::features::IndicatorConfig;
use crate::labeling::LabelConfig;
use crate::preprocessing::FilterConfig;
use crate::sequence_builder::SequenceConfig;
use crate::split::SplitConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads for per-entity stages (`None` = rayon default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,

    /// Per-entity technical indicators
    pub indicators: IndicatorConfig,

    /// Horizon targets and classification labels
    pub labels: LabelConfig,

    /// Liquidity / price filter
    pub filter: FilterConfig,

    /// Chronological partitioning
    pub split: SplitConfig,

    /// Sequence window
    pub sequence: SequenceConfig,

    /// Evaluation
    pub evaluation: EvaluationConfig,

    /// Experiment metadata (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ExperimentMetadata {
    /// Metadata stamped with the current UTC time.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            indicators: IndicatorConfig::default(),
            labels: LabelConfig::default(),
            filter: FilterConfig::default(),
            split: SplitConfig::default(),
            sequence: SequenceConfig::default(),
            evaluation: EvaluationConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_indicators(mut self, config: IndicatorConfig) -> Self {
        self.indicators = config;
        self
    }

    pub fn with_labels(mut self, config: LabelConfig) -> Self {
        self.labels = config;
        self
    }

    pub fn with_filter(mut self, config: FilterConfig) -> Self {
        self.filter = config;
        self
    }

    pub fn with_split(mut self, config: SplitConfig) -> Self {
        self.split = config;
        self
    }

    pub fn with_sequence(mut self, config: SequenceConfig) -> Self {
        self.sequence = config;
        self
    }

    pub fn with_evaluation(mut self, config: EvaluationConfig) -> Self {
        self.evaluation = config;
        self
    }

    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Forecast horizon H (shared by labeling and purged evaluation).
    pub fn horizon(&self) -> usize {
        self.labels.horizon
    }

    /// Validate every stage.
    pub fn validate(&self) -> Result<()> {
        let stages: [(&str, std::result::Result<(), String>); 6] = [
            ("indicators", self.indicators.validate()),
            ("labels", self.labels.validate()),
            ("filter", self.filter.validate()),
            ("split", self.split.validate()),
            ("sequence", self.sequence.validate()),
            ("evaluation", self.evaluation.validate()),
        ];
        for (stage, outcome) in stages {
            outcome.map_err(|msg| PipelineError::config(format!("{stage}: {msg}")))?;
        }

        if self.num_threads == Some(0) {
            return Err(PipelineError::config("num_threads must be > 0 when set"));
        }
        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load configuration from TOML file.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = PipelineConfig::load_toml("configs/experiment1.toml")?;
    /// ```
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load by extension: `.json` as JSON, anything else as TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_json(path),
            _ => Self::load_toml(path),
        }
    }
}
