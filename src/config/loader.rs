// --- Файл: src/config/loader.rs ---

//! Loading run configuration documents from YAML or JSON.
//!
//! Only the `Loss` and `Metric` sections are interpreted here. Every other
//! top-level key of the document is ignored.

use crate::error::{ConfigError, Error};
use crate::losses::{build_loss, CombinedLoss};
use crate::metrics::{build_metrics, CombinedMetrics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use super::spec_list;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Training or evaluation section of a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Eval,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Train => write!(f, "Train"),
            Phase::Eval => write!(f, "Eval"),
        }
    }
}

/// `Train` / `Eval` lists of one section.
///
/// The lists are kept as raw values so that a malformed section surfaces as a
/// [`ConfigError::Shape`] from the aggregator instead of a parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSections {
    #[serde(rename = "Train", default, skip_serializing_if = "Option::is_none")]
    pub train: Option<Value>,
    #[serde(rename = "Eval", default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<Value>,
}

impl PhaseSections {
    pub fn get(&self, phase: Phase) -> Option<&Value> {
        match phase {
            Phase::Train => self.train.as_ref(),
            Phase::Eval => self.eval.as_ref(),
        }
    }
}

/// The parts of a run configuration this crate understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "Loss", default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<PhaseSections>,
    #[serde(rename = "Metric", default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<PhaseSections>,
}

impl RunConfig {
    pub fn loss_section(&self, phase: Phase) -> Option<&Value> {
        self.loss.as_ref().and_then(|s| s.get(phase))
    }

    pub fn metric_section(&self, phase: Phase) -> Option<&Value> {
        self.metric.as_ref().and_then(|s| s.get(phase))
    }

    /// Compiles the loss list of `phase`, if the document has one.
    pub fn build_loss(&self, phase: Phase) -> Result<Option<CombinedLoss>, ConfigError> {
        self.loss_section(phase)
            .map(|section| spec_list(section).and_then(build_loss))
            .transpose()
    }

    /// Compiles the metric list of `phase`, if the document has one.
    pub fn build_metrics(&self, phase: Phase) -> Result<Option<CombinedMetrics>, ConfigError> {
        self.metric_section(phase)
            .map(|section| spec_list(section).and_then(build_metrics))
            .transpose()
    }
}

/// Configuration loader for run documents
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, auto-detecting the format from the extension
    ///
    /// ```rust,no_run
    /// use rustycls::config::{ConfigLoader, Phase};
    /// use std::path::Path;
    ///
    /// let config = ConfigLoader::load_from_file(Path::new("ResNet50.yaml"))?;
    /// let loss = config.build_loss(Phase::Train)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_file(path: &Path) -> Result<RunConfig, Error> {
        let format = ConfigFormat::from_extension(path)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading {:?} config from {}", format, path.display());
        Self::load_from_string(&content, format)
    }

    /// Load configuration from a string with specified format
    pub fn load_from_string(content: &str, format: ConfigFormat) -> Result<RunConfig, Error> {
        match format {
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }
}
