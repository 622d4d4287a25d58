// --- Файл: src/metrics/combined.rs ---

//! Ordered collection of configured metric evaluators.

use super::registry::MetricKind;
use super::retrieval::{RetriMetric, RetrievalConfig, RetrievalKind};
use super::Metric;
use crate::config::split_entry;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use serde_json::Value;
use std::fmt;

/// Evaluators in configuration order, with at most one trailing
/// [`RetriMetric`].
pub struct CombinedMetrics {
    metrics: Vec<Box<dyn Metric>>,
}

impl CombinedMetrics {
    pub fn from_specs(specs: &[Value]) -> Result<Self, ConfigError> {
        let mut metrics: Vec<Box<dyn Metric>> = Vec::with_capacity(specs.len());
        let mut retrieval = RetrievalConfig::new();

        for (index, entry) in specs.iter().enumerate() {
            let (name, params) = split_entry(index, entry)?;

            if let Some(kind) = RetrievalKind::from_name(&name) {
                if retrieval.insert(kind, params) {
                    tracing::warn!(
                        "Metric {} configured more than once; the last entry is used",
                        name
                    );
                }
                continue;
            }

            let metric = MetricKind::from_name(&name)?.build(params)?;
            tracing::debug!("Built metric {}", name);
            metrics.push(metric);
        }

        if !retrieval.is_empty() {
            metrics.push(Box::new(RetriMetric::from_config(retrieval)?));
        }

        let combined = Self { metrics };
        tracing::info!("Built metrics: {}", combined);
        Ok(combined)
    }

    pub fn push(&mut self, metric: Box<dyn Metric>) {
        self.metrics.push(metric);
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name()).collect()
    }

    /// Runs every evaluator in order and merges the results; later keys
    /// overwrite earlier ones.
    pub fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let mut merged = ScalarMap::new();
        for metric in &self.metrics {
            merged.merge(metric.evaluate(output, batch)?);
        }
        Ok(merged)
    }
}

impl fmt::Display for CombinedMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}

impl fmt::Debug for CombinedMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.metrics.iter()).finish()
    }
}

/// Builds a [`CombinedMetrics`] from a metric section.
pub fn build_metrics(specs: &[Value]) -> Result<CombinedMetrics, ConfigError> {
    CombinedMetrics::from_specs(specs)
}
