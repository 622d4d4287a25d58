// --- Файл: src/losses/combined.rs ---

//! Weighted sum of configured losses.

use super::registry::LossKind;
use super::Loss;
use crate::config::split_entry;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use serde_json::Value;
use std::fmt;

/// Key of the synthesized total in [`CombinedLoss::evaluate`] results.
pub const TOTAL_KEY: &str = "loss";

struct WeightedLoss {
    loss: Box<dyn Loss>,
    weight: f32,
}

/// A list of losses with per-entry weights, built from configuration.
pub struct CombinedLoss {
    entries: Vec<WeightedLoss>,
}

impl CombinedLoss {
    /// Compiles a list of `{name: {weight: w, ...params}}` entries.
    pub fn from_specs(specs: &[Value]) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(specs.len());

        for (index, entry) in specs.iter().enumerate() {
            let (name, mut params) = split_entry(index, entry)?;

            if !params.contains("weight") {
                return Err(ConfigError::MissingWeight {
                    name,
                    present: params.keys(),
                });
            }
            let weight = params.take_f32("weight")?.ok_or_else(|| {
                ConfigError::construction(&name, "parameter 'weight' must be a number, found null")
            })?;

            let loss = LossKind::from_name(&name)?.build(params)?;
            tracing::debug!("Built loss {} with weight {}", name, weight);
            entries.push(WeightedLoss { loss, weight });
        }

        let combined = Self { entries };
        tracing::info!("Built combined loss: {}", combined);
        Ok(combined)
    }

    /// Adds an already constructed loss.
    pub fn push(&mut self, loss: Box<dyn Loss>, weight: f32) {
        self.entries.push(WeightedLoss { loss, weight });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Constituent names in configuration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.loss.name()).collect()
    }

    pub fn weights(&self) -> Vec<f32> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    /// Evaluates every loss, scales its outputs by the entry weight and merges
    /// them. Later entries overwrite earlier keys on collision. The `loss` key
    /// is then set to the sum of everything in the merged map.
    pub fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let mut merged = ScalarMap::new();

        for entry in &self.entries {
            let parts = entry.loss.evaluate(output, batch)?.scaled(entry.weight);
            for (key, value) in parts {
                if let Some(previous) = merged.insert(key.as_str(), value) {
                    tracing::debug!(
                        "Loss component '{}' from {} overwrote {}",
                        key,
                        entry.loss.name(),
                        previous
                    );
                }
            }
        }

        let total = merged.sum();
        merged.insert(TOTAL_KEY, total);
        Ok(merged)
    }
}

impl fmt::Display for CombinedLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{} x {}", e.loss.name(), e.weight))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

impl fmt::Debug for CombinedLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedLoss")
            .field("losses", &self.names())
            .field("weights", &self.weights())
            .finish()
    }
}

/// Builds a [`CombinedLoss`] from a loss section.
pub fn build_loss(specs: &[Value]) -> Result<CombinedLoss, ConfigError> {
    CombinedLoss::from_specs(specs)
}
