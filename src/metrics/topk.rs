// --- Файл: src/metrics/topk.rs ---

//! Top-k classification accuracy.

use super::Metric;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{argsort_desc, matrix};
use ndarray::ArrayD;

fn read_topk(params: &mut Params) -> Result<Vec<usize>, ConfigError> {
    let topk = params.take_usize_list("topk")?.unwrap_or_else(|| vec![1, 5]);
    if topk.is_empty() || topk.contains(&0) {
        return Err(ConfigError::construction(
            params.owner(),
            format!("topk must be a non-empty list of positive integers, got {topk:?}"),
        ));
    }
    Ok(topk)
}

/// Fraction of samples whose label is among the `k` highest logits, for
/// every configured `k`.
///
/// Output keys: `top{k}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TopkAcc {
    topk: Vec<usize>,
}

impl TopkAcc {
    pub fn new(topk: Vec<usize>) -> Self {
        Self { topk }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let topk = read_topk(&mut params)?;
        params.finish()?;
        Ok(Self::new(topk))
    }

    pub fn topk(&self) -> &[usize] {
        &self.topk
    }

    /// Scores a logits tensor directly.
    pub fn score(&self, logits: &ArrayD<f32>, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let logits = matrix(logits, "TopkAcc logits")?;
        let (rows, classes) = logits.dim();
        if rows == 0 {
            return Err(EvalError::invalid("TopkAcc", "empty batch"));
        }
        if let Some(&k) = self.topk.iter().find(|&&k| k > classes) {
            return Err(EvalError::invalid(
                "TopkAcc",
                format!("k = {k} exceeds the number of classes ({classes})"),
            ));
        }

        let labels = batch.class_indices(Some(classes))?;
        if labels.len() != rows {
            return Err(EvalError::shape(
                "TopkAcc",
                format!("{} labels for {} logit rows", labels.len(), rows),
            ));
        }

        // Rank of the true label within each row.
        let ranks: Vec<usize> = logits
            .outer_iter()
            .zip(&labels)
            .map(|(row, &label)| {
                argsort_desc(row)
                    .iter()
                    .position(|&c| c == label)
                    .unwrap_or(classes)
            })
            .collect();

        Ok(self
            .topk
            .iter()
            .map(|&k| {
                let hits = ranks.iter().filter(|&&rank| rank < k).count();
                (format!("top{k}"), hits as f32 / rows as f32)
            })
            .collect())
    }
}

impl Metric for TopkAcc {
    fn name(&self) -> &str {
        "TopkAcc"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        self.score(output.logits()?, batch)
    }
}

/// [`TopkAcc`] on one sub-model of a distillation output.
///
/// Reads `output[model_key]`, then `[feature_key]` when set, then the logits
/// of that entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DistillationTopkAcc {
    model_key: String,
    feature_key: Option<String>,
    inner: TopkAcc,
}

impl DistillationTopkAcc {
    pub fn new(model_key: &str, feature_key: Option<&str>, topk: Vec<usize>) -> Self {
        Self {
            model_key: model_key.to_string(),
            feature_key: feature_key.map(str::to_string),
            inner: TopkAcc::new(topk),
        }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let model_key = params.take_string("model_key")?.ok_or_else(|| {
            ConfigError::construction(params.owner(), "missing required parameter 'model_key'")
        })?;
        let feature_key = params.take_string("feature_key")?;
        let topk = read_topk(&mut params)?;
        params.finish()?;
        Ok(Self {
            model_key,
            feature_key,
            inner: TopkAcc::new(topk),
        })
    }
}

impl Metric for DistillationTopkAcc {
    fn name(&self) -> &str {
        "DistillationTopkAcc"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let mut selected = output.get(&self.model_key)?;
        if let Some(key) = &self.feature_key {
            selected = selected.get(key)?;
        }
        self.inner.score(selected.logits()?, batch)
    }
}
