// --- Файл: src/losses/celoss.rs ---

//! Cross-entropy with optional label smoothing.

use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{log_softmax_rows, matrix, one_hot, softmax_rows};
use ndarray::{Array2, Axis};

/// Softmax cross-entropy on the model logits.
///
/// With `epsilon` in `(0, 1)` the targets are smoothed to
/// `(1 - epsilon) * one_hot + epsilon / C`. Any other epsilon disables
/// smoothing. Without smoothing, `[N, C]` labels are treated as soft targets
/// and passed through a softmax first.
///
/// Output key: `CELoss`.
#[derive(Debug, Clone, PartialEq)]
pub struct CeLoss {
    epsilon: Option<f32>,
}

impl CeLoss {
    pub fn new(epsilon: Option<f32>) -> Self {
        let epsilon = epsilon.filter(|e| *e > 0.0 && *e < 1.0);
        Self { epsilon }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        // `class_num` is accepted for compatibility; the class count always
        // comes from the logits.
        let _class_num = params.take_usize("class_num")?;
        let epsilon = params.take_f32("epsilon")?;
        params.finish()?;
        Ok(Self::new(epsilon))
    }

    /// Effective smoothing factor, `None` when smoothing is off.
    pub fn epsilon(&self) -> Option<f32> {
        self.epsilon
    }

    fn targets(&self, batch: &Batch, rows: usize, classes: usize) -> Result<Array2<f32>, EvalError> {
        let soft = batch.has_soft_labels(classes);
        let targets = match self.epsilon {
            Some(eps) => {
                let base = if soft {
                    matrix(&batch.labels, "CELoss labels")?.to_owned()
                } else {
                    one_hot(&batch.class_indices(Some(classes))?, classes)
                };
                base.mapv(|t| t * (1.0 - eps) + eps / classes as f32)
            }
            None if soft => softmax_rows(&matrix(&batch.labels, "CELoss labels")?),
            None => one_hot(&batch.class_indices(Some(classes))?, classes),
        };

        if targets.nrows() != rows {
            return Err(EvalError::shape(
                "CELoss",
                format!("{} label rows for {} logit rows", targets.nrows(), rows),
            ));
        }
        Ok(targets)
    }
}

impl Loss for CeLoss {
    fn name(&self) -> &str {
        "CELoss"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let logits = matrix(output.logits()?, "CELoss logits")?;
        let (rows, classes) = logits.dim();
        if rows == 0 {
            return Err(EvalError::invalid("CELoss", "empty batch"));
        }

        let targets = self.targets(batch, rows, classes)?;
        let neg_log_probs = log_softmax_rows(&logits).mapv(|x| -x);
        let per_sample = (&neg_log_probs * &targets).sum_axis(Axis(1));
        let loss = per_sample.sum() / rows as f32;

        Ok(ScalarMap::single("CELoss", loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_logits_give_log_num_classes() {
        let loss = CeLoss::new(None);
        let output = ModelOutput::from(Array2::<f32>::zeros((2, 10)).into_dyn());
        let batch = Batch::from_indices(&[3, 7]);
        let value = loss.evaluate(&output, &batch).unwrap().get("CELoss").unwrap();
        assert!((value - 10.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_hard_labels() {
        let loss = CeLoss::new(None);
        let output = ModelOutput::from(array![[2.0f32, 0.0], [0.0, 2.0]].into_dyn());
        let batch = Batch::from_indices(&[0, 0]);
        let value = loss.evaluate(&output, &batch).unwrap().get("CELoss").unwrap();

        let p_hi = 2.0f32.exp() / (2.0f32.exp() + 1.0);
        let expected = (-(p_hi.ln()) - (1.0 - p_hi).ln()) / 2.0;
        assert!((value - expected).abs() < 1e-5);
    }

    #[test]
    fn test_epsilon_outside_unit_interval_disables_smoothing() {
        assert_eq!(CeLoss::new(Some(0.0)).epsilon(), None);
        assert_eq!(CeLoss::new(Some(1.0)).epsilon(), None);
        assert_eq!(CeLoss::new(Some(0.1)).epsilon(), Some(0.1));
    }

    #[test]
    fn test_label_smoothing() {
        let eps = 0.1;
        let loss = CeLoss::new(Some(eps));
        let output = ModelOutput::from(array![[1.0f32, 0.0]].into_dyn());
        let batch = Batch::from_indices(&[0]);
        let value = loss.evaluate(&output, &batch).unwrap().get("CELoss").unwrap();

        let p0 = 1.0f32.exp() / (1.0f32.exp() + 1.0);
        let expected = -(0.95 * p0.ln() + 0.05 * (1.0 - p0).ln());
        assert!((value - expected).abs() < 1e-5);
    }

    #[test]
    fn test_soft_labels_are_softmaxed() {
        let loss = CeLoss::new(None);
        let output = ModelOutput::from(array![[0.0f32, 0.0]].into_dyn());
        let batch = Batch::new(array![[5.0f32, 5.0]].into_dyn());
        let value = loss.evaluate(&output, &batch).unwrap().get("CELoss").unwrap();
        assert!((value - 2.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_dict_output_uses_logits_entry() {
        let loss = CeLoss::new(None);
        let output = ModelOutput::dict()
            .with("logits", Array2::<f32>::zeros((1, 4)).into_dyn())
            .with("features", Array2::<f32>::ones((1, 8)).into_dyn());
        let value = loss
            .evaluate(&output, &Batch::from_indices(&[1]))
            .unwrap()
            .get("CELoss")
            .unwrap();
        assert!((value - 4.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_label_out_of_range() {
        let loss = CeLoss::new(None);
        let output = ModelOutput::from(Array2::<f32>::zeros((1, 3)).into_dyn());
        assert!(matches!(
            loss.evaluate(&output, &Batch::from_indices(&[3])),
            Err(EvalError::LabelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_unexpected_parameter() {
        let mut map = serde_json::Map::new();
        map.insert("gamma".to_string(), serde_json::json!(2.0));
        let err = CeLoss::from_params(Params::new("CELoss", map)).unwrap_err();
        assert!(matches!(err, ConfigError::Construction { .. }));
    }
}
