// --- Файл: src/losses/npairsloss.rs ---

//! N-pair loss on interleaved anchor / positive rows.

use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{log_softmax_rows, matrix, row_sq_norms};
use ndarray::s;

/// Rows `0, 2, 4, ..` are anchors and rows `1, 3, 5, ..` their positives.
/// The loss is the softmax cross-entropy of `anchors . positives^T` against
/// the diagonal, plus `0.5 * reg_lambda * mean(||f||^2)` over all rows.
///
/// Output key: `npairsloss`.
#[derive(Debug, Clone, PartialEq)]
pub struct NpairsLoss {
    reg_lambda: f32,
}

impl NpairsLoss {
    pub fn new(reg_lambda: f32) -> Self {
        Self { reg_lambda }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let reg_lambda = params.take_f32_or("reg_lambda", 0.01)?;
        params.finish()?;
        Ok(Self::new(reg_lambda))
    }
}

impl Loss for NpairsLoss {
    fn name(&self) -> &str {
        "NpairsLoss"
    }

    fn evaluate(&self, output: &ModelOutput, _batch: &Batch) -> Result<ScalarMap, EvalError> {
        let features = matrix(output.features()?, "NpairsLoss features")?;
        let rows = features.nrows();
        if rows == 0 || rows % 2 != 0 {
            return Err(EvalError::shape(
                "NpairsLoss",
                format!("expected an even, non-zero number of rows, got {rows}"),
            ));
        }
        let num_pairs = rows / 2;

        let anchors = features.slice(s![0..;2, ..]);
        let positives = features.slice(s![1..;2, ..]);
        let similarity = anchors.dot(&positives.t());

        let log_probs = log_softmax_rows(&similarity.view());
        let xent = -log_probs.diag().sum() / num_pairs as f32;

        let reg = row_sq_norms(&features).mean().unwrap_or(0.0);
        let l2loss = 0.5 * self.reg_lambda * reg;

        Ok(ScalarMap::single("npairsloss", xent + l2loss))
    }
}
