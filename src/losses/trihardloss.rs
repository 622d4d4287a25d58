// --- Файл: src/losses/trihardloss.rs ---

//! Per-anchor hardest triplet loss over a `P * K` batch.

use super::mining::{max_of, min_of, GroupLayout};
use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{l2_normalize, matrix, pairwise_sq_distances};

/// `mean(relu(hardest_pos + margin - hardest_neg))` on L2-normalised
/// features and squared distances.
///
/// Output key: `trihardloss`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriHardLoss {
    layout: GroupLayout,
    margin: f32,
}

impl TriHardLoss {
    pub fn new(layout: GroupLayout, margin: f32) -> Self {
        Self { layout, margin }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let layout = GroupLayout::from_params(&mut params, 120)?;
        let margin = params.take_f32_or("margin", 0.1)?;
        params.finish()?;
        Ok(Self::new(layout, margin))
    }
}

impl Loss for TriHardLoss {
    fn name(&self) -> &str {
        "TriHardLoss"
    }

    fn evaluate(&self, output: &ModelOutput, _batch: &Batch) -> Result<ScalarMap, EvalError> {
        let features = matrix(output.features()?, "TriHardLoss features")?;
        self.layout.check(features.nrows(), "TriHardLoss")?;

        let dist = pairwise_sq_distances(&l2_normalize(&features, 0.0).view());

        let total: f32 = (0..self.layout.batch_size)
            .map(|i| {
                let (pos, neg) = self.layout.split_row(&dist, i);
                (max_of(&pos) + self.margin - min_of(&neg)).max(0.0)
            })
            .sum();
        let loss = total / self.layout.batch_size as f32;

        Ok(ScalarMap::single("trihardloss", loss))
    }
}
