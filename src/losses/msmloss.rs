// --- Файл: src/losses/msmloss.rs ---

//! Margin sample mining loss over a `P * K` batch.

use super::mining::{max_of, min_of, GroupLayout};
use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{l2_normalize, matrix, pairwise_sq_distances};

/// `relu(max positive distance - min negative distance + margin)`, where the
/// max and min are taken over the whole batch, on L2-normalised features and
/// squared Euclidean distances.
///
/// Output key: `msmloss`.
#[derive(Debug, Clone, PartialEq)]
pub struct MsmLoss {
    layout: GroupLayout,
    margin: f32,
}

impl MsmLoss {
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

impl Loss for MsmLoss {
    fn name(&self) -> &str {
        "MSMLoss"
    }

    fn evaluate(&self, output: &ModelOutput, _batch: &Batch) -> Result<ScalarMap, EvalError> {
        let features = matrix(output.features()?, "MSMLoss features")?;
        self.layout.check(features.nrows(), "MSMLoss")?;

        let dist = pairwise_sq_distances(&l2_normalize(&features, 0.0).view());

        let mut pos_max = f32::NEG_INFINITY;
        let mut neg_min = f32::INFINITY;
        for i in 0..self.layout.batch_size {
            let (pos, neg) = self.layout.split_row(&dist, i);
            pos_max = pos_max.max(max_of(&pos));
            neg_min = neg_min.min(min_of(&neg));
        }

        let loss = (pos_max - neg_min + self.margin).max(0.0);
        Ok(ScalarMap::single("msmloss", loss))
    }
}
