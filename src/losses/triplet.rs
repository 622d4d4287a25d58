// --- Файл: src/losses/triplet.rs ---

//! Batch-hard triplet losses.

use super::mining::{hardest_by_label, margin_ranking};
use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{l2_normalize, matrix, pairwise_distances};

/// Computes `mean(max(0, d_ap - d_an + margin))` with batch-hard mining.
fn batch_hard_triplet(
    output: &ModelOutput,
    batch: &Batch,
    margin: f32,
    normalize: bool,
    context: &str,
) -> Result<f32, EvalError> {
    let features = matrix(output.features()?, context)?;
    let labels = batch.class_indices(None)?;

    let dist = if normalize {
        pairwise_distances(&l2_normalize(&features, 1e-12).view())
    } else {
        pairwise_distances(&features)
    };

    let (dist_ap, dist_an) = hardest_by_label(&dist, &labels, context)?;
    Ok(margin_ranking(&dist_ap, &dist_an, margin))
}

/// Triplet loss on raw features with batch-hard mining.
///
/// Output key: `TripletLoss`.
#[derive(Debug, Clone, PartialEq)]
pub struct TripletLoss {
    margin: f32,
}

impl TripletLoss {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let margin = params.take_f32_or("margin", 1.0)?;
        params.finish()?;
        Ok(Self::new(margin))
    }
}

impl Loss for TripletLoss {
    fn name(&self) -> &str {
        "TripletLoss"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let loss = batch_hard_triplet(output, batch, self.margin, false, "TripletLoss")?;
        Ok(ScalarMap::single("TripletLoss", loss))
    }
}

/// Triplet loss on (optionally) L2-normalised features.
///
/// Output key: `TripletLossV2`.
#[derive(Debug, Clone, PartialEq)]
pub struct TripletLossV2 {
    margin: f32,
    normalize_feature: bool,
}

impl TripletLossV2 {
    pub fn new(margin: f32, normalize_feature: bool) -> Self {
        Self {
            margin,
            normalize_feature,
        }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let margin = params.take_f32_or("margin", 0.5)?;
        let normalize_feature = params.take_bool_or("normalize_feature", true)?;
        params.finish()?;
        Ok(Self::new(margin, normalize_feature))
    }
}

impl Loss for TripletLossV2 {
    fn name(&self) -> &str {
        "TripletLossV2"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let loss = batch_hard_triplet(
            output,
            batch,
            self.margin,
            self.normalize_feature,
            "TripletLossV2",
        )?;
        Ok(ScalarMap::single("TripletLossV2", loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn features(rows: ndarray::Array2<f32>) -> ModelOutput {
        ModelOutput::dict().with("features", rows.into_dyn())
    }

    #[test]
    fn test_well_separated_classes_have_zero_loss() {
        let output = features(array![[0.0f32, 0.0], [0.0, 0.1], [10.0, 0.0], [10.0, 0.1]]);
        let batch = Batch::from_indices(&[0, 0, 1, 1]);
        let value = TripletLoss::new(1.0)
            .evaluate(&output, &batch)
            .unwrap()
            .get("TripletLoss")
            .unwrap();
        assert!(value.abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_classes() {
        // d_ap = 2 for every anchor, d_an = 1 for every anchor.
        let output = features(array![[0.0f32], [2.0], [1.0], [3.0]]);
        let batch = Batch::from_indices(&[0, 0, 1, 1]);
        let value = TripletLoss::new(0.5)
            .evaluate(&output, &batch)
            .unwrap()
            .get("TripletLoss")
            .unwrap();
        assert!((value - 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_v2_normalizes_features() {
        // After normalisation, rows 0/1 and 2/3 coincide.
        let output = features(array![[1.0f32, 0.0], [5.0, 0.0], [0.0, 1.0], [0.0, 3.0]]);
        let batch = Batch::from_indices(&[0, 0, 1, 1]);
        let value = TripletLossV2::new(0.5, true)
            .evaluate(&output, &batch)
            .unwrap()
            .get("TripletLossV2")
            .unwrap();
        assert!(value.abs() < 1e-6);

        let raw = TripletLossV2::new(0.5, false)
            .evaluate(&output, &batch)
            .unwrap()
            .get("TripletLossV2")
            .unwrap();
        assert!(raw > 0.0);
    }

    #[test]
    fn test_requires_features() {
        let output = ModelOutput::from(array![[1.0f32, 0.0]].into_dyn());
        assert!(TripletLoss::new(1.0)
            .evaluate(&output, &Batch::from_indices(&[0]))
            .is_err());
    }
}
