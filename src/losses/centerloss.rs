// --- Файл: src/losses/centerloss.rs ---

//! Center loss: squared distance of every feature to its class center.

use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::matrix;
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

const CLIP_MIN: f64 = 1e-12;
const CLIP_MAX: f64 = 1e12;

/// Penalises the distance between each feature and the center of its class.
///
/// The `[batch, num_classes]` squared distance matrix is masked to
/// the label column and every entry is clipped to `[1e-12, 1e12]` before
/// summation, so masked-out entries still contribute `1e-12` each. The sum
/// is divided by the batch size.
///
/// Centers are drawn from a standard normal with a fixed `seed`. Updating
/// them is the trainer's job.
///
/// Output key: `CenterLoss`.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterLoss {
    centers: Array2<f32>,
}

impl CenterLoss {
    pub fn new(num_classes: usize, feat_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers = Array2::random_using((num_classes, feat_dim), StandardNormal, &mut rng);
        Self { centers }
    }

    /// Uses explicit centers, one row per class.
    pub fn with_centers(centers: Array2<f32>) -> Self {
        Self { centers }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let num_classes = params.take_usize_or("num_classes", 5013)?;
        let feat_dim = params.take_usize_or("feat_dim", 2048)?;
        let seed = params.take_usize_or("seed", 0)? as u64;
        if num_classes == 0 || feat_dim == 0 {
            return Err(ConfigError::construction(
                params.owner(),
                "num_classes and feat_dim must be positive",
            ));
        }
        params.finish()?;
        Ok(Self::new(num_classes, feat_dim, seed))
    }

    pub fn centers(&self) -> &Array2<f32> {
        &self.centers
    }

    pub fn num_classes(&self) -> usize {
        self.centers.nrows()
    }

    pub fn feat_dim(&self) -> usize {
        self.centers.ncols()
    }
}

impl Loss for CenterLoss {
    fn name(&self) -> &str {
        "CenterLoss"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let features = matrix(output.features()?, "CenterLoss features")?;
        let (rows, dim) = features.dim();
        if dim != self.feat_dim() {
            return Err(EvalError::shape(
                "CenterLoss",
                format!("features have dim {dim}, centers have dim {}", self.feat_dim()),
            ));
        }
        if rows == 0 {
            return Err(EvalError::invalid("CenterLoss", "empty batch"));
        }

        let labels = batch.class_indices(Some(self.num_classes()))?;
        if labels.len() != rows {
            return Err(EvalError::shape(
                "CenterLoss",
                format!("{} labels for {} features", labels.len(), rows),
            ));
        }

        let mut total = 0.0f64;
        for (feature, &label) in features.outer_iter().zip(&labels) {
            let center = self.centers.row(label);
            let dist: f64 = feature
                .iter()
                .zip(center.iter())
                .map(|(&f, &c)| {
                    let d = f as f64 - c as f64;
                    d * d
                })
                .sum();
            total += dist.clamp(CLIP_MIN, CLIP_MAX);
        }
        let masked_entries = (rows * (self.num_classes() - 1)) as f64;
        total += masked_entries * CLIP_MIN;

        Ok(ScalarMap::single("CenterLoss", (total / rows as f64) as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_distance_to_own_center() {
        let loss = CenterLoss::with_centers(array![[0.0f32, 0.0], [1.0, 1.0]]);
        let output = ModelOutput::dict().with(
            "features",
            array![[0.0f32, 2.0], [1.0, 1.0]].into_dyn(),
        );
        let value = loss
            .evaluate(&output, &Batch::from_indices(&[0, 1]))
            .unwrap()
            .get("CenterLoss")
            .unwrap();
        // sample 0: 4, sample 1: 0 -> clipped to 1e-12; plus masked entries.
        assert!((value - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_seeded_centers_are_reproducible() {
        let a = CenterLoss::new(4, 3, 7);
        let b = CenterLoss::new(4, 3, 7);
        assert_eq!(a.centers(), b.centers());
        assert_eq!(a.centers().dim(), (4, 3));
    }

    #[test]
    fn test_feature_dim_mismatch() {
        let loss = CenterLoss::new(2, 3, 0);
        let output = ModelOutput::dict().with("features", array![[1.0f32, 2.0]].into_dyn());
        assert!(matches!(
            loss.evaluate(&output, &Batch::from_indices(&[0])),
            Err(EvalError::Shape { .. })
        ));
    }
}
