// --- Файл: src/losses/mining.rs ---

//! Positive / negative mining over distance matrices.
//!
//! Two batch layouts are supported:
//!
//! - **labelled**: positives are the samples that share the anchor's label
//!   (`TripletLoss`, `TripletLossV2`).
//! - **grouped**: the batch is `P * K` samples where each run of `K`
//!   consecutive samples belongs to one class (`MSMLoss`, `EmlLoss`,
//!   `TriHardLoss`). Labels are not consulted.

use crate::config::Params;
use crate::error::{ConfigError, EvalError};
use ndarray::Array2;

/// Hardest positive (max distance, anchor itself included) and hardest
/// negative (min distance) for every anchor.
pub fn hardest_by_label(
    dist: &Array2<f32>,
    labels: &[usize],
    context: &str,
) -> Result<(Vec<f32>, Vec<f32>), EvalError> {
    let n = dist.nrows();
    if labels.len() != n {
        return Err(EvalError::shape(
            context,
            format!("{} labels for {} features", labels.len(), n),
        ));
    }

    let mut dist_ap = Vec::with_capacity(n);
    let mut dist_an = Vec::with_capacity(n);
    for i in 0..n {
        let mut hardest_pos = f32::NEG_INFINITY;
        let mut hardest_neg = f32::INFINITY;
        for j in 0..n {
            let d = dist[[i, j]];
            if labels[j] == labels[i] {
                hardest_pos = hardest_pos.max(d);
            } else {
                hardest_neg = hardest_neg.min(d);
            }
        }
        if hardest_neg == f32::INFINITY {
            return Err(EvalError::invalid(
                context,
                format!("anchor {i} has no negative sample in the batch"),
            ));
        }
        dist_ap.push(hardest_pos);
        dist_an.push(hardest_neg);
    }
    Ok((dist_ap, dist_an))
}

/// `mean(max(0, d_ap - d_an + margin))`.
pub fn margin_ranking(dist_ap: &[f32], dist_an: &[f32], margin: f32) -> f32 {
    if dist_ap.is_empty() {
        return 0.0;
    }
    let total: f32 = dist_ap
        .iter()
        .zip(dist_an)
        .map(|(ap, an)| (ap - an + margin).max(0.0))
        .sum();
    total / dist_ap.len() as f32
}

/// Fixed `P * K` layout shared by the grouped losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLayout {
    pub batch_size: usize,
    pub samples_each_class: usize,
}

impl GroupLayout {
    /// Reads `batch_size` and `samples_each_class` and validates them.
    pub fn from_params(
        params: &mut Params,
        default_batch_size: usize,
    ) -> Result<Self, ConfigError> {
        let batch_size = params.take_usize_or("batch_size", default_batch_size)?;
        let samples_each_class = params.take_usize_or("samples_each_class", 2)?;
        Self::new(params.owner(), batch_size, samples_each_class)
    }

    pub fn new(
        owner: &str,
        batch_size: usize,
        samples_each_class: usize,
    ) -> Result<Self, ConfigError> {
        if samples_each_class < 2 {
            return Err(ConfigError::construction(
                owner,
                "samples_each_class must be at least 2",
            ));
        }
        if batch_size % samples_each_class != 0 || batch_size <= samples_each_class {
            return Err(ConfigError::construction(
                owner,
                format!(
                    "batch_size {batch_size} must be a multiple of samples_each_class \
                     {samples_each_class} with at least two classes"
                ),
            ));
        }
        Ok(Self {
            batch_size,
            samples_each_class,
        })
    }

    /// Fails unless the batch has exactly `batch_size` rows.
    pub fn check(&self, rows: usize, context: &str) -> Result<(), EvalError> {
        if rows != self.batch_size {
            return Err(EvalError::shape(
                context,
                format!("expected {} samples, got {}", self.batch_size, rows),
            ));
        }
        Ok(())
    }

    /// Splits row `i` into same-group distances (anchor excluded) and the rest.
    pub fn split_row(&self, dist: &Array2<f32>, i: usize) -> (Vec<f32>, Vec<f32>) {
        let start = (i / self.samples_each_class) * self.samples_each_class;
        let end = start + self.samples_each_class;
        let mut pos = Vec::with_capacity(self.samples_each_class - 1);
        let mut neg = Vec::with_capacity(self.batch_size - self.samples_each_class);
        for (j, &d) in dist.row(i).iter().enumerate() {
            if j == i {
                continue;
            }
            if (start..end).contains(&j) {
                pos.push(d);
            } else {
                neg.push(d);
            }
        }
        (pos, neg)
    }
}

pub(crate) fn max_of(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

pub(crate) fn min_of(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::INFINITY, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_hardest_by_label() {
        let dist = array![
            [0.0f32, 1.0, 4.0, 2.0],
            [1.0, 0.0, 3.0, 5.0],
            [4.0, 3.0, 0.0, 0.5],
            [2.0, 5.0, 0.5, 0.0],
        ];
        let (ap, an) = hardest_by_label(&dist, &[0, 0, 1, 1], "t").unwrap();
        assert_eq!(ap, vec![1.0, 1.0, 0.5, 0.5]);
        assert_eq!(an, vec![2.0, 3.0, 3.0, 2.0]);
    }

    #[test]
    fn test_single_class_batch_fails() {
        let dist = array![[0.0f32, 1.0], [1.0, 0.0]];
        assert!(hardest_by_label(&dist, &[3, 3], "t").is_err());
    }

    #[test]
    fn test_margin_ranking() {
        let loss = margin_ranking(&[1.0, 0.5], &[2.0, 0.2], 0.5);
        // max(0, -0.5) = 0, max(0, 0.8) = 0.8
        assert!((loss - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_group_layout_validation() {
        assert!(GroupLayout::new("X", 8, 2).is_ok());
        assert!(GroupLayout::new("X", 8, 1).is_err());
        assert!(GroupLayout::new("X", 7, 2).is_err());
        assert!(GroupLayout::new("X", 2, 2).is_err());
    }

    #[test]
    fn test_split_row() {
        let layout = GroupLayout::new("X", 4, 2).unwrap();
        let dist = array![
            [0.0f32, 1.0, 2.0, 3.0],
            [1.0, 0.0, 4.0, 5.0],
            [2.0, 4.0, 0.0, 6.0],
            [3.0, 5.0, 6.0, 0.0],
        ];
        assert_eq!(layout.split_row(&dist, 1), (vec![1.0], vec![4.0, 5.0]));
        assert_eq!(layout.split_row(&dist, 2), (vec![6.0], vec![2.0, 4.0]));
    }
}
