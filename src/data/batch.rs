// --- Файл: src/data/batch.rs ---

//! Ground-truth side of one training or evaluation step.

use crate::error::EvalError;
use ndarray::ArrayD;

/// Labels for one batch, plus an optional retrieval gallery.
///
/// `labels` holds either class indices (shape `[N]` or `[N, 1]`) or soft /
/// one-hot targets (shape `[N, C]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub labels: ArrayD<f32>,
    pub gallery: Option<Gallery>,
}

/// A retrieval gallery to rank queries against.
///
/// Without a gallery, retrieval metrics rank the batch against itself with
/// self-matches masked out.
#[derive(Debug, Clone, PartialEq)]
pub struct Gallery {
    pub features: ArrayD<f32>,
    pub labels: ArrayD<f32>,
}

impl Batch {
    pub fn new(labels: ArrayD<f32>) -> Self {
        Self {
            labels,
            gallery: None,
        }
    }

    /// Builds a batch from plain class indices.
    pub fn from_indices(indices: &[usize]) -> Self {
        let labels = ndarray::Array1::from_iter(indices.iter().map(|&i| i as f32));
        Self::new(labels.into_dyn())
    }

    pub fn with_gallery(mut self, features: ArrayD<f32>, labels: ArrayD<f32>) -> Self {
        self.gallery = Some(Gallery { features, labels });
        self
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.labels.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hard class index per sample. See [`class_indices`].
    pub fn class_indices(&self, num_classes: Option<usize>) -> Result<Vec<usize>, EvalError> {
        class_indices(&self.labels, num_classes)
    }

    /// Whether the labels are `[N, C]` soft targets for `num_classes` classes.
    pub fn has_soft_labels(&self, num_classes: usize) -> bool {
        is_soft(&self.labels, num_classes)
    }
}

fn is_soft(targets: &ArrayD<f32>, num_classes: usize) -> bool {
    targets.ndim() == 2 && num_classes > 1 && targets.shape()[1] == num_classes
}

/// Extracts one class index per sample.
///
/// `[N, C]` targets with `C > 1` are read as one-hot / soft labels and reduced
/// with argmax. Anything else is flattened and read as integer indices, which
/// must be non-negative and, when `num_classes` is given, below it.
pub fn class_indices(
    targets: &ArrayD<f32>,
    num_classes: Option<usize>,
) -> Result<Vec<usize>, EvalError> {
    let width = if targets.ndim() == 2 { targets.shape()[1] } else { 1 };

    if targets.ndim() == 2 && width > 1 {
        if let Some(c) = num_classes {
            if width != c {
                return Err(EvalError::shape(
                    "labels",
                    format!("soft labels have {width} columns, expected {c}"),
                ));
            }
        }
        let rows = targets.shape()[0];
        return Ok((0..rows)
            .map(|i| {
                (0..width)
                    .max_by(|&a, &b| {
                        targets[[i, a]]
                            .partial_cmp(&targets[[i, b]])
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or(0)
            })
            .collect());
    }

    if targets.ndim() > 2 {
        return Err(EvalError::shape(
            "labels",
            format!("unsupported label shape {:?}", targets.shape()),
        ));
    }

    targets
        .iter()
        .map(|&label| {
            if label < 0.0 || label.fract() != 0.0 || !label.is_finite() {
                return Err(EvalError::invalid(
                    "labels",
                    format!("{label} is not a class index"),
                ));
            }
            match num_classes {
                Some(c) if label as usize >= c => Err(EvalError::LabelOutOfRange {
                    label,
                    num_classes: c,
                }),
                _ => Ok(label as usize),
            }
        })
        .collect()
}
