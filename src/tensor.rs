// --- Файл: src/tensor.rs ---

//! Dense helpers shared by the losses and metrics.
//!
//! Everything here works on 2-D `[batch, dim]` views. Reductions are done
//! row-wise, with the softmax max-shift trick for numerical stability.

use crate::error::EvalError;
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis, Ix2};

/// Views a tensor as a `[rows, cols]` matrix.
pub fn matrix<'a>(tensor: &'a ArrayD<f32>, what: &str) -> Result<ArrayView2<'a, f32>, EvalError> {
    tensor
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| {
            EvalError::shape(
                what,
                format!("expected a 2-D tensor, got shape {:?}", tensor.shape()),
            )
        })
}

/// Squared L2 norm of every row.
pub fn row_sq_norms(m: &ArrayView2<f32>) -> Array1<f32> {
    m.map_axis(Axis(1), |row| row.dot(&row))
}

/// Divides every row by `norm + eps`.
pub fn l2_normalize(m: &ArrayView2<f32>, eps: f32) -> Array2<f32> {
    let norms = row_sq_norms(m).mapv(f32::sqrt);
    let mut out = m.to_owned();
    for (mut row, norm) in out.axis_iter_mut(Axis(0)).zip(norms.iter()) {
        let denom = norm + eps;
        row.mapv_inplace(|x| x / denom);
    }
    out
}

/// Pairwise squared Euclidean distances `sum((a_i - a_j)^2)`.
pub fn pairwise_sq_distances(m: &ArrayView2<f32>) -> Array2<f32> {
    let n = m.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        m.row(i)
            .iter()
            .zip(m.row(j).iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    })
}

/// Pairwise Euclidean distances via `|a|^2 + |b|^2 - 2ab`, clamped at `1e-12`
/// before the square root.
pub fn pairwise_distances(m: &ArrayView2<f32>) -> Array2<f32> {
    let sq = row_sq_norms(m);
    let gram = m.dot(&m.t());
    let n = m.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        (sq[i] + sq[j] - 2.0 * gram[[i, j]]).max(1e-12).sqrt()
    })
}

/// Row-wise `log_softmax`.
pub fn log_softmax_rows(m: &ArrayView2<f32>) -> Array2<f32> {
    let mut out = m.to_owned();
    out.axis_iter_mut(Axis(0)).for_each(|mut row| {
        let max_val = row.iter().fold(f32::NEG_INFINITY, |max, &val| max.max(val));
        let log_sum = row.iter().map(|&x| (x - max_val).exp()).sum::<f32>().ln();
        row.mapv_inplace(|x| x - max_val - log_sum);
    });
    out
}

/// Row-wise softmax.
pub fn softmax_rows(m: &ArrayView2<f32>) -> Array2<f32> {
    log_softmax_rows(m).mapv(f32::exp)
}

/// Column indices of `row` sorted by descending value. Ties keep index order.
pub fn argsort_desc(row: ArrayView1<f32>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| {
        row[b]
            .partial_cmp(&row[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Builds `[n, num_classes]` one-hot rows.
pub fn one_hot(indices: &[usize], num_classes: usize) -> Array2<f32> {
    let mut out = Array2::zeros((indices.len(), num_classes));
    for (row, &class) in indices.iter().enumerate() {
        if class < num_classes {
            out[[row, class]] = 1.0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_matrix_rejects_wrong_rank() {
        let t = array![1.0f32, 2.0].into_dyn();
        assert!(matrix(&t, "x").is_err());
        let t = array![[1.0f32, 2.0]].into_dyn();
        assert_eq!(matrix(&t, "x").unwrap().dim(), (1, 2));
    }

    #[test]
    fn test_l2_normalize() {
        let m = array![[3.0f32, 4.0], [0.0, 2.0]];
        let n = l2_normalize(&m.view(), 0.0);
        assert!((n[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((n[[0, 1]] - 0.8).abs() < 1e-6);
        assert!((n[[1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_distances_agree() {
        let m = array![[0.0f32, 0.0], [3.0, 4.0], [1.0, 1.0]];
        let sq = pairwise_sq_distances(&m.view());
        let d = pairwise_distances(&m.view());
        assert!((sq[[0, 1]] - 25.0).abs() < 1e-5);
        assert!((d[[0, 1]] - 5.0).abs() < 1e-4);
        assert!((d[[0, 2]] - 2.0f32.sqrt()).abs() < 1e-4);
        assert!(d[[1, 1]] <= 1e-5);
    }

    #[test]
    fn test_log_softmax_uniform() {
        let m = array![[1.0f32, 1.0, 1.0, 1.0]];
        let ls = log_softmax_rows(&m.view());
        for v in ls.iter() {
            assert!((v + 4.0f32.ln()).abs() < 1e-6);
        }
        let sm = softmax_rows(&m.view());
        assert!((sm.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_argsort_desc_is_stable() {
        let row = array![0.1f32, 0.9, 0.5, 0.9];
        assert_eq!(argsort_desc(row.view()), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_one_hot() {
        let oh = one_hot(&[2, 0], 3);
        assert_eq!(oh, array![[0.0f32, 0.0, 1.0], [1.0, 0.0, 0.0]]);
    }
}
