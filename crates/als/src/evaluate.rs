//! Reconstruction and error metrics

use crate::error::{AlsError, Result};
use crate::linalg::DenseOps;
use ndarray::{Array2, ArrayView2, Zip};

/// Q̂ = X·Y
pub fn reconstruct(x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>> {
    x.matmul(y)
}

/// `Σ (W ⊙ (Q − X·Y))²`
///
/// Unobserved cells contribute exactly zero, even when Q holds NaN there.
pub fn weighted_error(
    mask: ArrayView2<f64>,
    ratings: ArrayView2<f64>,
    x: &Array2<f64>,
    y: &Array2<f64>,
) -> Result<f64> {
    let q_hat = reconstruct(x, y)?;
    weighted_error_of(mask, ratings, q_hat.view())
}

/// Weighted squared error of an already reconstructed matrix
pub fn weighted_error_of(
    mask: ArrayView2<f64>,
    ratings: ArrayView2<f64>,
    q_hat: ArrayView2<f64>,
) -> Result<f64> {
    check_shapes(mask, ratings, q_hat)?;

    let mut sum = 0.0;
    Zip::from(mask)
        .and(ratings)
        .and(q_hat)
        .for_each(|&w, &q, &p| {
            if w != 0.0 {
                let diff = w * (q - p);
                sum += diff * diff;
            }
        });
    Ok(sum)
}

/// Regularized objective `J = E + λ(‖X‖²_F + ‖Y‖²_F)`
pub fn objective(
    mask: ArrayView2<f64>,
    ratings: ArrayView2<f64>,
    x: &Array2<f64>,
    y: &Array2<f64>,
    lambda: f64,
) -> Result<f64> {
    let error = weighted_error(mask, ratings, x, y)?;
    Ok(error + lambda * (frobenius_sq(x) + frobenius_sq(y)))
}

/// Root mean squared error over observed cells; `None` if nothing is observed
pub fn rmse(
    mask: ArrayView2<f64>,
    ratings: ArrayView2<f64>,
    x: &Array2<f64>,
    y: &Array2<f64>,
) -> Result<Option<f64>> {
    let error = weighted_error(mask, ratings, x, y)?;
    let observed = crate::mask::observed_count(mask);
    if observed == 0 {
        return Ok(None);
    }
    Ok(Some((error / observed as f64).sqrt()))
}

fn frobenius_sq(m: &Array2<f64>) -> f64 {
    m.iter().map(|v| v * v).sum()
}

fn check_shapes(
    mask: ArrayView2<f64>,
    ratings: ArrayView2<f64>,
    q_hat: ArrayView2<f64>,
) -> Result<()> {
    if mask.dim() != ratings.dim() || q_hat.dim() != ratings.dim() {
        return Err(AlsError::invalid_input(format!(
            "shape mismatch: mask {:?}, ratings {:?}, reconstruction {:?}",
            mask.dim(),
            ratings.dim(),
            q_hat.dim()
        )));
    }
    Ok(())
}
