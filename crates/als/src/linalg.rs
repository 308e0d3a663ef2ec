//! Dense matrix primitives used by the solver
//!
//! The solver only needs five operations from a matrix type: multiply,
//! transpose, scale, elementwise add/subtract, and solving `A·X = B`.
//! [`DenseOps`] names them; the `ndarray` implementation below is the one
//! the crate ships.

use crate::error::{AlsError, Result};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

/// Pivots below this fraction of the largest diagonal entry are treated as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

pub trait DenseOps: Sized {
    fn matmul(&self, rhs: &Self) -> Result<Self>;
    fn transposed(&self) -> Self;
    fn scaled(&self, factor: f64) -> Self;
    fn elementwise_add(&self, rhs: &Self) -> Result<Self>;
    fn elementwise_sub(&self, rhs: &Self) -> Result<Self>;
    /// Solve `self · X = rhs` for `X`.
    fn solve(&self, rhs: &Self) -> Result<Self>;
}

impl DenseOps for Array2<f64> {
    fn matmul(&self, rhs: &Self) -> Result<Self> {
        if self.ncols() != rhs.nrows() {
            return Err(AlsError::invalid_input(format!(
                "cannot multiply {:?} by {:?}",
                self.dim(),
                rhs.dim()
            )));
        }
        Ok(self.dot(rhs))
    }

    fn transposed(&self) -> Self {
        self.t().to_owned()
    }

    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }

    fn elementwise_add(&self, rhs: &Self) -> Result<Self> {
        ensure_same_shape(self, rhs, "add")?;
        Ok(self + rhs)
    }

    fn elementwise_sub(&self, rhs: &Self) -> Result<Self> {
        ensure_same_shape(self, rhs, "subtract")?;
        Ok(self - rhs)
    }

    fn solve(&self, rhs: &Self) -> Result<Self> {
        Cholesky::factor(self.view())?.solve(rhs.view())
    }
}

fn ensure_same_shape(a: &Array2<f64>, b: &Array2<f64>, op: &str) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(AlsError::invalid_input(format!(
            "cannot {} matrices of shape {:?} and {:?}",
            op,
            a.dim(),
            b.dim()
        )));
    }
    Ok(())
}

/// `λ·I` of size `k × k`
pub fn scaled_identity(k: usize, lambda: f64) -> Array2<f64> {
    Array2::<f64>::eye(k).scaled(lambda)
}

/// Pivot cutoff for `A = G + λ·I` with `G` positive semi-definite
///
/// Every exact pivot of such a system is at least `λ`, so for `λ > 0` the
/// cutoff never exceeds `λ / 2`. With `λ = 0` only the relative check applies.
pub fn ridge_tolerance(a: ArrayView2<f64>, lambda: f64) -> f64 {
    let relative = PIVOT_TOLERANCE * diag_scale(a);
    if lambda > 0.0 {
        relative.min(lambda / 2.0)
    } else {
        relative
    }
}

/// Solve the ridge system `A·X = B`, where `A` already includes `λ·I`
pub fn solve_ridge(a: ArrayView2<f64>, b: ArrayView2<f64>, lambda: f64) -> Result<Array2<f64>> {
    Cholesky::factor_with_tolerance(a, ridge_tolerance(a, lambda))?.solve(b)
}

fn diag_scale(a: ArrayView2<f64>) -> f64 {
    a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

/// Cholesky factor `A = L·Lᵗ` of a symmetric positive-definite matrix
///
/// Factor once, then substitute once per right-hand-side column.
#[derive(Debug, Clone)]
pub struct Cholesky {
    lower: Array2<f64>,
}

impl Cholesky {
    /// Factor with pivots checked against [`PIVOT_TOLERANCE`] times the
    /// largest diagonal entry
    pub fn factor(a: ArrayView2<f64>) -> Result<Self> {
        Self::factor_with_tolerance(a, PIVOT_TOLERANCE * diag_scale(a))
    }

    /// Factor, rejecting any pivot `<= tolerance`
    pub fn factor_with_tolerance(a: ArrayView2<f64>, tolerance: f64) -> Result<Self> {
        let n = a.nrows();
        if n == 0 || a.ncols() != n {
            return Err(AlsError::invalid_input(format!(
                "system matrix must be square and non-empty, got {:?}",
                a.dim()
            )));
        }

        let mut lower = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            for j in 0..=i {
                let partial = lower
                    .row(i)
                    .slice(s![..j])
                    .dot(&lower.row(j).slice(s![..j]));
                let residual = a[[i, j]] - partial;

                let value = if i == j {
                    if !residual.is_finite() || residual <= tolerance {
                        return Err(AlsError::ill_conditioned(
                            "linear solve",
                            format!(
                                "pivot {} is {:.3e}; matrix is singular or not positive definite",
                                i, residual
                            ),
                        ));
                    }
                    residual.sqrt()
                } else {
                    residual / lower[[j, j]]
                };
                lower[[i, j]] = value;
            }
        }

        Ok(Self { lower })
    }

    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Solve `A·x = b` for a single right-hand side
    pub fn solve_vec(&self, b: ArrayView1<f64>) -> Result<Array1<f64>> {
        let n = self.dim();
        if b.len() != n {
            return Err(AlsError::invalid_input(format!(
                "right-hand side has length {}, expected {}",
                b.len(),
                n
            )));
        }
        let l = &self.lower;

        // Forward: L·z = b
        let mut z = Array1::<f64>::zeros(n);
        for i in 0..n {
            let known = l.row(i).slice(s![..i]).dot(&z.slice(s![..i]));
            z[i] = (b[i] - known) / l[[i, i]];
        }

        // Back: Lᵗ·x = z, reading column i of L below the diagonal
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let known = l
                .column(i)
                .slice(s![i + 1..])
                .dot(&x.slice(s![i + 1..]));
            x[i] = (z[i] - known) / l[[i, i]];
        }

        if x.iter().any(|v| !v.is_finite()) {
            return Err(AlsError::ill_conditioned(
                "linear solve",
                "solution contains non-finite values",
            ));
        }

        Ok(x)
    }

    /// Solve `A·X = B` column by column
    pub fn solve(&self, b: ArrayView2<f64>) -> Result<Array2<f64>> {
        if b.nrows() != self.dim() {
            return Err(AlsError::invalid_input(format!(
                "right-hand side has {} rows, expected {}",
                b.nrows(),
                self.dim()
            )));
        }

        let mut x = Array2::<f64>::zeros(b.dim());
        for (col, mut out) in b.columns().into_iter().zip(x.columns_mut()) {
            out.assign(&self.solve_vec(col)?);
        }
        Ok(x)
    }
}
