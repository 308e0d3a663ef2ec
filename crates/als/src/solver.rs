//! Matrix Factorization using Alternating Least Squares (ALS)
//!
//! Decomposes a partially observed user-item rating matrix Q (`rows × cols`)
//! into user factors X (`rows × k`) and item factors Y (`k × cols`) by
//! minimizing
//!
//! ```text
//! J(X, Y) = Σ_{W=1} (Q − X·Y)² + λ (‖X‖²_F + ‖Y‖²_F)
//! ```
//!
//! Each half-step holds one side fixed and solves the ridge-regularized
//! normal equations for the other. Two formulations are available, see
//! [`SolveStrategy`].

use crate::config::AlsConfig;
use crate::error::{AlsError, Result};
use crate::evaluate;
use crate::init::{initialize_factors, seeded_rng};
use crate::linalg::{ridge_tolerance, scaled_identity, solve_ridge, Cholesky, DenseOps};
use crate::mask::{build_mask, empty_cols, empty_rows};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

const USER_STAGE: &str = "user factors";
const ITEM_STAGE: &str = "item factors";

/// Which normal equations each half-step solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveStrategy {
    /// One regularized system per user (item) over that user's (item's)
    /// observed entries only. Minimizes J exactly per half-step.
    #[default]
    Weighted,
    /// Shared `k × k` system over the full matrix; missing entries act as
    /// zero-valued ratings. Cheaper, but minimizes a different objective.
    Dense,
}

impl fmt::Display for SolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStrategy::Weighted => write!(f, "weighted"),
            SolveStrategy::Dense => write!(f, "dense"),
        }
    }
}

impl FromStr for SolveStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weighted" => Ok(SolveStrategy::Weighted),
            "dense" => Ok(SolveStrategy::Dense),
            other => Err(format!(
                "unknown solve strategy '{}', expected 'weighted' or 'dense'",
                other
            )),
        }
    }
}

/// Fitted latent factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    /// User latent factors: [num_users x k]
    pub user_factors: Array2<f64>,
    /// Item latent factors: [k x num_items]
    pub item_factors: Array2<f64>,
}

impl Factors {
    pub fn new(user_factors: Array2<f64>, item_factors: Array2<f64>) -> Result<Self> {
        if user_factors.ncols() != item_factors.nrows() {
            return Err(AlsError::invalid_input(format!(
                "user factors {:?} and item factors {:?} disagree on rank",
                user_factors.dim(),
                item_factors.dim()
            )));
        }
        Ok(Self {
            user_factors,
            item_factors,
        })
    }

    pub fn rank(&self) -> usize {
        self.user_factors.ncols()
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.ncols()
    }

    /// Q̂ = X·Y
    pub fn reconstruct(&self) -> Result<Array2<f64>> {
        evaluate::reconstruct(&self.user_factors, &self.item_factors)
    }

    pub fn user_embedding(&self, user: usize) -> Option<ArrayView1<'_, f64>> {
        (user < self.num_users()).then(|| self.user_factors.row(user))
    }

    pub fn item_embedding(&self, item: usize) -> Option<ArrayView1<'_, f64>> {
        (item < self.num_items()).then(|| self.item_factors.column(item))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: usize,
    pub weighted_error: f64,
    pub objective: f64,
}

/// Outcome of a fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub factors: Factors,
    /// Weighted squared error of the final factors
    pub weighted_error: f64,
    pub iterations: usize,
    /// Per-iteration stats; empty unless progress tracking is on
    pub history: Vec<IterationStats>,
    /// Users without observations (zero factor rows under `Weighted`)
    pub degenerate_users: Vec<usize>,
    /// Items without observations (zero factor columns under `Weighted`)
    pub degenerate_items: Vec<usize>,
}

/// ALS solver bound to one configuration
#[derive(Debug, Clone)]
pub struct AlsSolver {
    config: AlsConfig,
}

impl AlsSolver {
    pub fn new(config: AlsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    /// Fit with the configured seed, or OS entropy when no seed is set
    pub fn fit(&self, ratings: ArrayView2<f64>) -> Result<FitReport> {
        let mut rng = match self.config.seed {
            Some(seed) => seeded_rng(seed),
            None => StdRng::from_entropy(),
        };
        self.fit_with_rng(ratings, &mut rng)
    }

    /// Fit with initial factors drawn from `rng`
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &self,
        ratings: ArrayView2<f64>,
        rng: &mut R,
    ) -> Result<FitReport> {
        self.check_preconditions(ratings)?;
        let (rows, cols) = ratings.dim();
        let (x, y) = initialize_factors(rows, cols, self.config.rank, rng)?;
        self.fit_from(ratings, x, y)
    }

    /// Run the alternation starting from caller-supplied factors
    pub fn fit_from(
        &self,
        ratings: ArrayView2<f64>,
        mut x: Array2<f64>,
        mut y: Array2<f64>,
    ) -> Result<FitReport> {
        self.check_preconditions(ratings)?;
        let (rows, cols) = ratings.dim();
        let k = self.config.rank;
        if x.dim() != (rows, k) || y.dim() != (k, cols) {
            return Err(AlsError::invalid_input(format!(
                "initial factors {:?} and {:?} do not match ratings {:?} at rank {}",
                x.dim(),
                y.dim(),
                ratings.dim(),
                k
            )));
        }

        if k > rows.min(cols) {
            warn!(
                "rank {} exceeds min({}, {}); normal equations rely on regularization to stay solvable",
                k, rows, cols
            );
        }

        let lambda = self.config.regularization;
        let mask = build_mask(ratings);

        let degenerate_users = empty_rows(mask.view());
        let degenerate_items = empty_cols(mask.view());
        if !degenerate_users.is_empty() || !degenerate_items.is_empty() {
            warn!(
                users = ?degenerate_users,
                items = ?degenerate_items,
                "ratings contain users or items without observations; their predictions are undefined"
            );
        }

        // The dense formulation reads missing cells as zero, so NaN sentinels
        // are replaced in a private copy.
        let dense_ratings = match self.config.strategy {
            SolveStrategy::Dense => Some(ratings.mapv(|v| if v.is_nan() { 0.0 } else { v })),
            SolveStrategy::Weighted => None,
        };

        let mut history = Vec::new();

        for iteration in 0..self.config.iterations {
            let (next_x, next_y) = match &dense_ratings {
                Some(q) => dense_step(q, &y, lambda)?,
                None => weighted_step(ratings, mask.view(), &y, lambda, self.config.parallel)?,
            };
            x = next_x;
            y = next_y;

            if self.config.track_progress {
                let weighted_error = evaluate::weighted_error(mask.view(), ratings, &x, &y)?;
                let objective = evaluate::objective(mask.view(), ratings, &x, &y, lambda)?;
                debug!(
                    "ALS iteration {}: error = {:.6}, objective = {:.6}",
                    iteration, weighted_error, objective
                );
                history.push(IterationStats {
                    iteration,
                    weighted_error,
                    objective,
                });
            }
        }

        let weighted_error = evaluate::weighted_error(mask.view(), ratings, &x, &y)?;
        info!(
            rows,
            cols,
            rank = k,
            iterations = self.config.iterations,
            strategy = %self.config.strategy,
            weighted_error,
            "ALS fit complete"
        );

        Ok(FitReport {
            factors: Factors {
                user_factors: x,
                item_factors: y,
            },
            weighted_error,
            iterations: self.config.iterations,
            history,
            degenerate_users,
            degenerate_items,
        })
    }

    fn check_preconditions(&self, ratings: ArrayView2<f64>) -> Result<()> {
        let (rows, cols) = ratings.dim();
        let k = self.config.rank;
        let lambda = self.config.regularization;

        if rows == 0 || cols == 0 {
            return Err(AlsError::invalid_input(format!(
                "ratings matrix is empty ({}x{})",
                rows, cols
            )));
        }
        if k == 0 {
            return Err(AlsError::invalid_input("rank must be at least 1"));
        }
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(AlsError::invalid_input(format!(
                "regularization must be finite and non-negative, got {}",
                lambda
            )));
        }
        if ratings.iter().any(|v| v.is_infinite()) {
            return Err(AlsError::invalid_input("ratings contain infinite values"));
        }
        Ok(())
    }
}

/// Fit `rank` factors to `ratings` with default settings and an unseeded RNG
pub fn fit(
    ratings: ArrayView2<f64>,
    rank: usize,
    iterations: usize,
    regularization: f64,
) -> Result<Factors> {
    let solver = AlsSolver::new(AlsConfig::new(rank, iterations, regularization));
    Ok(solver.fit(ratings)?.factors)
}

/// One alternation of the unweighted normal equations
///
/// X step: `(Y·Yᵗ + λI)·Xᵗ = Y·Qᵗ`; Y step: `(Xᵗ·X + λI)·Y = Xᵗ·Q`.
fn dense_step(
    ratings: &Array2<f64>,
    y: &Array2<f64>,
    lambda: f64,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let k = y.nrows();
    let ridge = scaled_identity(k, lambda);

    let a = y.matmul(&y.transposed())?.elementwise_add(&ridge)?;
    let b = y.matmul(&ratings.transposed())?;
    let x = solve_ridge(a.view(), b.view(), lambda)
        .map_err(|e| e.in_stage(USER_STAGE))?
        .transposed();

    let xt = x.transposed();
    let a = xt.matmul(&x)?.elementwise_add(&ridge)?;
    let b = xt.matmul(ratings)?;
    let y = solve_ridge(a.view(), b.view(), lambda).map_err(|e| e.in_stage(ITEM_STAGE))?;

    Ok((x, y))
}

/// One alternation of weighted ALS
fn weighted_step(
    ratings: ArrayView2<f64>,
    mask: ArrayView2<f64>,
    y: &Array2<f64>,
    lambda: f64,
    parallel: bool,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let x = solve_rows(ratings, mask, y.view(), lambda, parallel)
        .map_err(|e| e.in_stage(USER_STAGE))?;

    // Items are users of the transposed problem.
    let y_t = solve_rows(ratings.t(), mask.t(), x.t(), lambda, parallel)
        .map_err(|e| e.in_stage(ITEM_STAGE))?;

    Ok((x, y_t.reversed_axes()))
}

/// For each row `r`, solve
/// `(Σ_{j∈obs(r)} f_j f_jᵗ + λI) z_r = Σ_{j∈obs(r)} q_rj f_j`
/// where `f_j` is column `j` of `fixed` (`k × n`). Returns `rows × k`.
///
/// Rows without observations get a zero vector.
fn solve_rows(
    ratings: ArrayView2<f64>,
    mask: ArrayView2<f64>,
    fixed: ArrayView2<f64>,
    lambda: f64,
    parallel: bool,
) -> Result<Array2<f64>> {
    let k = fixed.nrows();
    let n = ratings.nrows();

    let solve_one = |r: usize| -> Result<Array1<f64>> {
        let mut a = scaled_identity(k, lambda);
        let mut b = Array1::<f64>::zeros(k);
        let mut observed = 0usize;

        for (j, (&w, &q)) in mask.row(r).iter().zip(ratings.row(r).iter()).enumerate() {
            if w == 0.0 {
                continue;
            }
            observed += 1;
            let f = fixed.column(j);
            for p in 0..k {
                b[p] += w * q * f[p];
                for s in 0..k {
                    a[[p, s]] += w * f[p] * f[s];
                }
            }
        }

        if observed == 0 {
            return Ok(Array1::zeros(k));
        }

        Cholesky::factor_with_tolerance(a.view(), ridge_tolerance(a.view(), lambda))
            .and_then(|chol| chol.solve_vec(b.view()))
            .map_err(|e| match e {
                AlsError::IllConditioned { stage, message } => AlsError::IllConditioned {
                    stage,
                    message: format!("row {}: {}", r, message),
                },
                other => other,
            })
    };

    let solved: Vec<Array1<f64>> = if parallel {
        (0..n).into_par_iter().map(&solve_one).collect::<Result<_>>()?
    } else {
        (0..n).map(&solve_one).collect::<Result<_>>()?
    };

    let mut out = Array2::<f64>::zeros((n, k));
    for (r, z) in solved.into_iter().enumerate() {
        out.row_mut(r).assign(&z);
    }
    Ok(out)
}
