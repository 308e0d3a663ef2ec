//! ALS Recommender
//!
//! Fits a low-rank factorization `Q ≈ X·Y` of a partially observed user-item
//! rating matrix with Alternating Least Squares, then ranks items per user
//! from the reconstruction.
//!
//! Ratings of `0.0` or NaN are treated as unobserved.
//!
//! ```no_run
//! use als_recommender::{AlsConfig, AlsSolver, ScoreTable};
//! use ndarray::array;
//!
//! # fn example() -> als_recommender::Result<()> {
//! let ratings = array![[5.0, 0.0, 1.0], [4.0, 2.0, 0.0], [0.0, 1.0, 5.0]];
//! let report = AlsSolver::new(AlsConfig::new(2, 10, 0.1).with_seed(7)).fit(ratings.view())?;
//! let q_hat = report.factors.reconstruct()?;
//! let ranking = ScoreTable::new(ratings.view(), q_hat.view())?.top_n(0, 1, None)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod evaluate;
pub mod init;
pub mod linalg;
pub mod mask;
pub mod ranking;
pub mod similarity;
pub mod solver;

pub use config::{load_dotenv, AlsConfig};
pub use error::{AlsError, Result};
pub use evaluate::{objective, reconstruct, rmse, weighted_error};
pub use init::{initialize_factors, seeded_rng};
pub use linalg::{Cholesky, DenseOps};
pub use mask::build_mask;
pub use ranking::{argmax, best_items, predict, top_n, RankedItem, Ranking, ScoreTable};
pub use similarity::cosine_similarity;
pub use solver::{fit, AlsSolver, Factors, FitReport, IterationStats, SolveStrategy};
