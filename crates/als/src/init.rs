//! Random initial factors

use crate::error::{AlsError, Result};
use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Initial factor entries are drawn from `[0, INIT_UPPER)`.
pub const INIT_UPPER: f64 = 5.0;

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draw X (`rows × k`) then Y (`k × cols`), both row-major, from `U[0, 5)`
pub fn initialize_factors<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    k: usize,
    rng: &mut R,
) -> Result<(Array2<f64>, Array2<f64>)> {
    if rows == 0 || cols == 0 {
        return Err(AlsError::invalid_input(format!(
            "cannot initialize factors for an empty {}x{} matrix",
            rows, cols
        )));
    }
    if k == 0 {
        return Err(AlsError::invalid_input("rank must be at least 1"));
    }

    let dist = Uniform::new(0.0, INIT_UPPER);
    let x = Array2::from_shape_simple_fn((rows, k), || dist.sample(rng));
    let y = Array2::from_shape_simple_fn((k, cols), || dist.sample(rng));

    Ok((x, y))
}
