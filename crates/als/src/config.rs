//! Fit configuration with environment variable loading
//!
//! All variables use the `ALS_` prefix. Values missing from the environment
//! fall back to [`AlsConfig::default`].
//!
//! # Example
//!
//! ```no_run
//! use als_recommender::config::{load_dotenv, AlsConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//! let config = AlsConfig::from_env()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::AlsError;
use crate::solver::SolveStrategy;

/// ALS fit parameters
///
/// # Environment Variables
///
/// - `ALS_RANK` (optional): latent factor count (default: 5)
/// - `ALS_ITERATIONS` (optional): alternation count (default: 10)
/// - `ALS_REGULARIZATION` (optional): lambda (default: 0.1)
/// - `ALS_STRATEGY` (optional): `weighted` or `dense` (default: weighted)
/// - `ALS_SEED` (optional): RNG seed for reproducible fits
/// - `ALS_PARALLEL` (optional): solve rows on the rayon pool (default: true)
/// - `ALS_TRACK_PROGRESS` (optional): record per-iteration error (default: false)
#[derive(Debug, Clone, PartialEq)]
pub struct AlsConfig {
    /// Number of latent factors (k)
    pub rank: usize,
    /// Number of alternations; the only stopping criterion
    pub iterations: usize,
    /// Regularization parameter (lambda)
    pub regularization: f64,
    /// Which normal equations each half-step solves
    pub strategy: SolveStrategy,
    /// Seed for the factor initializer; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Run independent row/column solves in parallel
    pub parallel: bool,
    /// Compute error and objective after every iteration
    pub track_progress: bool,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            rank: 5,
            iterations: 10,
            regularization: 0.1,
            strategy: SolveStrategy::Weighted,
            seed: None,
            parallel: true,
            track_progress: false,
        }
    }
}

impl AlsConfig {
    pub fn new(rank: usize, iterations: usize, regularization: f64) -> Self {
        Self {
            rank,
            iterations,
            regularization,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_strategy(mut self, strategy: SolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_progress(mut self, track_progress: bool) -> Self {
        self.track_progress = track_progress;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load configuration from `ALS_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, AlsError> {
        let defaults = Self::default();

        let rank = parse_env_var("ALS_RANK", defaults.rank)?;
        let iterations = parse_env_var("ALS_ITERATIONS", defaults.iterations)?;
        let regularization = parse_env_var("ALS_REGULARIZATION", defaults.regularization)?;
        let strategy = parse_env_var("ALS_STRATEGY", defaults.strategy)?;
        let parallel = parse_env_var("ALS_PARALLEL", defaults.parallel)?;
        let track_progress = parse_env_var("ALS_TRACK_PROGRESS", defaults.track_progress)?;

        let seed = match std::env::var("ALS_SEED") {
            Ok(v) => Some(v.parse::<u64>().map_err(|e| AlsError::ConfigurationError {
                message: format!("Failed to parse ALS_SEED: {}", e),
                key: Some("ALS_SEED".to_string()),
            })?),
            Err(_) => defaults.seed,
        };

        Ok(Self {
            rank,
            iterations,
            regularization,
            strategy,
            seed,
            parallel,
            track_progress,
        })
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` naming the offending variable.
    pub fn validate(&self) -> Result<(), AlsError> {
        if self.rank == 0 {
            return Err(AlsError::ConfigurationError {
                message: "rank must be greater than 0".to_string(),
                key: Some("ALS_RANK".to_string()),
            });
        }

        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(AlsError::ConfigurationError {
                message: format!(
                    "regularization must be a finite non-negative number, got {}",
                    self.regularization
                ),
                key: Some("ALS_REGULARIZATION".to_string()),
            });
        }

        Ok(())
    }
}

fn parse_env_var<T>(key: &str, default: T) -> Result<T, AlsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| AlsError::ConfigurationError {
                message: format!("Failed to parse {}: {}", key, e),
                key: Some(key.to_string()),
            })
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// A missing file is not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_als_config_default() {
        let config = AlsConfig::default();
        assert_eq!(config.rank, 5);
        assert_eq!(config.iterations, 10);
        assert_eq!(config.regularization, 0.1);
        assert_eq!(config.strategy, SolveStrategy::Weighted);
        assert_eq!(config.seed, None);
        assert!(config.parallel);
        assert!(!config.track_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = AlsConfig::new(3, 20, 0.05)
            .with_seed(7)
            .with_strategy(SolveStrategy::Dense)
            .with_progress(true)
            .with_parallel(false);

        assert_eq!(config.rank, 3);
        assert_eq!(config.iterations, 20);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.strategy, SolveStrategy::Dense);
        assert!(config.track_progress);
        assert!(!config.parallel);
    }

    // Env-var cases share one test so they never race each other.
    #[test]
    fn test_als_config_from_env() {
        env::set_var("ALS_RANK", "8");
        env::set_var("ALS_ITERATIONS", "25");
        env::set_var("ALS_REGULARIZATION", "0.05");
        env::set_var("ALS_STRATEGY", "dense");
        env::set_var("ALS_SEED", "42");
        env::set_var("ALS_PARALLEL", "false");

        let config = AlsConfig::from_env().unwrap();
        assert_eq!(config.rank, 8);
        assert_eq!(config.iterations, 25);
        assert_eq!(config.regularization, 0.05);
        assert_eq!(config.strategy, SolveStrategy::Dense);
        assert_eq!(config.seed, Some(42));
        assert!(!config.parallel);

        env::set_var("ALS_RANK", "eight");
        let result = AlsConfig::from_env();
        assert!(matches!(
            result,
            Err(AlsError::ConfigurationError { key: Some(ref k), .. }) if k == "ALS_RANK"
        ));

        env::set_var("ALS_RANK", "8");
        env::set_var("ALS_STRATEGY", "sideways");
        assert!(AlsConfig::from_env().is_err());

        for key in [
            "ALS_RANK",
            "ALS_ITERATIONS",
            "ALS_REGULARIZATION",
            "ALS_STRATEGY",
            "ALS_SEED",
            "ALS_PARALLEL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_validation_zero_rank() {
        let mut config = AlsConfig::default();
        config.rank = 0;

        let result = config.validate();
        assert!(matches!(
            result.unwrap_err(),
            AlsError::ConfigurationError { .. }
        ));
    }

    #[test]
    fn test_validation_negative_regularization() {
        let mut config = AlsConfig::default();
        config.regularization = -0.1;
        assert!(config.validate().is_err());

        config.regularization = f64::NAN;
        assert!(config.validate().is_err());

        config.regularization = 0.0;
        assert!(config.validate().is_ok());
    }
}
