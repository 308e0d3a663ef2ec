//! Rankings and predictions from a reconstructed rating matrix
//!
//! Raw reconstructions are not on the rating scale, so scores are first
//! shifted to start at zero and rescaled so the largest score equals the
//! largest observed rating. Already-rated cells are then pushed down by the
//! max rating so that unrated items rank above rated ones.

use crate::error::{AlsError, Result};
use crate::mask::build_mask;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub index: usize,
    pub name: Option<String>,
    pub score: f64,
}

/// Top-N items for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub user: usize,
    pub items: Vec<RankedItem>,
    /// The user has no observed ratings, no item scores above zero, or the
    /// reconstruction is constant. Items are still returned but carry no signal.
    pub degenerate: bool,
}

impl Ranking {
    pub fn indices(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.index).collect()
    }
}

/// Rescaled and suppressed scores derived from Q and Q̂
#[derive(Debug, Clone)]
pub struct ScoreTable {
    scaled: Array2<f64>,
    suppressed: Array2<f64>,
    mask: Array2<f64>,
    max_rating: f64,
    degenerate: bool,
}

impl ScoreTable {
    pub fn new(ratings: ArrayView2<f64>, q_hat: ArrayView2<f64>) -> Result<Self> {
        if ratings.dim() != q_hat.dim() {
            return Err(AlsError::invalid_input(format!(
                "ratings {:?} and reconstruction {:?} differ in shape",
                ratings.dim(),
                q_hat.dim()
            )));
        }
        if q_hat.is_empty() {
            return Err(AlsError::invalid_input("reconstruction is empty"));
        }
        if q_hat.iter().any(|v| !v.is_finite()) {
            return Err(AlsError::invalid_input(
                "reconstruction contains non-finite values",
            ));
        }

        let min = q_hat.fold(f64::INFINITY, |m, &v| m.min(v));
        let normalized = q_hat.mapv(|v| v - min);
        let spread = normalized.fold(0.0f64, |m, &v| m.max(v));
        let max_rating = max_rating(ratings);

        let degenerate = spread == 0.0;
        let scaled = if degenerate {
            warn!("reconstruction is constant; scores cannot be rescaled");
            normalized
        } else {
            normalized * (max_rating / spread)
        };

        let mask = build_mask(ratings);
        let suppressed = &scaled - &(&mask * max_rating);

        Ok(Self {
            scaled,
            suppressed,
            mask,
            max_rating,
            degenerate,
        })
    }

    pub fn scaled(&self) -> ArrayView2<'_, f64> {
        self.scaled.view()
    }

    pub fn suppressed(&self) -> ArrayView2<'_, f64> {
        self.suppressed.view()
    }

    pub fn max_rating(&self) -> f64 {
        self.max_rating
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn num_users(&self) -> usize {
        self.scaled.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.scaled.ncols()
    }

    /// Rescaled score for one cell (not suppressed for rated items)
    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        self.check_user(user)?;
        if item >= self.num_items() {
            return Err(AlsError::invalid_input(format!(
                "item index {} out of range for {} items",
                item,
                self.num_items()
            )));
        }
        Ok(self.scaled[[user, item]])
    }

    /// Up to `n` items for `user`, highest suppressed score first
    ///
    /// Equal scores keep ascending index order. When no score is positive the
    /// [`argmax`] pick leads and the ranking is flagged degenerate, so the
    /// first item always matches [`ScoreTable::best_items`].
    pub fn top_n(&self, user: usize, n: usize, names: Option<&[&str]>) -> Result<Ranking> {
        self.check_user(user)?;
        let cols = self.num_items();
        if n > cols {
            return Err(AlsError::invalid_input(format!(
                "requested top {} of only {} items",
                n, cols
            )));
        }
        if let Some(names) = names {
            if names.len() != cols {
                return Err(AlsError::invalid_input(format!(
                    "{} item names supplied for {} items",
                    names.len(),
                    cols
                )));
            }
        }

        let row = self.suppressed.row(user);
        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|&a, &b| row[b].partial_cmp(&row[a]).unwrap_or(Ordering::Equal));

        // Nothing scores above zero: lead with the same pick as `argmax`.
        let no_positive = row.iter().all(|&v| v <= 0.0);
        if no_positive {
            let first = argmax(row);
            order.retain(|&idx| idx != first);
            order.insert(0, first);
        }

        let items = order
            .into_iter()
            .take(n)
            .map(|index| RankedItem {
                index,
                name: names.map(|names| names[index].to_string()),
                score: row[index],
            })
            .collect();

        let unrated_user = self.mask.row(user).iter().all(|&w| w == 0.0);
        if unrated_user {
            warn!(user, "user has no observed ratings; ranking is a default order");
        } else if no_positive {
            warn!(user, "no item scores above zero; ranking is a default order");
        }

        Ok(Ranking {
            user,
            items,
            degenerate: self.degenerate || unrated_user || no_positive,
        })
    }

    /// Best item per user by [`argmax`] over suppressed scores
    pub fn best_items(&self) -> Vec<usize> {
        self.suppressed.rows().into_iter().map(argmax).collect()
    }

    fn check_user(&self, user: usize) -> Result<()> {
        if user >= self.num_users() {
            return Err(AlsError::invalid_input(format!(
                "user index {} out of range for {} users",
                user,
                self.num_users()
            )));
        }
        Ok(())
    }
}

/// Largest observed rating; NaN cells are skipped and the floor is 0
pub fn max_rating(ratings: ArrayView2<f64>) -> f64 {
    ratings
        .iter()
        .filter(|v| !v.is_nan())
        .fold(0.0f64, |m, &v| m.max(v))
}

/// Index of the first strictly greatest value
///
/// The scan starts from an implicit best of `0.0` at index 0, so a row that
/// is all zeros or all negative yields 0.
pub fn argmax(values: ArrayView1<f64>) -> usize {
    let mut index = 0;
    let mut best = 0.0;
    for (idx, &val) in values.iter().enumerate() {
        if val > best {
            index = idx;
            best = val;
        }
    }
    index
}

pub fn predict(
    ratings: ArrayView2<f64>,
    q_hat: ArrayView2<f64>,
    user: usize,
    item: usize,
) -> Result<f64> {
    ScoreTable::new(ratings, q_hat)?.predict(user, item)
}

pub fn top_n(
    ratings: ArrayView2<f64>,
    q_hat: ArrayView2<f64>,
    user: usize,
    n: usize,
    names: Option<&[&str]>,
) -> Result<Ranking> {
    ScoreTable::new(ratings, q_hat)?.top_n(user, n, names)
}

pub fn best_items(ratings: ArrayView2<f64>, q_hat: ArrayView2<f64>) -> Result<Vec<usize>> {
    Ok(ScoreTable::new(ratings, q_hat)?.best_items())
}
