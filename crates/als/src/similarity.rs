//! Embedding similarity over fitted factors

use crate::error::{AlsError, Result};
use crate::solver::Factors;
use ndarray::ArrayView1;
use std::cmp::Ordering;

/// Dot product; `None` for vectors of different length
pub fn dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.dot(&b))
}

/// Cosine similarity, 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let Some(product) = dot(a, b) else {
        return 0.0;
    };
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    product / (norm_a * norm_b)
}

impl Factors {
    /// The `n` users most similar to `user`, excluding itself
    pub fn similar_users(&self, user: usize, n: usize) -> Result<Vec<(usize, f64)>> {
        let target = self.user_embedding(user).ok_or_else(|| {
            AlsError::invalid_input(format!(
                "user index {} out of range for {} users",
                user,
                self.num_users()
            ))
        })?;

        let candidates = self
            .user_factors
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| *idx != user)
            .map(|(idx, row)| (idx, cosine_similarity(target, row)));

        Ok(top_similar(candidates, n))
    }

    /// The `n` items most similar to `item`, excluding itself
    pub fn similar_items(&self, item: usize, n: usize) -> Result<Vec<(usize, f64)>> {
        let target = self.item_embedding(item).ok_or_else(|| {
            AlsError::invalid_input(format!(
                "item index {} out of range for {} items",
                item,
                self.num_items()
            ))
        })?;

        let candidates = self
            .item_factors
            .columns()
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| *idx != item)
            .map(|(idx, col)| (idx, cosine_similarity(target, col)));

        Ok(top_similar(candidates, n))
    }
}

fn top_similar(candidates: impl Iterator<Item = (usize, f64)>, n: usize) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = candidates.collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(n);
    scored
}
