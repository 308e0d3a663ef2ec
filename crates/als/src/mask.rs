//! Observation mask for a rating matrix
//!
//! A rating of `0.0` or NaN means "not observed".

use ndarray::{Array2, ArrayView2, Axis};

#[inline]
pub fn is_missing(value: f64) -> bool {
    value == 0.0 || value.is_nan()
}

/// Build W: `1.0` where Q is observed, `0.0` where it is missing
pub fn build_mask(ratings: ArrayView2<f64>) -> Array2<f64> {
    ratings.mapv(|v| if is_missing(v) { 0.0 } else { 1.0 })
}

pub fn observed_count(mask: ArrayView2<f64>) -> usize {
    mask.iter().filter(|&&w| w != 0.0).count()
}

/// Row indices (users) without a single observation
pub fn empty_rows(mask: ArrayView2<f64>) -> Vec<usize> {
    empty_lanes(mask, Axis(0))
}

/// Column indices (items) without a single observation
pub fn empty_cols(mask: ArrayView2<f64>) -> Vec<usize> {
    empty_lanes(mask, Axis(1))
}

fn empty_lanes(mask: ArrayView2<f64>, axis: Axis) -> Vec<usize> {
    mask.axis_iter(axis)
        .enumerate()
        .filter(|(_, lane)| lane.iter().all(|&w| w == 0.0))
        .map(|(idx, _)| idx)
        .collect()
}
